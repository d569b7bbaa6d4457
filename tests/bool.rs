#[macro_use]
mod common;

#[cfg(test)]
mod bool {
    tests! {
        truthiness in bool is OK
        "zero truthy"
        "empty truthy"
        "nil falsy"
    }

    tests! {
        negation in bool is OK
        "false"
        "true"
        "false"
    }

    tests! {
        equality in bool is OK
        "true"
        "false"
        "true"
        "false"
    }
}
