#[macro_use]
mod common;

#[cfg(test)]
mod method {
    tests! {
        call in method is OK
        "2"
    }

    tests! {
        bound_method in method is OK
        "hi pebble"
    }

    tests! {
        parameters in method is OK
        "7"
    }
}
