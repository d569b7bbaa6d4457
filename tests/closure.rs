#[macro_use]
mod common;

#[cfg(test)]
mod closure {
    tests! {
        counter in closure is OK
        "1"
        "2"
        "3"
    }

    tests! {
        capture_later_write in closure is OK
        "after"
    }

    tests! {
        shared_environment in closure is OK
        "42"
    }

    tests! {
        over_parameter in closure is OK
        "8"
    }
}
