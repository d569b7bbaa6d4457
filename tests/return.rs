#[macro_use]
mod common;

#[cfg(test)]
mod _return {
    tests! {
        return_value in return is OK
        "7"
    }

    tests! {
        bare_return in return is OK
        "nil"
    }

    tests! {
        stops_loop in return is OK
        "2"
    }

    tests! {
        top_level in return is ERR
        "[Line 1] ERROR: at \"return\" Cannot return from top-level code"
    }

    tests! {
        value_in_initializer in return is ERR
        "[Line 3] ERROR: at \"return\" Cannot return a value from an initializer"
    }
}
