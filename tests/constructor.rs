#[macro_use]
mod common;

#[cfg(test)]
mod constructor {
    tests! {
        init_sets_fields in constructor is OK
        "7"
    }

    tests! {
        bare_return_in_init in constructor is OK
        "true"
    }

    tests! {
        runs_on_construction in constructor is OK
        "built"
        "built"
    }

    tests! {
        default_arity in constructor is ERR
        "[Line 2] Expected 0 arguments but got 1"
    }

    tests! {
        init_arity in constructor is ERR
        "[Line 6] Expected 1 arguments but got 0"
    }
}
