#[macro_use]
mod common;

#[cfg(test)]
mod inheritance {
    tests! {
        inherited_method in inheritance is OK
        "hello"
    }

    tests! {
        override_method in inheritance is OK
        "b"
    }

    tests! {
        two_levels in inheritance is OK
        "a"
    }

    tests! {
        inherited_init in inheritance is OK
        "9"
    }

    tests! {
        superclass_must_be_class in inheritance is ERR
        "[Line 2] Super class must be a class"
    }

    tests! {
        inherit_from_self in inheritance is ERR
        "[Line 1] ERROR: at \"A\" A class cannot inherit from itself"
    }
}
