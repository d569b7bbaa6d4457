#[macro_use]
mod common;

#[cfg(test)]
mod class {
    tests! {
        print_class in class is OK
        "Thing"
    }

    tests! {
        instance in class is OK
        "Thing instance"
    }

    tests! {
        methods in class is OK
        "hi"
    }

    tests! {
        class_as_value in class is OK
        "A instance"
    }
}
