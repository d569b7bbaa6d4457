#[macro_use]
mod common;

#[cfg(test)]
mod comment {
    tests! {
        line_comments in comment is OK
        "1"
    }

    tests! {
        block_comments in comment is OK
        "1"
        "2"
    }

    tests! {
        line_comment_inside_block in comment is OK
        "1"
        "2"
    }

    tests! {
        only_comments in comment is OK
    }
}
