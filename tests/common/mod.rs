#[macro_export]
macro_rules! tests {
    ($file:ident in $scope:ident is OK $($expected:expr)*) => {
        #[test]
        fn $file() {
            use pebble_lang::pebble;

            let mut expected = vec![$($expected),*];

            // if exists, concat expected lines with new lines
            let expected = match expected.len() {
                0 => "".to_string(),
                _ => {
                    // add empty string to end to add new line to end of output
                    expected.push("");
                    expected.join("\n")
                }
            };

            let mut output = Vec::new();
            let mut pebble = pebble::new(&mut output);

            pebble.run_file(&format!("tests/target/{}/{}.pebble", stringify!($scope), stringify!($file)));

            // drop pebble here to release the borrow before reading output
            drop(pebble);
            assert_eq!(expected, std::str::from_utf8(&output).unwrap());
        }
    };

    ($file:ident in $scope:ident is ERR $($expected:expr)+) => {
        #[test]
        fn $file() {
            use assert_cmd::Command;
            // output concats expected with new line
            let output = vec![$($expected),+].join("\n");
            let file = format!("tests/target/{}/{}.pebble", stringify!($scope), stringify!($file));

            Command::cargo_bin("pebble").unwrap()
                .arg(file)
                .assert()
                .stderr(format!("{output}\n"))
                .failure();
        }
    };

    ($file:ident in $scope:ident is WARN $($expected:expr)+) => {
        #[test]
        fn $file() {
            use assert_cmd::Command;
            // warnings go to stderr but the script still succeeds
            let output = vec![$($expected),+].join("\n");
            let file = format!("tests/target/{}/{}.pebble", stringify!($scope), stringify!($file));

            Command::cargo_bin("pebble").unwrap()
                .arg(file)
                .assert()
                .stderr(format!("{output}\n"))
                .success();
        }
    };
}
