use std::{env, io, process};

use pebble_lang::pebble;

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut stdout = io::stdout();
    let mut pebble = pebble::new(&mut stdout);

    match args.len() {
        n if n > 2 => {
            println!("Usage: pebble [script]");
            process::exit(64);
        },
        2 => pebble.run_file(&args[1]),
        _ => pebble.run_prompt(),
    };
}
