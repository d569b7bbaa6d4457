#![allow(clippy::needless_return)]

//! Pebble is a small dynamically typed scripting language written in Rust.
//! It has lexical scoping, first-class functions with closures, classes with
//! single inheritance, and a `break` statement. Pebble is a tree-walk
//! interpreter with a hand-written recursive descent parser, built to learn
//! how interpreters work rather than to run anything in production.
//!
//! ## Scanning
//! The first step in the interpreter is scanning. Scanning converts a string
//! of characters into a flat list of tokens. A token is a single unit of the
//! language; the string `1 + 2` becomes:
//! ```text
//! [Number(1), Plus, Number(2), EOF]
//! ```
//! The scanner is implemented in the [`scanner`](scanner) module as a single
//! pass over the characters of the source. Problems at this stage are
//! trivial ones, like an unterminated string literal or a character the
//! language has no use for. They are reported to the shared
//! [`ErrorReporter`](error::ErrorReporter) as soon as they are found and the
//! scanner keeps going, which lets the user fix several mistakes in one run.
//!
//! ## Parsing
//! The second step is parsing, implemented in the [`parser`](parser) module
//! as a recursive descent parser. The parser turns the token list into
//! [expressions](expr::Expr) — pieces of code that produce a value — and
//! [statements](stmt::Stmt) — pieces of code that have an effect, like a
//! variable declaration or a `print`. `for` loops are rewritten into `while`
//! loops here, so the later stages never see one.
//!
//! The parser catches mistakes that span several tokens, like a missing
//! operand:
//! ```text
//! 1 !=
//! ```
//! After reporting one it synchronizes: it skips ahead to the next statement
//! boundary and resumes, again so that one run surfaces as many problems as
//! possible.
//!
//! ## Resolving
//! The third step is resolving, implemented in the [`resolver`](resolver)
//! module as a pass over the finished AST. For every use of a variable it
//! records how many scopes out the binding lives, which makes closures
//! capture exactly the variables they saw when they were created. It also
//! rejects code that is syntactically fine but semantically meaningless,
//! like reading a variable in its own initializer,
//! ```text
//! {
//!     var a = a;
//! }
//! ```
//! using `this` outside of a class, `return` at the top level, or `break`
//! outside of a loop.
//!
//! ## Interpreting
//! The final step is interpreting, implemented in the
//! [`interpreter`](interpreter) module as a tree walk. Values are
//! [`Objects`](object::Object): literals, functions, classes and instances.
//! Scopes are a chain of [`Environments`](environment::Environment), one per
//! block or function activation, and a closure is nothing more than a
//! function value holding on to the environment it was born in. Most
//! mistakes can only be caught here — adding a string to a number, calling
//! something that is not callable — and the first one aborts the run:
//! ```text
//! var a = "123";
//! var b = a + 123;
//! ```

use std::fs;
use std::io::Write;
use std::process;
use std::rc::Rc;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

pub mod error;
pub mod token;
pub mod literal;
pub mod scanner;
pub mod expr;
pub mod stmt;
pub mod ast;
pub mod parser;
pub mod resolver;
pub mod environment;
pub mod object;
pub mod function;
pub mod class;
pub mod interpreter;

use error::ErrorReporter;
use interpreter::Interpreter;
use parser::Parser;
use resolver::Resolver;
use scanner::Scanner;

/// The interpreter driver: wires the pipeline together and keeps the
/// interpreter (and with it, the global scope) alive across runs. Program
/// output is written to the injected writer; diagnostics go to stderr.
#[allow(non_camel_case_types)]
pub struct pebble<'a> {
    interpreter: Interpreter<'a>,
    reporter: Rc<ErrorReporter>,
}

impl<'a> pebble<'a> {
    pub fn new(out: &'a mut dyn Write) -> Self {
        let reporter = Rc::new(ErrorReporter::new());

        pebble {
            interpreter: Interpreter::new(out, Rc::clone(&reporter)),
            reporter,
        }
    }

    /// Runs a script from disk and exits the process on failure: 68 when
    /// the file cannot be read, 65 on a compile-time error, 70 on a runtime
    /// error.
    pub fn run_file(&mut self, path: &str) {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) => {
                eprintln!("ERROR: Could not open file '{path}': {error}");
                process::exit(68);
            }
        };

        self.run_source(&contents);

        if self.reporter.had_error() {
            process::exit(65);
        }
        if self.reporter.had_runtime_error() {
            process::exit(70);
        }
    }

    /// Reads and runs lines until EOF or an interrupt. Every line shares the
    /// same globals, and the error flags are reset in between so one bad
    /// line does not poison the session.
    pub fn run_prompt(&mut self) {
        let mut editor = DefaultEditor::new().expect("readline editor to be available");
        let history = home::home_dir().map(|dir| dir.join(".pebble_history"));

        if let Some(path) = &history {
            let _ = editor.load_history(path);
        }

        loop {
            match editor.readline("> ") {
                Ok(line) => {
                    let _ = editor.add_history_entry(line.as_str());
                    self.run_interactive(&line);
                    self.reporter.reset();
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(error) => {
                    eprintln!("ERROR: {error}");
                    break;
                }
            }
        }

        if let Some(path) = &history {
            let _ = editor.save_history(path);
        }
    }

    /// Runs a whole script. Yielded statement values are discarded.
    pub fn run_source(&mut self, source: &str) {
        self.run(source, false);
    }

    /// Runs a single prompt line, echoing non-nil expression values.
    pub fn run_interactive(&mut self, line: &str) {
        self.run(line, true);
    }

    fn run(&mut self, source: &str, interactive: bool) {
        let scanner = Scanner::new(source, Rc::clone(&self.reporter));
        let tokens = scanner.scan_tokens();

        if self.reporter.had_error() {
            return;
        }

        let mut parser = Parser::new(tokens, Rc::clone(&self.reporter));
        let statements = parser.parse();

        if self.reporter.had_error() {
            return;
        }

        let mut resolver = Resolver::new(&mut self.interpreter, Rc::clone(&self.reporter));
        resolver.resolve(&statements);

        if self.reporter.had_error() {
            return;
        }

        self.interpreter.interpret(&statements, interactive);
    }
}
