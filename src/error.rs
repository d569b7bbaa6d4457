use std::cell::Cell;
use std::fmt::{self, Display};

use crate::object::Object;
use crate::token::{Token, Type};

/// Collects diagnostics from every stage of the pipeline.
///
/// Scan, parse and resolution errors accumulate: they set the sticky
/// `had_error` flag and reporting continues, so the user sees as many
/// problems as possible in one run. Runtime errors are reported once, at the
/// top of the interpreter loop, and set `had_runtime_error`.
///
/// Diagnostics are written to stderr; program output goes through the
/// interpreter's own writer.
#[derive(Debug, Default)]
pub struct ErrorReporter {
    had_error: Cell<bool>,
    had_runtime_error: Cell<bool>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        ErrorReporter::default()
    }

    pub fn had_error(&self) -> bool {
        self.had_error.get()
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error.get()
    }

    /// Clears both flags. Used between prompt lines.
    pub fn reset(&self) {
        self.had_error.set(false);
        self.had_runtime_error.set(false);
    }

    /// Reports an error at a bare line, without a lexeme to point at.
    pub fn error(&self, line: usize, message: &str) {
        self.report(line, "", message);
    }

    /// Reports an error at a token.
    pub fn error_token(&self, token: &Token, message: &str) {
        if token.r#type == Type::EOF {
            self.report(token.line, "at end", message);
        } else {
            self.report(token.line, &format!("at \"{}\"", token.lexeme), message);
        }
    }

    /// Reports a warning at a token. Warnings do not set the error flag.
    pub fn warn_token(&self, token: &Token, message: &str) {
        eprintln!(
            "[Line {line}] WARNING: at \"{lexeme}\" {message}",
            line = token.line,
            lexeme = token.lexeme,
        );
    }

    pub fn runtime_error(&self, error: &RuntimeError) {
        eprintln!("{error}");
        self.had_runtime_error.set(true);
    }

    fn report(&self, line: usize, place: &str, message: &str) {
        if line == 0 && place.is_empty() {
            eprintln!("ERROR: {message}");
        } else if place.is_empty() {
            eprintln!("[Line {line}] ERROR: {message}");
        } else {
            eprintln!("[Line {line}] ERROR: {place} {message}");
        }
        self.had_error.set(true);
    }
}

/// Represents an error that occurs during parsing.
#[derive(Debug)]
pub struct ParseError {
    pub token: Token,
    pub message: String,
}

/// Represents an error that occurs during runtime.
#[derive(Debug)]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Line {}] {}", self.token.line, self.message)
    }
}

/// Non-local control flow out of nested statement execution.
///
/// `Return` and `Break` are not errors: they unwind to the structurally
/// enclosing construct (a function call, a `while` loop) which catches them.
/// `Error` unwinds all the way to `interpret`, where it is reported and the
/// remaining statements are abandoned.
#[derive(Debug)]
pub enum Signal {
    Error(RuntimeError),
    Return(Object),
    Break,
}

impl From<RuntimeError> for Signal {
    fn from(error: RuntimeError) -> Self {
        Signal::Error(error)
    }
}
