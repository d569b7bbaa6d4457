use std::rc::Rc;
use std::str::Chars;

use peekmore::{PeekMore, PeekMoreIterator};
use substring::Substring;

use crate::error::ErrorReporter;
use crate::literal::Literal;
use crate::token::{Token, Type};

/// Turns a source string into a flat list of tokens, terminated by a single
/// EOF token. The scanner never fails: anything it cannot make sense of is
/// reported to the error sink and scanning carries on with the next
/// character.
pub struct Scanner<'a> {
    source: &'a str,
    chars: PeekMoreIterator<Chars<'a>>,
    reporter: Rc<ErrorReporter>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner. `start` and `current` are char offsets into
    /// the source; `line` is 1-based.
    pub fn new(source: &'a str, reporter: Rc<ErrorReporter>) -> Scanner<'a> {
        Scanner {
            source,
            chars: source.chars().peekmore(),
            reporter,
            tokens: vec!(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    /// Scans the source code and returns the tokens.
    pub fn scan_tokens(mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }

        self.tokens.push(Token::new(Type::EOF, String::new(), None, self.line));
        self.tokens
    }

    /// Consumes and returns the next character.
    fn advance(&mut self) -> char {
        let c = self.chars.next().expect("advance to be guarded by is_at_end");
        self.current += 1;
        c
    }

    /// Returns the next character without consuming it.
    fn peek(&mut self) -> char {
        self.chars.peek().copied().unwrap_or('\0')
    }

    /// Returns the character after the next one without consuming anything.
    /// `peek_next` moves peekmore's cursor, so put it back afterwards.
    fn peek_next(&mut self) -> char {
        let c = self.chars.peek_next().copied().unwrap_or('\0');
        self.chars.reset_cursor();
        c
    }

    /// Consumes the next character if it is the expected one.
    fn match_next(&mut self, expected: char) -> bool {
        if self.peek() == expected {
            self.advance();
            return true;
        }

        false
    }

    fn is_at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }

    /// Adds a token whose lexeme is the current `start..current` slice.
    fn add_token(&mut self, r#type: Type, literal: Option<Literal>) {
        let lexeme = self.source.substring(self.start, self.current).to_string();
        self.tokens.push(Token::new(r#type, lexeme, literal, self.line));
    }

    /// Handles a string literal. Strings may span lines.
    fn string(&mut self) {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            self.reporter.error(self.line, "Unterminated string.");
            return;
        }

        self.advance(); // The closing double quote.

        // The literal does not include the double quotes, unlike the lexeme.
        let value = self.source.substring(self.start + 1, self.current - 1).to_string();
        self.add_token(Type::String, Some(Literal::String(value)));
    }

    /// Handles a number literal: digits with an optional fractional part.
    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance(); // The dot.

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let value: f64 = self.source.substring(self.start, self.current).parse().unwrap();
        self.add_token(Type::Number, Some(Literal::Number(value)));
    }

    /// Handles an identifier or a keyword.
    fn identifier(&mut self) {
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let r#type = match self.source.substring(self.start, self.current) {
            "and"    => Type::And,
            "break"  => Type::Break,
            "class"  => Type::Class,
            "else"   => Type::Else,
            "false"  => Type::False,
            "for"    => Type::For,
            "fun"    => Type::Fun,
            "if"     => Type::If,
            "nil"    => Type::Nil,
            "or"     => Type::Or,
            "print"  => Type::Print,
            "return" => Type::Return,
            "super"  => Type::Super,
            "this"   => Type::This,
            "true"   => Type::True,
            "var"    => Type::Var,
            "while"  => Type::While,
            _        => Type::Identifier,
        };

        self.add_token(r#type, None);
    }

    /// Consumes a block comment, tracking line breaks. Stops quietly at EOF
    /// if the comment is never closed.
    fn block_comment(&mut self) {
        while !self.is_at_end() {
            if self.peek() == '*' && self.peek_next() == '/' {
                self.advance();
                self.advance();
                return;
            }

            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }
    }

    /// Scans the next token.
    fn scan_token(&mut self) {
        let c = self.advance();
        match c {
            // One character tokens
            '(' => self.add_token(Type::LeftParen, None),
            ')' => self.add_token(Type::RightParen, None),
            '{' => self.add_token(Type::LeftBrace, None),
            '}' => self.add_token(Type::RightBrace, None),
            ',' => self.add_token(Type::Comma, None),
            '.' => self.add_token(Type::Dot, None),
            '-' => self.add_token(Type::Minus, None),
            '+' => self.add_token(Type::Plus, None),
            ';' => self.add_token(Type::Semicolon, None),
            '*' => self.add_token(Type::Star, None),

            // Two character tokens
            '!' => {
                let r#type = if self.match_next('=') { Type::BangEqual } else { Type::Bang };
                self.add_token(r#type, None);
            },
            '=' => {
                let r#type = if self.match_next('=') { Type::EqualEqual } else { Type::Equal };
                self.add_token(r#type, None);
            },
            '<' => {
                let r#type = if self.match_next('=') { Type::LessEqual } else { Type::Less };
                self.add_token(r#type, None);
            },
            '>' => {
                let r#type = if self.match_next('=') { Type::GreaterEqual } else { Type::Greater };
                self.add_token(r#type, None);
            },

            // Comments or division
            '/' => {
                if self.match_next('/') {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else if self.match_next('*') {
                    self.block_comment();
                } else {
                    self.add_token(Type::Slash, None);
                }
            },

            // Ignore whitespace
            ' ' | '\u{0008}' | '\r' => (),

            // Update line counter
            '\n' => self.line += 1,

            // String
            '"' => self.string(),

            // Numbers
            c if c.is_ascii_digit() => self.number(),

            // Identifiers
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),

            _ => self.reporter.error(self.line, "Unexpected character."),
        }
    }
}
