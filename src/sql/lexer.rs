//! # SQL Lexer
//!
//! Zero-copy tokenizer for the statement dialect the binder understands.
//! Identifiers and literals are borrowed slices of the input; nothing is
//! allocated while scanning except the uppercase copy used for keyword lookup.
//!
//! ## Keyword Lookup
//!
//! Keywords are matched through a compile-time perfect hash map (`phf`).
//! Type names (`INTEGER`, `VARCHAR`, ...) and function names are not
//! keywords; they stay identifiers and are resolved later.
//!
//! ## Literals and Parameters
//!
//! - `'text'` strings, `''` escapes a quote
//! - `"Ident"` quoted identifiers, `""` escapes a quote
//! - `42`, `3.14`, `1e10`
//! - `$1` positional and `?` anonymous parameters
//! - `--` line comments and `/* */` block comments are skipped
//!
//! ## Statement Splitting
//!
//! [`split_statements`] reuses the scanner so that a `;` inside a string,
//! quoted identifier or comment never counts as a statement separator.
//! `prepare` relies on it to reject multi-statement input up front.
//!
//! ## Error Handling
//!
//! Invalid input produces `Token::Error` with a static message; the parser
//! turns it into a parse error carrying line and column.

use super::token::{Keyword, Parameter, Token};
use phf::phf_map;

static KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
    "AND" => Keyword::And,
    "AS" => Keyword::As,
    "ASC" => Keyword::Asc,
    "BEGIN" => Keyword::Begin,
    "BY" => Keyword::By,
    "CAST" => Keyword::Cast,
    "CHECKPOINT" => Keyword::Checkpoint,
    "COLLATE" => Keyword::Collate,
    "COMMIT" => Keyword::Commit,
    "CREATE" => Keyword::Create,
    "DEALLOCATE" => Keyword::Deallocate,
    "DESC" => Keyword::Desc,
    "DROP" => Keyword::Drop,
    "END" => Keyword::End,
    "EXECUTE" => Keyword::Execute,
    "EXISTS" => Keyword::Exists,
    "FALSE" => Keyword::False,
    "FORCE" => Keyword::Force,
    "FROM" => Keyword::From,
    "IF" => Keyword::If,
    "INSERT" => Keyword::Insert,
    "INTO" => Keyword::Into,
    "IS" => Keyword::Is,
    "LIMIT" => Keyword::Limit,
    "NOT" => Keyword::Not,
    "NULL" => Keyword::Null,
    "OR" => Keyword::Or,
    "ORDER" => Keyword::Order,
    "PREPARE" => Keyword::Prepare,
    "ROLLBACK" => Keyword::Rollback,
    "SELECT" => Keyword::Select,
    "TABLE" => Keyword::Table,
    "TRANSACTION" => Keyword::Transaction,
    "TRUE" => Keyword::True,
    "VALUES" => Keyword::Values,
    "WHERE" => Keyword::Where,
};

pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    token_start: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            token_start: 0,
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Byte offset where the most recent token started.
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    pub fn next_token(&mut self) -> Token<'a> {
        if let Some(err) = self.skip_whitespace_and_comments() {
            return Token::Error(err);
        }
        self.token_start = self.pos;

        if self.is_eof() {
            return Token::Eof;
        }

        let ch = self.current();

        if ch.is_ascii_alphabetic() || ch == b'_' {
            return self.scan_identifier_or_keyword();
        }

        if ch.is_ascii_digit() {
            return self.scan_number();
        }

        match ch {
            b'\'' => self.scan_string(),
            b'"' => self.scan_quoted_identifier(),
            b'$' => self.scan_positional_param(),
            b'?' => {
                self.advance();
                Token::Parameter(Parameter::Anonymous)
            }
            b':' => {
                self.advance();
                if !self.is_eof() && self.current() == b':' {
                    self.advance();
                    Token::DoubleColon
                } else {
                    Token::Error("unexpected ':'")
                }
            }
            b'.' if self.peek_char().is_some_and(|c| c.is_ascii_digit()) => self.scan_number(),
            b'+' => self.single(Token::Plus),
            b'-' => self.single(Token::Minus),
            b'*' => self.single(Token::Star),
            b'/' => self.single(Token::Slash),
            b'%' => self.single(Token::Percent),
            b'(' => self.single(Token::LParen),
            b')' => self.single(Token::RParen),
            b',' => self.single(Token::Comma),
            b';' => self.single(Token::Semicolon),
            b'=' => {
                self.advance();
                if !self.is_eof() && self.current() == b'=' {
                    self.advance();
                }
                Token::Eq
            }
            b'<' => {
                self.advance();
                match self.bytes.get(self.pos) {
                    Some(b'=') => self.single(Token::LtEq),
                    Some(b'>') => self.single(Token::NotEq),
                    _ => Token::Lt,
                }
            }
            b'>' => {
                self.advance();
                if !self.is_eof() && self.current() == b'=' {
                    self.single(Token::GtEq)
                } else {
                    Token::Gt
                }
            }
            b'!' => {
                self.advance();
                if !self.is_eof() && self.current() == b'=' {
                    self.single(Token::NotEq)
                } else {
                    Token::Error("unexpected '!'")
                }
            }
            b'|' => {
                self.advance();
                if !self.is_eof() && self.current() == b'|' {
                    self.single(Token::Concat)
                } else {
                    Token::Error("unexpected '|'")
                }
            }
            _ => {
                self.advance();
                Token::Error("unexpected character")
            }
        }
    }

    pub fn peek(&mut self) -> Token<'a> {
        let saved = (self.pos, self.line, self.column, self.token_start);
        let token = self.next_token();
        (self.pos, self.line, self.column, self.token_start) = saved;
        token
    }

    fn single(&mut self, token: Token<'a>) -> Token<'a> {
        self.advance();
        token
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn current(&self) -> u8 {
        self.bytes[self.pos]
    }

    fn peek_char(&self) -> Option<u8> {
        self.bytes.get(self.pos + 1).copied()
    }

    fn advance(&mut self) {
        if !self.is_eof() {
            if self.current() == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.pos += 1;
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Option<&'static str> {
        loop {
            while !self.is_eof() && matches!(self.current(), b' ' | b'\t' | b'\r' | b'\n') {
                self.advance();
            }
            if self.is_eof() {
                return None;
            }
            match (self.current(), self.peek_char()) {
                (b'-', Some(b'-')) => {
                    while !self.is_eof() && self.current() != b'\n' {
                        self.advance();
                    }
                }
                (b'/', Some(b'*')) => {
                    self.advance();
                    self.advance();
                    loop {
                        if self.is_eof() {
                            return Some("unterminated block comment");
                        }
                        if self.current() == b'*' && self.peek_char() == Some(b'/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => return None,
            }
        }
    }

    fn scan_identifier_or_keyword(&mut self) -> Token<'a> {
        let start = self.pos;
        while !self.is_eof() && (self.current().is_ascii_alphanumeric() || self.current() == b'_') {
            self.advance();
        }

        let ident = &self.input[start..self.pos];
        let upper = ident.to_ascii_uppercase();

        if let Some(&keyword) = KEYWORDS.get(upper.as_str()) {
            Token::Keyword(keyword)
        } else {
            Token::Ident(ident)
        }
    }

    fn scan_number(&mut self) -> Token<'a> {
        let start = self.pos;
        let mut is_float = false;

        while !self.is_eof() && self.current().is_ascii_digit() {
            self.advance();
        }

        if !self.is_eof() && self.current() == b'.' {
            is_float = true;
            self.advance();
            while !self.is_eof() && self.current().is_ascii_digit() {
                self.advance();
            }
        }

        if !self.is_eof() && (self.current() == b'e' || self.current() == b'E') {
            is_float = true;
            self.advance();
            if !self.is_eof() && (self.current() == b'+' || self.current() == b'-') {
                self.advance();
            }
            let exp_start = self.pos;
            while !self.is_eof() && self.current().is_ascii_digit() {
                self.advance();
            }
            if self.pos == exp_start {
                return Token::Error("missing exponent digits");
            }
        }

        let num_str = &self.input[start..self.pos];
        if is_float {
            Token::Float(num_str)
        } else {
            Token::Integer(num_str)
        }
    }

    fn scan_string(&mut self) -> Token<'a> {
        self.advance();
        let start = self.pos;

        loop {
            if self.is_eof() {
                return Token::Error("unterminated string");
            }

            if self.current() == b'\'' {
                if self.peek_char() == Some(b'\'') {
                    self.advance();
                    self.advance();
                } else {
                    let end = self.pos;
                    self.advance();
                    return Token::String(&self.input[start..end]);
                }
            } else {
                self.advance();
            }
        }
    }

    fn scan_quoted_identifier(&mut self) -> Token<'a> {
        self.advance();
        let start = self.pos;

        loop {
            if self.is_eof() {
                return Token::Error("unterminated quoted identifier");
            }

            if self.current() == b'"' {
                if self.peek_char() == Some(b'"') {
                    self.advance();
                    self.advance();
                } else {
                    let end = self.pos;
                    self.advance();
                    return Token::QuotedIdent(&self.input[start..end]);
                }
            } else {
                self.advance();
            }
        }
    }

    fn scan_positional_param(&mut self) -> Token<'a> {
        self.advance();
        let start = self.pos;
        while !self.is_eof() && self.current().is_ascii_digit() {
            self.advance();
        }
        if self.pos == start {
            return Token::Error("expected parameter number after '$'");
        }
        match self.input[start..self.pos].parse::<u32>() {
            Ok(0) => Token::Error("parameter numbers start at $1"),
            Ok(n) => Token::Parameter(Parameter::Positional(n)),
            Err(_) => Token::Error("invalid positional parameter"),
        }
    }
}

/// Splits `input` at top-level `;` separators. Empty statements are dropped
/// and each returned slice is trimmed.
pub fn split_statements(input: &str) -> Vec<&str> {
    let mut lexer = Lexer::new(input);
    let mut statements = Vec::new();
    let mut start = 0;
    let mut has_content = false;

    loop {
        match lexer.next_token() {
            Token::Eof => break,
            Token::Semicolon => {
                if has_content {
                    statements.push(input[start..lexer.token_start()].trim());
                }
                start = lexer.position();
                has_content = false;
            }
            Token::Error(_) => {
                // The rest is one malformed statement; the parser reports it.
                has_content = true;
                break;
            }
            _ => has_content = true,
        }
    }
    if has_content {
        statements.push(input[start..].trim());
    }
    statements
}
