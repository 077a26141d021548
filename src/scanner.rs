use crate::keyword;
use crate::token::*;
use std::{iter::FusedIterator, rc::Rc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("[{pos}] Unexpected character '{found}'.")]
    UnexpectedCharacter { found: char, pos: Position },
    #[error("[{pos}] Unterminated string.")]
    UnterminatedString { pos: Position },
    #[error("[{pos}] Integer literal {lexeme} is out of range.")]
    OutOfRange { lexeme: Rc<str>, pos: Position },
}

impl LexError {
    pub fn pos(&self) -> Position {
        match self {
            Self::UnexpectedCharacter { pos, .. }
            | Self::UnterminatedString { pos }
            | Self::OutOfRange { pos, .. } => *pos,
        }
    }
}

/// Lazy token stream over one source text.
///
/// Yields tokens until the input is exhausted or the first [`LexError`],
/// after which it is fused. Scanning the same text again means calling
/// [`tokenize`] again.
pub struct Scanner {
    str: Vec<char>,
    index: usize,
    line: usize,
    column: usize,
    done: bool,
}

impl Scanner {
    fn new(code: &str) -> Self {
        Self {
            str: code.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
            done: false,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.str.get(self.index).copied()?;
        self.index += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    // "match" is a keyword in the metalanguage already.
    fn match_next(&mut self, c: char) -> bool {
        let res = self.peek() == Some(c);
        if res {
            self.advance();
        }
        res
    }

    fn peek(&self) -> Option<char> {
        self.str.get(self.index).copied()
    }

    fn current_pos(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn lexeme(&self, start: usize) -> Rc<str> {
        self.str[start..self.index].iter().collect::<String>().into()
    }

    fn string(&mut self, quote: char, pos: Position) -> Result<Rc<str>, LexError> {
        let mut value = String::new();
        loop {
            match self.advance() {
                None => return Err(LexError::UnterminatedString { pos }),
                Some(c) if c == quote => return Ok(value.into()),
                Some('\\') => match self.advance() {
                    None => return Err(LexError::UnterminatedString { pos }),
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('0') => value.push('\0'),
                    Some(other) => value.push(other),
                },
                Some(c) => value.push(c),
            }
        }
    }

    fn scan_token(&mut self) -> Option<Result<Token, LexError>> {
        loop {
            let pos = self.current_pos();
            let start = self.index;
            let c = self.advance()?;

            let tok = match c {
                '(' => TokenType::LeftParen,
                ')' => TokenType::RightParen,
                '{' => TokenType::LeftBrace,
                '}' => TokenType::RightBrace,
                ',' => TokenType::Comma,
                ';' => TokenType::Semicolon,
                '+' => TokenType::Plus,
                '-' => TokenType::Minus,
                '*' => TokenType::Star,
                '/' => TokenType::Slash,
                '%' => TokenType::Percent,
                '#' => {
                    while !matches!(self.peek(), Some('\n') | None) {
                        self.advance();
                    }
                    continue;
                }
                '>' => {
                    if self.match_next('=') {
                        TokenType::GreaterEqual
                    } else {
                        TokenType::Greater
                    }
                }
                '=' => {
                    if self.match_next('=') {
                        TokenType::EqualEqual
                    } else {
                        TokenType::Equal
                    }
                }
                '<' => {
                    if self.match_next('=') {
                        TokenType::LessEqual
                    } else {
                        TokenType::Less
                    }
                }
                '!' => {
                    if self.match_next('=') {
                        TokenType::BangEqual
                    } else {
                        TokenType::Bang
                    }
                }
                '&' if self.match_next('&') => TokenType::AndAnd,
                '|' if self.match_next('|') => TokenType::OrOr,
                '\n' | '\r' | '\t' | ' ' => continue,
                '"' | '\'' => match self.string(c, pos) {
                    Ok(s) => TokenType::String(s),
                    Err(e) => return Some(Err(e)),
                },
                '0'..='9' => {
                    while self.peek().is_some_and(|d| d.is_ascii_digit()) {
                        self.advance();
                    }
                    let lexeme = self.lexeme(start);
                    match lexeme.parse() {
                        Ok(num) => TokenType::Integer(num),
                        Err(_) => return Some(Err(LexError::OutOfRange { lexeme, pos })),
                    }
                }
                c if c.is_alphabetic() || c == '_' => {
                    while self
                        .peek()
                        .is_some_and(|d| d.is_alphanumeric() || d == '_')
                    {
                        self.advance();
                    }
                    let word = self.lexeme(start);
                    match keyword::canonicalize(&word) {
                        Some(kw) => TokenType::Keyword(kw),
                        None => TokenType::Identifier(word),
                    }
                }
                found => return Some(Err(LexError::UnexpectedCharacter { found, pos })),
            };

            return Some(Ok(Token::new(tok, self.lexeme(start), pos)));
        }
    }
}

impl Iterator for Scanner {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let res = self.scan_token();
        if !matches!(res, Some(Ok(_))) {
            self.done = true;
        }
        res
    }
}

impl FusedIterator for Scanner {}

pub fn tokenize(code: &str) -> Scanner {
    Scanner::new(code)
}

pub fn scan(code: &str) -> Result<Vec<Token>, LexError> {
    tokenize(code).collect()
}
