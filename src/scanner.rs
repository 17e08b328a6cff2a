// A lexeme is the raw sequence of characters in the source code that represents a meaningful unit.
// A token is a categorized representation of a lexeme, pairing it with its type.

use crate::error::error;
use crate::token::{Token, TokenType, KEYWORDS};

pub struct Scanner {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: i32,
}

impl Scanner {
    pub fn new(source: String) -> Self {
        Self {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    pub fn scan_tokens(&mut self) -> &Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()
        }

        self.tokens.push(Token::new(TokenType::Eof, "", self.line));
        &self.tokens
    }

    fn scan_token(&mut self) {
        let c: char = self.advance();
        match c {
            // single char, unambiguous
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            ',' => self.add_token(TokenType::Comma),
            '.' => self.add_token(TokenType::Dot),
            ';' => self.add_token(TokenType::Semicolon),
            '?' => self.add_token(TokenType::Question),
            ':' => self.add_token(TokenType::Colon),

            '-' => {
                let t = if self.r#match('=') {
                    TokenType::MinusEqual
                } else {
                    TokenType::Minus
                };
                self.add_token(t);
            }
            '+' => {
                let t = if self.r#match('=') {
                    TokenType::PlusEqual
                } else {
                    TokenType::Plus
                };
                self.add_token(t);
            }
            '*' => {
                let t = if self.r#match('=') {
                    TokenType::StarEqual
                } else {
                    TokenType::Star
                };
                self.add_token(t);
            }

            '!' => {
                let t = if self.r#match('=') {
                    TokenType::BangEqual
                } else {
                    TokenType::Bang
                };
                self.add_token(t);
            }
            '=' => {
                let t = if self.r#match('=') {
                    TokenType::EqualEqual
                } else if self.r#match('>') {
                    TokenType::Arrow
                } else {
                    TokenType::Equal
                };
                self.add_token(t);
            }
            '<' => {
                let t = if self.r#match('=') {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                };
                self.add_token(t);
            }
            '>' => {
                let t = if self.r#match('=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                };
                self.add_token(t);
            }
            '&' => {
                if self.r#match('&') {
                    self.add_token(TokenType::AmpAmp);
                } else {
                    error(self.line, "Unexpected character.");
                }
            }
            '|' => {
                if self.r#match('|') {
                    self.add_token(TokenType::PipePipe);
                } else {
                    error(self.line, "Unexpected character.");
                }
            }

            // can be a comment
            '/' => {
                if self.r#match('/') {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else if self.r#match('*') {
                    self.block_comment();
                } else if self.r#match('=') {
                    self.add_token(TokenType::SlashEqual);
                } else {
                    self.add_token(TokenType::Slash);
                }
            }

            // ignore whitespace
            ' ' | '\t' | '\r' => (),

            '\n' => {
                self.line += 1;
            }

            '"' => self.string(),

            c => {
                if c.is_ascii_digit() {
                    self.number()
                } else if c.is_alphabetic() || c == '_' {
                    self.identifier()
                } else {
                    error(self.line, "Unexpected character.")
                }
            }
        }
    }

    /// Consumes a `/* ... */` comment body, just past the opening delimiter. Nested
    /// block comments are supported: each inner `/*` increases the depth, each `*/`
    /// decreases it, and the comment ends only once depth returns to zero.
    fn block_comment(&mut self) {
        let mut depth = 1usize;
        while depth > 0 {
            if self.is_at_end() {
                error(self.line, "Unterminated block comment.");
                return;
            }
            if self.peek() == '/' && self.peek_next() == '*' {
                self.advance();
                self.advance();
                depth += 1;
            } else if self.peek() == '*' && self.peek_next() == '/' {
                self.advance();
                self.advance();
                depth -= 1;
            } else {
                if self.peek() == '\n' {
                    self.line += 1;
                }
                self.advance();
            }
        }
    }

    // consume characters until we reach the closing "
    fn string(&mut self) {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            error(self.line, "Unterminated string.");
            return;
        }

        // the closing "
        self.advance();

        let literal: String = self.source[(self.start + 1)..(self.current - 1)]
            .iter()
            .collect();

        self.add_token(TokenType::String { literal });
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        if self.peek().is_alphabetic() || self.peek() == '_' {
            error(self.line, "Trailing letter in number.");
            while self.peek().is_alphanumeric() || self.peek() == '_' {
                self.advance();
            }
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        let literal: f64 = text
            .parse()
            .expect("scanner only admits well-formed numeric text before this point");

        self.add_token(TokenType::Number { literal });
    }

    fn identifier(&mut self) {
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        let tpe = KEYWORDS
            .get(text.as_str())
            .cloned()
            .unwrap_or(TokenType::Identifier);

        self.add_token(tpe);
    }

    fn advance(&mut self) -> char {
        self.current += 1;
        self.source[self.current - 1]
    }

    // it's like advance but doesn't consume the next character
    fn peek(&self) -> char {
        self.source.get(self.current).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.source.get(self.current + 1).copied().unwrap_or('\0')
    }

    fn add_token(&mut self, token_type: TokenType) {
        let text: String = self.source[self.start..self.current].iter().collect();
        self.tokens.push(Token::new(token_type, text, self.line));
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    // we only consume the current character if that is what we are looking for
    fn r#match(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenType> {
        Scanner::new(src.to_string())
            .scan_tokens()
            .iter()
            .map(|t| t.token_type.clone())
            .collect()
    }

    #[test]
    fn scans_augmented_assignment_operators() {
        assert_eq!(
            kinds("+= -= *= /="),
            vec![
                TokenType::PlusEqual,
                TokenType::MinusEqual,
                TokenType::StarEqual,
                TokenType::SlashEqual,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn scans_arrow_and_logical_operators() {
        assert_eq!(
            kinds("=> && ||"),
            vec![
                TokenType::Arrow,
                TokenType::AmpAmp,
                TokenType::PipePipe,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn nested_block_comments_are_skipped() {
        assert_eq!(
            kinds("/* outer /* inner */ still outer */ 1"),
            vec![TokenType::Number { literal: 1.0 }, TokenType::Eof]
        );
    }

    #[test]
    fn adjacent_strings_are_separate_tokens_at_scan_time() {
        assert_eq!(
            kinds("\"a\" \"b\""),
            vec![
                TokenType::String {
                    literal: "a".to_string()
                },
                TokenType::String {
                    literal: "b".to_string()
                },
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn keyword_lookup_covers_the_full_set() {
        assert_eq!(
            kinds("function inherits const static break continue in"),
            vec![
                TokenType::Function,
                TokenType::Inherits,
                TokenType::Const,
                TokenType::Static,
                TokenType::Break,
                TokenType::Continue,
                TokenType::In,
                TokenType::Eof,
            ]
        );
    }
}
