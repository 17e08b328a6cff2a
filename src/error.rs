use thiserror::Error as ThisError;

use crate::token::{Token, TokenType};
use crate::value::Value;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A syntax error was already reported to stderr at the point it was raised; this
    /// variant is only a sentinel caught by `declaration()` to drive synchronization.
    #[error("parse error")]
    Parse,

    /// A static (resolver) error was already reported to stderr; sentinel only.
    #[error("resolve error")]
    Resolve,

    #[error("{message}\n[line {}]", .token.line)]
    Runtime { token: Token, message: String },

    /// Non-local control signals, unwound through `Result`/`?` rather than a separate
    /// `Flow` type since `Error` is already the crate's one unwinding channel.
    #[error("uncaught 'break' (bug: not caught by a loop)")]
    Break,
    #[error("uncaught 'continue' (bug: not caught by a loop)")]
    Continue,
    #[error("uncaught 'return' (bug: not caught by a call)")]
    Return(Value),
}

/// Reports a scan-time error: bad character, unterminated string/comment, bad number.
pub fn error(line: i32, message: &str) {
    report(line, "", message);
}

/// Reports a parse-time error at the offending token.
pub fn parser_error(token: &Token, message: &str) {
    if token.token_type == TokenType::Eof {
        report(token.line, " at end", message);
    } else {
        report(token.line, &format!(" at '{}'", token.lexeme), message);
    }
}

/// Reports a runtime error that has unwound to the top of `interpret()`.
pub fn runtime_error(err: &Error) {
    if let Error::Runtime { token, message } = err {
        eprintln!("{message}\n[line {}]", token.line);
    }
}

fn report(line: i32, location: &str, message: &str) {
    eprintln!("[line {line}] Error{location}: {message}");
}
