pub mod ast;
pub mod builtins;
pub mod class;
pub mod environment;
pub mod error;
pub mod function;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use error::Error;
use interpreter::Interpreter;
use parser::Parser;
use resolver::Resolver;
use scanner::Scanner;

/// Scans, parses, resolves, and interprets a single source string against a fresh
/// interpreter. Used by integration tests and by the CLI's file-mode driver.
pub fn run_source(source: &str) -> Result<(), Error> {
    let mut interpreter = Interpreter::new();
    run(&mut interpreter, source)
}

/// Same pipeline, but reusing an existing interpreter so globals/side effects persist
/// across calls. This is what the REPL uses for each line.
pub fn run(interpreter: &mut Interpreter, source: &str) -> Result<(), Error> {
    let mut scanner = Scanner::new(source.to_string());
    let tokens = scanner.scan_tokens().clone();

    let mut parser = Parser::new(tokens);
    let statements = parser.parse()?;

    log::debug!("parsed {} top-level statement(s)", statements.len());

    Resolver::new(interpreter).resolve(&statements)?;

    interpreter.interpret(&statements)
}
