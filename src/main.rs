use std::fs;
use std::process::exit;

use clap::Parser as ClapParser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use skiff::error::Error;
use skiff::interpreter::Interpreter;

/// A tree-walking interpreter for a small dynamically-typed, class-based language.
#[derive(ClapParser)]
#[command(name = "skiff", version, about)]
struct Cli {
    /// Script to run. Omit to start the REPL.
    path: Option<String>,

    /// Raise the log level to debug.
    #[arg(short, long)]
    verbose: bool,

    /// Print the number of parsed top-level statements to stderr (debug aid).
    #[arg(long)]
    ast: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    if cli.ast {
        // --ast forces the parsed-statement-count line regardless of -v/--verbose.
        logger.filter_module("skiff", log::LevelFilter::Debug);
    }
    logger.init();

    let exit_code = match &cli.path {
        Some(path) => run_file(path),
        None => run_prompt(),
    };

    exit(exit_code);
}

fn run_file(path: &str) -> i32 {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Could not read file '{path}': {err}");
            return 64;
        }
    };

    let mut interpreter = Interpreter::new();
    match skiff::run(&mut interpreter, &source) {
        Ok(()) => 0,
        Err(err) => report_and_exit_code(&err),
    }
}

fn run_prompt() -> i32 {
    let mut interpreter = Interpreter::new();
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("Failed to start line editor: {err}");
            return 64;
        }
    };

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                // Each line is scanned/parsed/resolved/executed independently; a
                // mistake on one line never poisons the next.
                if let Err(err) = skiff::run(&mut interpreter, &line) {
                    report_and_exit_code(&err);
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Readline error: {err}");
                break;
            }
        }
    }

    0
}

fn report_and_exit_code(err: &Error) -> i32 {
    match err {
        Error::Runtime { .. } => {
            skiff::error::runtime_error(err);
            70
        }
        Error::Parse | Error::Resolve => 65,
        Error::Io(io_err) => {
            eprintln!("I/O error: {io_err}");
            74
        }
        Error::Break | Error::Continue | Error::Return(_) => {
            unreachable!("non-local control flow never escapes interpret()")
        }
    }
}
