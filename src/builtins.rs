use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::environment::Environment;
use crate::error::Error;
use crate::function::Callable;
use crate::token::Token;
use crate::value::Value;

/// Installs `clock`, `input`, `print`, `println` into the globals environment.
pub fn install(globals: &Rc<RefCell<Environment>>) {
    let mut env = globals.borrow_mut();
    env.define(
        "clock",
        Value::Callable(Callable::Native {
            name: "clock",
            arity: 0,
            func: clock,
        }),
    );
    env.define(
        "input",
        Value::Callable(Callable::Native {
            name: "input",
            arity: 0,
            func: input,
        }),
    );
    env.define(
        "print",
        Value::Callable(Callable::Native {
            name: "print",
            arity: 1,
            func: print,
        }),
    );
    env.define(
        "println",
        Value::Callable(Callable::Native {
            name: "println",
            arity: 1,
            func: println,
        }),
    );
}

fn clock(_args: &[Value]) -> Result<Value, Error> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch");
    Ok(Value::Number(now.as_secs_f64()))
}

fn input(_args: &[Value]) -> Result<Value, Error> {
    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
        Ok(0) => Ok(Value::Nil),
        Ok(_) => {
            if line.ends_with('\n') {
                line.pop();
                if line.ends_with('\r') {
                    line.pop();
                }
            }
            Ok(Value::String(line))
        }
        Err(err) => Err(Error::Runtime {
            token: Token::synthetic("input"),
            message: format!("Failed to read input: {err}"),
        }),
    }
}

fn print(args: &[Value]) -> Result<Value, Error> {
    print!("{}", args[0]);
    io::stdout().flush().ok();
    Ok(Value::Nil)
}

fn println(args: &[Value]) -> Result<Value, Error> {
    std::println!("{}", args[0]);
    Ok(Value::Nil)
}
