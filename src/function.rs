use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ast::Stmt;
use crate::environment::Environment;
use crate::error::Error;
use crate::token::Token;
use crate::value::Value;

/// A declared function together with the environment it closed over, grounded in the
/// teacher's `Function::User` variant but lifted into its own `Rc`-wrapped struct so
/// that binding a method only clones a reference, not the whole declaration.
pub struct UserFunction {
    pub name: Option<Token>,
    pub params: Rc<Vec<Token>>,
    pub body: Rc<Vec<Stmt>>,
    pub closure: Rc<RefCell<Environment>>,
    pub is_initializer: bool,
}

impl UserFunction {
    /// Creates a new environment nested inside the function's closure, with `this`
    /// bound to `instance` — a closure-within-a-closure.
    pub fn bind(&self, instance: Value) -> UserFunction {
        let env = Environment::with_enclosing(&self.closure);
        env.borrow_mut().define("this", instance);
        UserFunction {
            name: self.name.clone(),
            params: Rc::clone(&self.params),
            body: Rc::clone(&self.body),
            closure: env,
            is_initializer: self.is_initializer,
        }
    }
}

pub type NativeFn = fn(&[Value]) -> Result<Value, Error>;

#[derive(Clone)]
pub enum Callable {
    Native {
        name: &'static str,
        arity: usize,
        func: NativeFn,
    },
    User(Rc<UserFunction>),
}

impl Callable {
    pub fn arity(&self) -> usize {
        match self {
            Callable::Native { arity, .. } => *arity,
            Callable::User(f) => f.params.len(),
        }
    }

    pub fn identity_eq(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Native { func: a, .. }, Callable::Native { func: b, .. }) => {
                *a as usize == *b as usize
            }
            (Callable::User(a), Callable::User(b)) => {
                Rc::ptr_eq(&a.body, &b.body) && Rc::ptr_eq(&a.closure, &b.closure)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native { name, .. } => write!(f, "<function {name}>"),
            Callable::User(func) => match &func.name {
                Some(name) => write!(f, "<function {}>", name.lexeme),
                None => write!(f, "<function>"),
            },
        }
    }
}
