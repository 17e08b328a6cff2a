use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::Error;
use crate::token::Token;
use crate::value::Value;

/// A name→value table with an optional enclosing-environment back-reference.
/// `get`/`assign` walk the chain and are used only for the two cases the resolver
/// leaves without a hop-count: unresolved (global) references, and the globals
/// environment's own direct lookups. Resolved references go through `get_at`/
/// `assign_at`, which index a specific ancestor directly with no chain search.
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            values: HashMap::new(),
            enclosing: None,
        }))
    }

    pub fn with_enclosing(enclosing: &Rc<RefCell<Environment>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            values: HashMap::new(),
            enclosing: Some(Rc::clone(enclosing)),
        }))
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &Token) -> Result<Value, Error> {
        if let Some(value) = self.values.get(&name.lexeme) {
            return Ok(value.clone());
        }
        if let Some(enclosing) = &self.enclosing {
            return enclosing.borrow().get(name);
        }
        Err(Error::Runtime {
            token: name.clone(),
            message: format!("Undefined variable '{}'.", name.lexeme),
        })
    }

    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), Error> {
        if self.values.contains_key(&name.lexeme) {
            self.values.insert(name.lexeme.clone(), value);
            return Ok(());
        }
        if let Some(enclosing) = &self.enclosing {
            return enclosing.borrow_mut().assign(name, value);
        }
        Err(Error::Runtime {
            token: name.clone(),
            message: format!("Undefined variable '{}'.", name.lexeme),
        })
    }
}

fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
    let mut current = Rc::clone(env);
    for _ in 0..distance {
        let parent = current
            .borrow()
            .enclosing
            .clone()
            .expect("resolver hop-count exceeds the active environment chain depth");
        current = parent;
    }
    current
}

pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Value {
    ancestor(env, distance)
        .borrow()
        .values
        .get(name)
        .cloned()
        .unwrap_or_else(|| {
            panic!("resolver recorded a binding for '{name}' absent at distance {distance}")
        })
}

pub fn assign_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &Token, value: Value) {
    ancestor(env, distance)
        .borrow_mut()
        .values
        .insert(name.lexeme.clone(), value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_shadows_parent_but_parent_is_unaffected() {
        let parent = Environment::new();
        parent.borrow_mut().define("x", Value::Number(1.0));
        let child = Environment::with_enclosing(&parent);
        child.borrow_mut().define("x", Value::Number(2.0));

        assert_eq!(get_at(&child, 0, "x").to_string(), "2");
        assert_eq!(get_at(&child, 1, "x").to_string(), "1");
    }

    #[test]
    fn assign_through_chain_mutates_the_defining_environment() {
        let parent = Environment::new();
        parent.borrow_mut().define("x", Value::Number(1.0));
        let child = Environment::with_enclosing(&parent);

        let name = Token::synthetic("x");
        child.borrow_mut().assign(&name, Value::Number(5.0)).unwrap();

        assert_eq!(parent.borrow().get(&name).unwrap().to_string(), "5");
    }
}
