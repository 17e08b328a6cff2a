use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::Error;
use crate::function::{Callable, UserFunction};
use crate::token::Token;
use crate::value::Value;

/// A class is itself an instance carrying static fields: `statics` holds the
/// `static function` methods of the class itself (see DESIGN.md Open Question 7 for
/// why there is no separate runtime path for arbitrary static *field* assignment).
pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<RefCell<Class>>>,
    pub methods: HashMap<String, Rc<UserFunction>>,
    pub statics: HashMap<String, Value>,
}

impl Class {
    pub fn find_method(&self, name: &str) -> Option<Rc<UserFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }
        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.borrow().find_method(name))
    }

    /// `Class.arity() == (__init__?.arity() ?? 0)`.
    pub fn arity(&self) -> usize {
        self.find_method("__init__")
            .map(|init| init.params.len())
            .unwrap_or(0)
    }

    /// A class object's `Get` looks only in its own field table (static fields).
    pub fn get_static(&self, name: &Token) -> Result<Value, Error> {
        self.statics.get(&name.lexeme).cloned().ok_or_else(|| Error::Runtime {
            token: name.clone(),
            message: format!("Undefined property '{}'.", name.lexeme),
        })
    }
}

pub struct Instance {
    pub class: Rc<RefCell<Class>>,
    pub fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<RefCell<Class>>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    /// Checks fields first, then walks the class's method table and superclass chain;
    /// a found method is returned bound to `self_value`.
    pub fn get(&self, name: &Token, self_value: &Value) -> Result<Value, Error> {
        if let Some(value) = self.fields.get(&name.lexeme) {
            return Ok(value.clone());
        }
        if let Some(method) = self.class.borrow().find_method(&name.lexeme) {
            let bound = method.bind(self_value.clone());
            return Ok(Value::Callable(Callable::User(Rc::new(bound))));
        }
        Err(Error::Runtime {
            token: name.clone(),
            message: format!("Undefined property '{}'.", name.lexeme),
        })
    }

    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}
