use std::cell::RefCell;
use std::collections::HashMap;
use std::mem;
use std::rc::Rc;

use crate::ast::{Expr, LiteralValue, Stmt};
use crate::builtins;
use crate::class::{Class, Instance};
use crate::environment::{self, Environment};
use crate::error::Error;
use crate::function::{Callable, UserFunction};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Walks the AST directly: no Visitor trait, just `match`.
pub struct Interpreter {
    pub globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<u32, usize>,
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Environment::new();
        builtins::install(&globals);
        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
        }
    }

    pub fn resolve(&mut self, id: u32, depth: usize) {
        self.locals.insert(id, depth);
    }

    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), Error> {
        for stmt in statements {
            self.execute(stmt)?;
        }
        Ok(())
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<(), Error> {
        match stmt {
            Stmt::Block { statements } => {
                let scope = Environment::with_enclosing(&self.environment);
                self.execute_block(statements, scope)
            }
            Stmt::Expression { expression } => {
                self.evaluate(expression)?;
                Ok(())
            }
            Stmt::Var {
                names,
                initializers,
                ..
            } => {
                for i in 0..names.len() {
                    let value = match &initializers[i] {
                        Some(init) => self.evaluate(init)?,
                        None => Value::Nil,
                    };
                    self.environment.borrow_mut().define(&names[i].lexeme, value);
                }
                Ok(())
            }
            Stmt::Function { name, params, body } => {
                let function = UserFunction {
                    name: Some(name.clone()),
                    params: Rc::clone(params),
                    body: Rc::clone(body),
                    closure: Rc::clone(&self.environment),
                    is_initializer: false,
                };
                self.environment.borrow_mut().define(
                    &name.lexeme,
                    Value::Callable(Callable::User(Rc::new(function))),
                );
                Ok(())
            }
            Stmt::Method { .. } => unreachable!("methods are only reachable via Stmt::Class"),
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
            Stmt::Break { .. } => Err(Error::Break),
            Stmt::Continue { .. } => Err(Error::Continue),
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Err(Error::Return(value))
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body) {
                        Ok(()) => {}
                        Err(Error::Break) => break,
                        Err(Error::Continue) => continue,
                        Err(err) => return Err(err),
                    }
                }
                Ok(())
            }
            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => self.execute_for(initializer, condition, increment, body),
        }
    }

    fn execute_for(
        &mut self,
        initializer: &Option<Box<Stmt>>,
        condition: &Option<Expr>,
        increment: &Option<Expr>,
        body: &Stmt,
    ) -> Result<(), Error> {
        let loop_env = Environment::with_enclosing(&self.environment);
        let previous = mem::replace(&mut self.environment, loop_env);

        let result = (|| {
            if let Some(initializer) = initializer {
                self.execute(initializer)?;
            }
            loop {
                if let Some(condition) = condition {
                    if !self.evaluate(condition)?.is_truthy() {
                        break;
                    }
                }
                match self.execute(body) {
                    Ok(()) => {}
                    Err(Error::Break) => break,
                    Err(Error::Continue) => {}
                    Err(err) => return Err(err),
                }
                if let Some(increment) = increment {
                    self.evaluate(increment)?;
                }
            }
            Ok(())
        })();

        self.environment = previous;
        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Stmt],
    ) -> Result<(), Error> {
        let superclass_class = match superclass {
            Some(expr) => {
                let value = self.evaluate(expr)?;
                match value {
                    Value::Class(class) => Some(class),
                    _ => {
                        return Err(Error::Runtime {
                            token: superclass_token(expr),
                            message: "Superclass must be a class.".to_string(),
                        })
                    }
                }
            }
            None => None,
        };

        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        let previous = if let Some(superclass_class) = &superclass_class {
            let env = Environment::with_enclosing(&self.environment);
            env.borrow_mut().define("super", Value::Class(Rc::clone(superclass_class)));
            Some(mem::replace(&mut self.environment, env))
        } else {
            None
        };

        let mut class_methods = HashMap::new();
        let mut statics = HashMap::new();

        for method in methods {
            if let Stmt::Method { function, is_static } = method {
                if let Stmt::Function { name: fname, params, body } = function.as_ref() {
                    let user_fn = UserFunction {
                        name: Some(fname.clone()),
                        params: Rc::clone(params),
                        body: Rc::clone(body),
                        closure: Rc::clone(&self.environment),
                        is_initializer: fname.lexeme == "__init__",
                    };
                    if *is_static {
                        let value = Value::Callable(Callable::User(Rc::new(user_fn)));
                        statics.insert(fname.lexeme.clone(), value);
                    } else {
                        class_methods.insert(fname.lexeme.clone(), Rc::new(user_fn));
                    }
                }
            }
        }

        if let Some(previous) = previous {
            self.environment = previous;
        }

        let class = Rc::new(RefCell::new(Class {
            name: name.lexeme.clone(),
            superclass: superclass_class,
            methods: class_methods,
            statics,
        }));

        self.environment.borrow_mut().assign(name, Value::Class(class))?;
        Ok(())
    }

    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        scope: Rc<RefCell<Environment>>,
    ) -> Result<(), Error> {
        let previous = mem::replace(&mut self.environment, scope);
        let result = (|| {
            for stmt in statements {
                self.execute(stmt)?;
            }
            Ok(())
        })();
        self.environment = previous;
        result
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, Error> {
        match expr {
            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                match self.locals.get(id) {
                    Some(&depth) => environment::assign_at(&self.environment, depth, name, value.clone()),
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }
                Ok(value)
            }
            Expr::Set { object, name, value } => {
                let object_value = self.evaluate(object)?;
                match object_value {
                    Value::Instance(instance) => {
                        let value = self.evaluate(value)?;
                        instance.borrow_mut().set(name, value.clone());
                        Ok(value)
                    }
                    _ => Err(Error::Runtime {
                        token: name.clone(),
                        message: "Only instances have fields.".to_string(),
                    }),
                }
            }
            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),
            Expr::Super { id, keyword, method } => {
                let depth = *self.locals.get(id).expect("'super' is always resolved");
                let superclass = match environment::get_at(&self.environment, depth, "super") {
                    Value::Class(class) => class,
                    _ => unreachable!("'super' always binds to a class"),
                };
                let instance = environment::get_at(&self.environment, depth - 1, "this");
                let found = superclass.borrow().find_method(&method.lexeme);
                match found {
                    Some(found) => {
                        let bound = found.bind(instance);
                        Ok(Value::Callable(Callable::User(Rc::new(bound))))
                    }
                    None => Err(Error::Runtime {
                        token: keyword.clone(),
                        message: format!("Undefined property '{}'.", method.lexeme),
                    }),
                }
            }
            Expr::Ternary {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(cond)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),
            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_value = self.evaluate(left)?;
                if operator.token_type == TokenType::Or || operator.token_type == TokenType::PipePipe {
                    if left_value.is_truthy() {
                        return Ok(left_value);
                    }
                } else if !left_value.is_truthy() {
                    return Ok(left_value);
                }
                self.evaluate(right)
            }
            Expr::Unary { operator, right } => {
                let right_value = self.evaluate(right)?;
                match operator.token_type {
                    TokenType::Minus => match right_value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(Error::Runtime {
                            token: operator.clone(),
                            message: "Operand must be a number.".to_string(),
                        }),
                    },
                    TokenType::Bang => Ok(Value::Bool(!right_value.is_truthy())),
                    _ => unreachable!("parser never produces other unary operators"),
                }
            }
            Expr::Grouping { expression } => self.evaluate(expression),
            Expr::Literal { value } => Ok(match value {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::String(s) => Value::String(s.clone()),
                LiteralValue::Boolean(b) => Value::Bool(*b),
                LiteralValue::Nil => Value::Nil,
            }),
            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),
            Expr::Get { object, name } => {
                let object_value = self.evaluate(object)?;
                match object_value {
                    Value::Instance(instance) => {
                        let self_value = Value::Instance(Rc::clone(&instance));
                        instance.borrow().get(name, &self_value)
                    }
                    Value::Class(class) => class.borrow().get_static(name),
                    _ => Err(Error::Runtime {
                        token: name.clone(),
                        message: "Only instances have properties.".to_string(),
                    }),
                }
            }
            Expr::Function { name, params, body } => {
                let function = UserFunction {
                    name: name.clone(),
                    params: Rc::clone(params),
                    body: Rc::clone(body),
                    closure: Rc::clone(&self.environment),
                    is_initializer: false,
                };
                Ok(Value::Callable(Callable::User(Rc::new(function))))
            }
            Expr::Variable { id, name } => self.look_up_variable(*id, name),
        }
    }

    fn look_up_variable(&self, id: u32, name: &Token) -> Result<Value, Error> {
        match self.locals.get(&id) {
            Some(&depth) => Ok(environment::get_at(&self.environment, depth, &name.lexeme)),
            None => self.globals.borrow().get(name),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value, Error> {
        let left_value = self.evaluate(left)?;
        let right_value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::Plus => add(&left_value, &right_value, operator),
            TokenType::Minus => numeric(&left_value, &right_value, operator, |a, b| a - b).map(Value::Number),
            TokenType::Star => numeric(&left_value, &right_value, operator, |a, b| a * b).map(Value::Number),
            TokenType::Slash => {
                let a = as_number(&left_value, operator)?;
                let b = as_number(&right_value, operator)?;
                // Host IEEE-754 semantics: division by zero yields infinity/NaN, not
                // an error.
                Ok(Value::Number(a / b))
            }
            TokenType::Greater => Ok(Value::Bool(
                as_number(&left_value, operator)? > as_number(&right_value, operator)?,
            )),
            TokenType::GreaterEqual => Ok(Value::Bool(
                as_number(&left_value, operator)? >= as_number(&right_value, operator)?,
            )),
            TokenType::Less => Ok(Value::Bool(
                as_number(&left_value, operator)? < as_number(&right_value, operator)?,
            )),
            TokenType::LessEqual => Ok(Value::Bool(
                as_number(&left_value, operator)? <= as_number(&right_value, operator)?,
            )),
            TokenType::BangEqual => Ok(Value::Bool(!left_value.equals(&right_value))),
            TokenType::EqualEqual => Ok(Value::Bool(left_value.equals(&right_value))),
            _ => unreachable!("parser never produces other binary operators"),
        }
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> Result<Value, Error> {
        let callee_value = self.evaluate(callee)?;
        let mut args = Vec::with_capacity(arguments.len());
        for arg in arguments {
            args.push(self.evaluate(arg)?);
        }

        match callee_value {
            Value::Callable(callable) => self.call_callable(&callable, &args, paren),
            Value::Class(class) => {
                let arity = class.borrow().arity();
                if args.len() != arity {
                    return Err(Error::Runtime {
                        token: paren.clone(),
                        message: format!("Expected {arity} arguments but got {}.", args.len()),
                    });
                }
                let instance = Rc::new(RefCell::new(Instance::new(Rc::clone(&class))));
                let init = class.borrow().find_method("__init__");
                if let Some(init) = init {
                    let self_value = Value::Instance(Rc::clone(&instance));
                    let bound = init.bind(self_value);
                    self.call_user_function(&bound, &args)?;
                }
                Ok(Value::Instance(instance))
            }
            _ => Err(Error::Runtime {
                token: paren.clone(),
                message: "Can only call functions and classes.".to_string(),
            }),
        }
    }

    fn call_callable(&mut self, callable: &Callable, args: &[Value], paren: &Token) -> Result<Value, Error> {
        if args.len() != callable.arity() {
            return Err(Error::Runtime {
                token: paren.clone(),
                message: format!("Expected {} arguments but got {}.", callable.arity(), args.len()),
            });
        }
        match callable {
            Callable::Native { func, .. } => func(args),
            Callable::User(f) => self.call_user_function(f, args),
        }
    }

    fn call_user_function(&mut self, function: &UserFunction, args: &[Value]) -> Result<Value, Error> {
        let call_env = Environment::with_enclosing(&function.closure);
        {
            let mut env = call_env.borrow_mut();
            for (param, arg) in function.params.iter().zip(args) {
                env.define(&param.lexeme, arg.clone());
            }
        }

        let previous = mem::replace(&mut self.environment, call_env);
        let result = (|| {
            for stmt in function.body.iter() {
                self.execute(stmt)?;
            }
            Ok(Value::Nil)
        })();
        self.environment = previous;

        match result {
            Ok(value) => {
                if function.is_initializer {
                    Ok(environment::get_at(&function.closure, 0, "this"))
                } else {
                    Ok(value)
                }
            }
            Err(Error::Return(value)) => {
                if function.is_initializer {
                    Ok(environment::get_at(&function.closure, 0, "this"))
                } else {
                    Ok(value)
                }
            }
            Err(err) => Err(err),
        }
    }
}

fn superclass_token(expr: &Expr) -> Token {
    match expr {
        Expr::Variable { name, .. } => name.clone(),
        _ => Token::synthetic("super"),
    }
}

fn as_number(value: &Value, operator: &Token) -> Result<f64, Error> {
    match value {
        Value::Number(n) => Ok(*n),
        _ => Err(Error::Runtime {
            token: operator.clone(),
            message: "Operands must be numbers.".to_string(),
        }),
    }
}

fn numeric(
    left: &Value,
    right: &Value,
    operator: &Token,
    op: impl Fn(f64, f64) -> f64,
) -> Result<f64, Error> {
    let a = as_number(left, operator)?;
    let b = as_number(right, operator)?;
    Ok(op(a, b))
}

/// Implements `+`'s priority-ordered overload resolution: number+number,
/// string+string, string+X (stringifies X), X+string (stringifies X), else error.
/// Sequential `if let`, not `match`, to preserve this exact check order.
fn add(left: &Value, right: &Value, operator: &Token) -> Result<Value, Error> {
    if let (Value::Number(a), Value::Number(b)) = (left, right) {
        return Ok(Value::Number(a + b));
    }
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return Ok(Value::String(format!("{a}{b}")));
    }
    if let Value::String(a) = left {
        return Ok(Value::String(format!("{a}{right}")));
    }
    if let Value::String(b) = right {
        return Ok(Value::String(format!("{left}{b}")));
    }
    Err(Error::Runtime {
        token: operator.clone(),
        message: "Operands must be two numbers or at least one string.".to_string(),
    })
}
