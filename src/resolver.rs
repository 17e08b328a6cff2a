use std::collections::{HashMap, HashSet};

use crate::ast::{Expr, Stmt};
use crate::error::parser_error;
use crate::interpreter::Interpreter;
use crate::token::Token;

#[derive(Clone, Copy, PartialEq)]
enum FunctionType {
    None,
    Function,
    Method,
    StaticMethod,
    Initializer,
}

#[derive(Clone, Copy, PartialEq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

struct ScopeEntry {
    defined: bool,
    is_const: bool,
}

/// Static scope-analysis pass: walks the AST with a scope stack, recording a
/// hop-count for every `Variable`/`Assign`/`This`/`Super` reference on the interpreter's
/// side-table, and reporting any static errors encountered along the way.
pub struct Resolver<'a> {
    interpreter: &'a mut Interpreter,
    scopes: Vec<HashMap<String, ScopeEntry>>,
    global_consts: HashSet<String>,
    current_function: FunctionType,
    current_class: ClassType,
    in_loop: bool,
    had_error: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(interpreter: &'a mut Interpreter) -> Self {
        Self {
            interpreter,
            scopes: Vec::new(),
            global_consts: HashSet::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            in_loop: false,
            had_error: false,
        }
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.had_error = true;
        parser_error(token, message);
    }

    /// Resolves a whole program, returning `Error::Resolve` if any static error was
    /// reported (each error is already printed to stderr at the point it occurred).
    pub fn resolve(mut self, statements: &[Stmt]) -> Result<(), crate::error::Error> {
        self.resolve_stmts(statements);
        if self.had_error {
            Err(crate::error::Error::Resolve)
        } else {
            Ok(())
        }
    }

    fn resolve_stmts(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token, is_const: bool) {
        let duplicate = self
            .scopes
            .last()
            .map_or(false, |scope| scope.contains_key(&name.lexeme));
        if duplicate {
            self.error(name, "Already a variable with this name in this scope.");
        }
        match self.scopes.last_mut() {
            Some(scope) => {
                scope.insert(
                    name.lexeme.clone(),
                    ScopeEntry {
                        defined: false,
                        is_const,
                    },
                );
            }
            None => {
                if is_const {
                    self.global_consts.insert(name.lexeme.clone());
                }
            }
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if let Some(entry) = scope.get_mut(&name.lexeme) {
                entry.defined = true;
            }
        }
    }

    fn is_const_binding(&self, name: &Token) -> bool {
        for scope in self.scopes.iter().rev() {
            if let Some(entry) = scope.get(&name.lexeme) {
                return entry.is_const;
            }
        }
        self.global_consts.contains(&name.lexeme)
    }

    /// Scans scopes top-down; the first scope containing the name yields a hop-count.
    /// If no scope matches, the reference is global (no entry recorded). Stops at the
    /// first match, unlike the teacher's `resolve_local`, which keeps scanning after a
    /// hit and can overwrite a correct hop-count with one from a farther scope.
    fn resolve_local(&mut self, id: u32, name: &str) {
        for (i, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                self.interpreter.resolve(id, i);
                return;
            }
        }
    }

    fn resolve_function(&mut self, params: &[Token], body: &[Stmt], kind: FunctionType) {
        let enclosing_function = self.current_function;
        let enclosing_loop = self.in_loop;
        self.current_function = kind;
        self.in_loop = false;

        self.begin_scope();
        for param in params {
            self.declare(param, false);
            self.define(param);
        }
        self.resolve_stmts(body);
        self.end_scope();

        self.current_function = enclosing_function;
        self.in_loop = enclosing_loop;
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block { statements } => {
                self.begin_scope();
                self.resolve_stmts(statements);
                self.end_scope();
            }
            Stmt::Expression { expression } => self.resolve_expr(expression),
            Stmt::Var {
                names,
                is_const,
                initializers,
            } => {
                for i in 0..names.len() {
                    self.declare(&names[i], is_const[i]);
                    if let Some(init) = &initializers[i] {
                        self.resolve_expr(init);
                    }
                    self.define(&names[i]);
                }
            }
            Stmt::Function { name, params, body } => {
                self.declare(name, false);
                self.define(name);
                self.resolve_function(params, body, FunctionType::Function);
            }
            Stmt::Method { .. } => unreachable!("methods are resolved inline by visit_class"),
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),
            Stmt::Break { keyword } => {
                if !self.in_loop {
                    self.error(keyword, "Cannot use 'break' outside of a loop.");
                }
            }
            Stmt::Continue { keyword } => {
                if !self.in_loop {
                    self.error(keyword, "Cannot use 'continue' outside of a loop.");
                }
            }
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Cannot return from top-level code.");
                }
                if let Some(value) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Cannot return a value from an initializer.");
                    }
                    self.resolve_expr(value);
                }
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                let enclosing_loop = self.in_loop;
                self.in_loop = true;
                self.resolve_stmt(body);
                self.in_loop = enclosing_loop;
            }
            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                self.begin_scope();
                let enclosing_loop = self.in_loop;
                self.in_loop = true;
                if let Some(initializer) = initializer {
                    self.resolve_stmt(initializer);
                }
                if let Some(condition) = condition {
                    self.resolve_expr(condition);
                }
                if let Some(increment) = increment {
                    self.resolve_expr(increment);
                }
                self.resolve_stmt(body);
                self.in_loop = enclosing_loop;
                self.end_scope();
            }
        }
    }

    fn resolve_class(&mut self, name: &Token, superclass: Option<&Expr>, methods: &[Stmt]) {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(name, false);
        self.define(name);

        if let Some(superclass_expr) = superclass {
            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass_expr);
            self.begin_scope();
            self.scopes.last_mut().unwrap().insert(
                "super".to_string(),
                ScopeEntry {
                    defined: true,
                    is_const: true,
                },
            );
        }

        self.begin_scope();
        self.scopes.last_mut().unwrap().insert(
            "this".to_string(),
            ScopeEntry {
                defined: true,
                is_const: true,
            },
        );

        for method in methods {
            if let Stmt::Method { function, is_static } = method {
                if let Stmt::Function { name: fname, params, body } = function.as_ref() {
                    if *is_static && fname.lexeme == "__init__" {
                        self.error(fname, "Initializer cannot be static.");
                    }
                    let kind = if *is_static {
                        FunctionType::StaticMethod
                    } else if fname.lexeme == "__init__" {
                        FunctionType::Initializer
                    } else {
                        FunctionType::Method
                    };
                    self.resolve_function(params, body, kind);
                }
            }
        }

        self.end_scope();
        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                if self.is_const_binding(name) {
                    self.error(
                        name,
                        &format!("Cannot assign to constant variable '{}'.", name.lexeme),
                    );
                }
                self.resolve_local(*id, &name.lexeme);
            }
            Expr::Set { object, name: _, value } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            Expr::This { id, keyword } => match self.current_class {
                ClassType::None => {
                    self.error(keyword, "Cannot use 'this' outside of a class.")
                }
                _ => {
                    if self.current_function == FunctionType::StaticMethod {
                        self.error(keyword, "Cannot use 'this' in a static method.");
                    } else {
                        self.resolve_local(*id, &keyword.lexeme);
                    }
                }
            },
            Expr::Super { id, keyword, method: _ } => match self.current_class {
                ClassType::None => {
                    self.error(keyword, "Cannot use 'super' outside of a class.")
                }
                ClassType::Class => self.error(
                    keyword,
                    "Cannot use 'super' in a class with no superclass.",
                ),
                ClassType::Subclass => {
                    if self.current_function == FunctionType::StaticMethod {
                        self.error(keyword, "Cannot use 'super' in a static method.");
                    } else {
                        self.resolve_local(*id, &keyword.lexeme);
                    }
                }
            },
            Expr::Ternary {
                cond,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(cond);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }
            Expr::Binary { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Unary { right, .. } => self.resolve_expr(right),
            Expr::Grouping { expression } => self.resolve_expr(expression),
            Expr::Literal { .. } => {}
            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }
            Expr::Get { object, .. } => self.resolve_expr(object),
            Expr::Function { params, body, .. } => {
                self.resolve_function(params, body, FunctionType::Function);
            }
            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if let Some(entry) = scope.get(&name.lexeme) {
                        if !entry.defined {
                            self.error(
                                name,
                                "Cannot read local variable in its own initializer.",
                            );
                        }
                    }
                }
                self.resolve_local(*id, &name.lexeme);
            }
        }
    }
}
