use std::rc::Rc;

use crate::ast::{Expr, LiteralValue, Stmt};
use crate::error::{parser_error, Error};
use crate::token::{Token, TokenType};

/// Recursive-descent parser producing the AST directly. `next_expr_id`
/// issues the monotonic ids that back the resolver's hop-count side-table.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    next_expr_id: u32,
    /// Set by `non_fatal_error` for limits (argument/parameter counts, a `const`
    /// with no initializer) that are reported but don't abort the current
    /// production — parsing continues, but the run is still marked unrunnable.
    had_error: bool,
}

type ExprResult = Result<Expr, Error>;
type StmtResult = Result<Stmt, Error>;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            next_expr_id: 0,
            had_error: false,
        }
    }

    pub fn parse(&mut self) -> Result<Vec<Stmt>, Error> {
        let mut statements = Vec::new();
        let mut had_error = false;
        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(_) => {
                    had_error = true;
                    self.synchronize();
                }
            }
        }
        if had_error || self.had_error {
            Err(Error::Parse)
        } else {
            Ok(statements)
        }
    }

    /// Reports an error without aborting the current production: the limit is
    /// noted and parsing continues past it, but the overall parse is still a
    /// failure (spec.md §7: "reported ... continues; program unrunnable").
    fn non_fatal_error(&mut self, token: &Token, message: &str) {
        self.had_error = true;
        parser_error(token, message);
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_expr_id;
        self.next_expr_id += 1;
        id
    }

    fn declaration(&mut self) -> StmtResult {
        if self.check(&TokenType::Class) {
            self.advance();
            return self.class_declaration();
        }
        if self.check(&TokenType::Function) && self.check_next(&TokenType::Identifier) {
            self.advance();
            return self.function_declaration("function");
        }
        if self.check(&TokenType::Var) || self.check(&TokenType::Const) {
            return self.var_declaration();
        }
        self.statement()
    }

    fn class_declaration(&mut self) -> StmtResult {
        let name = self.consume(&TokenType::Identifier, "Expect class name.")?;

        let superclass = if self.match_token(&TokenType::Inherits) {
            let super_name = self.consume(&TokenType::Identifier, "Expect superclass name.")?;
            Some(Expr::Variable {
                id: self.next_id(),
                name: super_name,
            })
        } else {
            None
        };

        self.consume(&TokenType::LeftBrace, "Expect '{' before class body.")?;

        let mut methods = Vec::new();
        while !self.check(&TokenType::RightBrace) && !self.is_at_end() {
            let is_static = self.match_token(&TokenType::Static);
            self.consume(&TokenType::Function, "Expect 'function' before method name.")?;
            let function = self.function_declaration("method")?;
            methods.push(Stmt::Method {
                function: Box::new(function),
                is_static,
            });
        }

        self.consume(&TokenType::RightBrace, "Expect '}' after class body.")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn function_declaration(&mut self, kind: &str) -> StmtResult {
        let name = self.consume(&TokenType::Identifier, &format!("Expect {kind} name."))?;
        let (params, body, is_arrow) = self.function_params_and_body(kind)?;
        if is_arrow {
            self.consume(&TokenType::Semicolon, "Expect ';' after expression.")?;
        }
        Ok(Stmt::Function {
            name,
            params: Rc::new(params),
            body: Rc::new(body),
        })
    }

    /// Shared by named declarations, methods, and anonymous/arrow functions.
    /// `is_arrow` tells the caller whether the body came from `=>` (no trailing
    /// semicolon required at the statement level).
    fn function_params_and_body(&mut self, kind: &str) -> Result<(Vec<Token>, Vec<Stmt>, bool), Error> {
        self.consume(&TokenType::LeftParen, &format!("Expect '(' after {kind} name."))?;
        let mut params = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                if params.len() >= 255 {
                    let token = self.peek().clone();
                    self.non_fatal_error(&token, "Cannot have more than 255 parameters.");
                }
                params.push(self.consume(&TokenType::Identifier, "Expect parameter name.")?);
                if !self.match_token(&TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(&TokenType::RightParen, "Expect ')' after parameters.")?;

        if self.match_token(&TokenType::Arrow) {
            let keyword = self.previous().clone();
            let value = self.expression()?;
            let body = vec![Stmt::Return {
                keyword,
                value: Some(value),
            }];
            return Ok((params, body, true));
        }

        self.consume(&TokenType::LeftBrace, &format!("Expect '{{' before {kind} body."))?;
        let body = self.block()?;
        Ok((params, body, false))
    }

    fn var_declaration(&mut self) -> StmtResult {
        let mut names = Vec::new();
        let mut is_const = Vec::new();
        let mut initializers = Vec::new();

        loop {
            let const_binding = self.match_token(&TokenType::Const);
            if !const_binding {
                self.consume(&TokenType::Var, "Expect 'var' or 'const'.")?;
            }
            let name = self.consume(&TokenType::Identifier, "Expect variable name.")?;
            let initializer = if self.match_token(&TokenType::Equal) {
                Some(self.expression()?)
            } else {
                None
            };
            if const_binding && initializer.is_none() {
                self.non_fatal_error(&name, "Constant declaration requires an initializer.");
            }
            names.push(name);
            is_const.push(const_binding);
            initializers.push(initializer);

            if !self.match_token(&TokenType::Comma) {
                break;
            }
        }

        self.consume(&TokenType::Semicolon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::Var {
            names,
            is_const,
            initializers,
        })
    }

    fn statement(&mut self) -> StmtResult {
        if self.match_token(&TokenType::If) {
            return self.if_statement();
        }
        if self.match_token(&TokenType::While) {
            return self.while_statement();
        }
        if self.match_token(&TokenType::For) {
            return self.for_statement();
        }
        if self.match_token(&TokenType::Break) {
            let keyword = self.previous().clone();
            self.consume(&TokenType::Semicolon, "Expect ';' after 'break'.")?;
            return Ok(Stmt::Break { keyword });
        }
        if self.match_token(&TokenType::Continue) {
            let keyword = self.previous().clone();
            self.consume(&TokenType::Semicolon, "Expect ';' after 'continue'.")?;
            return Ok(Stmt::Continue { keyword });
        }
        if self.match_token(&TokenType::Return) {
            return self.return_statement();
        }
        if self.match_token(&TokenType::LeftBrace) {
            return Ok(Stmt::Block {
                statements: self.block()?,
            });
        }
        self.expression_statement()
    }

    fn if_statement(&mut self) -> StmtResult {
        self.consume(&TokenType::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(&TokenType::RightParen, "Expect ')' after if condition.")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_token(&TokenType::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> StmtResult {
        self.consume(&TokenType::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(&TokenType::RightParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    fn for_statement(&mut self) -> StmtResult {
        self.consume(&TokenType::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_token(&TokenType::Semicolon) {
            None
        } else if self.check(&TokenType::Var) || self.check(&TokenType::Const) {
            Some(Box::new(self.var_declaration()?))
        } else {
            Some(Box::new(self.expression_statement()?))
        };

        let condition = if !self.check(&TokenType::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(&TokenType::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if !self.check(&TokenType::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(&TokenType::RightParen, "Expect ')' after for clauses.")?;

        let body = Box::new(self.statement()?);

        Ok(Stmt::For {
            initializer,
            condition,
            increment,
            body,
        })
    }

    fn return_statement(&mut self) -> StmtResult {
        let keyword = self.previous().clone();
        let value = if !self.check(&TokenType::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(&TokenType::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn block(&mut self) -> Result<Vec<Stmt>, Error> {
        let mut statements = Vec::new();
        while !self.check(&TokenType::RightBrace) && !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.synchronize();
                    return Err(err);
                }
            }
        }
        self.consume(&TokenType::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn expression_statement(&mut self) -> StmtResult {
        let expr = self.expression()?;
        self.consume(&TokenType::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression { expression: expr })
    }

    fn expression(&mut self) -> ExprResult {
        self.assignment()
    }

    fn assignment(&mut self) -> ExprResult {
        let expr = self.ternary()?;

        if self.match_token(&TokenType::Equal) {
            let equals = self.previous().clone();
            let value = self.assignment()?;
            return self.build_assignment(expr, &equals, value);
        }

        for (token_type, base_op) in [
            (TokenType::PlusEqual, "+"),
            (TokenType::MinusEqual, "-"),
            (TokenType::StarEqual, "*"),
            (TokenType::SlashEqual, "/"),
        ] {
            if self.check(&token_type) {
                self.advance();
                let op_token = self.previous().clone();
                let value = self.assignment()?;
                let synthesized_op = Token::new(base_operator_type(&token_type), base_op, op_token.line);
                return self.build_augmented_assignment(expr, &synthesized_op, value);
            }
        }

        Ok(expr)
    }

    fn build_assignment(&mut self, target: Expr, equals: &Token, value: Expr) -> ExprResult {
        match target {
            Expr::Variable { name, .. } => Ok(Expr::Assign {
                id: self.next_id(),
                name,
                value: Box::new(value),
            }),
            Expr::Get { object, name } => Ok(Expr::Set {
                object,
                name,
                value: Box::new(value),
            }),
            _ => {
                parser_error(equals, "Invalid assignment target.");
                Err(Error::Parse)
            }
        }
    }

    /// Desugars `x += e` into `x = x + e`, and `obj.f += e` into a `Set` whose value
    /// is `Binary(Get(obj.f), +, e)`. The `Get` target's object subexpression is
    /// cloned so it can be evaluated once for the read and once for the write (see
    /// DESIGN.md Open Question 5 for why this double-evaluation is accepted).
    fn build_augmented_assignment(&mut self, target: Expr, operator: &Token, value: Expr) -> ExprResult {
        match target {
            Expr::Variable { name, .. } => {
                let read = Expr::Variable {
                    id: self.next_id(),
                    name: name.clone(),
                };
                let combined = Expr::Binary {
                    left: Box::new(read),
                    operator: operator.clone(),
                    right: Box::new(value),
                };
                Ok(Expr::Assign {
                    id: self.next_id(),
                    name,
                    value: Box::new(combined),
                })
            }
            Expr::Get { object, name } => {
                let read = Expr::Get {
                    object: object.clone(),
                    name: name.clone(),
                };
                let combined = Expr::Binary {
                    left: Box::new(read),
                    operator: operator.clone(),
                    right: Box::new(value),
                };
                Ok(Expr::Set {
                    object,
                    name,
                    value: Box::new(combined),
                })
            }
            _ => {
                parser_error(operator, "Invalid assignment target.");
                Err(Error::Parse)
            }
        }
    }

    fn ternary(&mut self) -> ExprResult {
        let expr = self.logic_or()?;
        if self.match_token(&TokenType::Question) {
            let then_branch = self.ternary()?;
            self.consume(&TokenType::Colon, "Expect ':' in ternary expression.")?;
            let else_branch = self.ternary()?;
            return Ok(Expr::Ternary {
                cond: Box::new(expr),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            });
        }
        Ok(expr)
    }

    fn logic_or(&mut self) -> ExprResult {
        let mut expr = self.logic_and()?;
        while self.check(&TokenType::Or) || self.check(&TokenType::PipePipe) {
            self.advance();
            let operator = self.previous().clone();
            let right = self.logic_and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn logic_and(&mut self) -> ExprResult {
        let mut expr = self.equality()?;
        while self.check(&TokenType::And) || self.check(&TokenType::AmpAmp) {
            self.advance();
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ExprResult {
        let mut expr = self.comparison()?;
        while self.check(&TokenType::BangEqual) || self.check(&TokenType::EqualEqual) {
            self.advance();
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ExprResult {
        let mut expr = self.addition()?;
        while self.check(&TokenType::Greater)
            || self.check(&TokenType::GreaterEqual)
            || self.check(&TokenType::Less)
            || self.check(&TokenType::LessEqual)
        {
            self.advance();
            let operator = self.previous().clone();
            let right = self.addition()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn addition(&mut self) -> ExprResult {
        let mut expr = self.multiplication()?;
        while self.check(&TokenType::Plus) || self.check(&TokenType::Minus) {
            self.advance();
            let operator = self.previous().clone();
            let right = self.multiplication()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn multiplication(&mut self) -> ExprResult {
        let mut expr = self.unary()?;
        while self.check(&TokenType::Star) || self.check(&TokenType::Slash) {
            self.advance();
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ExprResult {
        if self.check(&TokenType::Bang) || self.check(&TokenType::Minus) {
            self.advance();
            let operator = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        // A binary operator with no left operand is a common typo; report it instead
        // of letting `primary` fail with a less useful message.
        if self.check(&TokenType::Plus)
            || self.check(&TokenType::Star)
            || self.check(&TokenType::Slash)
            || self.check(&TokenType::BangEqual)
            || self.check(&TokenType::EqualEqual)
            || self.check(&TokenType::Greater)
            || self.check(&TokenType::GreaterEqual)
            || self.check(&TokenType::Less)
            || self.check(&TokenType::LessEqual)
        {
            let operator = self.peek().clone();
            parser_error(&operator, "Expect expression.");
            return Err(Error::Parse);
        }

        self.call()
    }

    fn call(&mut self) -> ExprResult {
        let mut expr = self.primary()?;

        loop {
            if self.match_token(&TokenType::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.match_token(&TokenType::Dot) {
                let name = self.consume(&TokenType::Identifier, "Expect property name after '.'.")?;
                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ExprResult {
        let mut arguments = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                if arguments.len() >= 8 {
                    let token = self.peek().clone();
                    self.non_fatal_error(&token, "Cannot have more than 8 arguments.");
                }
                arguments.push(self.expression()?);
                if !self.match_token(&TokenType::Comma) {
                    break;
                }
            }
        }
        let paren = self.consume(&TokenType::RightParen, "Expect ')' after arguments.")?;
        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> ExprResult {
        if self.match_token(&TokenType::False) {
            return Ok(Expr::Literal {
                value: LiteralValue::Boolean(false),
            });
        }
        if self.match_token(&TokenType::True) {
            return Ok(Expr::Literal {
                value: LiteralValue::Boolean(true),
            });
        }
        if self.match_token(&TokenType::Nil) {
            return Ok(Expr::Literal {
                value: LiteralValue::Nil,
            });
        }
        if let TokenType::Number { literal } = &self.peek().token_type {
            let n = *literal;
            self.advance();
            return Ok(Expr::Literal {
                value: LiteralValue::Number(n),
            });
        }
        if let TokenType::String { .. } = &self.peek().token_type {
            return self.string_literal();
        }
        if self.match_token(&TokenType::Super) {
            let keyword = self.previous().clone();
            self.consume(&TokenType::Dot, "Expect '.' after 'super'.")?;
            let method = self.consume(&TokenType::Identifier, "Expect superclass method name.")?;
            return Ok(Expr::Super {
                id: self.next_id(),
                keyword,
                method,
            });
        }
        if self.match_token(&TokenType::This) {
            return Ok(Expr::This {
                id: self.next_id(),
                keyword: self.previous().clone(),
            });
        }
        if self.match_token(&TokenType::Function) {
            let (params, body, _) = self.function_params_and_body("function")?;
            return Ok(Expr::Function {
                name: None,
                params: Rc::new(params),
                body: Rc::new(body),
            });
        }
        if self.check(&TokenType::Identifier) {
            self.advance();
            return Ok(Expr::Variable {
                id: self.next_id(),
                name: self.previous().clone(),
            });
        }
        if self.match_token(&TokenType::LeftParen) {
            let expr = self.expression()?;
            self.consume(&TokenType::RightParen, "Expect ')' after expression.")?;
            return Ok(Expr::Grouping {
                expression: Box::new(expr),
            });
        }

        let token = self.peek().clone();
        parser_error(&token, "Expect expression.");
        Err(Error::Parse)
    }

    /// Adjacent string literals concatenate at parse time.
    fn string_literal(&mut self) -> ExprResult {
        let mut combined = String::new();
        loop {
            match &self.peek().token_type {
                TokenType::String { literal } => {
                    combined.push_str(literal);
                    self.advance();
                }
                _ => break,
            }
        }
        Ok(Expr::Literal {
            value: LiteralValue::String(combined),
        })
    }

    fn match_token(&mut self, token_type: &TokenType) -> bool {
        if self.check(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, token_type: &TokenType) -> bool {
        !self.is_at_end() && token_type_matches(&self.peek().token_type, token_type)
    }

    fn check_next(&self, token_type: &TokenType) -> bool {
        if self.current + 1 >= self.tokens.len() {
            return false;
        }
        token_type_matches(&self.tokens[self.current + 1].token_type, token_type)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn consume(&mut self, token_type: &TokenType, message: &str) -> Result<Token, Error> {
        if self.check(token_type) {
            return Ok(self.advance().clone());
        }
        let token = self.peek().clone();
        parser_error(&token, message);
        Err(Error::Parse)
    }

    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().token_type == TokenType::Semicolon {
                return;
            }
            match self.peek().token_type {
                TokenType::Class
                | TokenType::Function
                | TokenType::Var
                | TokenType::Const
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }
}

fn base_operator_type(compound: &TokenType) -> TokenType {
    match compound {
        TokenType::PlusEqual => TokenType::Plus,
        TokenType::MinusEqual => TokenType::Minus,
        TokenType::StarEqual => TokenType::Star,
        TokenType::SlashEqual => TokenType::Slash,
        _ => unreachable!("only called with augmented-assignment operators"),
    }
}

/// Enum-variant matching that ignores payload (so `Number(0.0)` matches the
/// placeholder `Number(_)` used by `check`/`check_next` callers).
fn token_type_matches(actual: &TokenType, expected: &TokenType) -> bool {
    std::mem::discriminant(actual) == std::mem::discriminant(expected)
}
