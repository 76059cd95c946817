use std::rc::Rc;

use num_traits::ToPrimitive;

use crate::ast::{
    BinaryOp, Expr, ExprKind, FnDef, Module, Stmt, StmtKind, UnaryOp, VarDecl, VarInit,
};
use crate::diagnostic::{Diagnostic, Span};
use crate::token::Token;

type ParseResult<T> = Result<T, Diagnostic>;

/// Recursive-descent parser with one-token lookahead over the lexer's token
/// stream.
///
/// Expression productions are fallible and propagate errors with `?`; the
/// statement-level productions catch them, record a diagnostic, skip tokens
/// until a synchronization point, and substitute an `Empty` statement so
/// parsing always continues to the end of the input.
pub struct TokenParser {
    tokens: Vec<(Token, Span)>,
    current: usize,
    /// End position of the most recently consumed token; node spans close
    /// here.
    prev_end: usize,
    errors: Vec<Diagnostic>,
}

impl TokenParser {
    pub fn new(tokens: Vec<(Token, Span)>) -> Self {
        Self {
            tokens,
            current: 0,
            prev_end: 0,
            errors: Vec::new(),
        }
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.errors
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current).map(|(token, _)| token)
    }

    fn at(&self, expected: &Token) -> bool {
        self.peek() == Some(expected)
    }

    fn at_eof(&self) -> bool {
        self.current >= self.tokens.len()
    }

    fn advance(&mut self) -> Option<Token> {
        let (token, span) = self.tokens.get(self.current).cloned()?;
        self.current += 1;
        self.prev_end = span.end;
        Some(token)
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.current)
            .map(|(_, span)| *span)
            .unwrap_or_else(|| Span::new(self.prev_end, self.prev_end))
    }

    fn current_start(&self) -> usize {
        self.current_span().start
    }

    fn span_from(&self, begin: usize) -> Span {
        Span::new(begin, self.prev_end.max(begin))
    }

    fn error(&self, message: impl Into<String>) -> Diagnostic {
        Diagnostic::error(self.current_span(), message)
    }

    fn error_unexpected(&self, message: &str) -> Diagnostic {
        match self.peek() {
            Some(token) => self.error(format!("unexpected token: {}, {}", token, message)),
            None => self.error(format!("unexpected end of input, {}", message)),
        }
    }

    // Panic-mode recovery. Skips to a token the enclosing construct can
    // resume from; the statement set is shared by every statement form.

    fn skip_until(&mut self, in_set: fn(&Token) -> bool) {
        while let Some(token) = self.peek() {
            if in_set(token) {
                break;
            }
            self.advance();
        }
    }

    fn statement_recovery(token: &Token) -> bool {
        matches!(
            token,
            Token::Return
                | Token::Break
                | Token::If
                | Token::Else
                | Token::Var
                | Token::Semicolon
                | Token::RBrace
        )
    }

    fn module_recovery(token: &Token) -> bool {
        matches!(token, Token::Semicolon | Token::Var)
    }

    fn recover_statement(&mut self, error: Diagnostic) {
        self.errors.push(error);
        self.skip_until(Self::statement_recovery);
    }

    // Expressions, lowest precedence first:
    //   ||  &&  ==/!=  </<=/>/>=  =  +/-  */  unary  call  primary
    // All binary operators are left-associative except `=`, which is
    // right-associative and deliberately sits below the comparisons.

    pub fn expr(&mut self) -> ParseResult<Expr> {
        self.expr_or()
    }

    fn expr_or(&mut self) -> ParseResult<Expr> {
        let begin = self.current_start();
        let mut ret = self.expr_and()?;
        while self.at(&Token::Or) {
            self.advance();
            let right = self.expr_and()?;
            ret = Expr {
                kind: ExprKind::Binary {
                    left: Box::new(ret),
                    op: BinaryOp::Or,
                    right: Box::new(right),
                },
                span: self.span_from(begin),
            };
        }
        Ok(ret)
    }

    fn expr_and(&mut self) -> ParseResult<Expr> {
        let begin = self.current_start();
        let mut ret = self.expr_eq()?;
        while self.at(&Token::And) {
            self.advance();
            let right = self.expr_eq()?;
            ret = Expr {
                kind: ExprKind::Binary {
                    left: Box::new(ret),
                    op: BinaryOp::And,
                    right: Box::new(right),
                },
                span: self.span_from(begin),
            };
        }
        Ok(ret)
    }

    fn expr_eq(&mut self) -> ParseResult<Expr> {
        let begin = self.current_start();
        let mut ret = self.expr_cmp()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.expr_cmp()?;
            ret = Expr {
                kind: ExprKind::Binary {
                    left: Box::new(ret),
                    op,
                    right: Box::new(right),
                },
                span: self.span_from(begin),
            };
        }
        Ok(ret)
    }

    fn expr_cmp(&mut self) -> ParseResult<Expr> {
        let begin = self.current_start();
        let mut ret = self.expr_assign()?;
        loop {
            let op = match self.peek() {
                Some(Token::Less) => BinaryOp::Less,
                Some(Token::LessEq) => BinaryOp::LessEq,
                Some(Token::Greater) => BinaryOp::Greater,
                Some(Token::GreaterEq) => BinaryOp::GreaterEq,
                _ => break,
            };
            self.advance();
            let right = self.expr_assign()?;
            ret = Expr {
                kind: ExprKind::Binary {
                    left: Box::new(ret),
                    op,
                    right: Box::new(right),
                },
                span: self.span_from(begin),
            };
        }
        Ok(ret)
    }

    fn expr_assign(&mut self) -> ParseResult<Expr> {
        let begin = self.current_start();
        let ret = self.expr_add_sub()?;
        if self.at(&Token::Assign) {
            self.advance();
            let value = self.expr_assign()?;
            return Ok(Expr {
                kind: ExprKind::Binary {
                    left: Box::new(ret),
                    op: BinaryOp::Assign,
                    right: Box::new(value),
                },
                span: self.span_from(begin),
            });
        }
        Ok(ret)
    }

    fn expr_add_sub(&mut self) -> ParseResult<Expr> {
        let begin = self.current_start();
        let mut ret = self.expr_mul_div()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.expr_mul_div()?;
            ret = Expr {
                kind: ExprKind::Binary {
                    left: Box::new(ret),
                    op,
                    right: Box::new(right),
                },
                span: self.span_from(begin),
            };
        }
        Ok(ret)
    }

    fn expr_mul_div(&mut self) -> ParseResult<Expr> {
        let begin = self.current_start();
        let mut ret = self.expr_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.expr_unary()?;
            ret = Expr {
                kind: ExprKind::Binary {
                    left: Box::new(ret),
                    op,
                    right: Box::new(right),
                },
                span: self.span_from(begin),
            };
        }
        Ok(ret)
    }

    fn expr_unary(&mut self) -> ParseResult<Expr> {
        let begin = self.current_start();
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Bang) => UnaryOp::Not,
            _ => return self.expr_call(),
        };
        self.advance();
        let operand = self.expr_unary()?;
        Ok(Expr {
            kind: ExprKind::Unary {
                op,
                expr: Box::new(operand),
            },
            span: self.span_from(begin),
        })
    }

    fn expr_call(&mut self) -> ParseResult<Expr> {
        let begin = self.current_start();
        let mut ret = self.primary()?;
        // call chains left: f()(x) is (f())(x)
        while self.at(&Token::LParen) {
            self.advance();
            let mut args = Vec::new();
            if !self.at(&Token::RParen) {
                args.push(self.expr()?);
                while self.at(&Token::Comma) {
                    self.advance();
                    args.push(self.expr()?);
                }
            }
            if !self.at(&Token::RParen) {
                return Err(self.error_unexpected("expecting ')' after call arguments"));
            }
            self.advance();
            ret = Expr {
                kind: ExprKind::Call {
                    callee: Box::new(ret),
                    args,
                },
                span: self.span_from(begin),
            };
        }
        Ok(ret)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let begin = self.current_start();
        match self.peek() {
            Some(Token::LParen) => {
                self.advance();
                let mut inner = self.expr()?;
                if !self.at(&Token::RParen) {
                    return Err(
                        self.error_unexpected("expecting ')' to close a parenthesized expression")
                    );
                }
                self.advance();
                // parentheses add no node, they only widen the span
                inner.span = self.span_from(begin);
                Ok(inner)
            }
            Some(Token::Integer(value)) => {
                let value = value.clone();
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Integer(Rc::new(value)),
                    span: self.span_from(begin),
                })
            }
            Some(Token::Decimal(value)) => {
                let value = value.clone();
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Decimal(Rc::new(value)),
                    span: self.span_from(begin),
                })
            }
            Some(Token::Ident(name)) => {
                let name: Rc<str> = Rc::from(name.as_str());
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Identifier(name),
                    span: self.span_from(begin),
                })
            }
            Some(Token::Fn) => self.fn_expr(),
            Some(Token::True) => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Bool(true),
                    span: self.span_from(begin),
                })
            }
            Some(Token::False) => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Bool(false),
                    span: self.span_from(begin),
                })
            }
            _ => Err(self.error_unexpected(
                "expecting integer, decimal, identifier, true, false, 'fn' or '(' in an expression",
            )),
        }
    }

    /// Parses a whole lambda: `fn [captures]? (params)? block`. Both lists
    /// are optional; a present list must be properly closed. Public so the
    /// VM can parse synthetic intrinsic signatures through the same
    /// production user code goes through.
    pub fn fn_def(&mut self) -> ParseResult<FnDef> {
        if !self.at(&Token::Fn) {
            return Err(self.error_unexpected("a lambda must start with 'fn'"));
        }
        self.advance();

        let mut captures = Vec::new();
        if self.at(&Token::LBracket) {
            self.advance();
            if !self.at(&Token::RBracket) {
                captures.push(self.var_init()?);
                while self.at(&Token::Comma) {
                    self.advance();
                    captures.push(self.var_init()?);
                }
            }
            if !self.at(&Token::RBracket) {
                return Err(self.error_unexpected("lambda captures must be enclosed by []"));
            }
            self.advance();
        }

        // a bare capture `x` means "capture the variable of the same name
        // from the defining scope"
        for capture in &mut captures {
            if capture.init.is_none() {
                capture.init = Some(Expr {
                    kind: ExprKind::Identifier(capture.name.clone()),
                    span: capture.name_span,
                });
            }
        }

        let mut params = Vec::new();
        if self.at(&Token::LParen) {
            self.advance();
            if !self.at(&Token::RParen) {
                params.push(self.var_init()?);
                while self.at(&Token::Comma) {
                    self.advance();
                    params.push(self.var_init()?);
                }
            }
            if !self.at(&Token::RParen) {
                return Err(
                    self.error_unexpected("parameter definitions must be enclosed by ()")
                );
            }
            self.advance();
        }

        let body = self.block();
        Ok(FnDef {
            captures,
            params,
            body,
        })
    }

    fn fn_expr(&mut self) -> ParseResult<Expr> {
        let begin = self.current_start();
        let def = self.fn_def()?;
        Ok(Expr {
            kind: ExprKind::Fn(Rc::new(def)),
            span: self.span_from(begin),
        })
    }

    fn var_init(&mut self) -> ParseResult<VarInit> {
        let name_span = self.current_span();
        let name: Rc<str> = match self.peek() {
            Some(Token::Ident(name)) => Rc::from(name.as_str()),
            _ => return Err(self.error_unexpected("expecting an identifier")),
        };
        self.advance();
        let init = if self.at(&Token::Assign) {
            self.advance();
            Some(self.expr()?)
        } else {
            None
        };
        Ok(VarInit {
            name,
            name_span,
            init,
        })
    }

    fn var_decl(&mut self) -> ParseResult<VarDecl> {
        let begin = self.current_start();
        if !self.at(&Token::Var) {
            return Err(self.error_unexpected("expecting 'var' to begin a variable declaration"));
        }
        self.advance();
        let mut vars = vec![self.var_init()?];
        while self.at(&Token::Comma) {
            self.advance();
            vars.push(self.var_init()?);
        }
        if !self.at(&Token::Semicolon) {
            return Err(self.error_unexpected("expecting ';' at the end of a variable declaration"));
        }
        self.advance();
        Ok(VarDecl {
            vars,
            span: self.span_from(begin),
        })
    }

    // Statements. These never fail: each form catches the errors of the
    // productions underneath it and substitutes an empty construct.

    pub fn stmt(&mut self) -> Stmt {
        let begin = self.current_start();
        match self.peek() {
            Some(Token::Semicolon) => {
                self.advance();
                Stmt {
                    kind: StmtKind::Empty,
                    span: self.span_from(begin),
                }
            }
            Some(Token::LBrace) => self.block(),
            Some(Token::Var) => match self.var_decl() {
                Ok(decl) => Stmt {
                    kind: StmtKind::VarDecl(decl),
                    span: self.span_from(begin),
                },
                Err(error) => {
                    self.recover_statement(error);
                    let span = self.span_from(begin);
                    Stmt {
                        kind: StmtKind::VarDecl(VarDecl {
                            vars: Vec::new(),
                            span,
                        }),
                        span,
                    }
                }
            },
            Some(Token::If) => self.if_stmt(),
            Some(Token::While) => self.while_stmt(),
            Some(Token::Break) => self.break_stmt(),
            Some(Token::Return) => self.return_stmt(),
            _ => self.expr_stmt(),
        }
    }

    fn expr_stmt(&mut self) -> Stmt {
        let begin = self.current_start();
        match self.expr() {
            Ok(expr) => {
                if self.at(&Token::Semicolon) {
                    self.advance();
                } else {
                    let error =
                        self.error_unexpected("expecting ';' after an expression statement");
                    self.recover_statement(error);
                }
                Stmt {
                    kind: StmtKind::Expr(expr),
                    span: self.span_from(begin),
                }
            }
            Err(error) => {
                self.recover_statement(error);
                Stmt {
                    kind: StmtKind::Empty,
                    span: self.span_from(begin),
                }
            }
        }
    }

    fn if_stmt(&mut self) -> Stmt {
        let begin = self.current_start();
        self.advance(); // 'if'
        let cond = match self.expr() {
            Ok(cond) => cond,
            Err(error) => {
                self.recover_statement(error);
                return Stmt {
                    kind: StmtKind::Empty,
                    span: self.span_from(begin),
                };
            }
        };
        let then_branch = Box::new(self.stmt());
        let else_branch = if self.at(&Token::Else) {
            self.advance();
            Some(Box::new(self.stmt()))
        } else {
            None
        };
        Stmt {
            kind: StmtKind::If {
                cond,
                then_branch,
                else_branch,
            },
            span: self.span_from(begin),
        }
    }

    fn while_stmt(&mut self) -> Stmt {
        let begin = self.current_start();
        self.advance(); // 'while'
        let cond = match self.expr() {
            Ok(cond) => cond,
            Err(error) => {
                self.recover_statement(error);
                return Stmt {
                    kind: StmtKind::Empty,
                    span: self.span_from(begin),
                };
            }
        };
        let body = Box::new(self.stmt());
        Stmt {
            kind: StmtKind::While { cond, body },
            span: self.span_from(begin),
        }
    }

    fn break_stmt(&mut self) -> Stmt {
        let begin = self.current_start();
        self.advance(); // 'break'
        let count = match self.peek() {
            Some(Token::Integer(value)) => {
                let parsed = value.to_u32();
                let literal_span = self.current_span();
                self.advance();
                match parsed {
                    // an explicit `break 0` still leaves one loop
                    Some(count) => count.max(1),
                    None => {
                        self.errors.push(Diagnostic::error(
                            literal_span,
                            "break count does not fit in a loop counter",
                        ));
                        1
                    }
                }
            }
            _ => 1,
        };
        if self.at(&Token::Semicolon) {
            self.advance();
        } else {
            let error = self.error_unexpected("expecting ';' after a break statement");
            self.recover_statement(error);
        }
        Stmt {
            kind: StmtKind::Break(count),
            span: self.span_from(begin),
        }
    }

    fn return_stmt(&mut self) -> Stmt {
        let begin = self.current_start();
        self.advance(); // 'return'
        match self.expr() {
            Ok(value) => {
                if self.at(&Token::Semicolon) {
                    self.advance();
                } else {
                    let error = self.error_unexpected("expecting ';' after a return statement");
                    self.recover_statement(error);
                }
                Stmt {
                    kind: StmtKind::Return(value),
                    span: self.span_from(begin),
                }
            }
            Err(error) => {
                self.recover_statement(error);
                Stmt {
                    kind: StmtKind::Empty,
                    span: self.span_from(begin),
                }
            }
        }
    }

    pub fn block(&mut self) -> Stmt {
        let begin = self.current_start();
        if !self.at(&Token::LBrace) {
            let error = self.error_unexpected("expecting '{' at the beginning of a code block");
            self.errors.push(error);
            self.skip_until(|token| matches!(token, Token::RBrace));
            self.advance();
            return Stmt {
                kind: StmtKind::Empty,
                span: self.span_from(begin),
            };
        }
        self.advance();
        let mut stmts = Vec::new();
        while !self.at(&Token::RBrace) && !self.at_eof() {
            let before = self.current;
            stmts.push(self.stmt());
            if self.current == before {
                // recovery stopped on a token no statement can start with
                self.advance();
            }
        }
        if self.at(&Token::RBrace) {
            self.advance();
        } else {
            let error = self.error_unexpected("expecting '}' at the end of a code block");
            self.errors.push(error);
        }
        Stmt {
            kind: StmtKind::Block(stmts),
            span: self.span_from(begin),
        }
    }

    /// Parses a whole module: `var` declarations separated by optional stray
    /// semicolons, until end of input.
    pub fn parse_module(&mut self) -> Module {
        let begin = self.current_start();
        let mut decls = Vec::new();
        while !self.at_eof() {
            while self.at(&Token::Semicolon) {
                self.advance();
            }
            if self.at_eof() {
                break;
            }
            let decl_begin = self.current_start();
            let before = self.current;
            match self.var_decl() {
                Ok(decl) => decls.push(decl),
                Err(error) => {
                    self.errors.push(error);
                    self.skip_until(Self::module_recovery);
                    if self.current == before {
                        self.advance();
                    }
                    decls.push(VarDecl {
                        vars: Vec::new(),
                        span: self.span_from(decl_begin),
                    });
                }
            }
        }
        Module {
            decls,
            span: self.span_from(begin),
        }
    }
}
