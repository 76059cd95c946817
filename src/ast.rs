use std::fmt;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::diagnostic::Span;
use crate::interpreter::control_flow::ControlFlow;
use crate::interpreter::error::RuntimeError;
use crate::interpreter::evaluator::Interpreter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Assign,
    And,
    Or,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Eq,
    NotEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Bool(bool),
    /// Literal values are parsed once and shared, so re-evaluating a literal
    /// node never re-allocates.
    Integer(Rc<BigInt>),
    Decimal(Rc<BigDecimal>),
    Identifier(Rc<str>),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Fn(Rc<FnDef>),
}

/// One `name` or `name = expr` entry in a capture list, parameter list, or
/// `var` declaration. Capture entries always carry an initializer (the parser
/// desugars a bare capture `x` to `x = x`); parameters without one have no
/// default value.
#[derive(Debug, Clone, PartialEq)]
pub struct VarInit {
    pub name: Rc<str>,
    pub name_span: Span,
    pub init: Option<Expr>,
}

/// A lambda: `fn [captures] (params) { body }`. Closure values share this
/// definition by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct FnDef {
    pub captures: Vec<VarInit>,
    pub params: Vec<VarInit>,
    pub body: Stmt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Empty,
    Expr(Expr),
    VarDecl(VarDecl),
    Block(Vec<Stmt>),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    /// `break` or `break N`; the count is always at least 1.
    Break(u32),
    Return(Expr),
    /// A native body substituted for a block when a built-in function is
    /// installed; never produced by the parser.
    Intrinsic(NativeFn),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub vars: Vec<VarInit>,
    pub span: Span,
}

/// A whole source file: module-level `var` declarations, evaluated in order
/// at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub decls: Vec<VarDecl>,
    pub span: Span,
}

#[derive(Clone)]
pub struct NativeFn(pub Rc<dyn Fn(&mut Interpreter) -> Result<ControlFlow, RuntimeError>>);

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native>")
    }
}

impl PartialEq for NativeFn {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
