use std::cmp::Ordering;
use std::io::{self, BufRead, BufReader, Write};
use std::rc::Rc;

use bigdecimal::BigDecimal;
use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::ast::{BinaryOp, Expr, ExprKind, FnDef, Module, NativeFn, Stmt, StmtKind, UnaryOp};
use crate::diagnostic::Span;
use crate::value::{FnValue, Value};

use super::builtins;
use super::control_flow::ControlFlow;
use super::environment::{Frame, Scope};
use super::error::RuntimeError;
use super::parser::TokenParser;

const MIN_CACHE_INT: i64 = -127;
const MAX_CACHE_INT: i64 = 127;

/// The tree-walking virtual machine.
///
/// Holds the process-wide global scope, a LIFO stack of call frames, the
/// small-value caches, and the input/output endpoints the intrinsics talk
/// to. A single instance owns all of this; it is not usable from multiple
/// threads.
pub struct Interpreter {
    global: Scope,
    call_stack: Vec<Frame>,
    int_cache: Vec<Value>,
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter wired to the process stdin/stdout.
    pub fn new() -> Self {
        Self::with_io(
            Box::new(BufReader::new(io::stdin())),
            Box::new(io::stdout()),
        )
    }

    /// An interpreter with injected endpoints, so programs that use
    /// `read_int`/`print_line` can run in-process.
    pub fn with_io(input: Box<dyn BufRead>, output: Box<dyn Write>) -> Self {
        let int_cache = (MIN_CACHE_INT..=MAX_CACHE_INT)
            .map(|small| Value::Int(Rc::new(BigInt::from(small))))
            .collect();
        let mut interpreter = Self {
            global: Scope::new(),
            call_stack: Vec::new(),
            int_cache,
            input,
            output,
        };
        // the base frame hosts module-level initializer evaluation
        interpreter.push_frame();
        builtins::install(&mut interpreter);
        interpreter
    }

    /// Integer values in `[-127, 127]` come from a prebuilt cache; identity
    /// is never observable, this only avoids allocation.
    pub fn get_int(&self, value: BigInt) -> Value {
        if let Some(small) = value.to_i64() {
            if (MIN_CACHE_INT..=MAX_CACHE_INT).contains(&small) {
                return self.int_cache[(small - MIN_CACHE_INT) as usize].clone();
            }
        }
        Value::Int(Rc::new(value))
    }

    fn push_frame(&mut self) {
        self.call_stack.push(Frame::new());
    }

    fn pop_frame(&mut self) {
        self.call_stack.pop();
    }

    fn current_frame(&self) -> &Frame {
        self.call_stack.last().expect("call stack is never empty")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.call_stack
            .last_mut()
            .expect("call stack is never empty")
    }

    /// Name lookup: current frame from the innermost scope outwards, then
    /// the global scope.
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.current_frame()
            .get(name)
            .or_else(|| self.global.get(name))
    }

    pub(crate) fn define_global(&mut self, name: &str, value: Value) {
        self.global.insert(Rc::from(name), value);
    }

    /// Executes a parsed module: evaluates the module-level declarations in
    /// source order into the global scope, then calls `entry` with no
    /// arguments.
    pub fn exec_module(&mut self, module: &Module) -> Result<(), RuntimeError> {
        for decl in &module.decls {
            for var in &decl.vars {
                let value = match &var.init {
                    Some(init) => self.evaluate(init)?,
                    None => Value::Nothing,
                };
                self.global.insert(var.name.clone(), value);
            }
        }

        let entry = self
            .global
            .get("entry")
            .cloned()
            .ok_or_else(|| RuntimeError::undefined_variable("entry"))?;
        let Value::Function(function) = entry else {
            return Err(RuntimeError::type_error("entry must be bound to a function"));
        };
        self.call_value(&function, Vec::new())?;
        Ok(())
    }

    // Statement execution. The return value threads non-local transfers
    // (`break`, `return`) up to their receivers; runtime errors travel in
    // the Err channel. Every scope push below is matched by a pop on every
    // exit path.

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<ControlFlow, RuntimeError> {
        match &stmt.kind {
            StmtKind::Empty => Ok(ControlFlow::Next),

            StmtKind::Expr(expr) => {
                self.evaluate(expr)?;
                Ok(ControlFlow::Next)
            }

            StmtKind::VarDecl(decl) => {
                for var in &decl.vars {
                    let value = match &var.init {
                        Some(init) => self.evaluate(init)?,
                        None => Value::Nothing,
                    };
                    self.current_frame_mut().define(var.name.clone(), value);
                }
                Ok(ControlFlow::Next)
            }

            StmtKind::Block(stmts) => {
                self.current_frame_mut().push_scope();
                let result = self.exec_block(stmts);
                self.current_frame_mut().pop_scope();
                result
            }

            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.evaluate(cond)?;
                let Some(cond) = cond.as_bool() else {
                    return Err(RuntimeError::type_error(
                        "condition of an if statement must be a boolean",
                    ));
                };
                if cond {
                    self.exec_stmt(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_stmt(else_branch)
                } else {
                    Ok(ControlFlow::Next)
                }
            }

            StmtKind::While { cond, body } => {
                loop {
                    let value = self.evaluate(cond)?;
                    let Some(keep_going) = value.as_bool() else {
                        return Err(RuntimeError::type_error(
                            "condition of a while statement must be a boolean",
                        ));
                    };
                    if !keep_going {
                        break;
                    }
                    match self.exec_stmt(body)? {
                        ControlFlow::Next => {}
                        ControlFlow::Return(value) => return Ok(ControlFlow::Return(value)),
                        ControlFlow::Break(count) => {
                            if count > 1 {
                                // this loop is done; the rest of the count
                                // unwinds to the enclosing loops
                                return Ok(ControlFlow::Break(count - 1));
                            }
                            break;
                        }
                    }
                }
                Ok(ControlFlow::Next)
            }

            StmtKind::Break(count) => Ok(ControlFlow::Break(*count)),

            StmtKind::Return(expr) => {
                let value = self.evaluate(expr)?;
                Ok(ControlFlow::Return(value))
            }

            StmtKind::Intrinsic(native) => (native.0)(self),
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<ControlFlow, RuntimeError> {
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                ControlFlow::Next => {}
                flow => return Ok(flow),
            }
        }
        Ok(ControlFlow::Next)
    }

    // R-value evaluation: an expression produces a value.

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match &expr.kind {
            ExprKind::Bool(value) => Ok(Value::Bool(*value)),
            ExprKind::Integer(value) => Ok(Value::Int(value.clone())),
            ExprKind::Decimal(value) => Ok(Value::Decimal(value.clone())),

            ExprKind::Identifier(name) => self
                .lookup(name)
                .cloned()
                .ok_or_else(|| RuntimeError::undefined_variable(name.as_ref())),

            ExprKind::Fn(def) => self.eval_fn(def),

            ExprKind::Unary { op, expr } => {
                let value = self.evaluate(expr)?;
                self.eval_unary_op(*op, &value)
            }

            ExprKind::Binary {
                left,
                op: BinaryOp::Assign,
                right,
            } => {
                // rhs first, then resolve the target cell
                let value = self.evaluate(right)?;
                let cell = self.lvalue(left)?;
                *cell = value.clone();
                Ok(value)
            }

            ExprKind::Binary { left, op, right } => {
                // strictly left-to-right; && and || evaluate both sides
                let lhs = self.evaluate(left)?;
                let rhs = self.evaluate(right)?;
                self.eval_binary_op(*op, &lhs, &rhs)
            }

            ExprKind::Call { callee, args } => {
                let callee = self.evaluate(callee)?;
                let Value::Function(function) = callee else {
                    return Err(RuntimeError::NotCallable);
                };
                if args.len() > function.def.params.len() {
                    return Err(RuntimeError::TooManyArguments);
                }
                // arguments are evaluated in the caller's environment
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.evaluate(arg)?);
                }
                self.call_value(&function, arg_values)
            }
        }
    }

    // L-value evaluation: only identifiers designate an assignable cell.
    // The name must already be bound in the current frame or in the global
    // scope; assignment never creates a binding.

    fn lvalue(&mut self, expr: &Expr) -> Result<&mut Value, RuntimeError> {
        let ExprKind::Identifier(name) = &expr.kind else {
            return Err(RuntimeError::InvalidLValue);
        };
        let frame = self
            .call_stack
            .last_mut()
            .expect("call stack is never empty");
        match frame.get_mut(name) {
            Some(cell) => Ok(cell),
            None => self
                .global
                .get_mut(name.as_ref())
                .ok_or_else(|| RuntimeError::undefined_variable(name.as_ref())),
        }
    }

    /// Builds a closure value: evaluates the capture initializers in a
    /// scratch scope of the defining frame (earlier captures are visible to
    /// later ones), then snapshots the results by value.
    fn eval_fn(&mut self, def: &Rc<FnDef>) -> Result<Value, RuntimeError> {
        self.current_frame_mut().push_scope();
        let result = self.eval_captures(def);
        let scope = self.current_frame_mut().pop_scope();
        result?;

        let mut captured = IndexMap::with_capacity(def.captures.len());
        for capture in &def.captures {
            if let Some(value) = scope.get(capture.name.as_ref()) {
                captured.insert(capture.name.clone(), value.clone());
            }
        }
        Ok(Value::Function(Rc::new(FnValue {
            def: def.clone(),
            captured,
        })))
    }

    fn eval_captures(&mut self, def: &FnDef) -> Result<(), RuntimeError> {
        for capture in &def.captures {
            let value = match &capture.init {
                Some(init) => self.evaluate(init)?,
                // the parser desugars bare captures, but a hand-built AST
                // may still carry none: capture the same-named variable
                None => self
                    .lookup(capture.name.as_ref())
                    .cloned()
                    .ok_or_else(|| RuntimeError::undefined_variable(capture.name.as_ref()))?,
            };
            self.current_frame_mut().define(capture.name.clone(), value);
        }
        Ok(())
    }

    /// Calls a function value with already-evaluated arguments: one fresh
    /// frame, one scope holding captures and parameters, defaults evaluated
    /// in the callee environment. Normal fall-through yields `Nothing`.
    pub(crate) fn call_value(
        &mut self,
        function: &Rc<FnValue>,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        if args.len() > function.def.params.len() {
            return Err(RuntimeError::TooManyArguments);
        }
        self.push_frame();
        self.current_frame_mut().push_scope();
        let result = self.enter_function(function, args);
        self.current_frame_mut().pop_scope();
        self.pop_frame();
        match result? {
            ControlFlow::Return(value) => Ok(value),
            ControlFlow::Next => Ok(Value::Nothing),
            ControlFlow::Break(_) => Err(RuntimeError::BreakOutsideLoop),
        }
    }

    fn enter_function(
        &mut self,
        function: &FnValue,
        args: Vec<Value>,
    ) -> Result<ControlFlow, RuntimeError> {
        for (name, value) in &function.captured {
            self.current_frame_mut().set(name.clone(), value.clone());
        }
        let mut args = args.into_iter();
        for param in &function.def.params {
            if let Some(arg) = args.next() {
                self.current_frame_mut().define(param.name.clone(), arg);
            } else {
                let init = param
                    .init
                    .as_ref()
                    .ok_or_else(|| RuntimeError::missing_argument(param.name.as_ref()))?;
                let value = self.evaluate(init)?;
                self.current_frame_mut().define(param.name.clone(), value);
            }
        }
        self.exec_stmt(&function.def.body)
    }

    // Operators.

    fn eval_unary_op(&self, op: UnaryOp, value: &Value) -> Result<Value, RuntimeError> {
        match op {
            UnaryOp::Neg => match value {
                Value::Int(value) => Ok(self.get_int(-(&**value))),
                Value::Decimal(value) => Ok(Value::Decimal(Rc::new(-(&**value)))),
                _ => Err(RuntimeError::type_error(
                    "cannot perform numeric negation on a non-numeric value",
                )),
            },
            UnaryOp::Not => match value {
                Value::Bool(value) => Ok(Value::Bool(!value)),
                _ => Err(RuntimeError::type_error(
                    "cannot perform logical negation on a non-boolean value",
                )),
            },
        }
    }

    fn eval_binary_op(
        &self,
        op: BinaryOp,
        lhs: &Value,
        rhs: &Value,
    ) -> Result<Value, RuntimeError> {
        match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                self.arithmetic(op, lhs, rhs)
            }
            BinaryOp::Less
            | BinaryOp::LessEq
            | BinaryOp::Greater
            | BinaryOp::GreaterEq
            | BinaryOp::Eq
            | BinaryOp::NotEq => self.comparison(op, lhs, rhs),
            BinaryOp::And | BinaryOp::Or => match (lhs, rhs) {
                (Value::Bool(left), Value::Bool(right)) => Ok(Value::Bool(if op == BinaryOp::And {
                    *left && *right
                } else {
                    *left || *right
                })),
                _ => Err(RuntimeError::type_error(
                    "cannot perform a logical operation on non-boolean operands",
                )),
            },
            BinaryOp::Assign => unreachable!("assignment is handled through lvalue dispatch"),
        }
    }

    /// Arithmetic with the numeric coercion rule: Int∘Int stays Int, any
    /// Decimal operand makes the result Decimal.
    fn arithmetic(&self, op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
        if let (Value::Int(left), Value::Int(right)) = (lhs, rhs) {
            if op == BinaryOp::Div && right.is_zero() {
                return Err(RuntimeError::DivisionByZero);
            }
            let result = match op {
                BinaryOp::Add => &**left + &**right,
                BinaryOp::Sub => &**left - &**right,
                BinaryOp::Mul => &**left * &**right,
                BinaryOp::Div => &**left / &**right,
                _ => unreachable!("non-arithmetic operator"),
            };
            return Ok(self.get_int(result));
        }

        let (left, right) = decimal_operands(lhs, rhs).ok_or_else(|| {
            RuntimeError::type_error("cannot perform an arithmetic operation on non-numeric operands")
        })?;
        if op == BinaryOp::Div && right.is_zero() {
            return Err(RuntimeError::DivisionByZero);
        }
        let result = match op {
            BinaryOp::Add => left + right,
            BinaryOp::Sub => left - right,
            BinaryOp::Mul => left * right,
            BinaryOp::Div => left / right,
            _ => unreachable!("non-arithmetic operator"),
        };
        Ok(Value::Decimal(Rc::new(result)))
    }

    fn comparison(&self, op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
        let ordering = if let (Value::Int(left), Value::Int(right)) = (lhs, rhs) {
            left.cmp(right)
        } else {
            let (left, right) = decimal_operands(lhs, rhs).ok_or_else(|| {
                RuntimeError::type_error(
                    "cannot perform an arithmetic comparison on non-numeric operands",
                )
            })?;
            left.cmp(&right)
        };
        let result = match op {
            BinaryOp::Less => ordering == Ordering::Less,
            BinaryOp::LessEq => ordering != Ordering::Greater,
            BinaryOp::Greater => ordering == Ordering::Greater,
            BinaryOp::GreaterEq => ordering != Ordering::Less,
            BinaryOp::Eq => ordering == Ordering::Equal,
            BinaryOp::NotEq => ordering != Ordering::Equal,
            _ => unreachable!("non-comparison operator"),
        };
        Ok(Value::Bool(result))
    }

    // Endpoints used by the intrinsics.

    /// Reads a bound argument from the callee scope of the running call.
    pub(crate) fn arg(&self, name: &str) -> Result<Value, RuntimeError> {
        self.lookup(name)
            .cloned()
            .ok_or_else(|| RuntimeError::undefined_variable(name))
    }

    pub(crate) fn write_line(&mut self, value: &Value) {
        let _ = writeln!(self.output, "{}", value);
        let _ = self.output.flush();
    }

    /// Reads one whitespace-delimited word from the input endpoint.
    pub(crate) fn read_word(&mut self) -> Result<String, RuntimeError> {
        let mut word = String::new();
        loop {
            let available = self
                .input
                .fill_buf()
                .map_err(|error| RuntimeError::input(format!("failed to read input: {}", error)))?;
            if available.is_empty() {
                break;
            }
            let mut consumed = 0;
            let mut done = false;
            for &byte in available {
                let ch = byte as char;
                if ch.is_ascii_whitespace() {
                    consumed += 1;
                    if !word.is_empty() {
                        done = true;
                        break;
                    }
                } else {
                    word.push(ch);
                    consumed += 1;
                }
            }
            self.input.consume(consumed);
            if done {
                break;
            }
        }
        if word.is_empty() {
            return Err(RuntimeError::input(
                "unexpected end of input while reading an integer",
            ));
        }
        Ok(word)
    }

    /// Parses and closes an intrinsic: the synthetic signature goes through
    /// the ordinary lambda production, then the native body replaces the
    /// empty block, so intrinsic calls use the normal call machinery.
    pub(crate) fn make_intrinsic(
        &mut self,
        signature: &str,
        body: impl Fn(&mut Interpreter) -> Result<ControlFlow, RuntimeError> + 'static,
    ) -> Value {
        let source = format!("{} {{}}", signature);
        let tokens = crate::lexer::tokenize(&source);
        let mut parser = TokenParser::new(tokens);
        let mut def = parser.fn_def().expect("intrinsic signatures always parse");
        def.body = Stmt {
            kind: StmtKind::Intrinsic(NativeFn(Rc::new(body))),
            span: Span::dummy(),
        };
        self.eval_fn(&Rc::new(def))
            .expect("intrinsics capture nothing, closing them cannot fail")
    }
}

/// Coerces a mixed numeric pair to decimals; `None` when either side is not
/// numeric.
fn decimal_operands(lhs: &Value, rhs: &Value) -> Option<(BigDecimal, BigDecimal)> {
    let coerce = |value: &Value| match value {
        Value::Int(value) => Some(BigDecimal::from((**value).clone())),
        Value::Decimal(value) => Some((**value).clone()),
        _ => None,
    };
    Some((coerce(lhs)?, coerce(rhs)?))
}
