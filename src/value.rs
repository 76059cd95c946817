use std::fmt;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use indexmap::IndexMap;
use num_bigint::BigInt;

use crate::ast::FnDef;

/// A runtime value. Values are immutable and reference-shared; mutation
/// always happens by replacing the value stored in an environment cell.
#[derive(Debug, Clone)]
pub enum Value {
    Nothing,
    Int(Rc<BigInt>),
    Decimal(Rc<BigDecimal>),
    Bool(bool),
    Function(Rc<FnValue>),
}

/// A closure: the lambda definition it was built from plus a by-value
/// snapshot of its captures, taken when the `fn` expression was evaluated.
/// The snapshot keeps declaration order so installing captures into a call
/// frame is deterministic.
#[derive(Debug, Clone)]
pub struct FnValue {
    pub def: Rc<FnDef>,
    pub captured: IndexMap<Rc<str>, Value>,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nothing, Value::Nothing) => true,
            (Value::Int(left), Value::Int(right)) => left == right,
            (Value::Decimal(left), Value::Decimal(right)) => left == right,
            (Value::Bool(left), Value::Bool(right)) => left == right,
            (Value::Function(left), Value::Function(right)) => Rc::ptr_eq(left, right),
            _ => false,
        }
    }
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Bool(value) = self {
            Some(*value)
        } else {
            None
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nothing => write!(f, "nothing"),
            Value::Int(value) => write!(f, "{}", value),
            Value::Decimal(value) => write!(f, "{}", value),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Function(_) => write!(f, "<function>"),
        }
    }
}
