use std::fmt;

/// An error raised while the tree-walk is executing. Runtime errors abort
/// the current execution; they carry a message and nothing else.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    UndefinedVariable { name: String },
    TypeError { message: String },
    InvalidLValue,
    NotCallable,
    TooManyArguments,
    MissingArgument { name: String },
    DivisionByZero,
    BreakOutsideLoop,
    Input { message: String },
}

impl RuntimeError {
    pub fn undefined_variable(name: impl Into<String>) -> Self {
        Self::UndefinedVariable { name: name.into() }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::TypeError {
            message: message.into(),
        }
    }

    pub fn missing_argument(name: impl Into<String>) -> Self {
        Self::MissingArgument { name: name.into() }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::UndefinedVariable { name } => {
                write!(f, "variable \"{}\" not found", name)
            }
            RuntimeError::TypeError { message } => write!(f, "{}", message),
            RuntimeError::InvalidLValue => {
                write!(f, "expression cannot be used as lvalue")
            }
            RuntimeError::NotCallable => write!(f, "cannot call a non-function value"),
            RuntimeError::TooManyArguments => {
                write!(f, "too many arguments in function call")
            }
            RuntimeError::MissingArgument { name } => {
                write!(
                    f,
                    "unprovided call argument \"{}\" must have a default value",
                    name
                )
            }
            RuntimeError::DivisionByZero => write!(f, "division by zero"),
            RuntimeError::BreakOutsideLoop => write!(f, "break used outside of a loop"),
            RuntimeError::Input { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for RuntimeError {}
