//! Built-in functions, installed into the global scope at VM startup.
//!
//! Each one is created by parsing a synthetic lambda signature and swapping
//! the empty body for a native one, so calling a built-in goes through the
//! exact same machinery as calling user code: a frame, a scope, bound
//! parameters.

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::value::Value;

use super::control_flow::ControlFlow;
use super::error::RuntimeError;
use super::evaluator::Interpreter;

pub(crate) fn install(interpreter: &mut Interpreter) {
    let print_line = interpreter.make_intrinsic("fn (val)", |vm| {
        let value = vm.arg("val")?;
        vm.write_line(&value);
        Ok(ControlFlow::Next)
    });
    interpreter.define_global("print_line", print_line);

    let read_int = interpreter.make_intrinsic("fn ()", |vm| {
        let word = vm.read_word()?;
        let value: BigInt = word
            .parse()
            .map_err(|_| RuntimeError::input(format!("\"{}\" is not an integer", word)))?;
        Ok(ControlFlow::Return(vm.get_int(value)))
    });
    interpreter.define_global("read_int", read_int);

    let sqrt = interpreter.make_intrinsic("fn (x)", |vm| {
        let x = vm.arg("x")?;
        let radicand = match &x {
            Value::Decimal(value) => (**value).clone(),
            Value::Int(value) => BigDecimal::from((**value).clone()),
            _ => return Err(RuntimeError::type_error("sqrt accepts only numbers")),
        };
        let root = radicand.sqrt().ok_or_else(|| {
            RuntimeError::type_error("cannot take the square root of a negative number")
        })?;
        Ok(ControlFlow::Return(Value::Decimal(std::rc::Rc::new(root))))
    });
    interpreter.define_global("sqrt", sqrt);
}
