#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Cursor, Write};
use std::rc::Rc;

use alanfl::diagnostic::Diagnostic;
use alanfl::interpreter::{parse_source, Interpreter, RuntimeError};

/// Write endpoint that keeps a shared handle on everything written, so a
/// test can read the program's output after the interpreter is done.
pub struct SharedBuf(pub Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Parses and executes a program with the given stdin contents; returns the
/// captured stdout and the execution result.
pub fn run_with_input(source: &str, input: &str) -> (String, Result<(), RuntimeError>) {
    let (module, diagnostics) = parse_source(source);
    assert!(
        diagnostics.is_empty(),
        "unexpected parse errors: {:?}",
        diagnostics
    );
    let buffer = Rc::new(RefCell::new(Vec::new()));
    let mut interpreter = Interpreter::with_io(
        Box::new(Cursor::new(input.as_bytes().to_vec())),
        Box::new(SharedBuf(buffer.clone())),
    );
    let result = interpreter.exec_module(&module);
    let output = String::from_utf8(buffer.borrow().clone()).unwrap();
    (output, result)
}

/// Runs a program that is expected to succeed; returns its stdout.
pub fn run(source: &str) -> String {
    let (output, result) = run_with_input(source, "");
    result.expect("program should run");
    output
}

/// Runs a program that is expected to raise a runtime error.
pub fn run_err(source: &str) -> RuntimeError {
    let (_, result) = run_with_input(source, "");
    result.expect_err("program should fail")
}

/// Parses a program and returns only its diagnostics.
pub fn parse_diagnostics(source: &str) -> Vec<Diagnostic> {
    parse_source(source).1
}
