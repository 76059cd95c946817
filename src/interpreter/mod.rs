pub mod builtins;
pub mod control_flow;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod parser;

pub use control_flow::ControlFlow;
pub use environment::{Frame, Scope};
pub use error::RuntimeError;
pub use evaluator::Interpreter;
pub use parser::TokenParser;

use crate::ast::Module;
use crate::diagnostic::Diagnostic;

/// Lexes and parses a complete module, collecting recoverable diagnostics.
/// The module is always produced; callers decide whether the diagnostics
/// make it unrunnable.
pub fn parse_source(source: &str) -> (Module, Vec<Diagnostic>) {
    let tokens = crate::lexer::tokenize(source);
    let mut parser = TokenParser::new(tokens);
    let module = parser.parse_module();
    (module, parser.into_diagnostics())
}

/// Convenience entry point flattening both failure modes into a printable
/// message. The CLI and the tests use the step-by-step API instead.
pub fn parse_and_run(source: &str) -> Result<(), String> {
    let (module, diagnostics) = parse_source(source);
    if !diagnostics.is_empty() {
        return Err(crate::diagnostic::render_diagnostics(source, &diagnostics));
    }
    let mut interpreter = Interpreter::new();
    interpreter
        .exec_module(&module)
        .map_err(|error| error.to_string())
}
