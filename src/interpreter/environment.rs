use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

/// One level of lexical nesting: an unordered name → value-cell map.
pub type Scope = HashMap<Rc<str>, Value>;

/// A per-call stack of scopes, innermost last. A frame is created on
/// function entry and destroyed on exit; blocks push and pop scopes inside
/// it.
#[derive(Debug, Default)]
pub struct Frame {
    scopes: Vec<Scope>,
}

impl Frame {
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    pub fn pop_scope(&mut self) -> Scope {
        self.scopes.pop().unwrap_or_default()
    }

    /// Looks `name` up from the innermost scope outwards.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Mutable access to the cell holding `name`, innermost scope first.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
    }

    /// Updates the nearest enclosing scope that defines `name`; when no scope
    /// does, defines it in the innermost one. This preserves lexical
    /// shadowing across nested blocks.
    pub fn set(&mut self, name: Rc<str>, value: Value) {
        match self
            .scopes
            .iter()
            .rposition(|scope| scope.contains_key(name.as_ref()))
        {
            Some(index) => {
                self.scopes[index].insert(name, value);
            }
            None => self.define(name, value),
        }
    }

    /// Defines (or replaces) `name` in the innermost scope.
    pub fn define(&mut self, name: Rc<str>, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, value);
        }
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn int(value: i64) -> Value {
        Value::Int(Rc::new(BigInt::from(value)))
    }

    fn frame_with_scope() -> Frame {
        let mut frame = Frame::new();
        frame.push_scope();
        frame
    }

    #[test]
    fn test_define_then_get() {
        let mut frame = frame_with_scope();
        frame.define(Rc::from("x"), int(42));
        assert_eq!(frame.get("x"), Some(&int(42)));
        assert_eq!(frame.get("y"), None);
    }

    #[test]
    fn test_inner_scope_shadows_outer() {
        let mut frame = frame_with_scope();
        frame.define(Rc::from("x"), int(1));

        frame.push_scope();
        frame.define(Rc::from("x"), int(2));
        assert_eq!(frame.get("x"), Some(&int(2)));

        frame.pop_scope();
        assert_eq!(frame.get("x"), Some(&int(1)));
    }

    #[test]
    fn test_set_updates_nearest_defining_scope() {
        let mut frame = frame_with_scope();
        frame.define(Rc::from("x"), int(1));

        frame.push_scope();
        frame.set(Rc::from("x"), int(2));
        frame.pop_scope();

        assert_eq!(frame.get("x"), Some(&int(2)));
    }

    #[test]
    fn test_set_defines_in_innermost_when_unbound() {
        let mut frame = frame_with_scope();
        frame.push_scope();
        frame.set(Rc::from("fresh"), int(7));
        assert_eq!(frame.get("fresh"), Some(&int(7)));

        let popped = frame.pop_scope();
        assert!(popped.contains_key("fresh"));
        assert_eq!(frame.get("fresh"), None);
    }

    #[test]
    fn test_pop_returns_bindings() {
        let mut frame = frame_with_scope();
        frame.define(Rc::from("a"), int(1));
        frame.define(Rc::from("b"), int(2));
        let scope = frame.pop_scope();
        assert_eq!(scope.len(), 2);
        assert_eq!(scope.get("a"), Some(&int(1)));
        assert_eq!(frame.scope_count(), 0);
    }
}
