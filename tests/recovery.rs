mod common;

use alanfl::ast::{ExprKind, StmtKind};
use alanfl::diagnostic::render_diagnostics;
use alanfl::interpreter::parse_source;
use common::parse_diagnostics;

#[test]
fn test_valid_programs_produce_no_diagnostics() {
    let source = r#"
        var fib = fn(n) {
            if n < 2 { return n; }
            return fib(n - 1) + fib(n - 2);
        };
        var entry = fn() { print_line(fib(10)); };
    "#;
    assert!(parse_diagnostics(source).is_empty());
}

#[test]
fn test_clean_parse_has_no_substituted_empty_statements() {
    let source = "var entry = fn() { var x = 1; x = x + 1; print_line(x); };";
    let (module, diagnostics) = parse_source(source);
    assert!(diagnostics.is_empty());
    let ExprKind::Fn(def) = &module.decls[0].vars[0].init.as_ref().unwrap().kind else {
        panic!("expected lambda");
    };
    let StmtKind::Block(stmts) = &def.body.kind else {
        panic!("expected block");
    };
    assert!(stmts
        .iter()
        .all(|stmt| !matches!(stmt.kind, StmtKind::Empty)));
}

#[test]
fn test_bad_declaration_recovers_to_the_next_one() {
    let (module, diagnostics) = parse_source("var x = ; var y = 1;");
    assert_eq!(diagnostics.len(), 1);
    let surviving: Vec<_> = module
        .decls
        .iter()
        .flat_map(|decl| decl.vars.iter())
        .map(|var| var.name.as_ref())
        .collect();
    assert_eq!(surviving, vec!["y"]);
}

#[test]
fn test_each_bad_statement_reports_once() {
    let source = r#"
        var entry = fn() {
            var a = * 1;
            var b = 2;
            var c = * 3;
            print_line(b);
        };
    "#;
    let diagnostics = parse_diagnostics(source);
    assert_eq!(diagnostics.len(), 2);
}

#[test]
fn test_missing_semicolon_keeps_the_statement() {
    let source = "var entry = fn() { var x = 1; x = 2 };";
    let diagnostics = parse_diagnostics(source);
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message.contains("';'"));
}

#[test]
fn test_garbage_at_module_level_recovers() {
    let (module, diagnostics) = parse_source("1 + 2; var entry = fn() { };");
    assert!(!diagnostics.is_empty());
    assert!(module
        .decls
        .iter()
        .flat_map(|decl| decl.vars.iter())
        .any(|var| var.name.as_ref() == "entry"));
}

#[test]
fn test_unknown_characters_are_parser_errors() {
    let diagnostics = parse_diagnostics("var x = 1 # 2;");
    assert!(!diagnostics.is_empty());
    assert!(diagnostics[0].message.contains("unexpected token"));
}

#[test]
fn test_truncated_input_terminates_with_diagnostics() {
    let diagnostics = parse_diagnostics("var entry = fn() { while true {");
    assert!(!diagnostics.is_empty());
}

#[test]
fn test_rendered_diagnostics_point_at_the_right_line() {
    let source = "var ok = 1;\nvar broken = ;\n";
    let (_, diagnostics) = parse_source(source);
    assert_eq!(diagnostics.len(), 1);
    let rendered = render_diagnostics(source, &diagnostics);
    let line = rendered.lines().next().unwrap();
    let (position, message) = line.split_once('\t').expect("tab-separated diagnostic");
    assert_eq!(position, "2:14");
    assert!(message.contains("unexpected token"));
}

#[test]
fn test_recovered_module_is_still_executable_shape() {
    // after an error the remaining declarations still form a module the VM
    // could run, had the caller chosen to ignore the diagnostics
    let (module, diagnostics) = parse_source("var x = ; var entry = fn() { };");
    assert_eq!(diagnostics.len(), 1);
    assert!(module.decls.len() >= 2);
}
