// Functions the rewrite must refuse, and the diagnostics it reports

use unblock::compiler::context::Severity;
use unblock::{compile, Catalog, CompileError, Options};

/// Error messages of a compilation expected to fail
fn rejected(source: &str) -> Vec<String> {
    let error = compile(source, &Catalog::builtin(), &Options::default())
        .expect_err("Compilation should have been rejected");
    assert!(
        matches!(error, CompileError::Failed { .. }),
        "Unexpected error kind: {:?}",
        error
    );
    error
        .diagnostics()
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| d.message.clone())
        .collect()
}

fn assert_rejected(source: &str, fragment: &str) {
    let messages = rejected(source);
    assert!(
        messages.iter().any(|m| m.contains(fragment)),
        "Expected an error containing {:?}, got {:?}",
        fragment,
        messages
    );
}

#[test]
fn test_call_inside_expression() {
    assert_rejected(
        "int f(h) { int r; r = wait_op(h, 1); return r; }",
        "blocking call to `wait_op` in disallowed position",
    );
    assert_rejected(
        "int f(h) { if (wait_op(h, 1)) { return 1; } return 0; }",
        "in disallowed position",
    );
}

#[test]
fn test_call_inside_loop() {
    assert_rejected(
        "void f(h, n) { int i; for (i = 0; i < n; i++) { wait_op(h, i); } }",
        "blocking call inside a loop",
    );
    assert_rejected(
        "void f(h) { while (1) wait_op(h, 1); }",
        "blocking call inside a loop",
    );
}

#[test]
fn test_call_inside_switch() {
    assert_rejected(
        "void f(h, c) { switch (c) { case 1: wait_op(h, 1); break; default: break; } }",
        "blocking call inside a switch",
    );
}

#[test]
fn test_call_inside_nested_conditionals() {
    assert_rejected(
        "void f(h, a, b) { if (a) { if (b) { wait_op(h, 1); } } }",
        "nested conditionals",
    );
}

#[test]
fn test_goto_with_boundaries() {
    let messages = rejected("void f(h) { again: wait_op(h, 1); goto again; }");
    assert!(messages.iter().any(|m| m.contains("goto")), "{:?}", messages);
    assert!(messages.iter().all(|m| m.starts_with("unsupported control flow across suspension")));
}

#[test]
fn test_parameter_assigned_before_suspension() {
    assert_rejected(
        "void f(h, int c) { c = c + 1; wait_op(h, 1); use(c); }",
        "parameter `c` is assigned before a blocking call and read after it",
    );
    // The completion check reads the handle again after resuming
    assert_rejected(
        "void f(int h) { h = h + 1; wait_op(h, 1); }",
        "parameter `h` is assigned before a blocking call",
    );
}

#[test]
fn test_recursion() {
    assert_rejected(
        "void f(h, n) { wait_op(h, n); if (n) { f(h, n - 1); } }",
        "recursive function containing a boundary",
    );
}

#[test]
fn test_too_few_arguments() {
    assert_rejected("void f(h) { wait_op(h); }", "`wait_op` expects at least 2 argument(s), found 1");
}

#[test]
fn test_missing_wait_parameter() {
    assert_rejected(
        "uint8_t f(int x) { papi_sleep(10); return 0; }",
        "needs a `waiting_for` parameter",
    );
}

#[test]
fn test_unreachable_state() {
    let error = compile(
        "void f(h) { return; wait_op(h, 1); }",
        &Catalog::builtin(),
        &Options::default(),
    )
    .expect_err("Compilation should have been rejected");

    let diagnostics = error.diagnostics();
    assert!(diagnostics
        .iter()
        .any(|d| d.severity == Severity::Warning && d.message == "unreachable statement"));
    assert!(diagnostics
        .iter()
        .any(|d| d.severity == Severity::Error && d.message.contains("state 1 is unreachable")));
}

#[test]
fn test_escaping_declarations_that_cannot_move() {
    assert_rejected(
        "void f(h) { int v = { 1 }; wait_op(h, 1); use(v); }",
        "has a brace initializer",
    );
    assert_rejected(
        "void f(h) { int a, b; a = 1; b = 2; wait_op(h, 1); use(a, b); }",
        "must be declared on its own",
    );
}

#[test]
fn test_reserved_names() {
    assert_rejected(
        "void f(h) { int sa_state; sa_state = 1; wait_op(h, 1); }",
        "`sa_state` is reserved",
    );

    let options = Options {
        function: Some("f".to_string()),
        ..Options::default()
    };
    let error = compile("void f(void) { label_1: done(); }", &Catalog::builtin(), &options)
        .expect_err("Compilation should have been rejected");
    assert!(error.diagnostics()[0]
        .message
        .contains("label `label_1` collides with a generated resume label"));
}

#[test]
fn test_errors_carry_positions() {
    let source = "void f(h) {\n    int r;\n    r = wait_op(h, 1);\n}\n";
    let error = compile(source, &Catalog::builtin(), &Options::default()).unwrap_err();
    let diagnostic = &error.diagnostics()[0];

    assert_eq!(diagnostic.span.start.line, 3);
    assert_eq!(&source[diagnostic.span.start.offset..][..7], "wait_op");
    assert!(error.to_string().contains("failed with 1 error(s)"));
}
