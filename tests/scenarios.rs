//! Drives the built `skiff` binary end to end (file mode) rather than calling
//! `skiff::run_source` directly, so these tests also pin the CLI's exit-code contract
//! (spec.md §6.1) and the fact that `print`/`println` write to real stdout.

use std::io::Write;
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

fn run(source: &str) -> Output {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let mut path = std::env::temp_dir();
    path.push(format!("skiff-scenario-{}-{id}.skiff", std::process::id()));
    {
        let mut file = std::fs::File::create(&path).expect("create temp script");
        file.write_all(source.as_bytes()).expect("write temp script");
    }

    let output = Command::new(env!("CARGO_BIN_EXE_skiff"))
        .arg(&path)
        .output()
        .expect("run skiff binary");

    std::fs::remove_file(&path).ok();
    output
}

fn stdout(source: &str) -> String {
    let output = run(source);
    assert!(
        output.status.success(),
        "expected success, got status {:?}, stderr: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout is utf8")
}

#[test]
fn arithmetic_and_string_concat() {
    assert_eq!(
        stdout(r#"println("Hello agent " + 72 + "!");"#),
        "Hello agent 72!\n"
    );
}

#[test]
fn closures_over_shadowed_names() {
    let source = r#"
        var q = 10;
        { function w() { println(q); } w(); var q = 12; w(); }
    "#;
    assert_eq!(stdout(source), "10\n10\n");
}

#[test]
fn inheritance_and_super() {
    let source = r#"
        class A {
            function __init__(){ this.v = 1; }
            function f(){ println(this.v); }
        }
        class B inherits A {
            function __init__(){ super.__init__(); this.v = 2; }
        }
        B().f();
    "#;
    assert_eq!(stdout(source), "2\n");
}

#[test]
fn static_methods_are_called_on_the_class() {
    assert_eq!(
        stdout(r#"class M { static function s(){ println("hi"); } } M.s();"#),
        "hi\n"
    );
}

#[test]
fn calling_a_static_method_on_an_instance_is_a_runtime_error() {
    let output = run(r#"class M { static function s(){ println("hi"); } } M().s();"#);
    assert_eq!(output.status.code(), Some(70));
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("Undefined property 's'"),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn loop_control_break_and_continue() {
    let source = "for (var i=0; i<5; i+=1) { if (i==1) continue; if (i==3) break; println(i); }";
    assert_eq!(stdout(source), "0\n2\n");
}

#[test]
fn arrow_iife() {
    let output = run(r#"print((function () => "Hello, World!")());"#);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "Hello, World!"
    );
}

#[test]
fn calls_with_more_than_8_arguments_are_a_parse_error() {
    let args = (0..9).map(|n| n.to_string()).collect::<Vec<_>>().join(", ");
    let output = run(&format!("function f() {{}} f({args});"));
    assert_eq!(output.status.code(), Some(65));
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("Cannot have more than 8 arguments."),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn arrow_function_declaration_requires_a_trailing_semicolon() {
    let output = run("function f() => 1");
    assert_eq!(output.status.code(), Some(65));
}

#[test]
fn const_without_an_initializer_is_a_parse_error() {
    let output = run("const x; println(x);");
    assert_eq!(output.status.code(), Some(65));
}

#[test]
fn super_in_a_static_method_is_a_static_error() {
    let source = r#"
        class A { static function greet(){} }
        class B inherits A { static function greet(){ super.greet(); } }
        B.greet();
    "#;
    let output = run(source);
    assert_eq!(output.status.code(), Some(65));
}

#[test]
fn return_at_top_level_is_a_static_error() {
    let output = run("return 1;");
    assert_eq!(output.status.code(), Some(65));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Cannot return from top-level code."));
}

#[test]
fn this_at_top_level_is_a_static_error() {
    let output = run("this;");
    assert_eq!(output.status.code(), Some(65));
}

#[test]
fn static_initializer_is_a_static_error() {
    let output = run("class K { static function __init__(){ return 1; } }");
    assert_eq!(output.status.code(), Some(65));
}

#[test]
fn reading_own_initializer_in_local_scope_is_a_static_error() {
    let output = run("function f() { var x = x; }");
    assert_eq!(output.status.code(), Some(65));
    assert!(String::from_utf8_lossy(&output.stderr)
        .contains("Cannot read local variable in its own initializer."));
}

#[test]
fn adding_a_number_and_a_bool_is_a_runtime_error() {
    let output = run("1 + true;");
    assert_eq!(output.status.code(), Some(70));
}

#[test]
fn division_by_zero_is_not_an_error() {
    assert_eq!(stdout("println(1 / 0);"), "inf\n");
    assert_eq!(stdout("println(-1 / 0);"), "-inf\n");
}

#[test]
fn short_circuit_or_does_not_evaluate_right_side() {
    let source = r#"
        function boom() { println("boom"); return true; }
        println(true or boom());
        println(false and boom());
    "#;
    assert_eq!(stdout(source), "true\nfalse\n");
}

#[test]
fn ternary_evaluates_exactly_one_arm() {
    let source = r#"
        function yes() { println("yes"); return 1; }
        function no() { println("no"); return 2; }
        println(true ? yes() : no());
    "#;
    assert_eq!(stdout(source), "yes\n1\n");
}

#[test]
fn augmented_assignment_desugars_to_read_then_write() {
    assert_eq!(stdout("var x = 1; x += 2; println(x);"), "3\n");
}

#[test]
fn const_reassignment_is_a_static_error() {
    let output = run("const x = 1; x = 2;");
    assert_eq!(output.status.code(), Some(65));
    assert!(String::from_utf8_lossy(&output.stderr).contains("constant"));
}

#[test]
fn class_call_arity_matches_initializer_arity() {
    let source = r#"
        class Point { function __init__(x, y) { this.x = x; this.y = y; } }
        println(Point(1, 2).x);
    "#;
    assert_eq!(stdout(source), "1\n");
}

#[test]
fn missing_property_is_a_runtime_error() {
    let output = run("class Empty {} Empty().missing;");
    assert_eq!(output.status.code(), Some(70));
}

#[test]
fn nested_block_comments_and_adjacent_strings() {
    let source = r#"
        /* outer /* inner */ still a comment */
        println("a" "b" "c");
    "#;
    assert_eq!(stdout(source), "abc\n");
}

#[test]
fn numbers_print_without_trailing_decimal_point() {
    assert_eq!(stdout("println(3.0);"), "3\n");
    assert_eq!(stdout("println(3.5);"), "3.5\n");
}
