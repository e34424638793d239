use metron_engine::{evaluate, Environment, EvalConfig};
use metron_num::Rational;
use metron_values::{
    record_from_operand, ErrorKind, Operand, Orientation, Scalar, Value, VectorValue,
};

fn rpn(parts: &[&str]) -> String {
    parts.join("\u{a0}")
}

fn eval(parts: &[&str]) -> Operand {
    evaluate(&rpn(parts), &Environment::new(), &EvalConfig::default(), None).operand
}

fn rat(s: &str) -> Rational {
    s.parse().unwrap()
}

fn error_kind(op: &Operand) -> ErrorKind {
    match &op.value {
        Value::Error(e) => e.kind,
        other => panic!("expected an error operand, got {other:?}"),
    }
}

#[test]
fn three_quarters_plus_one_quarter() {
    let out = eval(&["®3/4", "®1/4", "+"]);
    assert_eq!(out.value, Value::Rational(rat("1")));
}

#[test]
fn chained_comparison_examples() {
    // 1 < 2 < 1 is false; 1 < 2 < 3 is true.
    let out = eval(&["®1/1", "®2/1", "<", "®1/1", "<"]);
    assert_eq!(out.value, Value::Bool(false));
    let out = eval(&["®1/1", "®2/1", "<", "®3/1", "<"]);
    assert_eq!(out.value, Value::Bool(true));
}

#[test]
fn factorial_and_its_error_kind() {
    assert_eq!(eval(&["®5/1", "!"]).value, Value::Rational(rat("120")));
    assert_eq!(error_kind(&eval(&["®-1/1", "!"])), ErrorKind::Fact);
    assert_eq!(error_kind(&eval(&["®1/2", "!"])), ErrorKind::Fact);
}

#[test]
fn division_by_zero_is_reported_structurally() {
    assert_eq!(error_kind(&eval(&["®1/1", "®0/1", "/"])), ErrorKind::Div);
}

#[test]
fn cases_evaluates_only_the_chosen_branch() {
    // The first branch divides by zero; its condition is false, so it must
    // never run.
    let divide_by_zero = "\"®1/1\u{a0}®0/1\u{a0}/\"";
    let two = "\"®2/1\"";
    let out = eval(&[divide_by_zero, "false", two, "true", "cases", "2"]);
    assert_eq!(out.value, Value::Rational(rat("2")));
}

#[test]
fn cases_with_no_true_condition_errors() {
    let out = eval(&["\"®1/1\"", "false", "cases", "1"]);
    assert_eq!(error_kind(&out), ErrorKind::Cases);
}

#[test]
fn summation_over_a_dummy_variable() {
    // ∑ k·k for k = 1..5 = 55
    let body = "\"¿k\u{a0}¿k\u{a0}*\"";
    let out = eval(&[body, "\"k\"", "®1/1", "®5/1", "∑"]);
    assert_eq!(out.value, Value::Rational(rat("55")));
}

#[test]
fn variable_resolution_and_v_name() {
    let mut env = Environment::new();
    env.insert(
        "x".to_string(),
        record_from_operand("x", &Operand::rational(rat("3"))),
    );
    let out = evaluate(
        &rpn(&["¿x", "®2/1", "+"]),
        &env,
        &EvalConfig::default(),
        None,
    )
    .operand;
    assert_eq!(out.value, Value::Rational(rat("5")));

    let missing = eval(&["¿nope", "®1/1", "+"]);
    assert_eq!(error_kind(&missing), ErrorKind::VName);
    match &missing.value {
        Value::Error(e) => assert_eq!(e.message(), "Variable nope has not been defined."),
        _ => unreachable!(),
    }
}

#[test]
fn malformed_streams_are_single_errors() {
    // Two leftover operands.
    assert_eq!(error_kind(&eval(&["®1/1", "®2/1"])), ErrorKind::Stack);
    // Operator with an empty stack.
    assert_eq!(error_kind(&eval(&["+"])), ErrorKind::Rpn);
    // Unknown word.
    assert_eq!(error_kind(&eval(&["frobnicate"])), ErrorKind::BadToken);
}

#[test]
fn constants_resolve_as_words() {
    let out = eval(&["π", "®2/1", "*"]);
    match out.value {
        Value::Rational(r) => {
            assert!((r.to_f64() - 2.0 * std::f64::consts::PI).abs() < 1e-12)
        }
        other => panic!("expected rational, got {other:?}"),
    }
}

#[test]
fn complex_literal_arithmetic() {
    // (1+i)(1−i) = 2
    let out = eval(&["©1,1,1,1", "©1,1,-1,1", "*"]);
    match out.value {
        Value::Complex(z) => {
            assert_eq!(z.re, rat("2"));
            assert!(z.im.is_zero());
        }
        other => panic!("expected complex, got {other:?}"),
    }
}

#[test]
fn string_concatenation() {
    let out = eval(&["\"ab\"", "\"cd\"", "&"]);
    assert_eq!(out.value, Value::Str("abcd".into()));
}

#[test]
fn row_times_column_is_a_scalar() {
    let out = eval(&[
        "®1/1", "®2/1", "®3/1", "matrix", "1", "3",
        "®3/1", "®2/1", "®1/1", "matrix", "3", "1",
        "·",
    ]);
    assert_eq!(out.value, Value::Rational(rat("10")));
}

#[test]
fn mismatched_vector_lengths() {
    let out = eval(&[
        "®1/1", "®2/1", "®3/1", "matrix", "1", "3",
        "®1/1", "®2/1", "matrix", "2", "1",
        "·",
    ]);
    assert_eq!(error_kind(&out), ErrorKind::MisElNum);
}

#[test]
fn matrix_literal_orientations() {
    let row = eval(&["®1/1", "®2/1", "matrix", "1", "2"]);
    assert_eq!(
        row.value,
        Value::Vector(VectorValue::new(
            vec![Scalar::Rational(rat("1")), Scalar::Rational(rat("2"))],
            Orientation::Row,
        ))
    );
    let column = eval(&["®1/1", "®2/1", "matrix", "2", "1"]);
    assert!(matches!(
        column.value,
        Value::Vector(VectorValue { orientation: Orientation::Column, .. })
    ));
    let full = eval(&["®1/1", "®2/1", "®3/1", "®4/1", "matrix", "2", "2"]);
    assert!(matches!(full.value, Value::Matrix(_)));
}

#[test]
fn determinant_through_absolute_value_bars() {
    let out = eval(&["®1/1", "®2/1", "®3/1", "®4/1", "matrix", "2", "2", "abs"]);
    assert_eq!(out.value, Value::Rational(rat("-2")));
}

#[test]
fn unresolved_fetch_fails_with_fetch_kind() {
    let out = eval(&["\"https://example.com/rates\"", "fetch"]);
    assert_eq!(error_kind(&out), ErrorKind::Fetch);
}

#[test]
fn unknown_function_name() {
    let out = eval(&["®1/1", "function", "mystery", "1"]);
    assert_eq!(error_kind(&out), ErrorKind::FName);
}

#[test]
fn builtin_functions_are_reachable() {
    let out = eval(&["®1/1", "®2/1", "®3/1", "function", "sum", "3"]);
    assert_eq!(out.value, Value::Rational(rat("6")));
    let mean = eval(&["®1/1", "®2/1", "matrix", "1", "2", "function", "mean", "1"]);
    assert_eq!(mean.value, Value::Rational(rat("3/2")));
}

#[test]
fn recursion_budget_bounds_sub_evaluation() {
    // cases and ∑ re-enter the evaluator; with a zero depth budget that
    // first re-entry is already a typed error instead of unbounded
    // recursion on pathological input.
    let config = EvalConfig { max_recursion_depth: 0, ..EvalConfig::default() };
    let out = evaluate(
        &rpn(&["\"®1/1\"", "true", "cases", "1"]),
        &Environment::new(),
        &config,
        None,
    )
    .operand;
    assert_eq!(error_kind(&out), ErrorKind::MaxDepth);
}
