use metron_engine::{
    evaluate, Environment, EvalConfig, FunctionLibrary, Parameter, Statement, UserFunction,
};
use metron_num::Rational;
use metron_values::{ErrorKind, Operand, Value};

fn rpn(parts: &[&str]) -> String {
    parts.join("\u{a0}")
}

fn rat(s: &str) -> Rational {
    s.parse().unwrap()
}

fn call(lib: &FunctionLibrary, parts: &[&str]) -> Operand {
    evaluate(
        &rpn(parts),
        &Environment::new(),
        &EvalConfig::default(),
        Some(lib),
    )
    .operand
}

fn error_kind(op: &Operand) -> ErrorKind {
    match &op.value {
        Value::Error(e) => e.kind,
        other => panic!("expected an error operand, got {other:?}"),
    }
}

fn library_of(function: UserFunction) -> FunctionLibrary {
    let mut lib = FunctionLibrary::new();
    lib.insert(function);
    lib
}

#[test]
fn for_loop_binds_each_element_in_order() {
    // trace = "" ; for x in 1:1:5 { trace = trace & x } ; return trace
    let f = UserFunction::new(
        "trace",
        vec![],
        vec![
            Statement::Assignment { name: Some("t".into()), rpn: rpn(&["\"\""]) },
            Statement::For {
                dummy: "x".into(),
                rpn: rpn(&["®1/1", "®1/1", "®5/1", "range", "3"]),
            },
            Statement::Assignment { name: Some("t".into()), rpn: rpn(&["¿t", "¿x", "&"]) },
            Statement::End,
            Statement::Return { rpn: Some(rpn(&["¿t"])) },
        ],
    );
    let out = call(&library_of(f), &["function", "trace", "0"]);
    // Exactly five iterations, bound to 1,2,3,4,5 in order.
    assert_eq!(out.value, Value::Str("12345".into()));
}

#[test]
fn break_inside_if_terminates_the_loop() {
    // total = 0 ; for x in 1:1:5 { if x = 3 { break } ; total = total + x }
    let f = UserFunction::new(
        "partial",
        vec![],
        vec![
            Statement::Assignment { name: Some("total".into()), rpn: rpn(&["®0/1"]) },
            Statement::For {
                dummy: "x".into(),
                rpn: rpn(&["®1/1", "®1/1", "®5/1", "range", "3"]),
            },
            Statement::If { rpn: rpn(&["¿x", "®3/1", "="]) },
            Statement::Break,
            Statement::End,
            Statement::Assignment {
                name: Some("total".into()),
                rpn: rpn(&["¿total", "¿x", "+"]),
            },
            Statement::End,
            Statement::Return { rpn: Some(rpn(&["¿total"])) },
        ],
    );
    let out = call(&library_of(f), &["function", "partial", "0"]);
    // break leaves the loop, not just the if: only 1 and 2 accumulate.
    assert_eq!(out.value, Value::Rational(rat("3")));
}

#[test]
fn while_loop_and_condition_reevaluation() {
    let f = UserFunction::new(
        "count",
        vec![],
        vec![
            Statement::Assignment { name: Some("n".into()), rpn: rpn(&["®0/1"]) },
            Statement::While { rpn: rpn(&["¿n", "®4/1", "<"]) },
            Statement::Assignment { name: Some("n".into()), rpn: rpn(&["¿n", "®1/1", "+"]) },
            Statement::End,
            Statement::Return { rpn: Some(rpn(&["¿n"])) },
        ],
    );
    let out = call(&library_of(f), &["function", "count", "0"]);
    assert_eq!(out.value, Value::Rational(rat("4")));
}

#[test]
fn elseif_chain_takes_the_matching_branch() {
    let f = UserFunction::new(
        "bucket",
        vec![Parameter::required("x")],
        vec![
            Statement::If { rpn: rpn(&["¿x", "®1/1", "="]) },
            Statement::Return { rpn: Some(rpn(&["®10/1"])) },
            Statement::ElseIf { rpn: rpn(&["¿x", "®2/1", "="]) },
            Statement::Return { rpn: Some(rpn(&["®20/1"])) },
            Statement::Else,
            Statement::Return { rpn: Some(rpn(&["®30/1"])) },
            Statement::End,
        ],
    );
    let lib = library_of(f);
    assert_eq!(
        call(&lib, &["®1/1", "function", "bucket", "1"]).value,
        Value::Rational(rat("10"))
    );
    assert_eq!(
        call(&lib, &["®2/1", "function", "bucket", "1"]).value,
        Value::Rational(rat("20"))
    );
    assert_eq!(
        call(&lib, &["®9/1", "function", "bucket", "1"]).value,
        Value::Rational(rat("30"))
    );
}

#[test]
fn trailing_default_parameter_fills_missing_argument() {
    let f = UserFunction::new(
        "plus",
        vec![
            Parameter::required("a"),
            Parameter::with_default("b", rpn(&["®5/1"])),
        ],
        vec![Statement::Return { rpn: Some(rpn(&["¿a", "¿b", "+"])) }],
    );
    let lib = library_of(f);
    assert_eq!(
        call(&lib, &["®2/1", "function", "plus", "1"]).value,
        Value::Rational(rat("7"))
    );
    assert_eq!(
        call(&lib, &["®2/1", "®3/1", "function", "plus", "2"]).value,
        Value::Rational(rat("5"))
    );
    // Surplus arguments are a NUMARGS error.
    let surplus = call(&lib, &["®1/1", "®1/1", "®1/1", "function", "plus", "3"]);
    assert_eq!(error_kind(&surplus), ErrorKind::NumArgs);
    match &surplus.value {
        Value::Error(e) => {
            assert_eq!(e.message(), "Wrong number of arguments to function plus.")
        }
        _ => unreachable!(),
    }
}

#[test]
fn bare_return_yields_rational_zero() {
    let f = UserFunction::new("nothing", vec![], vec![Statement::Return { rpn: None }]);
    let out = call(&library_of(f), &["function", "nothing", "0"]);
    assert_eq!(out.value, Value::Rational(Rational::zero()));
}

#[test]
fn print_statements_collect_into_the_outcome() {
    let f = UserFunction::new(
        "noisy",
        vec![],
        vec![
            Statement::Print { rpn: rpn(&["\"starting\""]) },
            Statement::Print { rpn: rpn(&["®2/1", "®2/1", "+"]) },
            Statement::Return { rpn: Some(rpn(&["®1/1"])) },
        ],
    );
    let outcome = evaluate(
        &rpn(&["function", "noisy", "0"]),
        &Environment::new(),
        &EvalConfig::default(),
        Some(&library_of(f)),
    );
    assert_eq!(outcome.printed, vec!["starting".to_string(), "4".to_string()]);
}

#[test]
fn throw_returns_an_error_operand() {
    let f = UserFunction::new(
        "guard",
        vec![],
        vec![Statement::Throw { message: "pressure out of range".into() }],
    );
    let out = call(&library_of(f), &["function", "guard", "0"]);
    match &out.value {
        Value::Error(e) => assert_eq!(e.message(), "pressure out of range"),
        other => panic!("expected error, got {other:?}"),
    }
}

#[test]
fn string_iteration_steps_by_character() {
    // Multi-byte characters advance the cursor by their full width.
    let f = UserFunction::new(
        "echo",
        vec![Parameter::required("s")],
        vec![
            Statement::Assignment { name: Some("out".into()), rpn: rpn(&["\"\""]) },
            Statement::For { dummy: "c".into(), rpn: rpn(&["¿s"]) },
            Statement::Assignment { name: Some("out".into()), rpn: rpn(&["¿out", "¿c", "&"]) },
            Statement::End,
            Statement::Return { rpn: Some(rpn(&["¿out"])) },
        ],
    );
    let out = call(&library_of(f), &["\"héllø\"", "function", "echo", "1"]);
    assert_eq!(out.value, Value::Str("héllø".into()));
}

#[test]
fn runaway_loops_hit_the_statement_budget() {
    let f = UserFunction::new(
        "spin",
        vec![],
        vec![
            Statement::While { rpn: rpn(&["true"]) },
            Statement::Assignment { name: None, rpn: rpn(&["®1/1"]) },
            Statement::End,
        ],
    );
    let config = EvalConfig { max_loop_iterations: 50, ..EvalConfig::default() };
    let out = evaluate(
        &rpn(&["function", "spin", "0"]),
        &Environment::new(),
        &config,
        Some(&library_of(f)),
    )
    .operand;
    assert_eq!(error_kind(&out), ErrorKind::MaxIteration);
}

#[test]
fn unbounded_recursion_hits_the_depth_budget() {
    let f = UserFunction::new(
        "loop_forever",
        vec![],
        vec![Statement::Return { rpn: Some(rpn(&["function", "loop_forever", "0"])) }],
    );
    let config = EvalConfig { max_recursion_depth: 8, ..EvalConfig::default() };
    let out = evaluate(
        &rpn(&["function", "loop_forever", "0"]),
        &Environment::new(),
        &config,
        Some(&library_of(f)),
    )
    .operand;
    assert_eq!(error_kind(&out), ErrorKind::MaxDepth);
}

#[test]
fn break_outside_a_loop_is_an_error() {
    let f = UserFunction::new("stray", vec![], vec![Statement::Break]);
    let out = call(&library_of(f), &["function", "stray", "0"]);
    assert_eq!(error_kind(&out), ErrorKind::BreakOutsideLoop);
}

#[test]
fn nested_loops_break_only_the_inner_one() {
    // for i in 1:1:3 { for j in 1:1:3 { if j = 2 { break } ; n = n + 1 } }
    let f = UserFunction::new(
        "nested",
        vec![],
        vec![
            Statement::Assignment { name: Some("n".into()), rpn: rpn(&["®0/1"]) },
            Statement::For {
                dummy: "i".into(),
                rpn: rpn(&["®1/1", "®1/1", "®3/1", "range", "3"]),
            },
            Statement::For {
                dummy: "j".into(),
                rpn: rpn(&["®1/1", "®1/1", "®3/1", "range", "3"]),
            },
            Statement::If { rpn: rpn(&["¿j", "®2/1", "="]) },
            Statement::Break,
            Statement::End,
            Statement::Assignment { name: Some("n".into()), rpn: rpn(&["¿n", "®1/1", "+"]) },
            Statement::End,
            Statement::End,
            Statement::Return { rpn: Some(rpn(&["¿n"])) },
        ],
    );
    let out = call(&library_of(f), &["function", "nested", "0"]);
    // The inner loop contributes j = 1 only, for each of the three i's.
    assert_eq!(out.value, Value::Rational(rat("3")));
}
