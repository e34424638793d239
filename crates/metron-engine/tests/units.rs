use metron_engine::{evaluate, Environment, EvalConfig};
use metron_num::Rational;
use metron_units::{from_base_units, unit_from_name, DimensionVector};
use metron_values::{ErrorKind, Operand, UnitTag, Value};

fn rpn(parts: &[&str]) -> String {
    parts.join("\u{a0}")
}

fn eval_aware(parts: &[&str]) -> Operand {
    evaluate(&rpn(parts), &Environment::new(), &EvalConfig::default(), None).operand
}

fn eval_plain(parts: &[&str]) -> Operand {
    let config = EvalConfig { unit_aware: false, ..EvalConfig::default() };
    evaluate(&rpn(parts), &Environment::new(), &config, None).operand
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
fn feet_plus_yards_travels_in_base_units() {
    let out = eval_aware(&["®4/1", "'ft'", "®3/1", "'yards'", "+"]);
    // 4 ft + 3 yd = 3.9624 m exactly.
    assert_eq!(out.value, Value::Rational(rat("4953/1250")));
    match &out.unit {
        UnitTag::Expos(d) => assert_eq!(d, &DimensionVector([1, 0, 0, 0, 0, 0, 0, 0])),
        other => panic!("expected exponent tag, got {other:?}"),
    }
    // Convertible back to any compatible display unit: 13 feet.
    let ft = unit_from_name("ft").unwrap();
    match &out.value {
        Value::Rational(base) => assert_eq!(from_base_units(base, &ft), rat("13")),
        _ => unreachable!(),
    }
}

#[test]
fn incompatible_dimensions_cannot_add() {
    let out = eval_aware(&["®4/1", "'ft'", "®3/1", "'s'", "+"]);
    assert_eq!(error_kind(&out), ErrorKind::UnitAdd);
}

#[test]
fn plain_mode_ignores_unit_scaling() {
    let out = eval_plain(&["®4/1", "'ft'", "®3/1", "'yards'", "+"]);
    assert_eq!(out.value, Value::Rational(rat("7")));
    match &out.unit {
        UnitTag::Named(u) => assert_eq!(u.name, "ft"),
        other => panic!("expected named unit, got {other:?}"),
    }
}

#[test]
fn unknown_unit_name() {
    let out = eval_aware(&["®1/1", "'parsnips'"]);
    assert_eq!(error_kind(&out), ErrorKind::UnitName);
}

#[test]
fn transcendentals_demand_unitless_arguments() {
    let out = eval_aware(&["®1/2", "'m'", "function", "sin", "1"]);
    assert_eq!(error_kind(&out), ErrorKind::UnitIn);
}

#[test]
fn degrees_scale_into_radians() {
    let out = eval_aware(&["®30/1", "'°'", "function", "sin", "1"]);
    match out.value {
        Value::Rational(r) => assert!((r.to_f64() - 0.5).abs() < 1e-9),
        other => panic!("expected rational, got {other:?}"),
    }
}

#[test]
fn multiplication_sums_dimension_exponents() {
    let out = eval_aware(&["®3/1", "'m'", "®2/1", "'m'", "*"]);
    assert_eq!(out.value, Value::Rational(rat("6")));
    assert_eq!(out.expos(), Some(&DimensionVector([2, 0, 0, 0, 0, 0, 0, 0])));
}

#[test]
fn division_subtracts_dimension_exponents() {
    let out = eval_aware(&["®6/1", "'m'", "®2/1", "'s'", "/"]);
    assert_eq!(out.value, Value::Rational(rat("3")));
    assert_eq!(out.expos(), Some(&DimensionVector([1, 0, -1, 0, 0, 0, 0, 0])));
}

#[test]
fn compound_unit_names_resolve() {
    let out = eval_aware(&["®5/1", "'m/s'", "®2/1", "'s'", "*"]);
    assert_eq!(out.value, Value::Rational(rat("10")));
    assert_eq!(out.expos(), Some(&DimensionVector([1, 0, 0, 0, 0, 0, 0, 0])));
}

#[test]
fn quantities_compare_in_base_units() {
    // 1 yard < 4 ft.
    let out = eval_aware(&["®1/1", "'yd'", "®4/1", "'ft'", "<"]);
    assert_eq!(out.value, Value::Bool(true));
    let bad = eval_aware(&["®1/1", "'yd'", "®4/1", "'s'", "<"]);
    assert_eq!(error_kind(&bad), ErrorKind::UnitComp);
}

#[test]
fn celsius_gauge_applies_before_scaling() {
    let out = eval_aware(&["®25/1", "'°C'"]);
    assert_eq!(out.value, Value::Rational(rat("298.15")));
}

#[test]
fn vector_of_quantities() {
    let out = eval_aware(&["®1/1", "®2/1", "matrix", "1", "2", "'ft'", "®2/1", "*"]);
    match &out.value {
        Value::Vector(v) => {
            assert_eq!(v.data.len(), 2);
            assert_eq!(
                v.data[0],
                metron_values::Scalar::Rational(rat("0.6096"))
            );
        }
        other => panic!("expected vector, got {other:?}"),
    }
    assert_eq!(out.expos(), Some(&DimensionVector([1, 0, 0, 0, 0, 0, 0, 0])));
}
