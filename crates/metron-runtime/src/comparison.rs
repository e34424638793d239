//! Relational operators, including chained-comparison semantics.
//!
//! `a < b < c` arrives as two links. The first link's result is a carrier
//! holding both its truth and its right operand; the second link unwraps the
//! carrier, threads the previous truth, and type-checks its operands even
//! when the chain is already false — falsity short-circuits the truth value,
//! never the checking.

use std::cmp::Ordering;

use metron_values::{
    CalcError, ChainedBool, ErrorKind, Operand, Scalar, UnitTag, Value, VectorValue,
};

use crate::binary::materialized;

fn scalar_order(x: &Scalar, y: &Scalar) -> Result<Option<Ordering>, CalcError> {
    match (x, y) {
        (Scalar::Rational(a), Scalar::Rational(b)) => Ok(Some(a.cmp(b))),
        (Scalar::Str(a), Scalar::Str(b)) => Ok(Some(a.cmp(b))),
        _ => Ok(None),
    }
}

pub(crate) fn scalar_equal(x: &Scalar, y: &Scalar) -> bool {
    match (x, y) {
        (Scalar::Rational(a), Scalar::Rational(b)) => a == b,
        (Scalar::Complex(a), Scalar::Complex(b)) => a == b,
        (Scalar::Rational(a), Scalar::Complex(b)) | (Scalar::Complex(b), Scalar::Rational(a)) => {
            b.is_real() && &b.re == a
        }
        (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
        (Scalar::Str(a), Scalar::Str(b)) => a == b,
        _ => false,
    }
}

/// One relational link over two scalars.
fn compute_link(op: &str, x: &Scalar, y: &Scalar) -> Result<bool, CalcError> {
    match op {
        "=" | "==" => Ok(scalar_equal(x, y)),
        "≠" | "!=" => Ok(!scalar_equal(x, y)),
        "<" | ">" | "≤" | "<=" | "≥" | ">=" => match scalar_order(x, y)? {
            Some(ord) => Ok(match op {
                "<" => ord == Ordering::Less,
                ">" => ord == Ordering::Greater,
                "≤" | "<=" => ord != Ordering::Greater,
                _ => ord != Ordering::Less,
            }),
            None => Err(CalcError::with(ErrorKind::Unsupported, op)),
        },
        other => Err(CalcError::with(ErrorKind::BadToken, other)),
    }
}

/// Type-check a link without deriving its truth; used when an earlier link
/// already made the chain false.
fn check_link(op: &str, x: &Scalar, y: &Scalar) -> Result<(), CalcError> {
    match op {
        "=" | "==" | "≠" | "!=" => Ok(()),
        "<" | ">" | "≤" | "<=" | "≥" | ">=" => match scalar_order(x, y)? {
            Some(_) => Ok(()),
            None => Err(CalcError::with(ErrorKind::Unsupported, op)),
        },
        other => Err(CalcError::with(ErrorKind::BadToken, other)),
    }
}

fn membership(value: &Value, collection: &Value) -> Result<bool, CalcError> {
    match (Scalar::from_value(value), collection) {
        (Some(needle), Value::Vector(v)) => Ok(v.data.iter().any(|s| scalar_equal(s, &needle))),
        (Some(needle), Value::Matrix(m)) => Ok(m.data.iter().any(|s| scalar_equal(s, &needle))),
        (Some(Scalar::Str(key)), Value::Map(m)) => Ok(m.get(&key).is_some()),
        (Some(Scalar::Str(sub)), Value::Str(s)) => Ok(s.contains(&sub)),
        _ => Err(CalcError::with(ErrorKind::Unsupported, "∈")),
    }
}

fn gate_units(a: &Operand, b: &Operand) -> Result<(), CalcError> {
    let ea = match &a.unit {
        UnitTag::Expos(d) => Some(d),
        _ => None,
    };
    let eb = match &b.unit {
        UnitTag::Expos(d) => Some(d),
        _ => None,
    };
    match (ea, eb) {
        (Some(da), Some(db)) => {
            if metron_units::units_are_compatible(da, db) {
                Ok(())
            } else {
                Err(CalcError::new(ErrorKind::UnitComp))
            }
        }
        (Some(d), None) | (None, Some(d)) => {
            if d.is_dimensionless() {
                Ok(())
            } else {
                Err(CalcError::new(ErrorKind::UnitComp))
            }
        }
        (None, None) => Ok(()),
    }
}

/// The relational dispatch entry point.
pub fn relate(op: &str, a: &Operand, b: &Operand) -> Result<Operand, CalcError> {
    if let Value::Error(e) = &a.value {
        return Err(e.clone());
    }
    if let Value::Error(e) = &b.value {
        return Err(e.clone());
    }

    // Unwrap a chained carrier: its truth threads into this link and its
    // right operand becomes our left operand.
    let (left, prev) = match &a.value {
        Value::Chained(c) => ((*c.rhs).clone(), Some(c.truth)),
        _ => (a.clone(), None),
    };
    let left = materialized(&left)?;
    let right = materialized(b)?;
    gate_units(&left, &right)?;

    // Membership relations produce a plain boolean; they do not chain.
    match op {
        "∈" | "in" => return Ok(Operand::boolean(membership(&left.value, &right.value)?)),
        "∉" => return Ok(Operand::boolean(!membership(&left.value, &right.value)?)),
        "∋" => return Ok(Operand::boolean(membership(&right.value, &left.value)?)),
        _ => {}
    }

    match (Scalar::from_value(&left.value), Scalar::from_value(&right.value)) {
        (Some(x), Some(y)) => {
            let truth = match prev {
                Some(false) => {
                    check_link(op, &x, &y)?;
                    false
                }
                _ => prev.unwrap_or(true) && compute_link(op, &x, &y)?,
            };
            Ok(Operand::new(Value::Chained(ChainedBool {
                truth,
                rhs: Box::new(right),
            })))
        }
        _ => {
            // Element-wise comparison over one container shape.
            let booleans = |data: Vec<bool>| -> Vec<Scalar> {
                data.into_iter().map(Scalar::Bool).collect()
            };
            match (&left.value, &right.value) {
                (Value::Vector(v), other) if Scalar::from_value(other).is_some() => {
                    let y = Scalar::from_value(other).unwrap();
                    let data = v
                        .data
                        .iter()
                        .map(|x| compute_link(op, x, &y))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Operand::new(Value::Vector(VectorValue::new(
                        booleans(data),
                        v.orientation,
                    ))))
                }
                (other, Value::Vector(v)) if Scalar::from_value(other).is_some() => {
                    let x = Scalar::from_value(other).unwrap();
                    let data = v
                        .data
                        .iter()
                        .map(|y| compute_link(op, &x, y))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Operand::new(Value::Vector(VectorValue::new(
                        booleans(data),
                        v.orientation,
                    ))))
                }
                (Value::Vector(va), Value::Vector(vb)) => {
                    if va.len() != vb.len() {
                        return Err(CalcError::new(ErrorKind::MisElNum));
                    }
                    let data = va
                        .data
                        .iter()
                        .zip(vb.data.iter())
                        .map(|(x, y)| compute_link(op, x, y))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Operand::new(Value::Vector(VectorValue::new(
                        booleans(data),
                        va.orientation,
                    ))))
                }
                _ => Err(CalcError::with(ErrorKind::Unsupported, op)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metron_num::Rational;

    fn rat(s: &str) -> Rational {
        s.parse().unwrap()
    }

    fn num(s: &str) -> Operand {
        Operand::rational(rat(s))
    }

    fn truth(op: &Operand) -> bool {
        match &op.value {
            Value::Chained(c) => c.truth,
            Value::Bool(b) => *b,
            other => panic!("not a boolean: {other:?}"),
        }
    }

    #[test]
    fn chained_comparison_short_circuits_falsity() {
        // 1 < 2 < 1 is false; 1 < 2 < 3 is true.
        let first = relate("<", &num("1"), &num("2")).unwrap();
        let second = relate("<", &first, &num("1")).unwrap();
        assert!(!truth(&second));

        let first = relate("<", &num("1"), &num("2")).unwrap();
        let second = relate("<", &first, &num("3")).unwrap();
        assert!(truth(&second));
    }

    #[test]
    fn false_chain_still_type_checks() {
        // 2 < 1 < "x": the chain is already false, but the second link's
        // operands are still checked and the string comparison is invalid.
        let first = relate("<", &num("2"), &num("1")).unwrap();
        assert!(!truth(&first));
        let err = relate("<", &first, &Operand::string("x")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unsupported);
    }

    #[test]
    fn chain_threads_right_operand() {
        // 1 < 5 < 3 must compare 5 against 3, not 1 against 3.
        let first = relate("<", &num("1"), &num("5")).unwrap();
        let second = relate("<", &first, &num("3")).unwrap();
        assert!(!truth(&second));
    }

    #[test]
    fn equality_between_kinds() {
        assert!(truth(&relate("=", &num("1/2"), &num("2/4")).unwrap()));
        assert!(truth(&relate("≠", &num("1"), &Operand::string("1")).unwrap()));
    }

    #[test]
    fn membership_over_containers() {
        let v = Operand::new(Value::Vector(VectorValue::new(
            vec![Scalar::Rational(rat("1")), Scalar::Rational(rat("2"))],
            metron_values::Orientation::Row,
        )));
        assert!(truth(&relate("∈", &num("2"), &v).unwrap()));
        assert!(!truth(&relate("∈", &num("3"), &v).unwrap()));
        assert!(truth(&relate("∋", &v, &num("1")).unwrap()));
        let s = Operand::string("metron");
        assert!(truth(&relate("∈", &Operand::string("tro"), &s).unwrap()));
    }

    #[test]
    fn incompatible_units_fail_comparison() {
        use metron_units::DimensionVector;
        let metre = Operand::with_unit(
            Value::Rational(rat("1")),
            UnitTag::Expos(DimensionVector([1, 0, 0, 0, 0, 0, 0, 0])),
        );
        let second = Operand::with_unit(
            Value::Rational(rat("1")),
            UnitTag::Expos(DimensionVector([0, 0, 1, 0, 0, 0, 0, 0])),
        );
        let err = relate("<", &metre, &second).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnitComp);
    }

    #[test]
    fn vector_comparison_is_elementwise() {
        let v = Operand::new(Value::Vector(VectorValue::new(
            vec![Scalar::Rational(rat("1")), Scalar::Rational(rat("5"))],
            metron_values::Orientation::Row,
        )));
        let out = relate("<", &v, &num("3")).unwrap();
        assert_eq!(
            out.value,
            Value::Vector(VectorValue::new(
                vec![Scalar::Bool(true), Scalar::Bool(false)],
                metron_values::Orientation::Row,
            ))
        );
    }
}
