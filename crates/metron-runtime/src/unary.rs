//! Unary operator dispatch: negation, logical not, factorials, transpose,
//! square root and the absolute-value bars.

use metron_num::{Complex, Rational};
use metron_values::{
    CalcError, ErrorKind, Operand, Scalar, UnitTag, Value, VectorValue,
};

use crate::binary::{materialized, scalar_neg, simplify_complex, value_has_division_by_zero};
use crate::matrix;

fn scalar_sqrt(s: &Scalar) -> Result<Scalar, CalcError> {
    match s {
        Scalar::Rational(r) => {
            if r.is_negative() {
                Complex::from_rational(r.clone())
                    .sqrt()
                    .map(Scalar::Complex)
                    .map_err(|_| CalcError::new(ErrorKind::Nan))
            } else {
                r.sqrt()
                    .map(Scalar::Rational)
                    .map_err(|_| CalcError::new(ErrorKind::Nan))
            }
        }
        Scalar::Complex(c) => c
            .sqrt()
            .map(simplify_complex)
            .map_err(|_| CalcError::new(ErrorKind::Nan)),
        _ => Err(CalcError::with(ErrorKind::BadType, "√")),
    }
}

fn map_cells(
    value: &Value,
    f: impl Fn(&Scalar) -> Result<Scalar, CalcError>,
    op: &str,
) -> Result<Value, CalcError> {
    match value {
        Value::Vector(v) => {
            let data = v.data.iter().map(&f).collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Vector(VectorValue::new(data, v.orientation)))
        }
        Value::Matrix(m) => {
            let data = m.data.iter().map(&f).collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Matrix(metron_values::MatrixValue::new(data, m.rows, m.cols)?))
        }
        Value::Map(m) => {
            let values = m.values.iter().map(&f).collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Map(metron_values::MapValue { keys: m.keys.clone(), values }))
        }
        other => match Scalar::from_value(other) {
            Some(s) => Ok(f(&s)?.into_value()),
            None => Err(CalcError::with(ErrorKind::Unsupported, op)),
        },
    }
}

/// Halve the dimension exponents for a square root; errors when an odd
/// exponent would go fractional.
fn sqrt_unit(unit: &UnitTag) -> Result<UnitTag, CalcError> {
    match unit {
        UnitTag::Expos(d) => {
            let half = Rational::from_i64(1).div(&Rational::from_i64(2));
            Ok(UnitTag::Expos(
                d.scale(&half).map_err(|_| CalcError::new(ErrorKind::UnitPow))?,
            ))
        }
        other => Ok(other.clone()),
    }
}

/// The unary dispatch entry point. Token names arrive from the evaluator:
/// `neg`, `not`, `!`, `‼`, `ᵀ`, `√`, `abs`.
pub fn unary_op(op: &str, a: &Operand) -> Result<Operand, CalcError> {
    if let Value::Error(e) = &a.value {
        return Err(e.clone());
    }
    let a = materialized(a)?;
    let result = match op {
        "neg" => Operand::with_unit(map_cells(&a.value, |s| scalar_neg(s), "neg")?, a.unit.clone()),
        "not" | "¬" => match &a.value {
            Value::Bool(b) => Operand::boolean(!*b),
            _ => return Err(CalcError::new(ErrorKind::NotBoolean)),
        },
        "!" => match &a.value {
            Value::Rational(r) => {
                if !a.is_unitless() || r.is_negative() || !r.is_integer() {
                    return Err(CalcError::new(ErrorKind::Fact));
                }
                Operand::rational(r.factorial().map_err(|_| CalcError::new(ErrorKind::Fact))?)
            }
            _ => return Err(CalcError::new(ErrorKind::Fact)),
        },
        "‼" => match &a.value {
            Value::Rational(r) => {
                if !a.is_unitless() || r.is_negative() || !r.is_integer() {
                    return Err(CalcError::new(ErrorKind::Fact));
                }
                Operand::rational(
                    r.double_factorial()
                        .map_err(|_| CalcError::new(ErrorKind::Fact))?,
                )
            }
            _ => return Err(CalcError::new(ErrorKind::Fact)),
        },
        "ᵀ" | "transpose" => match &a.value {
            Value::Vector(v) => Operand::with_unit(Value::Vector(v.transpose()), a.unit.clone()),
            Value::Matrix(m) => {
                Operand::with_unit(Value::Matrix(matrix::transpose(m)), a.unit.clone())
            }
            other if Scalar::from_value(other).is_some() => a.clone(),
            _ => return Err(CalcError::with(ErrorKind::Unsupported, "ᵀ")),
        },
        "√" => Operand::with_unit(map_cells(&a.value, scalar_sqrt, "√")?, sqrt_unit(&a.unit)?),
        "abs" => match &a.value {
            Value::Rational(r) => Operand::with_unit(Value::Rational(r.abs()), a.unit.clone()),
            Value::Complex(c) => Operand::with_unit(
                Value::Rational(c.magnitude().map_err(|_| CalcError::new(ErrorKind::Nan))?),
                a.unit.clone(),
            ),
            // |v| is the Euclidean norm; |M| is the determinant.
            Value::Vector(v) => {
                let square = matrix::dot_product(v, v)?;
                Operand::with_unit(scalar_sqrt(&square)?.into_value(), a.unit.clone())
            }
            Value::Matrix(m) => Operand::new(matrix::determinant(m)?.into_value()),
            _ => return Err(CalcError::with(ErrorKind::Unsupported, "| |")),
        },
        other => return Err(CalcError::with(ErrorKind::BadToken, other)),
    };
    if value_has_division_by_zero(&result.value) {
        return Err(CalcError::new(ErrorKind::Div));
    }
    Ok(result)
}
