//! Binary operator dispatch.
//!
//! Each operator dispatches on the shape pair of its operands. Element-wise
//! ops check shape agreement first (`MIS_ELNUM`); multiplication picks its
//! algorithm from the user's token (`×` cross, `·` dot, `∘` Hadamard, `*`
//! matrix product), not from shapes alone. Undeclared shape pairs are typed
//! errors. Division by zero is never pre-checked: the computed result is
//! inspected for a zero denominator across every shape.

use metron_num::{Complex, Rational};
use metron_units::DimensionVector;
use metron_values::{
    CalcError, ErrorKind, MapValue, MatrixValue, Operand, Orientation, Scalar, UnitTag, Value,
    VectorValue,
};

use crate::matrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MulStyle {
    /// `×` — cross product for vectors, matrix product for matrices.
    Cross,
    /// `·` — dot product.
    Dot,
    /// `∘` — Hadamard (element-wise) product.
    Hadamard,
    /// `*` or juxtaposition — scalar or matrix product.
    Asterisk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul(MulStyle),
    Div,
    Pow,
    Mod,
    Rem,
    Concat,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    pub fn from_token(token: &str) -> Option<BinaryOp> {
        match token {
            "+" => Some(BinaryOp::Add),
            "-" | "−" => Some(BinaryOp::Sub),
            "×" => Some(BinaryOp::Mul(MulStyle::Cross)),
            "·" => Some(BinaryOp::Mul(MulStyle::Dot)),
            "∘" => Some(BinaryOp::Mul(MulStyle::Hadamard)),
            "*" => Some(BinaryOp::Mul(MulStyle::Asterisk)),
            "/" | "÷" => Some(BinaryOp::Div),
            "^" => Some(BinaryOp::Pow),
            "mod" => Some(BinaryOp::Mod),
            "rem" => Some(BinaryOp::Rem),
            "&" => Some(BinaryOp::Concat),
            "and" | "∧" => Some(BinaryOp::And),
            "or" | "∨" => Some(BinaryOp::Or),
            "xor" | "⊻" => Some(BinaryOp::Xor),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul(MulStyle::Cross) => "×",
            BinaryOp::Mul(MulStyle::Dot) => "·",
            BinaryOp::Mul(MulStyle::Hadamard) => "∘",
            BinaryOp::Mul(MulStyle::Asterisk) => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
            BinaryOp::Mod => "mod",
            BinaryOp::Rem => "rem",
            BinaryOp::Concat => "&",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
        }
    }
}

// ---------------------------------------------------------------------------
// Scalar kernels. Containers reduce to these cell by cell.
// ---------------------------------------------------------------------------

pub(crate) fn scalar_add(a: &Scalar, b: &Scalar) -> Result<Scalar, CalcError> {
    match (a, b) {
        (Scalar::Rational(x), Scalar::Rational(y)) => Ok(Scalar::Rational(x.add(y))),
        (Scalar::Complex(x), Scalar::Complex(y)) => Ok(Scalar::Complex(x.add(y))),
        (Scalar::Complex(x), Scalar::Rational(y)) => {
            Ok(Scalar::Complex(x.add(&Complex::from_rational(y.clone()))))
        }
        (Scalar::Rational(x), Scalar::Complex(y)) => {
            Ok(Scalar::Complex(Complex::from_rational(x.clone()).add(y)))
        }
        _ => Err(CalcError::with(ErrorKind::BadType, "+")),
    }
}

pub(crate) fn scalar_sub(a: &Scalar, b: &Scalar) -> Result<Scalar, CalcError> {
    scalar_add(a, &scalar_neg(b)?)
}

pub(crate) fn scalar_neg(a: &Scalar) -> Result<Scalar, CalcError> {
    match a {
        Scalar::Rational(x) => Ok(Scalar::Rational(x.neg())),
        Scalar::Complex(x) => Ok(Scalar::Complex(x.neg())),
        _ => Err(CalcError::with(ErrorKind::BadType, "-")),
    }
}

pub(crate) fn scalar_mul(a: &Scalar, b: &Scalar) -> Result<Scalar, CalcError> {
    match (a, b) {
        (Scalar::Rational(x), Scalar::Rational(y)) => Ok(Scalar::Rational(x.mul(y))),
        (Scalar::Complex(x), Scalar::Complex(y)) => Ok(Scalar::Complex(x.mul(y))),
        (Scalar::Complex(x), Scalar::Rational(y)) => {
            Ok(Scalar::Complex(x.mul(&Complex::from_rational(y.clone()))))
        }
        (Scalar::Rational(x), Scalar::Complex(y)) => {
            Ok(Scalar::Complex(Complex::from_rational(x.clone()).mul(y)))
        }
        _ => Err(CalcError::with(ErrorKind::BadType, "*")),
    }
}

pub(crate) fn scalar_div(a: &Scalar, b: &Scalar) -> Result<Scalar, CalcError> {
    match (a, b) {
        (Scalar::Rational(x), Scalar::Rational(y)) => Ok(Scalar::Rational(x.div(y))),
        (Scalar::Complex(x), Scalar::Complex(y)) => Ok(Scalar::Complex(x.div(y))),
        (Scalar::Complex(x), Scalar::Rational(y)) => {
            Ok(Scalar::Complex(x.div(&Complex::from_rational(y.clone()))))
        }
        (Scalar::Rational(x), Scalar::Complex(y)) => {
            Ok(Scalar::Complex(Complex::from_rational(x.clone()).div(y)))
        }
        _ => Err(CalcError::with(ErrorKind::BadType, "/")),
    }
}

fn scalar_mod(a: &Scalar, b: &Scalar) -> Result<Scalar, CalcError> {
    match (a, b) {
        (Scalar::Rational(x), Scalar::Rational(y)) => Ok(Scalar::Rational(x.modulo(y))),
        _ => Err(CalcError::with(ErrorKind::BadType, "mod")),
    }
}

fn scalar_rem(a: &Scalar, b: &Scalar) -> Result<Scalar, CalcError> {
    match (a, b) {
        (Scalar::Rational(x), Scalar::Rational(y)) => Ok(Scalar::Rational(x.rem_trunc(y))),
        _ => Err(CalcError::with(ErrorKind::BadType, "rem")),
    }
}

/// Rational exponentiation escapes to the complex layer when a negative
/// base meets a non-integer exponent.
pub(crate) fn scalar_pow(a: &Scalar, b: &Scalar) -> Result<Scalar, CalcError> {
    match (a, b) {
        (Scalar::Rational(x), Scalar::Rational(y)) => {
            if x.is_negative() && !y.is_integer() {
                let z = Complex::from_rational(x.clone())
                    .pow(&Complex::from_rational(y.clone()))
                    .map_err(|_| CalcError::new(ErrorKind::Nan))?;
                return Ok(Scalar::Complex(z));
            }
            x.pow(y)
                .map(Scalar::Rational)
                .map_err(|_| CalcError::new(ErrorKind::Nan))
        }
        (Scalar::Complex(x), Scalar::Complex(y)) => x
            .pow(y)
            .map(simplify_complex)
            .map_err(|_| CalcError::new(ErrorKind::Nan)),
        (Scalar::Complex(x), Scalar::Rational(y)) => x
            .pow(&Complex::from_rational(y.clone()))
            .map(simplify_complex)
            .map_err(|_| CalcError::new(ErrorKind::Nan)),
        (Scalar::Rational(x), Scalar::Complex(y)) => Complex::from_rational(x.clone())
            .pow(y)
            .map(simplify_complex)
            .map_err(|_| CalcError::new(ErrorKind::Nan)),
        _ => Err(CalcError::with(ErrorKind::BadType, "^")),
    }
}

/// Collapse a complex result whose imaginary part is exactly zero back to a
/// rational scalar.
pub(crate) fn simplify_complex(z: Complex) -> Scalar {
    if z.is_real() && !z.is_division_by_zero() {
        Scalar::Rational(z.re)
    } else {
        Scalar::Complex(z)
    }
}

// ---------------------------------------------------------------------------
// Container walkers.
// ---------------------------------------------------------------------------

type Kernel = fn(&Scalar, &Scalar) -> Result<Scalar, CalcError>;

fn zip_vectors(a: &VectorValue, b: &VectorValue, f: Kernel) -> Result<VectorValue, CalcError> {
    if a.len() != b.len() {
        return Err(CalcError::new(ErrorKind::MisElNum));
    }
    let data = a
        .data
        .iter()
        .zip(b.data.iter())
        .map(|(x, y)| f(x, y))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(VectorValue::new(data, a.orientation))
}

fn map_vector(v: &VectorValue, f: impl Fn(&Scalar) -> Result<Scalar, CalcError>) -> Result<VectorValue, CalcError> {
    let data = v.data.iter().map(f).collect::<Result<Vec<_>, _>>()?;
    Ok(VectorValue::new(data, v.orientation))
}

fn zip_matrices(a: &MatrixValue, b: &MatrixValue, f: Kernel) -> Result<MatrixValue, CalcError> {
    if a.rows != b.rows || a.cols != b.cols {
        return Err(CalcError::new(ErrorKind::MisElNum));
    }
    let data = a
        .data
        .iter()
        .zip(b.data.iter())
        .map(|(x, y)| f(x, y))
        .collect::<Result<Vec<_>, _>>()?;
    MatrixValue::new(data, a.rows, a.cols)
}

fn map_matrix(m: &MatrixValue, f: impl Fn(&Scalar) -> Result<Scalar, CalcError>) -> Result<MatrixValue, CalcError> {
    let data = m.data.iter().map(f).collect::<Result<Vec<_>, _>>()?;
    MatrixValue::new(data, m.rows, m.cols)
}

fn zip_maps(a: &MapValue, b: &MapValue, f: Kernel) -> Result<MapValue, CalcError> {
    if a.keys != b.keys {
        return Err(CalcError::new(ErrorKind::MisElNum));
    }
    let values = a
        .values
        .iter()
        .zip(b.values.iter())
        .map(|(x, y)| f(x, y))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(MapValue { keys: a.keys.clone(), values })
}

fn map_map(m: &MapValue, f: impl Fn(&Scalar) -> Result<Scalar, CalcError>) -> Result<MapValue, CalcError> {
    let values = m.values.iter().map(f).collect::<Result<Vec<_>, _>>()?;
    Ok(MapValue { keys: m.keys.clone(), values })
}

/// Element-wise dispatch shared by `+ - / mod rem ∘`: scalars broadcast
/// over vectors, matrices and maps; like containers zip cell by cell.
fn elementwise(f: Kernel, a: &Value, b: &Value, op: &str) -> Result<Value, CalcError> {
    match (Scalar::from_value(a), Scalar::from_value(b)) {
        (Some(sa), Some(sb)) => return Ok(f(&sa, &sb)?.into_value()),
        (Some(sa), None) => match b {
            Value::Vector(v) => return Ok(Value::Vector(map_vector(v, |x| f(&sa, x))?)),
            Value::Matrix(m) => return Ok(Value::Matrix(map_matrix(m, |x| f(&sa, x))?)),
            Value::Map(m) => return Ok(Value::Map(map_map(m, |x| f(&sa, x))?)),
            _ => {}
        },
        (None, Some(sb)) => match a {
            Value::Vector(v) => return Ok(Value::Vector(map_vector(v, |x| f(x, &sb))?)),
            Value::Matrix(m) => return Ok(Value::Matrix(map_matrix(m, |x| f(x, &sb))?)),
            Value::Map(m) => return Ok(Value::Map(map_map(m, |x| f(x, &sb))?)),
            _ => {}
        },
        (None, None) => match (a, b) {
            (Value::Vector(va), Value::Vector(vb)) => {
                return Ok(Value::Vector(zip_vectors(va, vb, f)?))
            }
            (Value::Matrix(ma), Value::Matrix(mb)) => {
                return Ok(Value::Matrix(zip_matrices(ma, mb, f)?))
            }
            (Value::Map(ma), Value::Map(mb)) => return Ok(Value::Map(zip_maps(ma, mb, f)?)),
            _ => {}
        },
    }
    Err(CalcError::with(ErrorKind::Unsupported, op))
}

/// Multiplication dispatch. The algorithm follows the token, not just the
/// shapes: this is user-facing notation and must be preserved exactly.
fn multiply(style: MulStyle, a: &Value, b: &Value) -> Result<Value, CalcError> {
    if style == MulStyle::Hadamard {
        return elementwise(scalar_mul, a, b, "∘");
    }
    // Scalars broadcast under every multiplication token.
    if Scalar::from_value(a).is_some() || Scalar::from_value(b).is_some() {
        return elementwise(scalar_mul, a, b, "*");
    }
    match (a, b) {
        (Value::Vector(va), Value::Vector(vb)) => match style {
            MulStyle::Dot => Ok(matrix::dot_product(va, vb)?.into_value()),
            MulStyle::Cross => {
                // Row × column is a product even under the cross token; the
                // cross product proper needs two like-oriented 3-vectors.
                if va.orientation == Orientation::Row && vb.orientation == Orientation::Column {
                    Ok(matrix::dot_product(va, vb)?.into_value())
                } else if va.len() == 3 && vb.len() == 3 {
                    Ok(Value::Vector(matrix::cross_product(va, vb)?))
                } else {
                    Err(CalcError::new(ErrorKind::Cross))
                }
            }
            MulStyle::Asterisk => match (va.orientation, vb.orientation) {
                (Orientation::Row, Orientation::Column) => {
                    Ok(matrix::dot_product(va, vb)?.into_value())
                }
                (Orientation::Column, Orientation::Row) => {
                    Ok(Value::Matrix(matrix::outer_product(va, vb)?))
                }
                _ => Err(CalcError::new(ErrorKind::MisShape)),
            },
            MulStyle::Hadamard => unreachable!("handled above"),
        },
        (Value::Vector(v), Value::Matrix(m)) => matrix::vector_times_matrix(v, m),
        (Value::Matrix(m), Value::Vector(v)) => matrix::matrix_times_vector(m, v),
        (Value::Matrix(ma), Value::Matrix(mb)) => {
            Ok(Value::Matrix(matrix::matrix_multiply(ma, mb)?))
        }
        _ => Err(CalcError::with(ErrorKind::Unsupported, "×")),
    }
}

fn power(a: &Value, b: &Value) -> Result<Value, CalcError> {
    match (a, b) {
        (Value::Matrix(m), _) => {
            let exp = match Scalar::from_value(b) {
                Some(Scalar::Rational(r)) if r.is_integer() => r,
                _ => return Err(CalcError::with(ErrorKind::IntArg, "matrix exponent")),
            };
            Ok(Value::Matrix(matrix::matrix_power(m, &exp)?))
        }
        (Value::Vector(v), _) => match Scalar::from_value(b) {
            Some(sb) => Ok(Value::Vector(map_vector(v, |x| scalar_pow(x, &sb))?)),
            None => Err(CalcError::with(ErrorKind::Unsupported, "^")),
        },
        (Value::Map(m), _) => match Scalar::from_value(b) {
            Some(sb) => Ok(Value::Map(map_map(m, |x| scalar_pow(x, &sb))?)),
            None => Err(CalcError::with(ErrorKind::Unsupported, "^")),
        },
        _ => match (Scalar::from_value(a), Scalar::from_value(b)) {
            (Some(sa), Some(sb)) => Ok(scalar_pow(&sa, &sb)?.into_value()),
            _ => Err(CalcError::with(ErrorKind::Unsupported, "^")),
        },
    }
}

fn concat(a: &Value, b: &Value) -> Result<Value, CalcError> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(Value::Str(format!("{x}{y}"))),
        (Value::Str(x), other) if Scalar::from_value(other).is_some() => {
            Ok(Value::Str(format!("{x}{other}")))
        }
        (other, Value::Str(y)) if Scalar::from_value(other).is_some() => {
            Ok(Value::Str(format!("{other}{y}")))
        }
        (Value::Vector(va), Value::Vector(vb)) => {
            if va.orientation != vb.orientation {
                return Err(CalcError::new(ErrorKind::MisShape));
            }
            let mut data = va.data.clone();
            data.extend(vb.data.iter().cloned());
            Ok(Value::Vector(VectorValue::new(data, va.orientation)))
        }
        (Value::Vector(v), other) => match Scalar::from_value(other) {
            Some(s) => {
                let mut data = v.data.clone();
                data.push(s);
                Ok(Value::Vector(VectorValue::new(data, v.orientation)))
            }
            None => Err(CalcError::with(ErrorKind::Unsupported, "&")),
        },
        (other, Value::Vector(v)) => match Scalar::from_value(other) {
            Some(s) => {
                let mut data = vec![s];
                data.extend(v.data.iter().cloned());
                Ok(Value::Vector(VectorValue::new(data, v.orientation)))
            }
            None => Err(CalcError::with(ErrorKind::Unsupported, "&")),
        },
        _ => Err(CalcError::with(ErrorKind::Unsupported, "&")),
    }
}

fn logical(op: BinaryOp, a: &Value, b: &Value) -> Result<Value, CalcError> {
    let (x, y) = match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => (*x, *y),
        _ => return Err(CalcError::new(ErrorKind::NotBoolean)),
    };
    let out = match op {
        BinaryOp::And => x && y,
        BinaryOp::Or => x || y,
        BinaryOp::Xor => x ^ y,
        _ => unreachable!(),
    };
    Ok(Value::Bool(out))
}

// ---------------------------------------------------------------------------
// Units.
// ---------------------------------------------------------------------------

/// Unit-aware gating happens only on `Expos` tags: under plain evaluation a
/// named unit is a display hint and arithmetic ignores it.
fn aware_expos(op: &Operand) -> Option<&DimensionVector> {
    match &op.unit {
        UnitTag::Expos(d) => Some(d),
        _ => None,
    }
}

fn exponent_rational(b: &Operand) -> Result<Rational, CalcError> {
    if aware_expos(b).map(|d| !d.is_dimensionless()).unwrap_or(false) {
        return Err(CalcError::new(ErrorKind::UnitPow));
    }
    match &b.value {
        Value::Rational(r) => Ok(r.clone()),
        _ => Err(CalcError::new(ErrorKind::UnitPow)),
    }
}

fn result_unit(op: BinaryOp, a: &Operand, b: &Operand) -> Result<UnitTag, CalcError> {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mod | BinaryOp::Rem | BinaryOp::Concat => {
            match (aware_expos(a), aware_expos(b)) {
                (Some(da), Some(db)) => {
                    if !metron_units::units_are_compatible(da, db) {
                        return Err(CalcError::new(ErrorKind::UnitAdd));
                    }
                    Ok(a.unit.clone())
                }
                (Some(da), None) => {
                    if !da.is_dimensionless() {
                        return Err(CalcError::new(ErrorKind::UnitAdd));
                    }
                    Ok(a.unit.clone())
                }
                (None, Some(db)) => {
                    if !db.is_dimensionless() {
                        return Err(CalcError::new(ErrorKind::UnitAdd));
                    }
                    Ok(b.unit.clone())
                }
                (None, None) => {
                    // Plain evaluation: carry the first declared unit along.
                    if !a.unit.is_none() {
                        Ok(a.unit.clone())
                    } else {
                        Ok(b.unit.clone())
                    }
                }
            }
        }
        BinaryOp::Mul(_) => match (aware_expos(a), aware_expos(b)) {
            (Some(da), Some(db)) => Ok(UnitTag::Expos(
                da.add(db).map_err(|_| CalcError::new(ErrorKind::UnitPow))?,
            )),
            (Some(da), None) => Ok(UnitTag::Expos(*da)),
            (None, Some(db)) => Ok(UnitTag::Expos(*db)),
            (None, None) => Ok(UnitTag::None),
        },
        BinaryOp::Div => match (aware_expos(a), aware_expos(b)) {
            (Some(da), Some(db)) => Ok(UnitTag::Expos(
                da.sub(db).map_err(|_| CalcError::new(ErrorKind::UnitPow))?,
            )),
            (Some(da), None) => Ok(UnitTag::Expos(*da)),
            (None, Some(db)) => Ok(UnitTag::Expos(
                DimensionVector::UNITLESS
                    .sub(db)
                    .map_err(|_| CalcError::new(ErrorKind::UnitPow))?,
            )),
            (None, None) => Ok(UnitTag::None),
        },
        BinaryOp::Pow => match aware_expos(a) {
            Some(da) if !da.is_dimensionless() => {
                let exp = exponent_rational(b)?;
                Ok(UnitTag::Expos(
                    da.scale(&exp).map_err(|_| CalcError::new(ErrorKind::UnitPow))?,
                ))
            }
            Some(da) => Ok(UnitTag::Expos(*da)),
            None => Ok(UnitTag::None),
        },
        BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => Ok(UnitTag::None),
    }
}

/// Zero-denominator sweep across every shape, the structural detection
/// required by the error contract.
pub fn value_has_division_by_zero(value: &Value) -> bool {
    fn scalar_poisoned(s: &Scalar) -> bool {
        match s {
            Scalar::Rational(r) => r.is_division_by_zero(),
            Scalar::Complex(c) => c.is_division_by_zero(),
            _ => false,
        }
    }
    match value {
        Value::Rational(r) => r.is_division_by_zero(),
        Value::Complex(c) => c.is_division_by_zero(),
        Value::Vector(v) => v.data.iter().any(scalar_poisoned),
        Value::Matrix(m) => m.data.iter().any(scalar_poisoned),
        Value::Map(m) => m.values.iter().any(scalar_poisoned),
        _ => false,
    }
}

/// A range participates in arithmetic as the vector it denotes.
pub(crate) fn materialized(op: &Operand) -> Result<Operand, CalcError> {
    match &op.value {
        Value::Range(r) => {
            let data = r.materialize()?.into_iter().map(Scalar::Rational).collect();
            Ok(Operand::with_unit(
                Value::Vector(VectorValue::new(data, Orientation::Row)),
                op.unit.clone(),
            ))
        }
        Value::Chained(c) => Ok(Operand::with_unit(
            Value::Bool(c.truth),
            op.unit.clone(),
        )),
        _ => Ok(op.clone()),
    }
}

/// The binary dispatch entry point. Propagates error operands unchanged,
/// gates units, computes the value for the shape pair, and sweeps the
/// result for structural division by zero.
pub fn binary_op(op: BinaryOp, a: &Operand, b: &Operand) -> Result<Operand, CalcError> {
    if let Value::Error(e) = &a.value {
        return Err(e.clone());
    }
    if let Value::Error(e) = &b.value {
        return Err(e.clone());
    }
    let a = materialized(a)?;
    let b = materialized(b)?;
    let unit = result_unit(op, &a, &b)?;
    let value = match op {
        BinaryOp::Add => elementwise(scalar_add, &a.value, &b.value, "+")?,
        BinaryOp::Sub => elementwise(scalar_sub, &a.value, &b.value, "-")?,
        BinaryOp::Mul(style) => multiply(style, &a.value, &b.value)?,
        BinaryOp::Div => elementwise(scalar_div, &a.value, &b.value, "/")?,
        BinaryOp::Mod => elementwise(scalar_mod, &a.value, &b.value, "mod")?,
        BinaryOp::Rem => elementwise(scalar_rem, &a.value, &b.value, "rem")?,
        BinaryOp::Pow => power(&a.value, &b.value)?,
        BinaryOp::Concat => concat(&a.value, &b.value)?,
        BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => logical(op, &a.value, &b.value)?,
    };
    if value_has_division_by_zero(&value) {
        return Err(CalcError::new(ErrorKind::Div));
    }
    Ok(Operand::with_unit(value, unit))
}
