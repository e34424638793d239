//! Matrix operations over exact scalars.
//!
//! Everything here is hand-rolled over rational (or complex) cells: the
//! arithmetic is exact, so Gauss–Jordan elimination gives exact inverses and
//! a zero pivot column is a definitive singularity, not a conditioning
//! question.

use metron_num::Rational;
use metron_values::{
    CalcError, ErrorKind, MatrixValue, Orientation, Scalar, Value, VectorValue,
};

use crate::binary::{scalar_add, scalar_div, scalar_mul, scalar_neg, scalar_sub};

/// Σ aᵢ·bᵢ over two equal-length vectors.
pub fn dot_product(a: &VectorValue, b: &VectorValue) -> Result<Scalar, CalcError> {
    if a.len() != b.len() {
        return Err(CalcError::new(ErrorKind::MisElNum));
    }
    let mut acc = Scalar::Rational(Rational::zero());
    for (x, y) in a.data.iter().zip(b.data.iter()) {
        acc = scalar_add(&acc, &scalar_mul(x, y)?)?;
    }
    Ok(acc)
}

/// Cross product, defined only for 3-vectors.
pub fn cross_product(a: &VectorValue, b: &VectorValue) -> Result<VectorValue, CalcError> {
    if a.len() != 3 || b.len() != 3 {
        return Err(CalcError::new(ErrorKind::Cross));
    }
    let term = |i: usize, j: usize| -> Result<Scalar, CalcError> {
        scalar_sub(
            &scalar_mul(&a.data[i], &b.data[j])?,
            &scalar_mul(&a.data[j], &b.data[i])?,
        )
    };
    Ok(VectorValue::new(
        vec![term(1, 2)?, term(2, 0)?, term(0, 1)?],
        a.orientation,
    ))
}

/// Column × row outer product.
pub fn outer_product(a: &VectorValue, b: &VectorValue) -> Result<MatrixValue, CalcError> {
    let mut data = Vec::with_capacity(a.len() * b.len());
    for x in &a.data {
        for y in &b.data {
            data.push(scalar_mul(x, y)?);
        }
    }
    MatrixValue::new(data, a.len(), b.len())
}

/// Plain triple-loop matrix product with an inner-dimension check.
pub fn matrix_multiply(a: &MatrixValue, b: &MatrixValue) -> Result<MatrixValue, CalcError> {
    if a.cols != b.rows {
        return Err(CalcError::new(ErrorKind::MisShape));
    }
    let mut data = Vec::with_capacity(a.rows * b.cols);
    for i in 0..a.rows {
        for j in 0..b.cols {
            let mut acc = Scalar::Rational(Rational::zero());
            for k in 0..a.cols {
                acc = scalar_add(
                    &acc,
                    &scalar_mul(&a.data[i * a.cols + k], &b.data[k * b.cols + j])?,
                )?;
            }
            data.push(acc);
        }
    }
    MatrixValue::new(data, a.rows, b.cols)
}

/// Row vector × matrix, result reshaped back to a row vector.
pub fn vector_times_matrix(v: &VectorValue, m: &MatrixValue) -> Result<Value, CalcError> {
    if v.orientation != Orientation::Row {
        return Err(CalcError::new(ErrorKind::MisShape));
    }
    let as_matrix = MatrixValue::new(v.data.clone(), 1, v.len())?;
    let product = matrix_multiply(&as_matrix, m)?;
    Ok(Value::Vector(VectorValue::new(product.data, Orientation::Row)))
}

/// Matrix × column vector, result reshaped back to a column vector.
pub fn matrix_times_vector(m: &MatrixValue, v: &VectorValue) -> Result<Value, CalcError> {
    if v.orientation != Orientation::Column {
        return Err(CalcError::new(ErrorKind::MisShape));
    }
    let as_matrix = MatrixValue::new(v.data.clone(), v.len(), 1)?;
    let product = matrix_multiply(m, &as_matrix)?;
    Ok(Value::Vector(VectorValue::new(product.data, Orientation::Column)))
}

pub fn transpose(m: &MatrixValue) -> MatrixValue {
    let mut data = Vec::with_capacity(m.rows * m.cols);
    for j in 0..m.cols {
        for i in 0..m.rows {
            data.push(m.data[i * m.cols + j].clone());
        }
    }
    MatrixValue { data, rows: m.cols, cols: m.rows }
}

pub fn identity(n: usize) -> MatrixValue {
    let mut data = vec![Scalar::Rational(Rational::zero()); n * n];
    for i in 0..n {
        data[i * n + i] = Scalar::Rational(Rational::one());
    }
    MatrixValue { data, rows: n, cols: n }
}

fn scalar_is_zero(s: &Scalar) -> bool {
    match s {
        Scalar::Rational(r) => r.is_zero(),
        Scalar::Complex(c) => c.is_zero(),
        _ => false,
    }
}

/// Exact determinant by fraction-free Gaussian elimination is unnecessary
/// here: plain elimination over rationals is already exact.
pub fn determinant(m: &MatrixValue) -> Result<Scalar, CalcError> {
    if m.rows != m.cols {
        return Err(CalcError::new(ErrorKind::NonSquare));
    }
    let n = m.rows;
    let mut work = m.data.clone();
    let mut det = Scalar::Rational(Rational::one());
    for col in 0..n {
        // Find a nonzero pivot in this column.
        let pivot_row = (col..n).find(|&r| !scalar_is_zero(&work[r * n + col]));
        let pivot_row = match pivot_row {
            Some(r) => r,
            None => return Ok(Scalar::Rational(Rational::zero())),
        };
        if pivot_row != col {
            for k in 0..n {
                work.swap(pivot_row * n + k, col * n + k);
            }
            det = scalar_neg(&det)?;
        }
        let pivot = work[col * n + col].clone();
        det = scalar_mul(&det, &pivot)?;
        for row in (col + 1)..n {
            let factor = scalar_div(&work[row * n + col], &pivot)?;
            for k in col..n {
                let scaled = scalar_mul(&factor, &work[col * n + k])?;
                work[row * n + k] = scalar_sub(&work[row * n + k], &scaled)?;
            }
        }
    }
    Ok(det)
}

/// Exact inverse by Gauss–Jordan elimination on `[A | I]`.
pub fn inverse(m: &MatrixValue) -> Result<MatrixValue, CalcError> {
    if m.rows != m.cols {
        return Err(CalcError::new(ErrorKind::NonSquare));
    }
    let n = m.rows;
    let mut left = m.data.clone();
    let mut right = identity(n).data;
    for col in 0..n {
        let pivot_row = (col..n)
            .find(|&r| !scalar_is_zero(&left[r * n + col]))
            .ok_or_else(|| CalcError::new(ErrorKind::Singular))?;
        if pivot_row != col {
            for k in 0..n {
                left.swap(pivot_row * n + k, col * n + k);
                right.swap(pivot_row * n + k, col * n + k);
            }
        }
        let pivot = left[col * n + col].clone();
        for k in 0..n {
            left[col * n + k] = scalar_div(&left[col * n + k], &pivot)?;
            right[col * n + k] = scalar_div(&right[col * n + k], &pivot)?;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = left[row * n + col].clone();
            if scalar_is_zero(&factor) {
                continue;
            }
            for k in 0..n {
                let l = scalar_mul(&factor, &left[col * n + k])?;
                left[row * n + k] = scalar_sub(&left[row * n + k], &l)?;
                let r = scalar_mul(&factor, &right[col * n + k])?;
                right[row * n + k] = scalar_sub(&right[row * n + k], &r)?;
            }
        }
    }
    MatrixValue::new(right, n, n)
}

/// Integer matrix power. Zero gives the identity; a negative exponent is
/// the power of the inverse.
pub fn matrix_power(m: &MatrixValue, exp: &Rational) -> Result<MatrixValue, CalcError> {
    if m.rows != m.cols {
        return Err(CalcError::new(ErrorKind::NonSquare));
    }
    let e: i64 = exp
        .trunc()
        .numerator()
        .try_into()
        .map_err(|_| CalcError::with(ErrorKind::IntArg, "matrix exponent"))?;
    let base = if e < 0 { inverse(m)? } else { m.clone() };
    let mut acc = identity(m.rows);
    for _ in 0..e.unsigned_abs() {
        acc = matrix_multiply(&acc, &base)?;
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rat(s: &str) -> Rational {
        s.parse().unwrap()
    }

    fn mat(cells: &[&str], rows: usize, cols: usize) -> MatrixValue {
        MatrixValue::new(
            cells.iter().map(|s| Scalar::Rational(rat(s))).collect(),
            rows,
            cols,
        )
        .unwrap()
    }

    #[test]
    fn multiply_and_transpose() {
        let a = mat(&["1", "2", "3", "4"], 2, 2);
        let b = mat(&["5", "6", "7", "8"], 2, 2);
        let p = matrix_multiply(&a, &b).unwrap();
        assert_eq!(p, mat(&["19", "22", "43", "50"], 2, 2));
        assert_eq!(transpose(&a), mat(&["1", "3", "2", "4"], 2, 2));
    }

    #[test]
    fn determinant_is_exact() {
        let a = mat(&["1", "2", "3", "4"], 2, 2);
        assert_eq!(determinant(&a).unwrap(), Scalar::Rational(rat("-2")));
        let singular = mat(&["1", "2", "2", "4"], 2, 2);
        assert_eq!(determinant(&singular).unwrap(), Scalar::Rational(rat("0")));
        let nonsquare = mat(&["1", "2", "3", "4", "5", "6"], 2, 3);
        assert_eq!(determinant(&nonsquare).unwrap_err().kind, ErrorKind::NonSquare);
    }

    #[test]
    fn inverse_round_trips() {
        let a = mat(&["1", "2", "3", "4"], 2, 2);
        let inv = inverse(&a).unwrap();
        assert_eq!(inv, mat(&["-2", "1", "3/2", "-1/2"], 2, 2));
        let product = matrix_multiply(&a, &inv).unwrap();
        assert_eq!(product, identity(2));
    }

    #[test]
    fn singular_matrices_are_rejected() {
        let singular = mat(&["1", "2", "2", "4"], 2, 2);
        assert_eq!(inverse(&singular).unwrap_err().kind, ErrorKind::Singular);
    }

    #[test]
    fn negative_powers_invert_first() {
        let a = mat(&["2", "0", "0", "4"], 2, 2);
        let p = matrix_power(&a, &rat("-1")).unwrap();
        assert_eq!(p, mat(&["1/2", "0", "0", "1/4"], 2, 2));
        let zeroth = matrix_power(&a, &rat("0")).unwrap();
        assert_eq!(zeroth, identity(2));
    }
}
