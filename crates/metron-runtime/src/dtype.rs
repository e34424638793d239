//! Result-dtype rules.
//!
//! A parallel of the value dispatch: given the dtypes of two operands and an
//! operator, predict the dtype of the result without computing it. The
//! evaluator checks this against the computed operand, which keeps the two
//! tables from drifting apart the way the source's independently-maintained
//! copies could.

use metron_values::{BaseKind, CalcError, ContainerKind, Dtype, ErrorKind};

use crate::binary::{BinaryOp, MulStyle};

fn numeric_base(a: BaseKind, b: BaseKind, op: &str) -> Result<BaseKind, CalcError> {
    match (a, b) {
        (BaseKind::Rational, BaseKind::Rational) => Ok(BaseKind::Rational),
        (BaseKind::Complex, BaseKind::Rational)
        | (BaseKind::Rational, BaseKind::Complex)
        | (BaseKind::Complex, BaseKind::Complex) => Ok(BaseKind::Complex),
        _ => Err(CalcError::with(ErrorKind::BadType, op)),
    }
}

/// Containers combine: a scalar broadcasts into the other operand's
/// container, like containers stay put, and the multiplication styles have
/// their own vector geometry.
fn combine_containers(
    a: ContainerKind,
    b: ContainerKind,
    op: BinaryOp,
) -> Result<ContainerKind, CalcError> {
    use ContainerKind::*;
    // A range participates as the row vector it materializes into.
    let a = if a == Range { RowVector } else { a };
    let b = if b == Range { RowVector } else { b };
    if let BinaryOp::Mul(style) = op {
        if a != None && b != None {
            return match (a, b, style) {
                (_, _, MulStyle::Hadamard) if a == b => Ok(a),
                (RowVector, ColumnVector, _) => Ok(None),
                (ColumnVector, RowVector, MulStyle::Asterisk) => Ok(Matrix),
                (RowVector, RowVector, MulStyle::Dot)
                | (ColumnVector, ColumnVector, MulStyle::Dot) => Ok(None),
                (RowVector, RowVector, MulStyle::Cross)
                | (ColumnVector, ColumnVector, MulStyle::Cross) => Ok(a),
                (Matrix, Matrix, _) => Ok(Matrix),
                (RowVector, Matrix, _) => Ok(RowVector),
                (Matrix, ColumnVector, _) => Ok(ColumnVector),
                _ => Err(CalcError::with(ErrorKind::Unsupported, "×")),
            };
        }
    }
    match (a, b) {
        (None, other) | (other, None) => Ok(other),
        (x, y) if x == y => Ok(x),
        _ => Err(CalcError::with(ErrorKind::Unsupported, op.symbol())),
    }
}

/// Predict the result dtype of a binary operation.
pub fn binary_result_dtype(d1: &Dtype, d2: &Dtype, op: BinaryOp) -> Result<Dtype, CalcError> {
    let container = combine_containers(d1.container, d2.container, op)?;
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Rem => {
            Ok(Dtype {
                base: numeric_base(d1.base, d2.base, op.symbol())?,
                container,
                has_unit: d1.has_unit || d2.has_unit,
                from_comparison: false,
            })
        }
        BinaryOp::Mul(_) => Ok(Dtype {
            base: numeric_base(d1.base, d2.base, op.symbol())?,
            container,
            has_unit: d1.has_unit || d2.has_unit,
            from_comparison: false,
        }),
        BinaryOp::Pow => Ok(Dtype {
            base: numeric_base(d1.base, d2.base, "^")?,
            container: combine_containers(d1.container, ContainerKind::None, op)?,
            has_unit: d1.has_unit,
            from_comparison: false,
        }),
        BinaryOp::Concat => {
            let base = if d1.base == BaseKind::Str || d2.base == BaseKind::Str {
                BaseKind::Str
            } else {
                numeric_base(d1.base, d2.base, "&")?
            };
            Ok(Dtype {
                base,
                container,
                has_unit: d1.has_unit || d2.has_unit,
                from_comparison: false,
            })
        }
        BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => {
            if d1.base != BaseKind::Boolean || d2.base != BaseKind::Boolean {
                return Err(CalcError::new(ErrorKind::NotBoolean));
            }
            Ok(Dtype {
                base: BaseKind::Boolean,
                container,
                has_unit: false,
                from_comparison: false,
            })
        }
    }
}

/// Predict the result dtype of a relational link.
pub fn relational_result_dtype(d1: &Dtype, d2: &Dtype) -> Result<Dtype, CalcError> {
    let container = combine_containers(d1.container, d2.container, BinaryOp::Add)?;
    let _ = (d1.base, d2.base);
    Ok(Dtype {
        base: BaseKind::Boolean,
        container,
        from_comparison: container == ContainerKind::None,
        has_unit: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(base: BaseKind, has_unit: bool) -> Dtype {
        Dtype { base, container: ContainerKind::None, has_unit, from_comparison: false }
    }

    #[test]
    fn scalar_promotion() {
        let d = binary_result_dtype(
            &scalar(BaseKind::Rational, false),
            &scalar(BaseKind::Complex, false),
            BinaryOp::Add,
        )
        .unwrap();
        assert_eq!(d.base, BaseKind::Complex);
        assert_eq!(d.container, ContainerKind::None);
    }

    #[test]
    fn dot_product_collapses_vectors() {
        let row = Dtype {
            base: BaseKind::Rational,
            container: ContainerKind::RowVector,
            has_unit: false,
            from_comparison: false,
        };
        let colv = Dtype { container: ContainerKind::ColumnVector, ..row };
        let d = binary_result_dtype(&row, &colv, BinaryOp::Mul(MulStyle::Dot)).unwrap();
        assert_eq!(d.container, ContainerKind::None);
        let outer = binary_result_dtype(&colv, &row, BinaryOp::Mul(MulStyle::Asterisk)).unwrap();
        assert_eq!(outer.container, ContainerKind::Matrix);
    }

    #[test]
    fn undeclared_pairs_error() {
        let map = Dtype {
            base: BaseKind::Rational,
            container: ContainerKind::Map,
            has_unit: false,
            from_comparison: false,
        };
        let matrix = Dtype { container: ContainerKind::Matrix, ..map };
        assert!(binary_result_dtype(&matrix, &map, BinaryOp::Mul(MulStyle::Asterisk)).is_err());
    }

    #[test]
    fn relations_yield_booleans() {
        let d = relational_result_dtype(
            &scalar(BaseKind::Rational, true),
            &scalar(BaseKind::Rational, true),
        )
        .unwrap();
        assert_eq!(d.base, BaseKind::Boolean);
        assert!(d.from_comparison);
        assert!(!d.has_unit);
    }
}
