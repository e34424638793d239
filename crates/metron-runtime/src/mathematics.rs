//! Mathematical builtin functions.
//!
//! Everything here registers through `#[calc_builtin]` and is reached by
//! name via `call_builtin`. Transcendental functions demand unit-less
//! arguments; rounding and reducers carry units through. Rational kernels
//! that leave the real line (asin 2, ln −1) fall back to the complex float
//! kernel and re-rationalize.

use metron_num::{lanczos_gamma, Complex, Rational};
use metron_units::DimensionVector;
use metron_values::{
    CalcError, ErrorKind, MapValue, MatrixValue, Operand, Scalar, UnitTag, Value, VectorValue,
};
use num_complex::Complex64;

use metron_macros::{calc_builtin, calc_constant};

fn require_unitless(op: &Operand, name: &str) -> Result<(), CalcError> {
    if op.is_unitless() {
        Ok(())
    } else {
        Err(CalcError::with(ErrorKind::UnitIn, name))
    }
}

/// Apply a real kernel with a complex fallback to one scalar cell. A real
/// result that is not finite re-enters through the complex kernel, which is
/// how `asin 2` and `ln(−1)` leave the real line.
fn analytic_cell(
    s: &Scalar,
    f: fn(f64) -> f64,
    g: fn(Complex64) -> Complex64,
) -> Result<Scalar, CalcError> {
    match s {
        Scalar::Rational(r) => {
            let y = f(r.to_f64());
            if y.is_finite() {
                Rational::from_f64(y)
                    .map(Scalar::Rational)
                    .map_err(|_| CalcError::new(ErrorKind::Nan))
            } else {
                let z = g(Complex64::new(r.to_f64(), 0.0));
                if z.re.is_finite() && z.im.is_finite() {
                    Complex::from_c64(z)
                        .map(crate::binary::simplify_complex)
                        .map_err(|_| CalcError::new(ErrorKind::Nan))
                } else {
                    Err(CalcError::new(ErrorKind::Nan))
                }
            }
        }
        Scalar::Complex(c) => c
            .map_c64(g)
            .map(crate::binary::simplify_complex)
            .map_err(|_| CalcError::new(ErrorKind::Nan)),
        _ => Err(CalcError::new(ErrorKind::Nan)),
    }
}

/// Broadcast a scalar kernel over the operand's shape. The result is
/// unit-less, matching the unit-less-argument contract of every caller.
fn map_analytic(
    name: &str,
    op: &Operand,
    f: fn(f64) -> f64,
    g: fn(Complex64) -> Complex64,
) -> Result<Operand, CalcError> {
    require_unitless(op, name)?;
    let value = match &op.value {
        Value::Vector(v) => {
            let data = v
                .data
                .iter()
                .map(|s| analytic_cell(s, f, g))
                .collect::<Result<Vec<_>, _>>()?;
            Value::Vector(VectorValue::new(data, v.orientation))
        }
        Value::Matrix(m) => {
            let data = m
                .data
                .iter()
                .map(|s| analytic_cell(s, f, g))
                .collect::<Result<Vec<_>, _>>()?;
            Value::Matrix(MatrixValue::new(data, m.rows, m.cols)?)
        }
        Value::Map(m) => {
            let values = m
                .values
                .iter()
                .map(|s| analytic_cell(s, f, g))
                .collect::<Result<Vec<_>, _>>()?;
            Value::Map(MapValue { keys: m.keys.clone(), values })
        }
        other => match Scalar::from_value(other) {
            Some(s) => analytic_cell(&s, f, g)?.into_value(),
            None => return Err(CalcError::with(ErrorKind::BadArg, name)),
        },
    };
    Ok(Operand::new(value))
}

// ---------------------------------------------------------------------------
// Trigonometry
// ---------------------------------------------------------------------------

#[calc_builtin(name = "sin", category = "math/trigonometry", summary = "Sine of an angle in radians.")]
fn sin_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("sin", &x, |v| v.sin(), |z| z.sin())
}

#[calc_builtin(name = "cos", category = "math/trigonometry", summary = "Cosine of an angle in radians.")]
fn cos_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("cos", &x, |v| v.cos(), |z| z.cos())
}

#[calc_builtin(name = "tan", category = "math/trigonometry", summary = "Tangent of an angle in radians.")]
fn tan_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("tan", &x, |v| v.tan(), |z| z.tan())
}

#[calc_builtin(name = "sec", category = "math/trigonometry", summary = "Secant of an angle in radians.")]
fn sec_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("sec", &x, |v| 1.0 / v.cos(), |z| Complex64::new(1.0, 0.0) / z.cos())
}

#[calc_builtin(name = "csc", category = "math/trigonometry", summary = "Cosecant of an angle in radians.")]
fn csc_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("csc", &x, |v| 1.0 / v.sin(), |z| Complex64::new(1.0, 0.0) / z.sin())
}

#[calc_builtin(name = "cot", category = "math/trigonometry", summary = "Cotangent of an angle in radians.")]
fn cot_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("cot", &x, |v| 1.0 / v.tan(), |z| Complex64::new(1.0, 0.0) / z.tan())
}

#[calc_builtin(name = "asin", category = "math/trigonometry", summary = "Inverse sine.")]
fn asin_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("asin", &x, |v| v.asin(), |z| z.asin())
}

#[calc_builtin(name = "acos", category = "math/trigonometry", summary = "Inverse cosine.")]
fn acos_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("acos", &x, |v| v.acos(), |z| z.acos())
}

#[calc_builtin(name = "atan", category = "math/trigonometry", summary = "Inverse tangent.")]
fn atan_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("atan", &x, |v| v.atan(), |z| z.atan())
}

#[calc_builtin(name = "asec", category = "math/trigonometry", summary = "Inverse secant.")]
fn asec_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("asec", &x, |v| (1.0 / v).acos(), |z| (Complex64::new(1.0, 0.0) / z).acos())
}

#[calc_builtin(name = "acsc", category = "math/trigonometry", summary = "Inverse cosecant.")]
fn acsc_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("acsc", &x, |v| (1.0 / v).asin(), |z| (Complex64::new(1.0, 0.0) / z).asin())
}

#[calc_builtin(name = "acot", category = "math/trigonometry", summary = "Inverse cotangent.")]
fn acot_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("acot", &x, |v| (1.0 / v).atan(), |z| (Complex64::new(1.0, 0.0) / z).atan())
}

#[calc_builtin(name = "atan2", category = "math/trigonometry", summary = "Two-argument inverse tangent.")]
fn atan2_builtin(y: Operand, x: Operand) -> Result<Operand, CalcError> {
    require_unitless(&y, "atan2")?;
    require_unitless(&x, "atan2")?;
    let yy: Rational = (&y).try_into()?;
    let xx: Rational = (&x).try_into()?;
    Rational::from_f64(yy.to_f64().atan2(xx.to_f64()))
        .map(Operand::rational)
        .map_err(|_| CalcError::new(ErrorKind::Nan))
}

// ---------------------------------------------------------------------------
// Hyperbolics
// ---------------------------------------------------------------------------

#[calc_builtin(name = "sinh", category = "math/hyperbolic", summary = "Hyperbolic sine.")]
fn sinh_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("sinh", &x, |v| v.sinh(), |z| z.sinh())
}

#[calc_builtin(name = "cosh", category = "math/hyperbolic", summary = "Hyperbolic cosine.")]
fn cosh_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("cosh", &x, |v| v.cosh(), |z| z.cosh())
}

#[calc_builtin(name = "tanh", category = "math/hyperbolic", summary = "Hyperbolic tangent.")]
fn tanh_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("tanh", &x, |v| v.tanh(), |z| z.tanh())
}

#[calc_builtin(name = "asinh", category = "math/hyperbolic", summary = "Inverse hyperbolic sine.")]
fn asinh_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("asinh", &x, |v| v.asinh(), |z| (z + (z * z + 1.0).sqrt()).ln())
}

#[calc_builtin(name = "acosh", category = "math/hyperbolic", summary = "Inverse hyperbolic cosine.")]
fn acosh_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("acosh", &x, |v| v.acosh(), |z| (z + (z * z - 1.0).sqrt()).ln())
}

#[calc_builtin(name = "atanh", category = "math/hyperbolic", summary = "Inverse hyperbolic tangent.")]
fn atanh_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("atanh", &x, |v| v.atanh(), |z| {
        ((Complex64::new(1.0, 0.0) + z) / (Complex64::new(1.0, 0.0) - z)).ln() * 0.5
    })
}

// ---------------------------------------------------------------------------
// Exponentials and logarithms
// ---------------------------------------------------------------------------

#[calc_builtin(name = "exp", category = "math/exponential", summary = "e raised to the argument.")]
fn exp_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("exp", &x, |v| v.exp(), |z| z.exp())
}

#[calc_builtin(name = "ln", category = "math/exponential", summary = "Natural logarithm.")]
fn ln_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("ln", &x, |v| v.ln(), |z| z.ln())
}

#[calc_builtin(name = "log", category = "math/exponential", summary = "Base-10 logarithm.")]
fn log_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("log", &x, |v| v.log10(), |z| z.ln() / std::f64::consts::LN_10)
}

#[calc_builtin(name = "log10", category = "math/exponential", summary = "Base-10 logarithm.")]
fn log10_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("log10", &x, |v| v.log10(), |z| z.ln() / std::f64::consts::LN_10)
}

#[calc_builtin(name = "log2", category = "math/exponential", summary = "Base-2 logarithm.")]
fn log2_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_analytic("log2", &x, |v| v.log2(), |z| z.ln() / std::f64::consts::LN_2)
}

#[calc_builtin(name = "sqrt", category = "math/exponential", summary = "Square root.")]
fn sqrt_builtin(x: Operand) -> Result<Operand, CalcError> {
    crate::unary::unary_op("√", &x)
}

#[calc_builtin(name = "abs", category = "math", summary = "Absolute value, vector norm, or determinant.")]
fn abs_builtin(x: Operand) -> Result<Operand, CalcError> {
    crate::unary::unary_op("abs", &x)
}

// ---------------------------------------------------------------------------
// Rounding and integer functions (unit-preserving)
// ---------------------------------------------------------------------------

fn map_rational_cells(
    name: &str,
    op: &Operand,
    f: impl Fn(&Rational) -> Rational + Copy,
) -> Result<Operand, CalcError> {
    let kernel = |s: &Scalar| -> Result<Scalar, CalcError> {
        match s {
            Scalar::Rational(r) => Ok(Scalar::Rational(f(r))),
            _ => Err(CalcError::with(ErrorKind::BadArg, name)),
        }
    };
    let value = match &op.value {
        Value::Vector(v) => Value::Vector(VectorValue::new(
            v.data.iter().map(kernel).collect::<Result<Vec<_>, _>>()?,
            v.orientation,
        )),
        Value::Matrix(m) => Value::Matrix(MatrixValue::new(
            m.data.iter().map(kernel).collect::<Result<Vec<_>, _>>()?,
            m.rows,
            m.cols,
        )?),
        other => match Scalar::from_value(other) {
            Some(s) => kernel(&s)?.into_value(),
            None => return Err(CalcError::with(ErrorKind::BadArg, name)),
        },
    };
    Ok(Operand::with_unit(value, op.unit.clone()))
}

#[calc_builtin(name = "round", category = "math/rounding", summary = "Round half away from zero.")]
fn round_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_rational_cells("round", &x, |r| r.round())
}

#[calc_builtin(name = "floor", category = "math/rounding", summary = "Largest integer not above the argument.")]
fn floor_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_rational_cells("floor", &x, |r| r.floor())
}

#[calc_builtin(name = "ceil", category = "math/rounding", summary = "Smallest integer not below the argument.")]
fn ceil_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_rational_cells("ceil", &x, |r| r.ceil())
}

#[calc_builtin(name = "trunc", category = "math/rounding", summary = "Integer part, toward zero.")]
fn trunc_builtin(x: Operand) -> Result<Operand, CalcError> {
    map_rational_cells("trunc", &x, |r| r.trunc())
}

#[calc_builtin(name = "sign", category = "math", summary = "Sign of the argument: -1, 0 or 1.")]
fn sign_builtin(x: Operand) -> Result<Operand, CalcError> {
    let r: Rational = (&x).try_into()?;
    let s = if r.is_negative() {
        Rational::from_i64(-1)
    } else if r.is_zero() {
        Rational::zero()
    } else {
        Rational::one()
    };
    Ok(Operand::rational(s))
}

#[calc_builtin(name = "gcd", category = "math/integer", summary = "Greatest common divisor.")]
fn gcd_builtin(a: Operand, b: Operand) -> Result<Operand, CalcError> {
    require_unitless(&a, "gcd")?;
    require_unitless(&b, "gcd")?;
    let x: Rational = (&a).try_into()?;
    let y: Rational = (&b).try_into()?;
    x.gcd(&y)
        .map(Operand::rational)
        .map_err(|_| CalcError::with(ErrorKind::IntArg, "gcd"))
}

#[calc_builtin(name = "lcm", category = "math/integer", summary = "Least common multiple.")]
fn lcm_builtin(a: Operand, b: Operand) -> Result<Operand, CalcError> {
    require_unitless(&a, "lcm")?;
    require_unitless(&b, "lcm")?;
    let x: Rational = (&a).try_into()?;
    let y: Rational = (&b).try_into()?;
    let g = x.gcd(&y).map_err(|_| CalcError::with(ErrorKind::IntArg, "lcm"))?;
    if g.is_zero() {
        return Ok(Operand::rational(Rational::zero()));
    }
    Ok(Operand::rational(x.mul(&y).div(&g).abs().normalize()))
}

#[calc_builtin(name = "factorial", category = "math/integer", summary = "Factorial of a non-negative integer.")]
fn factorial_builtin(x: Operand) -> Result<Operand, CalcError> {
    crate::unary::unary_op("!", &x)
}

#[calc_builtin(name = "gamma", category = "math", summary = "The Gamma function.")]
fn gamma_builtin(x: Operand) -> Result<Operand, CalcError> {
    require_unitless(&x, "gamma")?;
    let r: Rational = (&x).try_into()?;
    let g = lanczos_gamma(r.to_f64());
    if g.is_finite() {
        Rational::from_f64(g)
            .map(Operand::rational)
            .map_err(|_| CalcError::new(ErrorKind::Nan))
    } else {
        Err(CalcError::new(ErrorKind::Nan))
    }
}

#[calc_builtin(name = "binomial", category = "math/integer", summary = "Binomial coefficient n choose k.")]
fn binomial_builtin(n: Operand, k: Operand) -> Result<Operand, CalcError> {
    if !n.is_unitless() || !k.is_unitless() {
        return Err(CalcError::new(ErrorKind::Binom));
    }
    let nn: Rational = (&n).try_into().map_err(|_| CalcError::new(ErrorKind::Binom))?;
    let kk: Rational = (&k).try_into().map_err(|_| CalcError::new(ErrorKind::Binom))?;
    if nn.is_integer() && kk.is_integer() && !nn.is_negative() && !kk.is_negative() {
        if kk > nn {
            return Ok(Operand::rational(Rational::zero()));
        }
        let num = nn.factorial().map_err(|_| CalcError::new(ErrorKind::Binom))?;
        let den = kk
            .factorial()
            .map_err(|_| CalcError::new(ErrorKind::Binom))?
            .mul(&nn.sub(&kk).factorial().map_err(|_| CalcError::new(ErrorKind::Binom))?);
        return Ok(Operand::rational(num.div(&den).normalize()));
    }
    // Real arguments extend through the Gamma function.
    let g = lanczos_gamma(nn.to_f64() + 1.0)
        / (lanczos_gamma(kk.to_f64() + 1.0) * lanczos_gamma(nn.to_f64() - kk.to_f64() + 1.0));
    if g.is_finite() {
        Rational::from_f64(g)
            .map(Operand::rational)
            .map_err(|_| CalcError::new(ErrorKind::Binom))
    } else {
        Err(CalcError::new(ErrorKind::Binom))
    }
}

// ---------------------------------------------------------------------------
// Complex-number accessors
// ---------------------------------------------------------------------------

#[calc_builtin(name = "real", category = "math/complex", summary = "Real component.")]
fn real_builtin(x: Operand) -> Result<Operand, CalcError> {
    let z: Complex = (&x).try_into()?;
    Ok(Operand::rational(z.re))
}

#[calc_builtin(name = "imag", category = "math/complex", summary = "Imaginary component.")]
fn imag_builtin(x: Operand) -> Result<Operand, CalcError> {
    let z: Complex = (&x).try_into()?;
    Ok(Operand::rational(z.im))
}

#[calc_builtin(name = "conj", category = "math/complex", summary = "Complex conjugate.")]
fn conj_builtin(x: Operand) -> Result<Operand, CalcError> {
    let z: Complex = (&x).try_into()?;
    Ok(Operand::new(Value::Complex(z.conjugate())))
}

#[calc_builtin(name = "angle", category = "math/complex", summary = "Phase angle of a complex number.")]
fn angle_builtin(x: Operand) -> Result<Operand, CalcError> {
    let z: Complex = (&x).try_into()?;
    z.argument()
        .map(Operand::rational)
        .map_err(|_| CalcError::new(ErrorKind::Origin))
}

// ---------------------------------------------------------------------------
// Reducers
// ---------------------------------------------------------------------------

/// Flatten reducer arguments into rational cells, insisting every quantity
/// among them shares one dimension vector (carried into the result).
fn collect_rationals(
    name: &str,
    args: &[Operand],
) -> Result<(Vec<Rational>, UnitTag), CalcError> {
    let mut cells: Vec<Rational> = Vec::new();
    let mut tag = UnitTag::None;
    let mut tag_dims: Option<DimensionVector> = None;
    for arg in args {
        if let Value::Error(e) = &arg.value {
            return Err(e.clone());
        }
        if let UnitTag::Expos(d) = &arg.unit {
            match &tag_dims {
                None => {
                    tag_dims = Some(*d);
                    tag = arg.unit.clone();
                }
                Some(existing) => {
                    if !metron_units::units_are_compatible(existing, d) {
                        return Err(CalcError::new(ErrorKind::UnitAdd));
                    }
                }
            }
        }
        fn push_scalar(cells: &mut Vec<Rational>, s: &Scalar, name: &str) -> Result<(), CalcError> {
            match s {
                Scalar::Rational(r) => {
                    cells.push(r.clone());
                    Ok(())
                }
                _ => Err(CalcError::with(ErrorKind::BadArg, name)),
            }
        }
        match &arg.value {
            Value::Rational(r) => cells.push(r.clone()),
            Value::Vector(v) => {
                for s in &v.data {
                    push_scalar(&mut cells, s, name)?;
                }
            }
            Value::Matrix(m) => {
                for s in &m.data {
                    push_scalar(&mut cells, s, name)?;
                }
            }
            Value::Range(r) => cells.extend(r.materialize()?),
            Value::Map(m) => {
                for s in &m.values {
                    push_scalar(&mut cells, s, name)?;
                }
            }
            _ => return Err(CalcError::with(ErrorKind::BadArg, name)),
        }
    }
    if cells.is_empty() {
        return Err(CalcError::with(ErrorKind::NumArgs, name));
    }
    Ok((cells, tag))
}

fn sum_of(cells: &[Rational]) -> Rational {
    let mut acc = Rational::zero();
    for c in cells {
        acc = acc.add(c);
    }
    acc
}

#[calc_builtin(name = "sum", category = "math/reducer", summary = "Sum of the arguments' cells.")]
fn sum_builtin(args: Vec<Operand>) -> Result<Operand, CalcError> {
    let (cells, tag) = collect_rationals("sum", &args)?;
    Ok(Operand::with_unit(Value::Rational(sum_of(&cells)), tag))
}

#[calc_builtin(name = "mean", category = "math/reducer", summary = "Arithmetic mean.")]
fn mean_builtin(args: Vec<Operand>) -> Result<Operand, CalcError> {
    let (cells, tag) = collect_rationals("mean", &args)?;
    let n = Rational::from_i64(cells.len() as i64);
    Ok(Operand::with_unit(
        Value::Rational(sum_of(&cells).div(&n).normalize()),
        tag,
    ))
}

#[calc_builtin(name = "median", category = "math/reducer", summary = "Median value.")]
fn median_builtin(args: Vec<Operand>) -> Result<Operand, CalcError> {
    let (mut cells, tag) = collect_rationals("median", &args)?;
    cells.sort();
    let n = cells.len();
    let mid = if n % 2 == 1 {
        cells[n / 2].clone()
    } else {
        cells[n / 2 - 1]
            .add(&cells[n / 2])
            .div(&Rational::from_i64(2))
            .normalize()
    };
    Ok(Operand::with_unit(Value::Rational(mid), tag))
}

#[calc_builtin(name = "product", category = "math/reducer", summary = "Product of unit-less cells.")]
fn product_builtin(args: Vec<Operand>) -> Result<Operand, CalcError> {
    for arg in &args {
        require_unitless(arg, "product")?;
    }
    let (cells, _) = collect_rationals("product", &args)?;
    let mut acc = Rational::one();
    for c in &cells {
        acc = acc.mul(c);
    }
    Ok(Operand::rational(acc))
}

#[calc_builtin(name = "max", category = "math/reducer", summary = "Largest cell.")]
fn max_builtin(args: Vec<Operand>) -> Result<Operand, CalcError> {
    let (cells, tag) = collect_rationals("max", &args)?;
    let best = cells.into_iter().max().expect("non-empty");
    Ok(Operand::with_unit(Value::Rational(best), tag))
}

#[calc_builtin(name = "min", category = "math/reducer", summary = "Smallest cell.")]
fn min_builtin(args: Vec<Operand>) -> Result<Operand, CalcError> {
    let (cells, tag) = collect_rationals("min", &args)?;
    let best = cells.into_iter().min().expect("non-empty");
    Ok(Operand::with_unit(Value::Rational(best), tag))
}

fn sample_variance(cells: &[Rational]) -> Result<Rational, CalcError> {
    if cells.len() < 2 {
        return Err(CalcError::with(ErrorKind::BadArg, "variance"));
    }
    let n = Rational::from_i64(cells.len() as i64);
    let mean = sum_of(cells).div(&n).normalize();
    let mut acc = Rational::zero();
    for c in cells {
        let d = c.sub(&mean);
        acc = acc.add(&d.mul(&d));
    }
    Ok(acc
        .div(&Rational::from_i64(cells.len() as i64 - 1))
        .normalize())
}

#[calc_builtin(name = "variance", category = "math/reducer", summary = "Sample variance.")]
fn variance_builtin(args: Vec<Operand>) -> Result<Operand, CalcError> {
    let (cells, tag) = collect_rationals("variance", &args)?;
    let v = sample_variance(&cells)?;
    let tag = match tag {
        UnitTag::Expos(d) => UnitTag::Expos(
            d.scale(&Rational::from_i64(2))
                .map_err(|_| CalcError::new(ErrorKind::UnitPow))?,
        ),
        other => other,
    };
    Ok(Operand::with_unit(Value::Rational(v), tag))
}

#[calc_builtin(name = "stddev", category = "math/reducer", summary = "Sample standard deviation.")]
fn stddev_builtin(args: Vec<Operand>) -> Result<Operand, CalcError> {
    let (cells, tag) = collect_rationals("stddev", &args)?;
    let v = sample_variance(&cells)?;
    let root = v.sqrt().map_err(|_| CalcError::new(ErrorKind::Nan))?;
    Ok(Operand::with_unit(Value::Rational(root), tag))
}

// ---------------------------------------------------------------------------
// Container and string queries
// ---------------------------------------------------------------------------

#[calc_builtin(name = "length", category = "container", summary = "Element count of a value.")]
fn length_builtin(x: Operand) -> Result<Operand, CalcError> {
    let n = match &x.value {
        Value::Str(s) => s.chars().count(),
        Value::Vector(v) => v.len(),
        Value::Matrix(m) => m.rows * m.cols,
        Value::Map(m) => m.len(),
        Value::Range(r) => r.len(),
        Value::DataFrame(d) => d.row_count(),
        _ => 1,
    };
    Ok(Operand::rational(Rational::from_i64(n as i64)))
}

#[calc_builtin(name = "count", category = "container", summary = "Occurrences of a value in a container or substring in a string.")]
fn count_builtin(haystack: Operand, needle: Operand) -> Result<Operand, CalcError> {
    let n = match (&haystack.value, &needle.value) {
        (Value::Str(s), Value::Str(sub)) => {
            if sub.is_empty() {
                0
            } else {
                s.matches(sub.as_str()).count()
            }
        }
        (Value::Vector(v), other) => match Scalar::from_value(other) {
            Some(target) => v
                .data
                .iter()
                .filter(|s| crate::comparison::scalar_equal(s, &target))
                .count(),
            None => return Err(CalcError::with(ErrorKind::BadArg, "count")),
        },
        _ => return Err(CalcError::with(ErrorKind::BadArg, "count")),
    };
    Ok(Operand::rational(Rational::from_i64(n as i64)))
}

#[calc_builtin(name = "findfirst", category = "container", summary = "1-based position of the first match, 0 when absent.")]
fn findfirst_builtin(args: Vec<Operand>) -> Result<Operand, CalcError> {
    let position = match args {
        ref a if a.len() == 1 => match &a[0].value {
            // One argument: the first true element of a boolean vector.
            Value::Vector(v) => v
                .data
                .iter()
                .position(|s| matches!(s, Scalar::Bool(true)))
                .map(|i| i + 1)
                .unwrap_or(0),
            _ => return Err(CalcError::with(ErrorKind::BadArg, "findfirst")),
        },
        ref a if a.len() == 2 => match (&a[0].value, &a[1].value) {
            (needle, Value::Vector(v)) => match Scalar::from_value(needle) {
                Some(target) => v
                    .data
                    .iter()
                    .position(|s| crate::comparison::scalar_equal(s, &target))
                    .map(|i| i + 1)
                    .unwrap_or(0),
                None => return Err(CalcError::with(ErrorKind::BadArg, "findfirst")),
            },
            (Value::Str(sub), Value::Str(s)) => s
                .find(sub.as_str())
                .map(|byte| s[..byte].chars().count() + 1)
                .unwrap_or(0),
            _ => return Err(CalcError::with(ErrorKind::BadArg, "findfirst")),
        },
        _ => return Err(CalcError::with(ErrorKind::NumArgs, "findfirst")),
    };
    Ok(Operand::rational(Rational::from_i64(position as i64)))
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

#[calc_constant(name = "pi")]
fn pi_constant() -> Operand {
    Operand::rational(Rational::from_f64(std::f64::consts::PI).expect("pi"))
}

#[calc_constant(name = "e")]
fn e_constant() -> Operand {
    Operand::rational(Rational::from_f64(std::f64::consts::E).expect("e"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_builtin;

    fn rat(s: &str) -> Rational {
        s.parse().unwrap()
    }

    fn num(s: &str) -> Operand {
        Operand::rational(rat(s))
    }

    #[test]
    fn trig_rejects_quantities() {
        let metre = Operand::with_unit(
            Value::Rational(rat("1")),
            UnitTag::Expos(DimensionVector([1, 0, 0, 0, 0, 0, 0, 0])),
        );
        let err = call_builtin("sin", &[metre]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnitIn);
        assert_eq!(err.message(), "The function sin takes only unit-less arguments.");
    }

    #[test]
    fn sine_of_pi_over_six() {
        let x = num("1/2");
        let out = call_builtin("asin", &[x]).unwrap();
        let r: Rational = (&out).try_into().unwrap();
        assert!((r.to_f64() - std::f64::consts::FRAC_PI_6).abs() < 1e-12);
    }

    #[test]
    fn asin_leaves_the_real_line() {
        let out = call_builtin("asin", &[num("2")]).unwrap();
        assert!(matches!(out.value, Value::Complex(_)));
    }

    #[test]
    fn ln_of_negative_is_complex() {
        let out = call_builtin("ln", &[num("-1")]).unwrap();
        match out.value {
            Value::Complex(z) => {
                assert!(z.re.is_zero());
                assert!((z.im.to_f64() - std::f64::consts::PI).abs() < 1e-12);
            }
            other => panic!("expected complex, got {other:?}"),
        }
    }

    #[test]
    fn reducers_carry_units() {
        let tag = UnitTag::Expos(DimensionVector([1, 0, 0, 0, 0, 0, 0, 0]));
        let a = Operand::with_unit(Value::Rational(rat("2")), tag.clone());
        let b = Operand::with_unit(Value::Rational(rat("3")), tag.clone());
        let out = call_builtin("sum", &[a, b]).unwrap();
        assert_eq!(out.value, Value::Rational(rat("5")));
        assert_eq!(out.unit, tag);
    }

    #[test]
    fn mean_is_exact() {
        let out = call_builtin("mean", &[num("1"), num("2"), num("4")]).unwrap();
        assert_eq!(out.value, Value::Rational(rat("7/3")));
    }

    #[test]
    fn variance_and_stddev() {
        let args = [num("2"), num("4"), num("4"), num("4"), num("5"), num("5"), num("7"), num("9")];
        let v = call_builtin("variance", &args).unwrap();
        assert_eq!(v.value, Value::Rational(rat("32/7")));
        let s = call_builtin("stddev", &args).unwrap();
        let r: Rational = (&s).try_into().unwrap();
        assert!((r.to_f64() - (32.0f64 / 7.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn binomial_exact_and_errors() {
        let out = call_builtin("binomial", &[num("5"), num("2")]).unwrap();
        assert_eq!(out.value, Value::Rational(rat("10")));
        let metre = Operand::with_unit(
            Value::Rational(rat("5")),
            UnitTag::Expos(DimensionVector([1, 0, 0, 0, 0, 0, 0, 0])),
        );
        assert_eq!(
            call_builtin("binomial", &[metre, num("2")]).unwrap_err().kind,
            ErrorKind::Binom
        );
    }

    #[test]
    fn findfirst_positions() {
        let v = Operand::new(Value::Vector(VectorValue::new(
            vec![
                Scalar::Rational(rat("4")),
                Scalar::Rational(rat("7")),
                Scalar::Rational(rat("7")),
            ],
            metron_values::Orientation::Row,
        )));
        let out = call_builtin("findfirst", &[num("7"), v]).unwrap();
        assert_eq!(out.value, Value::Rational(rat("2")));
        let missing = call_builtin("findfirst", &[
            num("1"),
            Operand::new(Value::Vector(VectorValue::new(vec![], metron_values::Orientation::Row))),
        ])
        .unwrap();
        assert_eq!(missing.value, Value::Rational(rat("0")));
    }

    #[test]
    fn gcd_lcm() {
        assert_eq!(
            call_builtin("gcd", &[num("12"), num("18")]).unwrap().value,
            Value::Rational(rat("6"))
        );
        assert_eq!(
            call_builtin("lcm", &[num("4"), num("6")]).unwrap().value,
            Value::Rational(rat("12"))
        );
    }
}
