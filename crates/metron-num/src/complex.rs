//! Complex arithmetic over rational components.
//!
//! Add/sub/mul stay exact. Division uses Smith's algorithm, branching on
//! which component of the divisor has the larger magnitude. Transcendentals
//! go through `num_complex::Complex64` float kernels and re-rationalize;
//! `pow` snaps a near-zero imaginary part back to exact zero so pure-real
//! results do not pick up float noise.

use std::fmt;

use num_complex::Complex64;

use crate::rational::Rational;

/// Relative magnitude below which an imaginary component produced by a float
/// kernel is considered exponentiation noise and snapped to exact zero.
const REAL_SNAP: f64 = 1e-15;

#[derive(Clone, Debug, PartialEq)]
pub struct Complex {
    pub re: Rational,
    pub im: Rational,
}

impl Complex {
    pub fn new(re: Rational, im: Rational) -> Self {
        Complex { re, im }
    }

    pub fn from_rational(re: Rational) -> Self {
        Complex { re, im: Rational::zero() }
    }

    pub fn zero() -> Self {
        Complex::from_rational(Rational::zero())
    }

    /// The unit imaginary, i.
    pub fn i() -> Self {
        Complex { re: Rational::zero(), im: Rational::one() }
    }

    pub fn is_zero(&self) -> bool {
        self.re.is_zero() && self.im.is_zero()
    }

    pub fn is_real(&self) -> bool {
        self.im.is_zero()
    }

    pub fn is_division_by_zero(&self) -> bool {
        self.re.is_division_by_zero() || self.im.is_division_by_zero()
    }

    pub fn division_by_zero() -> Self {
        Complex {
            re: Rational::division_by_zero(),
            im: Rational::division_by_zero(),
        }
    }

    pub fn conjugate(&self) -> Complex {
        Complex { re: self.re.clone(), im: self.im.neg() }
    }

    pub fn neg(&self) -> Complex {
        Complex { re: self.re.neg(), im: self.im.neg() }
    }

    pub fn add(&self, other: &Complex) -> Complex {
        Complex {
            re: self.re.add(&other.re),
            im: self.im.add(&other.im),
        }
    }

    pub fn sub(&self, other: &Complex) -> Complex {
        Complex {
            re: self.re.sub(&other.re),
            im: self.im.sub(&other.im),
        }
    }

    /// Distributive expansion: (a+bi)(c+di) = (ac−bd) + (ad+bc)i.
    pub fn mul(&self, other: &Complex) -> Complex {
        Complex {
            re: self.re.mul(&other.re).sub(&self.im.mul(&other.im)),
            im: self.re.mul(&other.im).add(&self.im.mul(&other.re)),
        }
    }

    /// Smith's algorithm: scale by the divisor component with the larger
    /// magnitude so neither intermediate product overflows its precision.
    pub fn div(&self, other: &Complex) -> Complex {
        if other.is_zero() {
            return Complex::division_by_zero();
        }
        if other.re.abs() >= other.im.abs() {
            let t = other.im.div(&other.re).normalize();
            let den = other.re.add(&other.im.mul(&t));
            Complex {
                re: self.re.add(&self.im.mul(&t)).div(&den),
                im: self.im.sub(&self.re.mul(&t)).div(&den),
            }
        } else {
            let t = other.re.div(&other.im).normalize();
            let den = other.re.mul(&t).add(&other.im);
            Complex {
                re: self.re.mul(&t).add(&self.im).div(&den),
                im: self.im.mul(&t).sub(&self.re).div(&den),
            }
        }
    }

    /// |z|, exact when the squared magnitude is a perfect square.
    pub fn magnitude(&self) -> Result<Rational, String> {
        self.re
            .mul(&self.re)
            .add(&self.im.mul(&self.im))
            .sqrt()
    }

    /// Phase angle in radians. Undefined at the origin.
    pub fn argument(&self) -> Result<Rational, String> {
        if self.is_zero() {
            return Err("the phase angle of zero is undefined".to_string());
        }
        Rational::from_f64(self.im.to_f64().atan2(self.re.to_f64()))
    }

    pub fn to_c64(&self) -> Complex64 {
        Complex64::new(self.re.to_f64(), self.im.to_f64())
    }

    pub fn from_c64(value: Complex64) -> Result<Complex, String> {
        Ok(Complex {
            re: Rational::from_f64(value.re)?,
            im: Rational::from_f64(value.im)?,
        })
    }

    /// Float-kernel bridge shared by the transcendental family.
    pub fn map_c64(&self, f: impl Fn(Complex64) -> Complex64) -> Result<Complex, String> {
        Complex::from_c64(f(self.to_c64()))
    }

    pub fn exp(&self) -> Result<Complex, String> {
        self.map_c64(|z| z.exp())
    }

    pub fn ln(&self) -> Result<Complex, String> {
        if self.is_zero() {
            return Err("logarithm of zero is undefined".to_string());
        }
        self.map_c64(|z| z.ln())
    }

    pub fn sqrt(&self) -> Result<Complex, String> {
        if self.is_real() {
            // Keep pure-real roots exact where the rational layer can.
            if self.re.is_negative() {
                let root = self.re.abs().sqrt()?;
                return Ok(Complex { re: Rational::zero(), im: root });
            }
            return Ok(Complex::from_rational(self.re.sqrt()?));
        }
        self.map_c64(|z| z.sqrt())
    }

    /// z^w via exp(ln(z)·w), with the pure-real cases routed through the
    /// rational layer and float noise in the imaginary part snapped away.
    pub fn pow(&self, exp: &Complex) -> Result<Complex, String> {
        if self.is_zero() {
            if exp.is_zero() {
                return Ok(Complex::from_rational(Rational::one()));
            }
            if exp.re.is_negative() {
                return Ok(Complex::division_by_zero());
            }
            return Ok(Complex::zero());
        }
        if self.is_real() && exp.is_real() {
            if !self.re.is_negative() || exp.re.is_integer() {
                return Ok(Complex::from_rational(self.re.pow(&exp.re)?));
            }
            // A half exponent of a negative real goes through the exact
            // square-root path rather than the polar identity.
            if exp.re == Rational::from_i64(1).div(&Rational::from_i64(2)) {
                return self.sqrt();
            }
        }
        let raw = self.to_c64().powc(exp.to_c64());
        if !raw.re.is_finite() || !raw.im.is_finite() {
            return Err("power result is out of range".to_string());
        }
        Ok(snap_to_real(Complex::from_c64(raw)?))
    }

    /// asinh z = ln(z + √(z² + 1))
    pub fn asinh(&self) -> Result<Complex, String> {
        self.map_c64(|z| (z + (z * z + 1.0).sqrt()).ln())
    }

    /// acosh z = ln(z + √(z² − 1))
    pub fn acosh(&self) -> Result<Complex, String> {
        self.map_c64(|z| (z + (z * z - 1.0).sqrt()).ln())
    }

    /// atanh z = ½ ln((1 + z) / (1 − z))
    pub fn atanh(&self) -> Result<Complex, String> {
        self.map_c64(|z| ((Complex64::new(1.0, 0.0) + z) / (Complex64::new(1.0, 0.0) - z)).ln() * 0.5)
    }
}

/// Snap an imaginary component that is vanishingly small relative to the
/// real component back to exact zero.
fn snap_to_real(value: Complex) -> Complex {
    let re_mag = value.re.to_f64().abs();
    let im_mag = value.im.to_f64().abs();
    if im_mag <= re_mag * REAL_SNAP {
        Complex { re: value.re, im: Rational::zero() }
    } else {
        value
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.im.is_zero() {
            write!(f, "{}", self.re)
        } else if self.im.is_negative() {
            write!(f, "{} - {}i", self.re, self.im.abs())
        } else {
            write!(f, "{} + {}i", self.re, self.im)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rat(s: &str) -> Rational {
        s.parse().unwrap()
    }

    fn cplx(re: &str, im: &str) -> Complex {
        Complex::new(rat(re), rat(im))
    }

    #[test]
    fn multiplication_expands_distributively() {
        // (1+2i)(3+4i) = -5 + 10i
        let p = cplx("1", "2").mul(&cplx("3", "4"));
        assert_eq!(p, cplx("-5", "10"));
    }

    #[test]
    fn smith_division_is_exact() {
        // (1+2i)/(3+4i) = (11 + 2i)/25
        let q = cplx("1", "2").div(&cplx("3", "4"));
        assert_eq!(q.re.normalize(), rat("11/25"));
        assert_eq!(q.im.normalize(), rat("2/25"));
        // Dividing a product by a factor recovers the other factor.
        let a = cplx("2", "-7");
        let b = cplx("-3", "5");
        let back = a.mul(&b).div(&b);
        assert_eq!(back.re.normalize(), a.re);
        assert_eq!(back.im.normalize(), a.im);
    }

    #[test]
    fn division_by_zero_is_structural() {
        let q = cplx("1", "1").div(&Complex::zero());
        assert!(q.is_division_by_zero());
    }

    #[test]
    fn argument_errors_at_origin() {
        assert!(Complex::zero().argument().is_err());
        let arg = Complex::i().argument().unwrap().to_f64();
        assert!((arg - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn sqrt_of_negative_real_is_pure_imaginary() {
        let r = Complex::from_rational(rat("-9/4")).sqrt().unwrap();
        assert_eq!(r, cplx("0", "3/2"));
    }

    #[test]
    fn pow_snaps_float_noise_to_real() {
        // i^2 = -1 exactly, no residual imaginary part.
        let sq = Complex::i().pow(&Complex::from_rational(rat("2"))).unwrap();
        assert!(sq.is_real());
        assert!((sq.re.to_f64() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pure_real_pow_stays_exact() {
        let r = Complex::from_rational(rat("2"))
            .pow(&Complex::from_rational(rat("10")))
            .unwrap();
        assert_eq!(r, Complex::from_rational(rat("1024")));
        let neg = Complex::from_rational(rat("-2"))
            .pow(&Complex::from_rational(rat("3")))
            .unwrap();
        assert_eq!(neg, Complex::from_rational(rat("-8")));
    }

    #[test]
    fn exp_ln_round_trip() {
        let z = cplx("1/2", "1/3");
        let back = z.exp().unwrap().ln().unwrap();
        assert!((back.re.to_f64() - 0.5).abs() < 1e-9);
        assert!((back.im.to_f64() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn inverse_hyperbolics_match_identities() {
        let z = cplx("3/4", "0");
        let v = z.asinh().unwrap().re.to_f64();
        assert!((v - 0.75f64.asinh()).abs() < 1e-9);
        let w = cplx("1/2", "0").atanh().unwrap().re.to_f64();
        assert!((w - 0.5f64.atanh()).abs() < 1e-9);
    }
}
