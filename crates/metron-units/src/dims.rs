//! Base-dimension exponent vectors.

use metron_num::Rational;

/// Number of base physical dimensions tracked per quantity.
pub const BASE_DIMENSIONS: usize = 8;

/// Slot order: length, mass, time, electric current, temperature,
/// amount of substance, luminous intensity, currency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DimensionVector(pub [i8; BASE_DIMENSIONS]);

impl DimensionVector {
    pub const UNITLESS: DimensionVector = DimensionVector([0; BASE_DIMENSIONS]);

    pub fn is_dimensionless(&self) -> bool {
        self.0.iter().all(|&e| e == 0)
    }

    /// Exponent sum, for multiplication of quantities.
    pub fn add(&self, other: &DimensionVector) -> Result<DimensionVector, String> {
        let mut out = [0i8; BASE_DIMENSIONS];
        for i in 0..BASE_DIMENSIONS {
            out[i] = self.0[i]
                .checked_add(other.0[i])
                .ok_or_else(|| "unit exponent overflow".to_string())?;
        }
        Ok(DimensionVector(out))
    }

    /// Exponent difference, for division of quantities.
    pub fn sub(&self, other: &DimensionVector) -> Result<DimensionVector, String> {
        let mut out = [0i8; BASE_DIMENSIONS];
        for i in 0..BASE_DIMENSIONS {
            out[i] = self.0[i]
                .checked_sub(other.0[i])
                .ok_or_else(|| "unit exponent overflow".to_string())?;
        }
        Ok(DimensionVector(out))
    }

    /// Scale every exponent by a rational power. Defined only when every
    /// scaled entry stays an integer within range: `m²` to the power `1/2`
    /// is metres, `m` to the power `1/2` is not a unit.
    pub fn scale(&self, power: &Rational) -> Result<DimensionVector, String> {
        let mut out = [0i8; BASE_DIMENSIONS];
        for i in 0..BASE_DIMENSIONS {
            let scaled = Rational::from_i64(self.0[i] as i64).mul(power);
            if !scaled.is_integer() {
                return Err("fractional unit exponent".to_string());
            }
            out[i] = scaled
                .trunc()
                .numerator()
                .try_into()
                .map_err(|_| "unit exponent overflow".to_string())?;
        }
        Ok(DimensionVector(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_sub_are_inverse() {
        let speed = DimensionVector([1, 0, -1, 0, 0, 0, 0, 0]);
        let time = DimensionVector([0, 0, 1, 0, 0, 0, 0, 0]);
        let length = speed.add(&time).unwrap();
        assert_eq!(length, DimensionVector([1, 0, 0, 0, 0, 0, 0, 0]));
        assert_eq!(length.sub(&time).unwrap(), speed);
    }

    #[test]
    fn scale_rejects_fractional_exponents() {
        let area = DimensionVector([2, 0, 0, 0, 0, 0, 0, 0]);
        let half = "1/2".parse().unwrap();
        assert_eq!(
            area.scale(&half).unwrap(),
            DimensionVector([1, 0, 0, 0, 0, 0, 0, 0])
        );
        let length = DimensionVector([1, 0, 0, 0, 0, 0, 0, 0]);
        assert!(length.scale(&half).is_err());
    }
}
