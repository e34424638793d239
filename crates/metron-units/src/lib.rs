//! Unit and dimension system.
//!
//! Every quantity carries an 8-slot exponent vector over the base physical
//! dimensions. Two quantities are compatible iff their vectors are equal
//! element-wise. Named units map a plain value into base units through
//! `base = (plain + gauge) * factor`; `gauge` is the affine offset used by
//! temperature scales.

pub mod dims;
pub mod unit;

pub use dims::DimensionVector;
pub use unit::{unit_from_name, Unit};

use metron_num::Rational;

/// Compatibility gate for `+`, `-`, relational links and container appends.
pub fn units_are_compatible(a: &DimensionVector, b: &DimensionVector) -> bool {
    a == b
}

/// Map an author-entered plain value into base units.
pub fn to_base_units(plain: &Rational, unit: &Unit) -> Rational {
    plain.add(&unit.gauge).mul(&unit.factor)
}

/// Inverse map from base units back to the unit's plain value.
pub fn from_base_units(base: &Rational, unit: &Unit) -> Rational {
    base.div(&unit.factor).normalize().sub(&unit.gauge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compatibility_is_reflexive_and_symmetric() {
        let v = unit_from_name("N").unwrap().dims;
        let w = unit_from_name("lbf").unwrap().dims;
        assert!(units_are_compatible(&v, &v));
        assert_eq!(
            units_are_compatible(&v, &w),
            units_are_compatible(&w, &v)
        );
        assert!(units_are_compatible(&v, &w));
    }

    #[test]
    fn feet_and_yards_share_a_base() {
        let ft = unit_from_name("ft").unwrap();
        let yd = unit_from_name("yards").unwrap();
        let four_ft = to_base_units(&"4".parse().unwrap(), &ft);
        let three_yd = to_base_units(&"3".parse().unwrap(), &yd);
        let sum = four_ft.add(&three_yd);
        // 4 ft + 3 yd = 3.9624 m exactly.
        assert_eq!(sum, "4953/1250".parse().unwrap());
        assert_eq!(from_base_units(&sum, &ft), "13".parse().unwrap());
    }

    #[test]
    fn celsius_gauge_round_trip() {
        let c = unit_from_name("°C").unwrap();
        let base = to_base_units(&"25".parse().unwrap(), &c);
        assert_eq!(base, "29815/100".parse().unwrap());
        assert_eq!(from_base_units(&base, &c), "25".parse().unwrap());
    }

    #[test]
    fn fahrenheit_freezing_point() {
        let f = unit_from_name("°F").unwrap();
        let base = to_base_units(&"32".parse().unwrap(), &f);
        assert_eq!(base, "27315/100".parse().unwrap());
    }
}
