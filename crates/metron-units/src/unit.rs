//! Unit registry and name resolution.
//!
//! Simple names resolve against a lazy static table (with SI-prefix
//! splitting), and a small grammar composes compound units from `·`, `/`,
//! `^` and superscript exponents. Factors are exact rationals; the table
//! keeps them as decimal strings so `ft` is exactly `0.3048 m`.

use std::collections::HashMap;

use metron_num::Rational;
use once_cell::sync::Lazy;

use crate::dims::{DimensionVector, BASE_DIMENSIONS};

#[derive(Clone, Debug, PartialEq)]
pub struct Unit {
    pub name: String,
    pub factor: Rational,
    pub gauge: Rational,
    pub dims: DimensionVector,
}

struct UnitEntry {
    names: &'static [&'static str],
    factor: &'static str,
    gauge: &'static str,
    prefixable: bool,
    dims: [i8; BASE_DIMENSIONS],
}

// Slot order: length, mass, time, current, temperature, amount, luminous, currency.
#[rustfmt::skip]
const UNIT_TABLE: &[UnitEntry] = &[
    // Length
    UnitEntry { names: &["m", "meter", "meters", "metre", "metres"], factor: "1", gauge: "0", prefixable: true, dims: [1, 0, 0, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["ft", "foot", "feet"], factor: "0.3048", gauge: "0", prefixable: false, dims: [1, 0, 0, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["yd", "yard", "yards"], factor: "0.9144", gauge: "0", prefixable: false, dims: [1, 0, 0, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["in", "inch", "inches"], factor: "0.0254", gauge: "0", prefixable: false, dims: [1, 0, 0, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["mi", "mile", "miles"], factor: "1609.344", gauge: "0", prefixable: false, dims: [1, 0, 0, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["nmi", "NM"], factor: "1852", gauge: "0", prefixable: false, dims: [1, 0, 0, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["Å", "angstrom"], factor: "0.0000000001", gauge: "0", prefixable: false, dims: [1, 0, 0, 0, 0, 0, 0, 0] },
    // Mass (base unit kg, so the gram carries factor 0.001)
    UnitEntry { names: &["g", "gram", "grams", "gramme"], factor: "0.001", gauge: "0", prefixable: true, dims: [0, 1, 0, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["lb", "lbm", "pound", "pounds"], factor: "0.45359237", gauge: "0", prefixable: false, dims: [0, 1, 0, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["oz", "ounce", "ounces"], factor: "0.028349523125", gauge: "0", prefixable: false, dims: [0, 1, 0, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["tonne", "tonnes", "t"], factor: "1000", gauge: "0", prefixable: false, dims: [0, 1, 0, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["ton", "tons"], factor: "907.18474", gauge: "0", prefixable: false, dims: [0, 1, 0, 0, 0, 0, 0, 0] },
    // Time
    UnitEntry { names: &["s", "sec", "second", "seconds"], factor: "1", gauge: "0", prefixable: true, dims: [0, 0, 1, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["min", "minute", "minutes"], factor: "60", gauge: "0", prefixable: false, dims: [0, 0, 1, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["h", "hr", "hour", "hours"], factor: "3600", gauge: "0", prefixable: false, dims: [0, 0, 1, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["day", "days"], factor: "86400", gauge: "0", prefixable: false, dims: [0, 0, 1, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["week", "weeks"], factor: "604800", gauge: "0", prefixable: false, dims: [0, 0, 1, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["year", "years", "yr"], factor: "31556952", gauge: "0", prefixable: false, dims: [0, 0, 1, 0, 0, 0, 0, 0] },
    // Electric current
    UnitEntry { names: &["A", "amp", "ampere", "amperes"], factor: "1", gauge: "0", prefixable: true, dims: [0, 0, 0, 1, 0, 0, 0, 0] },
    // Temperature (gauge carries the affine origin offset)
    UnitEntry { names: &["K", "kelvin"], factor: "1", gauge: "0", prefixable: true, dims: [0, 0, 0, 0, 1, 0, 0, 0] },
    UnitEntry { names: &["°C", "℃", "celsius"], factor: "1", gauge: "273.15", prefixable: false, dims: [0, 0, 0, 0, 1, 0, 0, 0] },
    UnitEntry { names: &["°F", "℉", "fahrenheit"], factor: "5/9", gauge: "459.67", prefixable: false, dims: [0, 0, 0, 0, 1, 0, 0, 0] },
    // Amount of substance, luminous intensity
    UnitEntry { names: &["mol", "mole", "moles"], factor: "1", gauge: "0", prefixable: true, dims: [0, 0, 0, 0, 0, 1, 0, 0] },
    UnitEntry { names: &["cd", "candela"], factor: "1", gauge: "0", prefixable: true, dims: [0, 0, 0, 0, 0, 0, 1, 0] },
    // Currency (exchange-rate resolution is the caller's concern)
    UnitEntry { names: &["USD", "$"], factor: "1", gauge: "0", prefixable: false, dims: [0, 0, 0, 0, 0, 0, 0, 1] },
    // Derived SI
    UnitEntry { names: &["N", "newton", "newtons"], factor: "1", gauge: "0", prefixable: true, dims: [1, 1, -2, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["Pa", "pascal", "pascals"], factor: "1", gauge: "0", prefixable: true, dims: [-1, 1, -2, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["J", "joule", "joules"], factor: "1", gauge: "0", prefixable: true, dims: [2, 1, -2, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["W", "watt", "watts"], factor: "1", gauge: "0", prefixable: true, dims: [2, 1, -3, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["Hz", "hertz"], factor: "1", gauge: "0", prefixable: true, dims: [0, 0, -1, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["C", "coulomb", "coulombs"], factor: "1", gauge: "0", prefixable: true, dims: [0, 0, 1, 1, 0, 0, 0, 0] },
    UnitEntry { names: &["V", "volt", "volts"], factor: "1", gauge: "0", prefixable: true, dims: [2, 1, -3, -1, 0, 0, 0, 0] },
    UnitEntry { names: &["Ω", "ohm", "ohms"], factor: "1", gauge: "0", prefixable: true, dims: [2, 1, -3, -2, 0, 0, 0, 0] },
    UnitEntry { names: &["F", "farad", "farads"], factor: "1", gauge: "0", prefixable: true, dims: [-2, -1, 4, 2, 0, 0, 0, 0] },
    UnitEntry { names: &["S", "siemens"], factor: "1", gauge: "0", prefixable: true, dims: [-2, -1, 3, 2, 0, 0, 0, 0] },
    UnitEntry { names: &["H", "henry"], factor: "1", gauge: "0", prefixable: true, dims: [2, 1, -2, -2, 0, 0, 0, 0] },
    UnitEntry { names: &["T", "tesla"], factor: "1", gauge: "0", prefixable: true, dims: [0, 1, -2, -1, 0, 0, 0, 0] },
    UnitEntry { names: &["Wb", "weber"], factor: "1", gauge: "0", prefixable: true, dims: [2, 1, -2, -1, 0, 0, 0, 0] },
    UnitEntry { names: &["lx", "lux"], factor: "1", gauge: "0", prefixable: true, dims: [-2, 0, 0, 0, 0, 0, 1, 0] },
    // Area and volume
    UnitEntry { names: &["ha", "hectare", "hectares"], factor: "10000", gauge: "0", prefixable: false, dims: [2, 0, 0, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["acre", "acres"], factor: "4046.8564224", gauge: "0", prefixable: false, dims: [2, 0, 0, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["L", "l", "liter", "liters", "litre", "litres"], factor: "0.001", gauge: "0", prefixable: true, dims: [3, 0, 0, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["gal", "gallon", "gallons"], factor: "0.003785411784", gauge: "0", prefixable: false, dims: [3, 0, 0, 0, 0, 0, 0, 0] },
    // Speed
    UnitEntry { names: &["mph"], factor: "0.44704", gauge: "0", prefixable: false, dims: [1, 0, -1, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["knot", "knots", "kn"], factor: "463/900", gauge: "0", prefixable: false, dims: [1, 0, -1, 0, 0, 0, 0, 0] },
    // Force, energy, power, pressure (non-SI)
    UnitEntry { names: &["lbf"], factor: "4.4482216152605", gauge: "0", prefixable: false, dims: [1, 1, -2, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["dyn", "dyne"], factor: "0.00001", gauge: "0", prefixable: false, dims: [1, 1, -2, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["cal", "calorie", "calories"], factor: "4.184", gauge: "0", prefixable: true, dims: [2, 1, -2, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["eV"], factor: "0.0000000000000000001602176634", gauge: "0", prefixable: true, dims: [2, 1, -2, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["Wh"], factor: "3600", gauge: "0", prefixable: true, dims: [2, 1, -2, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["hp", "horsepower"], factor: "745.69987158227022", gauge: "0", prefixable: false, dims: [2, 1, -3, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["atm"], factor: "101325", gauge: "0", prefixable: false, dims: [-1, 1, -2, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["bar"], factor: "100000", gauge: "0", prefixable: true, dims: [-1, 1, -2, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["psi"], factor: "6894.757293168361", gauge: "0", prefixable: false, dims: [-1, 1, -2, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["mmHg"], factor: "133.322387415", gauge: "0", prefixable: false, dims: [-1, 1, -2, 0, 0, 0, 0, 0] },
    // Dimensionless
    UnitEntry { names: &["%", "percent"], factor: "0.01", gauge: "0", prefixable: false, dims: [0, 0, 0, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["ppm"], factor: "0.000001", gauge: "0", prefixable: false, dims: [0, 0, 0, 0, 0, 0, 0, 0] },
    UnitEntry { names: &["rad", "radian", "radians"], factor: "1", gauge: "0", prefixable: true, dims: [0, 0, 0, 0, 0, 0, 0, 0] },
];

static UNIT_INDEX: Lazy<HashMap<&'static str, &'static UnitEntry>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for entry in UNIT_TABLE {
        for name in entry.names {
            map.insert(*name, entry);
        }
    }
    map
});

/// SI prefixes, longest spelling first so `da` wins over `d`.
const SI_PREFIXES: &[(&str, &str)] = &[
    ("da", "10"),
    ("Y", "1e24"),
    ("Z", "1e21"),
    ("E", "1e18"),
    ("P", "1e15"),
    ("T", "1e12"),
    ("G", "1e9"),
    ("M", "1e6"),
    ("k", "1e3"),
    ("h", "1e2"),
    ("d", "1e-1"),
    ("c", "1e-2"),
    ("m", "1e-3"),
    ("µ", "1e-6"),
    ("μ", "1e-6"),
    ("u", "1e-6"),
    ("n", "1e-9"),
    ("p", "1e-12"),
    ("f", "1e-15"),
    ("a", "1e-18"),
    ("z", "1e-21"),
    ("y", "1e-24"),
];

/// The degree is dimensionless with an exact-rational approximation of
/// pi/180 as its factor, so trig arguments arrive already in radians.
static DEGREE_FACTOR: Lazy<Rational> = Lazy::new(|| {
    Rational::from_f64(std::f64::consts::PI)
        .expect("pi factor")
        .div(&Rational::from_i64(180))
        .normalize()
});

fn rat(s: &str) -> Rational {
    s.parse().expect("unit table literal")
}

/// Resolve a simple (non-compound) unit name, trying an exact table match
/// before SI-prefix splitting.
fn resolve_simple(name: &str) -> Result<Unit, String> {
    if name == "°" || name == "deg" || name == "degree" || name == "degrees" {
        return Ok(Unit {
            name: name.to_string(),
            factor: DEGREE_FACTOR.clone(),
            gauge: Rational::zero(),
            dims: DimensionVector::UNITLESS,
        });
    }
    if let Some(entry) = UNIT_INDEX.get(name) {
        return Ok(Unit {
            name: name.to_string(),
            factor: rat(entry.factor),
            gauge: rat(entry.gauge),
            dims: DimensionVector(entry.dims),
        });
    }
    for (prefix, scale) in SI_PREFIXES {
        if let Some(rest) = name.strip_prefix(prefix) {
            if rest.is_empty() {
                continue;
            }
            if let Some(entry) = UNIT_INDEX.get(rest) {
                if entry.prefixable {
                    return Ok(Unit {
                        name: name.to_string(),
                        factor: rat(scale).mul(&rat(entry.factor)),
                        gauge: Rational::zero(),
                        dims: DimensionVector(entry.dims),
                    });
                }
            }
        }
    }
    Err(format!("unrecognized unit \"{name}\""))
}

fn superscript_digit(c: char) -> Option<i64> {
    match c {
        '⁰' => Some(0),
        '¹' => Some(1),
        '²' => Some(2),
        '³' => Some(3),
        '⁴' => Some(4),
        '⁵' => Some(5),
        '⁶' => Some(6),
        '⁷' => Some(7),
        '⁸' => Some(8),
        '⁹' => Some(9),
        _ => None,
    }
}

/// Split a factor segment into its base name and integer exponent, written
/// either as `^-2` or as trailing superscripts (`m³`, `s⁻¹`).
fn split_exponent(segment: &str) -> Result<(&str, i64), String> {
    if let Some(caret) = segment.find('^') {
        let (name, rest) = segment.split_at(caret);
        let exp: i64 = rest[1..]
            .parse()
            .map_err(|_| format!("bad unit exponent in \"{segment}\""))?;
        return Ok((name, exp));
    }
    let chars: Vec<char> = segment.chars().collect();
    let mut cut = chars.len();
    while cut > 0 && (superscript_digit(chars[cut - 1]).is_some() || chars[cut - 1] == '⁻') {
        cut -= 1;
    }
    if cut == chars.len() {
        return Ok((segment, 1));
    }
    let mut exp: i64 = 0;
    let mut negative = false;
    for &c in &chars[cut..] {
        if c == '⁻' {
            negative = true;
        } else {
            exp = exp * 10 + superscript_digit(c).expect("superscript digit");
        }
    }
    if exp == 0 {
        return Err(format!("bad unit exponent in \"{segment}\""));
    }
    let byte_cut: usize = chars[..cut].iter().map(|c| c.len_utf8()).sum();
    Ok((&segment[..byte_cut], if negative { -exp } else { exp }))
}

/// Resolve a (possibly compound) unit name into factor, gauge and dimension
/// vector. Compound expressions combine factors with `·` (or `*`) and `/`;
/// affine units cannot appear in a compound because a gauge does not
/// distribute over multiplication. Every failure path reports an error
/// value; no branch leaks a bare name.
pub fn unit_from_name(name: &str) -> Result<Unit, String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("empty unit name".to_string());
    }
    if let Ok(unit) = resolve_simple(trimmed) {
        return Ok(unit);
    }
    // Compound grammar: segments joined by '·'/'*' (multiply) and '/' (divide).
    let mut factor = Rational::one();
    let mut dims = DimensionVector::UNITLESS;
    let mut segment_count = 0usize;
    let mut sign = 1i64;
    let mut start = 0usize;
    let bytes: Vec<(usize, char)> = trimmed.char_indices().collect();
    let mut boundaries: Vec<(usize, usize, i64)> = Vec::new(); // (start, end, sign)
    for &(idx, c) in &bytes {
        if c == '·' || c == '*' || c == '⋅' || c == '/' {
            boundaries.push((start, idx, sign));
            sign = if c == '/' { -1 } else { 1 };
            start = idx + c.len_utf8();
        }
    }
    boundaries.push((start, trimmed.len(), sign));

    for (seg_start, seg_end, seg_sign) in boundaries {
        let segment = trimmed[seg_start..seg_end].trim();
        if segment.is_empty() {
            return Err(format!("unrecognized unit \"{name}\""));
        }
        let (base, exp) = split_exponent(segment)?;
        let unit = resolve_simple(base.trim())?;
        if !unit.gauge.is_zero() {
            return Err(format!(
                "unit \"{base}\" has an offset origin and cannot appear in a compound unit"
            ));
        }
        let signed_exp = exp * seg_sign;
        factor = factor.mul(&unit.factor.pow(&Rational::from_i64(signed_exp))?);
        dims = dims.add(&unit.dims.scale(&Rational::from_i64(signed_exp))?)?;
        segment_count += 1;
    }
    if segment_count == 0 {
        return Err(format!("unrecognized unit \"{name}\""));
    }
    Ok(Unit {
        name: trimmed.to_string(),
        factor: factor.normalize(),
        gauge: Rational::zero(),
        dims,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_lookup_and_aliases() {
        assert_eq!(unit_from_name("ft").unwrap().factor, rat("0.3048"));
        assert_eq!(unit_from_name("feet").unwrap().factor, rat("0.3048"));
        assert!(unit_from_name("furlong").is_err());
    }

    #[test]
    fn si_prefix_splitting() {
        let km = unit_from_name("km").unwrap();
        assert_eq!(km.factor, rat("1000"));
        assert_eq!(km.dims, DimensionVector([1, 0, 0, 0, 0, 0, 0, 0]));
        let microsecond = unit_from_name("µs").unwrap();
        assert_eq!(microsecond.factor, rat("0.000001"));
        let kg = unit_from_name("kg").unwrap();
        assert_eq!(kg.factor, rat("1"));
    }

    #[test]
    fn compound_units() {
        let speed = unit_from_name("m/s").unwrap();
        assert_eq!(speed.dims, DimensionVector([1, 0, -1, 0, 0, 0, 0, 0]));
        let accel = unit_from_name("m/s²").unwrap();
        assert_eq!(accel.dims, DimensionVector([1, 0, -2, 0, 0, 0, 0, 0]));
        let energy = unit_from_name("kW·h").unwrap();
        assert_eq!(energy.dims, DimensionVector([2, 1, -2, 0, 0, 0, 0, 0]));
        assert_eq!(energy.factor, rat("3600000"));
        let caret = unit_from_name("m^2").unwrap();
        assert_eq!(caret.dims, DimensionVector([2, 0, 0, 0, 0, 0, 0, 0]));
    }

    #[test]
    fn affine_units_cannot_compound() {
        assert!(unit_from_name("°C/s").is_err());
    }

    #[test]
    fn degrees_are_dimensionless_radian_scale() {
        let deg = unit_from_name("°").unwrap();
        assert!(deg.dims.is_dimensionless());
        let half_turn = rat("180").mul(&deg.factor);
        assert!((half_turn.to_f64() - std::f64::consts::PI).abs() < 1e-12);
    }
}
