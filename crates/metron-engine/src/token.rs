//! RPN token decoding.
//!
//! Tokens arrive joined by a no-break space, a character the expression
//! grammar reserves. Literals carry a leading sigil: `®` rational, `©`
//! complex, `"…"` string, `` `…` `` rich text, double-backtick data frame;
//! `¿` marks a variable reference and a single-quoted token applies a unit.
//! Anything else is an operator or function word interpreted by the
//! evaluator, with inline decimal counts following variadic constructs.

use metron_num::{Complex, Rational};
use metron_values::{CalcError, DataFrame, ErrorKind, Scalar};

/// The reserved token separator.
pub const SEPARATOR: char = '\u{00A0}';

/// Split a stream into raw tokens. Delimited literals (strings, rich text,
/// data frames, unit names) may contain the separator — an embedded `cases`
/// branch is a quoted sub-stream — so the splitter honors the delimiters
/// instead of splitting blindly.
pub fn split_stream(rpn: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = rpn;
    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix(SEPARATOR) {
            rest = stripped;
            continue;
        }
        let delimited = if let Some(tail) = rest.strip_prefix("``") {
            tail.find("``").map(|p| p + 4)
        } else if let Some(tail) = rest.strip_prefix('"') {
            tail.find('"').map(|p| p + 2)
        } else if let Some(tail) = rest.strip_prefix('`') {
            tail.find('`').map(|p| p + 2)
        } else if let Some(tail) = rest.strip_prefix('\'') {
            tail.find('\'').map(|p| p + 2)
        } else {
            None
        };
        let cut = delimited.unwrap_or_else(|| rest.find(SEPARATOR).unwrap_or(rest.len()));
        out.push(&rest[..cut]);
        rest = &rest[cut..];
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Rational(Rational),
    Complex(Complex),
    Str(String),
    DataFrame(DataFrame),
    Variable(String),
    ApplyUnit(String),
    Word(String),
}

/// Classify one raw token and decode its literal payload.
pub fn classify(raw: &str) -> Result<Token, CalcError> {
    if let Some(payload) = raw.strip_prefix('®') {
        return payload
            .parse::<Rational>()
            .map(Token::Rational)
            .map_err(|_| CalcError::with(ErrorKind::BadLiteral, raw));
    }
    if let Some(payload) = raw.strip_prefix('©') {
        return decode_complex(payload).ok_or_else(|| CalcError::with(ErrorKind::BadLiteral, raw));
    }
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return Ok(Token::Str(raw[1..raw.len() - 1].to_string()));
    }
    if raw.len() >= 4 && raw.starts_with("``") && raw.ends_with("``") {
        return decode_dataframe(&raw[2..raw.len() - 2]).map(Token::DataFrame);
    }
    if raw.len() >= 2 && raw.starts_with('`') && raw.ends_with('`') {
        return Ok(Token::Str(raw[1..raw.len() - 1].to_string()));
    }
    if let Some(name) = raw.strip_prefix('¿') {
        return Ok(Token::Variable(name.to_string()));
    }
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return Ok(Token::ApplyUnit(raw[1..raw.len() - 1].to_string()));
    }
    Ok(Token::Word(raw.to_string()))
}

/// `©re_num,re_den,im_num,im_den`
fn decode_complex(payload: &str) -> Option<Token> {
    let parts: Vec<&str> = payload.split(',').collect();
    if parts.len() != 4 {
        return None;
    }
    let ints: Vec<num_bigint::BigInt> = parts
        .iter()
        .map(|p| p.trim().parse().ok())
        .collect::<Option<Vec<_>>>()?;
    let mut iter = ints.into_iter();
    let re = Rational::new(iter.next()?, iter.next()?);
    let im = Rational::new(iter.next()?, iter.next()?);
    Some(Token::Complex(Complex::new(re, im)))
}

fn split_cells(line: &str, delimiter: char) -> Vec<String> {
    line.split(delimiter).map(|c| c.trim().to_string()).collect()
}

fn parse_cell(cell: &str) -> Scalar {
    match cell.parse::<Rational>() {
        Ok(r) => Scalar::Rational(r),
        Err(_) => Scalar::Str(cell.to_string()),
    }
}

/// Decode a tabular literal: a header line, an optional units line (every
/// non-empty cell resolves in the unit registry), then data rows. A first
/// column headed `name` supplies row names.
pub fn decode_dataframe(payload: &str) -> Result<DataFrame, CalcError> {
    let text = payload.trim_matches('\n');
    let delimiter = if text.contains('\t') { '\t' } else { ',' };
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| CalcError::new(ErrorKind::DataFrameLiteral))?;
    let mut headings = split_cells(header, delimiter);
    let rest: Vec<&str> = lines.collect();

    let mut units: Vec<Option<String>> = vec![None; headings.len()];
    let mut data_rows: &[&str] = &rest;
    if let Some(first) = rest.first() {
        let cells = split_cells(first, delimiter);
        let is_units_row = !cells.iter().all(|c| c.is_empty())
            && cells
                .iter()
                .all(|c| c.is_empty() || metron_units::unit_from_name(c).is_ok());
        if is_units_row {
            units = cells
                .into_iter()
                .map(|c| if c.is_empty() { None } else { Some(c) })
                .collect();
            units.resize(headings.len(), None);
            data_rows = &rest[1..];
        }
    }

    let mut rows: Vec<Vec<Scalar>> = Vec::new();
    for line in data_rows {
        let mut cells = split_cells(line, delimiter);
        if cells.len() != headings.len() {
            return Err(CalcError::new(ErrorKind::DataFrameLiteral));
        }
        rows.push(cells.drain(..).map(|c| parse_cell(&c)).collect());
    }

    // A leading `name` column carries row names rather than data.
    let mut row_names: Option<Vec<String>> = None;
    if headings.first().map(|h| h == "name").unwrap_or(false) {
        headings.remove(0);
        units.remove(0);
        let mut names = Vec::with_capacity(rows.len());
        for row in &mut rows {
            let cell = row.remove(0);
            names.push(match cell {
                Scalar::Str(s) => s,
                other => other.to_string(),
            });
        }
        row_names = Some(names);
    }

    let mut columns: Vec<Vec<Scalar>> = vec![Vec::with_capacity(rows.len()); headings.len()];
    for row in rows {
        for (c, cell) in row.into_iter().enumerate() {
            columns[c].push(cell);
        }
    }
    let frame = DataFrame::new(headings, columns, units)?;
    Ok(match row_names {
        Some(names) => frame.with_row_names(names),
        None => frame,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rational_and_complex_literals() {
        assert_eq!(
            classify("®3/4").unwrap(),
            Token::Rational("3/4".parse().unwrap())
        );
        assert_eq!(
            classify("®-2/1").unwrap(),
            Token::Rational("-2".parse().unwrap())
        );
        match classify("©1,2,3,4").unwrap() {
            Token::Complex(z) => {
                assert_eq!(z.re, "1/2".parse().unwrap());
                assert_eq!(z.im, "3/4".parse().unwrap());
            }
            other => panic!("expected complex, got {other:?}"),
        }
        assert!(classify("®x").is_err());
    }

    #[test]
    fn sigil_classification() {
        assert_eq!(classify("\"hi\"").unwrap(), Token::Str("hi".into()));
        assert_eq!(classify("`rich`").unwrap(), Token::Str("rich".into()));
        assert_eq!(classify("¿x").unwrap(), Token::Variable("x".into()));
        assert_eq!(classify("'ft'").unwrap(), Token::ApplyUnit("ft".into()));
        assert_eq!(classify("+").unwrap(), Token::Word("+".into()));
    }

    #[test]
    fn dataframe_literal_with_units_row() {
        let text = "name,area,cost\n,m²,USD\nslab,12,400\nwall,8.5,275";
        let df = decode_dataframe(text).unwrap();
        assert_eq!(df.headings, vec!["area".to_string(), "cost".to_string()]);
        assert_eq!(df.units[0], Some("m²".to_string()));
        assert_eq!(df.row_count(), 2);
        assert!(df.row_map.as_ref().unwrap().contains_key("wall"));
        assert_eq!(
            df.columns[0][1],
            Scalar::Rational("8.5".parse().unwrap())
        );
    }

    #[test]
    fn dataframe_literal_without_units() {
        let text = "x,y\n1,2\n3,4";
        let df = decode_dataframe(text).unwrap();
        assert_eq!(df.units, vec![None, None]);
        assert_eq!(df.row_count(), 2);
        assert!(df.row_map.is_none());
    }
}
