//! The universal value model for the Metron calculator engine.
//!
//! Every value flowing through the evaluator is an `Operand`: a `Value`
//! payload plus a unit tag. The source system encoded type information as a
//! bitmask of power-of-two dtype flags; here that is a closed tagged union
//! plus an orthogonal `Dtype` record that preserves the combinability
//! semantics ("rational row-vector carrying a unit") without bit layout.
//! Operands are immutable once built; container "append" operations return
//! a new container (explicit copy-on-write).

pub use inventory;

use std::collections::HashMap;
use std::fmt;

use metron_num::{Complex, Rational};
use metron_units::{DimensionVector, Unit};

pub mod error;

pub use error::{CalcError, ErrorKind};

/// A scalar cell inside a vector, matrix, map or data-frame column.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Rational(Rational),
    Complex(Complex),
    Bool(bool),
    Str(String),
}

impl Scalar {
    pub fn base_kind(&self) -> BaseKind {
        match self {
            Scalar::Rational(_) => BaseKind::Rational,
            Scalar::Complex(_) => BaseKind::Complex,
            Scalar::Bool(_) => BaseKind::Boolean,
            Scalar::Str(_) => BaseKind::Str,
        }
    }

    pub fn as_rational(&self) -> Option<&Rational> {
        match self {
            Scalar::Rational(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Scalar::Rational(r) => Value::Rational(r),
            Scalar::Complex(c) => Value::Complex(c),
            Scalar::Bool(b) => Value::Bool(b),
            Scalar::Str(s) => Value::Str(s),
        }
    }

    /// Scalar view of a scalar-shaped `Value`.
    pub fn from_value(value: &Value) -> Option<Scalar> {
        match value {
            Value::Rational(r) => Some(Scalar::Rational(r.clone())),
            Value::Complex(c) => Some(Scalar::Complex(c.clone())),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Str(s) => Some(Scalar::Str(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Rational(r) => write!(f, "{r}"),
            Scalar::Complex(c) => write!(f, "{c}"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Str(s) => write!(f, "\"{s}\""),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Row,
    Column,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorValue {
    pub data: Vec<Scalar>,
    pub orientation: Orientation,
}

impl VectorValue {
    pub fn new(data: Vec<Scalar>, orientation: Orientation) -> Self {
        VectorValue { data, orientation }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn transpose(&self) -> VectorValue {
        VectorValue {
            data: self.data.clone(),
            orientation: match self.orientation {
                Orientation::Row => Orientation::Column,
                Orientation::Column => Orientation::Row,
            },
        }
    }
}

/// Row-major element storage with checked construction.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixValue {
    pub data: Vec<Scalar>,
    pub rows: usize,
    pub cols: usize,
}

impl MatrixValue {
    pub fn new(data: Vec<Scalar>, rows: usize, cols: usize) -> Result<Self, CalcError> {
        if rows * cols != data.len() {
            return Err(CalcError::new(ErrorKind::MisShape));
        }
        Ok(MatrixValue { data, rows, cols })
    }

    pub fn get(&self, row: usize, col: usize) -> Result<&Scalar, CalcError> {
        if row >= self.rows || col >= self.cols {
            return Err(CalcError::new(ErrorKind::BigIndex));
        }
        Ok(&self.data[row * self.cols + col])
    }

    pub fn row(&self, row: usize) -> Result<Vec<Scalar>, CalcError> {
        if row >= self.rows {
            return Err(CalcError::new(ErrorKind::BigIndex));
        }
        Ok(self.data[row * self.cols..(row + 1) * self.cols].to_vec())
    }

    pub fn column(&self, col: usize) -> Result<Vec<Scalar>, CalcError> {
        if col >= self.cols {
            return Err(CalcError::new(ErrorKind::BigIndex));
        }
        Ok((0..self.rows).map(|r| self.data[r * self.cols + col].clone()).collect())
    }
}

/// Start/step/end triple. Materialization is capped: a range is a compact
/// description and some of them are too large to ever expand.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeValue {
    pub start: Rational,
    pub step: Rational,
    pub end: Rational,
}

impl RangeValue {
    pub const MATERIALIZE_LIMIT: usize = 1_000_000;

    pub fn new(start: Rational, step: Rational, end: Rational) -> Result<Self, CalcError> {
        if step.is_zero() {
            return Err(CalcError::new(ErrorKind::ZeroStep));
        }
        Ok(RangeValue { start, step, end })
    }

    /// Number of elements the range denotes (zero when it is empty).
    pub fn len(&self) -> usize {
        let span = self.end.sub(&self.start).div(&self.step).normalize();
        if span.is_negative() {
            return 0;
        }
        span.floor()
            .numerator()
            .try_into()
            .map(|n: u64| (n as usize).saturating_add(1))
            .unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn materialize(&self) -> Result<Vec<Rational>, CalcError> {
        let n = self.len();
        if n > Self::MATERIALIZE_LIMIT {
            return Err(CalcError::new(ErrorKind::BigRange));
        }
        let mut out = Vec::with_capacity(n);
        let mut cursor = self.start.clone();
        for _ in 0..n {
            out.push(cursor.clone());
            cursor = cursor.add(&self.step);
        }
        Ok(out)
    }
}

/// Insertion-ordered key → scalar map. One unit covers the whole map; it
/// lives on the enclosing `Operand`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapValue {
    pub keys: Vec<String>,
    pub values: Vec<Scalar>,
}

impl MapValue {
    pub fn new() -> Self {
        MapValue::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.keys.iter().position(|k| k == key).map(|i| &self.values[i])
    }

    /// Copy-on-write append: the receiver is never mutated.
    pub fn with_entry(&self, key: String, value: Scalar) -> MapValue {
        let mut next = self.clone();
        if let Some(i) = next.keys.iter().position(|k| *k == key) {
            next.values[i] = value;
        } else {
            next.keys.push(key);
            next.values.push(value);
        }
        next
    }
}

/// Columnar table: column arrays, a heading → index map, an optional
/// row-name → index map, and per-column unit names and base kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    pub columns: Vec<Vec<Scalar>>,
    pub headings: Vec<String>,
    pub column_map: HashMap<String, usize>,
    pub row_map: Option<HashMap<String, usize>>,
    pub units: Vec<Option<String>>,
    pub column_kinds: Vec<BaseKind>,
}

impl DataFrame {
    pub fn new(
        headings: Vec<String>,
        columns: Vec<Vec<Scalar>>,
        units: Vec<Option<String>>,
    ) -> Result<Self, CalcError> {
        if headings.len() != columns.len() || units.len() != columns.len() {
            return Err(CalcError::new(ErrorKind::DataFrameLiteral));
        }
        let rows = columns.first().map(|c| c.len()).unwrap_or(0);
        if columns.iter().any(|c| c.len() != rows) {
            return Err(CalcError::new(ErrorKind::DataFrameLiteral));
        }
        let column_map = headings
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();
        let column_kinds = columns
            .iter()
            .map(|c| c.first().map(Scalar::base_kind).unwrap_or(BaseKind::Rational))
            .collect();
        Ok(DataFrame {
            columns,
            headings,
            column_map,
            row_map: None,
            units,
            column_kinds,
        })
    }

    /// Install row names taken from an existing column.
    pub fn with_row_names(mut self, names: Vec<String>) -> Self {
        self.row_map = Some(
            names
                .into_iter()
                .enumerate()
                .map(|(i, n)| (n, i))
                .collect(),
        );
        self
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn column_named(&self, name: &str) -> Result<usize, CalcError> {
        self.column_map
            .get(name)
            .copied()
            .ok_or_else(|| CalcError::with(ErrorKind::BadColumn, name))
    }

    /// Copy-on-write column append. The new column's unit must agree with
    /// any unit already recorded under the same heading.
    pub fn with_column(
        &self,
        heading: String,
        column: Vec<Scalar>,
        unit: Option<String>,
    ) -> Result<DataFrame, CalcError> {
        if column.len() != self.row_count() {
            return Err(CalcError::new(ErrorKind::MisElNum));
        }
        if let Some(&existing) = self.column_map.get(&heading) {
            if self.units[existing] != unit {
                return Err(CalcError::new(ErrorKind::UnitAppend));
            }
        }
        let mut next = self.clone();
        let kind = column.first().map(Scalar::base_kind).unwrap_or(BaseKind::Rational);
        next.column_map.insert(heading.clone(), next.columns.len());
        next.headings.push(heading);
        next.columns.push(column);
        next.units.push(unit);
        next.column_kinds.push(kind);
        Ok(next)
    }
}

/// Carrier for chained comparisons: `a < b < c` threads the truth of the
/// first link and its right operand into the second link.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainedBool {
    pub truth: bool,
    pub rhs: Box<Operand>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Rational(Rational),
    Complex(Complex),
    Bool(bool),
    Str(String),
    Range(RangeValue),
    Vector(VectorValue),
    Matrix(MatrixValue),
    Map(MapValue),
    DataFrame(DataFrame),
    Chained(ChainedBool),
    Error(CalcError),
}

/// The coarse classification used to select dispatch arms. Computed on
/// demand, never stored. Ranges dispatch as vectors (they materialize
/// lazily); a chained comparison dispatches as the boolean it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Scalar,
    Complex,
    Vector,
    Matrix,
    Map,
    DataFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKind {
    Rational,
    Complex,
    Boolean,
    Str,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    None,
    Range,
    RowVector,
    ColumnVector,
    Matrix,
    Map,
    DataFrame,
}

/// The port of the source's OR-able dtype bitmask: one base kind, one
/// container kind, and the orthogonal modifier flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dtype {
    pub base: BaseKind,
    pub container: ContainerKind,
    pub has_unit: bool,
    pub from_comparison: bool,
}

impl Dtype {
    pub fn scalar(base: BaseKind) -> Self {
        Dtype { base, container: ContainerKind::None, has_unit: false, from_comparison: false }
    }

    pub fn is_error(&self) -> bool {
        self.base == BaseKind::Error
    }
}

impl Value {
    pub fn shape(&self) -> Shape {
        match self {
            Value::Rational(_) | Value::Bool(_) | Value::Str(_) => Shape::Scalar,
            Value::Complex(_) => Shape::Complex,
            Value::Range(_) | Value::Vector(_) => Shape::Vector,
            Value::Matrix(_) => Shape::Matrix,
            Value::Map(_) => Shape::Map,
            Value::DataFrame(_) => Shape::DataFrame,
            Value::Chained(_) => Shape::Scalar,
            Value::Error(_) => Shape::Scalar,
        }
    }

    pub fn base_kind(&self) -> BaseKind {
        match self {
            Value::Rational(_) | Value::Range(_) => BaseKind::Rational,
            Value::Complex(_) => BaseKind::Complex,
            Value::Bool(_) | Value::Chained(_) => BaseKind::Boolean,
            Value::Str(_) => BaseKind::Str,
            Value::Vector(v) => v.data.first().map(Scalar::base_kind).unwrap_or(BaseKind::Rational),
            Value::Matrix(m) => m.data.first().map(Scalar::base_kind).unwrap_or(BaseKind::Rational),
            Value::Map(m) => m.values.first().map(Scalar::base_kind).unwrap_or(BaseKind::Rational),
            Value::DataFrame(_) => BaseKind::Rational,
            Value::Error(_) => BaseKind::Error,
        }
    }

    pub fn container_kind(&self) -> ContainerKind {
        match self {
            Value::Range(_) => ContainerKind::Range,
            Value::Vector(v) => match v.orientation {
                Orientation::Row => ContainerKind::RowVector,
                Orientation::Column => ContainerKind::ColumnVector,
            },
            Value::Matrix(_) => ContainerKind::Matrix,
            Value::Map(_) => ContainerKind::Map,
            Value::DataFrame(_) => ContainerKind::DataFrame,
            _ => ContainerKind::None,
        }
    }

    /// Collapse a chained-comparison carrier to its plain boolean; other
    /// values pass through untouched.
    pub fn resolve_chain(self) -> Value {
        match self {
            Value::Chained(c) => Value::Bool(c.truth),
            other => other,
        }
    }
}

/// What a unit tag knows about an operand. Under unit-aware evaluation the
/// value travels in base units and only the exponent vector matters; under
/// plain evaluation the author's named unit rides along untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitTag {
    None,
    Expos(DimensionVector),
    Named(Unit),
}

impl UnitTag {
    pub fn expos(&self) -> Option<&DimensionVector> {
        match self {
            UnitTag::None => None,
            UnitTag::Expos(d) => Some(d),
            UnitTag::Named(u) => Some(&u.dims),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, UnitTag::None)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operand {
    pub value: Value,
    pub unit: UnitTag,
}

impl Operand {
    pub fn new(value: Value) -> Self {
        Operand { value, unit: UnitTag::None }
    }

    pub fn with_unit(value: Value, unit: UnitTag) -> Self {
        Operand { value, unit }
    }

    pub fn rational(r: Rational) -> Self {
        Operand::new(Value::Rational(r))
    }

    pub fn boolean(b: bool) -> Self {
        Operand::new(Value::Bool(b))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Operand::new(Value::Str(s.into()))
    }

    pub fn error(e: CalcError) -> Self {
        Operand::new(Value::Error(e))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.value, Value::Error(_))
    }

    pub fn shape(&self) -> Shape {
        self.value.shape()
    }

    pub fn dtype(&self) -> Dtype {
        Dtype {
            base: self.value.base_kind(),
            container: self.value.container_kind(),
            has_unit: !self.unit.is_none(),
            from_comparison: matches!(self.value, Value::Chained(_)),
        }
    }

    /// Effective dimension exponents; `None` means unit-less.
    pub fn expos(&self) -> Option<&DimensionVector> {
        self.unit.expos()
    }

    pub fn is_unitless(&self) -> bool {
        self.expos().map(|d| d.is_dimensionless()).unwrap_or(true)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Rational(r) => write!(f, "{r}"),
            Value::Complex(c) => write!(f, "{c}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Range(r) => write!(f, "{}:{}:{}", r.start, r.step, r.end),
            Value::Vector(v) => {
                let sep = match v.orientation {
                    Orientation::Row => ", ",
                    Orientation::Column => "; ",
                };
                write!(f, "[")?;
                for (i, s) in v.data.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{sep}")?;
                    }
                    write!(f, "{s}")?;
                }
                write!(f, "]")
            }
            Value::Matrix(m) => {
                write!(f, "[")?;
                for r in 0..m.rows {
                    if r > 0 {
                        write!(f, "; ")?;
                    }
                    for c in 0..m.cols {
                        if c > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", m.data[r * m.cols + c])?;
                    }
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.keys.iter().zip(m.values.iter()).enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::DataFrame(d) => {
                write!(f, "DataFrame({} columns, {} rows)", d.headings.len(), d.row_count())
            }
            Value::Chained(c) => write!(f, "{}", c.truth),
            Value::Error(e) => write!(f, "Error: {}", e.message()),
        }
    }
}

// TryFrom ladder used by the builtin-argument conversion wrappers.

impl TryFrom<&Operand> for Rational {
    type Error = CalcError;
    fn try_from(op: &Operand) -> Result<Self, Self::Error> {
        match &op.value {
            Value::Rational(r) => Ok(r.clone()),
            Value::Bool(b) => Ok(if *b { Rational::one() } else { Rational::zero() }),
            _ => Err(CalcError::with(ErrorKind::BadType, "a numeric argument")),
        }
    }
}

impl TryFrom<&Operand> for Complex {
    type Error = CalcError;
    fn try_from(op: &Operand) -> Result<Self, Self::Error> {
        match &op.value {
            Value::Complex(c) => Ok(c.clone()),
            Value::Rational(r) => Ok(Complex::from_rational(r.clone())),
            _ => Err(CalcError::with(ErrorKind::BadType, "a numeric argument")),
        }
    }
}

impl TryFrom<&Operand> for bool {
    type Error = CalcError;
    fn try_from(op: &Operand) -> Result<Self, Self::Error> {
        match &op.value {
            Value::Bool(b) => Ok(*b),
            Value::Chained(c) => Ok(c.truth),
            _ => Err(CalcError::new(ErrorKind::NotBoolean)),
        }
    }
}

impl TryFrom<&Operand> for String {
    type Error = CalcError;
    fn try_from(op: &Operand) -> Result<Self, Self::Error> {
        match &op.value {
            Value::Str(s) => Ok(s.clone()),
            _ => Err(CalcError::with(ErrorKind::BadType, "a string argument")),
        }
    }
}

impl TryFrom<&Operand> for usize {
    type Error = CalcError;
    fn try_from(op: &Operand) -> Result<Self, Self::Error> {
        let r: Rational = op.try_into()?;
        if !r.is_integer() || r.is_negative() {
            return Err(CalcError::with(ErrorKind::IntArg, "index"));
        }
        r.trunc()
            .numerator()
            .try_into()
            .map_err(|_| CalcError::new(ErrorKind::BigIndex))
    }
}

impl TryFrom<&Operand> for Operand {
    type Error = CalcError;
    fn try_from(op: &Operand) -> Result<Self, Self::Error> {
        Ok(op.clone())
    }
}

// ---------------------------------------------------------------------------
// Builtin-function and constant registries, inventory-backed and discovered
// at start-up.
// ---------------------------------------------------------------------------

pub struct BuiltinFunction {
    pub name: &'static str,
    pub category: &'static str,
    pub summary: &'static str,
    pub implementation: fn(&[Operand]) -> Result<Operand, CalcError>,
}

impl BuiltinFunction {
    pub const fn new(
        name: &'static str,
        category: &'static str,
        summary: &'static str,
        implementation: fn(&[Operand]) -> Result<Operand, CalcError>,
    ) -> Self {
        BuiltinFunction { name, category, summary, implementation }
    }
}

pub struct Constant {
    pub name: &'static str,
    pub builder: fn() -> Operand,
}

inventory::collect!(BuiltinFunction);
inventory::collect!(Constant);

pub fn builtin_functions() -> Vec<&'static BuiltinFunction> {
    inventory::iter::<BuiltinFunction>().collect()
}

pub fn constants() -> Vec<&'static Constant> {
    inventory::iter::<Constant>().collect()
}

// ---------------------------------------------------------------------------
// Variable environment records and the lossy projection to Operand.
// ---------------------------------------------------------------------------

/// What the document layer stores per variable. Richer than an `Operand`:
/// it keeps both the plain (author-entered) and base-unit values plus
/// display-only metadata that computation must not see.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentRecord {
    pub name: String,
    pub value: Value,
    pub value_in_base: Option<Value>,
    pub unit: Option<Unit>,
    pub expos: Option<DimensionVector>,
    pub display: Option<String>,
    pub alt_display: Option<String>,
}

impl AssignmentRecord {
    pub fn plain(name: impl Into<String>, value: Value) -> Self {
        AssignmentRecord {
            name: name.into(),
            value,
            value_in_base: None,
            unit: None,
            expos: None,
            display: None,
            alt_display: None,
        }
    }

    pub fn quantity(name: impl Into<String>, plain: Value, base: Value, unit: Unit) -> Self {
        let expos = unit.dims;
        AssignmentRecord {
            name: name.into(),
            value: plain,
            value_in_base: Some(base),
            unit: Some(unit),
            expos: Some(expos),
            display: None,
            alt_display: None,
        }
    }
}

/// The documented lossy projection from an assignment record down to a bare
/// compute Operand. For a quantity under unit-aware evaluation only the
/// base-unit value and the exponent vector survive; otherwise the plain
/// value and the declared unit survive. Display metadata never survives.
pub fn from_assignment(record: &AssignmentRecord, unit_aware: bool) -> Operand {
    match (&record.expos, unit_aware) {
        (Some(expos), true) => {
            let value = record
                .value_in_base
                .clone()
                .unwrap_or_else(|| record.value.clone());
            Operand::with_unit(value, UnitTag::Expos(*expos))
        }
        _ => match &record.unit {
            Some(unit) => Operand::with_unit(record.value.clone(), UnitTag::Named(unit.clone())),
            None => Operand::new(record.value.clone()),
        },
    }
}

/// Wrap a computed operand back into an assignment record, such that
/// `from_assignment` recovers the same operand under the same unit-aware
/// setting. Used for function locals and loop variables.
pub fn record_from_operand(name: &str, op: &Operand) -> AssignmentRecord {
    match &op.unit {
        UnitTag::None => AssignmentRecord::plain(name, op.value.clone()),
        UnitTag::Expos(d) => AssignmentRecord {
            name: name.to_string(),
            value: op.value.clone(),
            value_in_base: Some(op.value.clone()),
            unit: None,
            expos: Some(*d),
            display: None,
            alt_display: None,
        },
        UnitTag::Named(u) => AssignmentRecord {
            name: name.to_string(),
            value: op.value.clone(),
            value_in_base: None,
            unit: Some(u.clone()),
            expos: None,
            display: None,
            alt_display: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rat(s: &str) -> Rational {
        s.parse().unwrap()
    }

    #[test]
    fn dtype_captures_combinability() {
        let v = Operand::with_unit(
            Value::Vector(VectorValue::new(
                vec![Scalar::Rational(rat("1")), Scalar::Rational(rat("2"))],
                Orientation::Row,
            )),
            UnitTag::Expos(DimensionVector([1, 0, 0, 0, 0, 0, 0, 0])),
        );
        let d = v.dtype();
        assert_eq!(d.base, BaseKind::Rational);
        assert_eq!(d.container, ContainerKind::RowVector);
        assert!(d.has_unit);
        assert!(!d.from_comparison);
        assert_eq!(v.shape(), Shape::Vector);
    }

    #[test]
    fn range_len_and_materialize() {
        let r = RangeValue::new(rat("1"), rat("1"), rat("5")).unwrap();
        assert_eq!(r.len(), 5);
        let items = r.materialize().unwrap();
        assert_eq!(items.len(), 5);
        assert_eq!(items[4], rat("5"));
        let down = RangeValue::new(rat("10"), rat("-2"), rat("5")).unwrap();
        assert_eq!(down.materialize().unwrap(), vec![rat("10"), rat("8"), rat("6")]);
        assert!(RangeValue::new(rat("1"), rat("0"), rat("5")).is_err());
    }

    #[test]
    fn map_append_is_copy_on_write() {
        let m = MapValue::new().with_entry("a".into(), Scalar::Rational(rat("1")));
        let n = m.with_entry("b".into(), Scalar::Rational(rat("2")));
        assert_eq!(m.len(), 1);
        assert_eq!(n.len(), 2);
        assert!(m.get("b").is_none());
        assert_eq!(n.get("b"), Some(&Scalar::Rational(rat("2"))));
    }

    #[test]
    fn dataframe_append_checks_unit_identity() {
        let df = DataFrame::new(
            vec!["load".into()],
            vec![vec![Scalar::Rational(rat("1"))]],
            vec![Some("kN".into())],
        )
        .unwrap();
        let err = df.with_column("load".into(), vec![Scalar::Rational(rat("2"))], Some("psf".into()));
        assert_eq!(err.unwrap_err().kind, ErrorKind::UnitAppend);
        let grown = df
            .with_column("span".into(), vec![Scalar::Rational(rat("3"))], Some("m".into()))
            .unwrap();
        assert_eq!(df.headings.len(), 1);
        assert_eq!(grown.headings.len(), 2);
    }

    #[test]
    fn quantity_projection_is_lossy() {
        let unit = metron_units::unit_from_name("ft").unwrap();
        let mut record = AssignmentRecord::quantity(
            "L",
            Value::Rational(rat("4")),
            Value::Rational(rat("4").mul(&unit.factor)),
            unit,
        );
        record.display = Some("L = 4 ft".into());

        let aware = from_assignment(&record, true);
        assert_eq!(aware.value, Value::Rational(rat("1.2192")));
        assert!(matches!(aware.unit, UnitTag::Expos(_)));

        let plain = from_assignment(&record, false);
        assert_eq!(plain.value, Value::Rational(rat("4")));
        assert!(matches!(plain.unit, UnitTag::Named(_)));
    }

    #[test]
    fn chained_carrier_resolves_to_bool() {
        let chained = Value::Chained(ChainedBool {
            truth: true,
            rhs: Box::new(Operand::rational(rat("2"))),
        });
        assert_eq!(chained.resolve_chain(), Value::Bool(true));
    }
}
