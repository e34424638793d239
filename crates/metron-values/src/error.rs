//! The error catalog.
//!
//! Errors are values: every fallible operation produces a `CalcError` that
//! travels upward unchanged and ultimately surfaces as an ERROR operand.
//! Each kind has a fixed template message with at most one `@` insertion
//! point for a runtime string (a variable name, a unit name, …).

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // Arithmetic
    Div,
    Nan,
    Fact,
    Binom,
    Log,
    Origin,
    // Units
    UnitAdd,
    UnitComp,
    UnitIn,
    UnitName,
    UnitPow,
    UnitAppend,
    UnitAware,
    Currency,
    // Names and arguments
    VName,
    FName,
    BadFunctionName,
    NumArgs,
    BadArg,
    IntArg,
    BadType,
    Unsupported,
    // Vectors, matrices, containers
    MisElNum,
    MisShape,
    NonSquare,
    Singular,
    Cross,
    BadIndex,
    BigIndex,
    BadKey,
    BadColumn,
    BadRow,
    ZeroStep,
    BigRange,
    ForIterable,
    // Token stream / evaluator
    Rpn,
    Count,
    Stack,
    BadToken,
    BadLiteral,
    DataFrameLiteral,
    Cases,
    SumBounds,
    Fetch,
    NotBoolean,
    // Control flow
    BreakOutsideLoop,
    UnbalancedEnd,
    // Hardening guards
    MaxDepth,
    MaxIteration,
    // A user `throw` statement: the whole message is supplied at runtime.
    Custom,
}

impl ErrorKind {
    pub fn template(&self) -> &'static str {
        match self {
            ErrorKind::Div => "Divide by zero.",
            ErrorKind::Nan => "Calculation did not produce a numeric result.",
            ErrorKind::Fact => "Factorial is defined only for unit-less non-negative integers.",
            ErrorKind::Binom => "Binomial coefficients are defined only for unit-less numbers.",
            ErrorKind::Log => "Logarithm requires a positive unit-less argument.",
            ErrorKind::Origin => "The phase angle of zero is undefined.",
            ErrorKind::UnitAdd => "Unit mis-match in addition or subtraction.",
            ErrorKind::UnitComp => "Unit mis-match in a comparison.",
            ErrorKind::UnitIn => "The function @ takes only unit-less arguments.",
            ErrorKind::UnitName => "Unrecognized unit name: @.",
            ErrorKind::UnitPow => "That exponent would produce a fractional unit dimension.",
            ErrorKind::UnitAppend => "Cannot append a value whose unit differs from the column's unit.",
            ErrorKind::UnitAware => "Unit-aware calculation requires compatible units on every operand.",
            ErrorKind::Currency => "No exchange rate is available for @.",
            ErrorKind::VName => "Variable @ has not been defined.",
            ErrorKind::FName => "Function @ is not defined.",
            ErrorKind::BadFunctionName => "Not a valid function name: @.",
            ErrorKind::NumArgs => "Wrong number of arguments to function @.",
            ErrorKind::BadArg => "Invalid argument to function @.",
            ErrorKind::IntArg => "The function @ takes only integer arguments.",
            ErrorKind::BadType => "Unsupported operand type for @.",
            ErrorKind::Unsupported => "The operator @ is not defined for this pair of operand shapes.",
            ErrorKind::MisElNum => "Mis-matched number of elements.",
            ErrorKind::MisShape => "Mis-matched matrix dimensions.",
            ErrorKind::NonSquare => "Matrix must be square.",
            ErrorKind::Singular => "Matrix is singular.",
            ErrorKind::Cross => "A cross product is defined only for vectors of length 3.",
            ErrorKind::BadIndex => "Invalid index: @.",
            ErrorKind::BigIndex => "Index exceeds the number of elements.",
            ErrorKind::BadKey => "There is no value associated with key @.",
            ErrorKind::BadColumn => "There is no column named @.",
            ErrorKind::BadRow => "There is no row named @.",
            ErrorKind::ZeroStep => "A range step cannot be zero.",
            ErrorKind::BigRange => "Range is too large to materialize.",
            ErrorKind::ForIterable => "A for loop cannot iterate over this value.",
            ErrorKind::Rpn => "Malformed expression token stream.",
            ErrorKind::Count => "Malformed argument count in token stream.",
            ErrorKind::Stack => "Expression did not reduce to a single result.",
            ErrorKind::BadToken => "Unrecognized token: @.",
            ErrorKind::BadLiteral => "Malformed literal: @.",
            ErrorKind::DataFrameLiteral => "Malformed data-frame literal.",
            ErrorKind::Cases => "No case condition was satisfied.",
            ErrorKind::SumBounds => "Summation bounds must be unit-less integers.",
            ErrorKind::Fetch => "Remote data for @ has not been fetched.",
            ErrorKind::NotBoolean => "A condition must evaluate to true or false.",
            ErrorKind::BreakOutsideLoop => "A break statement appeared outside of a loop.",
            ErrorKind::UnbalancedEnd => "Unbalanced end statement in function body.",
            ErrorKind::MaxDepth => "Expression recursion exceeded the configured depth limit.",
            ErrorKind::MaxIteration => "Loop exceeded the configured iteration limit.",
            ErrorKind::Custom => "@",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalcError {
    pub kind: ErrorKind,
    pub insert: Option<String>,
}

impl CalcError {
    pub fn new(kind: ErrorKind) -> Self {
        CalcError { kind, insert: None }
    }

    pub fn with(kind: ErrorKind, insert: impl Into<String>) -> Self {
        CalcError { kind, insert: Some(insert.into()) }
    }

    /// The human-readable message, with the `@` insertion point filled.
    pub fn message(&self) -> String {
        let template = self.kind.template();
        match &self.insert {
            Some(text) => template.replace('@', text),
            None => template.replace(" @", "").replace('@', ""),
        }
    }
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for CalcError {}
