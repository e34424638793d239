//! The RPN stack machine.
//!
//! One explicit operand stack; literal tokens push frozen operands, variable
//! references resolve through the lossy assignment-record projection, and
//! operator tokens pop their arity, dispatch on shape through the runtime,
//! and push the result. Every dispatch result that is an error returns
//! upward immediately — there is no exception mechanism. `cases` and `∑`
//! recurse into this same entry point under an explicit depth budget.

use metron_num::Rational;
use metron_units::unit_from_name;
use metron_values::{
    from_assignment, record_from_operand, CalcError, DataFrame, ErrorKind, MapValue, MatrixValue,
    Operand, Orientation, RangeValue, Scalar, UnitTag, Value, VectorValue,
};
use metron_runtime::{binary_op, binary_result_dtype, relate, unary_op, BinaryOp};

use crate::functions::FunctionLibrary;
use crate::interpreter;
use crate::token::{classify, Token};
use crate::{Environment, EvalConfig};

const UNARY_TOKENS: &[&str] = &["neg", "not", "¬", "!", "‼", "ᵀ", "transpose", "√", "abs"];
const RELATION_TOKENS: &[&str] = &[
    "<", ">", "≤", "<=", "≥", ">=", "=", "==", "≠", "!=", "∈", "∉", "∋",
];

fn pop(stack: &mut Vec<Operand>) -> Result<Operand, CalcError> {
    stack.pop().ok_or_else(|| CalcError::new(ErrorKind::Rpn))
}

fn parse_count(tokens: &[&str], i: &mut usize) -> Result<usize, CalcError> {
    let raw = tokens.get(*i).ok_or_else(|| CalcError::new(ErrorKind::Count))?;
    *i += 1;
    raw.parse().map_err(|_| CalcError::new(ErrorKind::Count))
}

/// Evaluate one token stream to a single operand. `depth` counts the
/// recursion through `cases` branches, `∑` bodies and user-function calls.
pub(crate) fn eval_tokens(
    rpn: &str,
    env: &Environment,
    config: &EvalConfig,
    lib: Option<&FunctionLibrary>,
    depth: usize,
    prints: &mut Vec<String>,
) -> Result<Operand, CalcError> {
    if depth > config.max_recursion_depth {
        log::warn!("recursion budget exhausted at depth {depth}");
        return Err(CalcError::new(ErrorKind::MaxDepth));
    }
    let tokens: Vec<&str> = crate::token::split_stream(rpn);
    let mut stack: Vec<Operand> = Vec::new();
    let mut i = 0usize;

    while i < tokens.len() {
        let raw = tokens[i];
        i += 1;
        match classify(raw)? {
            Token::Rational(r) => stack.push(Operand::rational(r)),
            Token::Complex(z) => stack.push(Operand::new(Value::Complex(z))),
            Token::Str(s) => stack.push(Operand::string(s)),
            Token::DataFrame(df) => stack.push(Operand::new(Value::DataFrame(df))),
            Token::Variable(name) => {
                let record = env
                    .get(&name)
                    .ok_or_else(|| CalcError::with(ErrorKind::VName, &name))?;
                let operand = from_assignment(record, config.unit_aware);
                if let Value::Error(e) = &operand.value {
                    return Err(e.clone());
                }
                stack.push(operand);
            }
            Token::ApplyUnit(name) => {
                let value = pop(&mut stack)?;
                stack.push(apply_unit(value, &name, config)?);
            }
            Token::Word(word) => {
                let handled = eval_word(
                    &word, &tokens, &mut i, &mut stack, env, config, lib, depth, prints,
                )?;
                if !handled {
                    return Err(CalcError::with(ErrorKind::BadToken, &word));
                }
            }
        }
    }

    // On success exactly one operand remains.
    if stack.len() != 1 {
        return Err(CalcError::new(ErrorKind::Stack));
    }
    let result = pop(&mut stack)?;
    if let Value::Error(e) = &result.value {
        return Err(e.clone());
    }
    Ok(Operand::with_unit(result.value.resolve_chain(), result.unit))
}

/// Interpret one operator/function word. Returns false only for a token the
/// engine does not recognize at all.
#[allow(clippy::too_many_arguments)]
fn eval_word(
    word: &str,
    tokens: &[&str],
    i: &mut usize,
    stack: &mut Vec<Operand>,
    env: &Environment,
    config: &EvalConfig,
    lib: Option<&FunctionLibrary>,
    depth: usize,
    prints: &mut Vec<String>,
) -> Result<bool, CalcError> {
    match word {
        "matrix" => {
            let rows = parse_count(tokens, i)?;
            let cols = parse_count(tokens, i)?;
            let mut items = Vec::with_capacity(rows * cols);
            for _ in 0..rows * cols {
                items.push(pop(stack)?);
            }
            items.reverse();
            stack.push(build_matrix(items, rows, cols)?);
            return Ok(true);
        }
        "map" => {
            let n = parse_count(tokens, i)?;
            let mut items = Vec::with_capacity(2 * n);
            for _ in 0..2 * n {
                items.push(pop(stack)?);
            }
            items.reverse();
            stack.push(build_map(items)?);
            return Ok(true);
        }
        "range" => {
            let n = parse_count(tokens, i)?;
            if n != 2 && n != 3 {
                return Err(CalcError::new(ErrorKind::Count));
            }
            let mut items = Vec::with_capacity(n);
            for _ in 0..n {
                items.push(pop(stack)?);
            }
            items.reverse();
            let start: Rational = (&items[0]).try_into()?;
            let (step, end) = if n == 2 {
                (Rational::one(), (&items[1]).try_into()?)
            } else {
                ((&items[1]).try_into()?, (&items[2]).try_into()?)
            };
            stack.push(Operand::new(Value::Range(RangeValue::new(start, step, end)?)));
            return Ok(true);
        }
        "function" => {
            let name = *tokens.get(*i).ok_or_else(|| CalcError::new(ErrorKind::Count))?;
            *i += 1;
            let argc = parse_count(tokens, i)?;
            let mut args = Vec::with_capacity(argc);
            for _ in 0..argc {
                let arg = pop(stack)?;
                args.push(Operand::with_unit(arg.value.resolve_chain(), arg.unit));
            }
            args.reverse();
            let result = if let Some(library) = lib {
                if let Some(function) = library.get(name) {
                    interpreter::call_function(function, &args, config, Some(library), depth + 1, prints)?
                } else {
                    metron_runtime::call_builtin(name, &args)?
                }
            } else {
                metron_runtime::call_builtin(name, &args)?
            };
            if let Value::Error(e) = &result.value {
                return Err(e.clone());
            }
            stack.push(result);
            return Ok(true);
        }
        "cases" => {
            let n = parse_count(tokens, i)?;
            // Per branch the expression string is pushed first, then its
            // condition; conditions were evaluated eagerly upstream.
            let mut branches = Vec::with_capacity(n);
            for _ in 0..n {
                let condition = pop(stack)?;
                let expression = pop(stack)?;
                branches.push((expression, condition));
            }
            branches.reverse();
            for (expression, condition) in branches {
                let chosen: bool = (&condition).try_into()?;
                if chosen {
                    // Only the chosen branch's sub-stream is ever evaluated.
                    let body: String = (&expression).try_into()?;
                    let result = eval_tokens(&body, env, config, lib, depth + 1, prints)?;
                    stack.push(result);
                    return Ok(true);
                }
            }
            return Err(CalcError::new(ErrorKind::Cases));
        }
        "∑" => {
            let end = pop(stack)?;
            let start = pop(stack)?;
            let dummy: String = (&pop(stack)?).try_into()?;
            let body: String = (&pop(stack)?).try_into()?;
            stack.push(summation(&body, &dummy, &start, &end, env, config, lib, depth, prints)?);
            return Ok(true);
        }
        "index" => {
            let argc = parse_count(tokens, i)?;
            let mut indices = Vec::with_capacity(argc);
            for _ in 0..argc {
                indices.push(pop(stack)?);
            }
            indices.reverse();
            let base = pop(stack)?;
            stack.push(access(&base, &indices, config)?);
            return Ok(true);
        }
        "true" => {
            stack.push(Operand::boolean(true));
            return Ok(true);
        }
        "false" => {
            stack.push(Operand::boolean(false));
            return Ok(true);
        }
        "fetch" => {
            let target = match stack.last() {
                Some(op) => match &op.value {
                    Value::Str(s) => s.clone(),
                    _ => String::new(),
                },
                None => String::new(),
            };
            return Err(CalcError::with(ErrorKind::Fetch, target));
        }
        _ => {}
    }

    if UNARY_TOKENS.contains(&word) {
        let a = pop(stack)?;
        let result = unary_op(word, &a)?;
        stack.push(result);
        return Ok(true);
    }

    if RELATION_TOKENS.contains(&word) {
        let b = pop(stack)?;
        let a = pop(stack)?;
        let result = relate(word, &a, &b)?;
        stack.push(result);
        return Ok(true);
    }

    if let Some(op) = BinaryOp::from_token(word) {
        let b = pop(stack)?;
        let a = pop(stack)?;
        let result = binary_op(op, &a, &b)?;
        // The result-dtype rules run beside the value computation; drift
        // between the two tables is a bug.
        if cfg!(debug_assertions) {
            if let Ok(planned) = binary_result_dtype(&a.dtype(), &b.dtype(), op) {
                assert_eq!(
                    planned.container,
                    result.dtype().container,
                    "dtype planner drift on {}",
                    op.symbol()
                );
            }
        }
        stack.push(result);
        return Ok(true);
    }

    if let Some(constant) = lookup_constant_word(word) {
        stack.push(constant);
        return Ok(true);
    }

    // A bare numeric token (counts are consumed by their operators above).
    if let Ok(r) = word.parse::<Rational>() {
        stack.push(Operand::rational(r));
        return Ok(true);
    }

    Ok(false)
}

fn lookup_constant_word(word: &str) -> Option<Operand> {
    let canonical = match word {
        "π" => "pi",
        other => other,
    };
    metron_runtime::lookup_constant(canonical)
}

/// Attach a unit to an operand. Under unit-aware evaluation the plain value
/// converts to base units ((plain + gauge) × factor) and only the exponent
/// vector travels on; otherwise the named unit rides along for display.
fn apply_unit(op: Operand, name: &str, config: &EvalConfig) -> Result<Operand, CalcError> {
    let unit = unit_from_name(name).map_err(|_| CalcError::with(ErrorKind::UnitName, name))?;
    if !config.unit_aware {
        return Ok(Operand::with_unit(op.value, UnitTag::Named(unit)));
    }
    let convert = |s: &Scalar| -> Result<Scalar, CalcError> {
        match s {
            Scalar::Rational(r) => Ok(Scalar::Rational(metron_units::to_base_units(r, &unit))),
            _ => Err(CalcError::with(ErrorKind::BadType, name)),
        }
    };
    let value = match &op.value {
        Value::Rational(r) => Value::Rational(metron_units::to_base_units(r, &unit)),
        Value::Vector(v) => Value::Vector(VectorValue::new(
            v.data.iter().map(convert).collect::<Result<Vec<_>, _>>()?,
            v.orientation,
        )),
        Value::Matrix(m) => Value::Matrix(MatrixValue::new(
            m.data.iter().map(convert).collect::<Result<Vec<_>, _>>()?,
            m.rows,
            m.cols,
        )?),
        Value::Map(m) => Value::Map(MapValue {
            keys: m.keys.clone(),
            values: m.values.iter().map(convert).collect::<Result<Vec<_>, _>>()?,
        }),
        _ => return Err(CalcError::with(ErrorKind::BadType, name)),
    };
    Ok(Operand::with_unit(value, UnitTag::Expos(unit.dims)))
}

/// Assemble a matrix (or vector, or plain scalar) from row-major items.
/// Element units must agree; the merged unit moves to the container.
fn build_matrix(items: Vec<Operand>, rows: usize, cols: usize) -> Result<Operand, CalcError> {
    if items.len() != rows * cols {
        return Err(CalcError::new(ErrorKind::Count));
    }
    let mut unit = UnitTag::None;
    let mut cells = Vec::with_capacity(items.len());
    for item in &items {
        match (&unit, item.expos()) {
            (UnitTag::None, Some(_)) => unit = item.unit.clone(),
            (UnitTag::Expos(d) | UnitTag::Named(metron_units::Unit { dims: d, .. }), Some(e)) => {
                if !metron_units::units_are_compatible(d, e) {
                    return Err(CalcError::new(ErrorKind::UnitAdd));
                }
            }
            _ => {}
        }
        let cell = Scalar::from_value(&item.value.clone().resolve_chain())
            .ok_or_else(|| CalcError::with(ErrorKind::BadType, "matrix"))?;
        cells.push(cell);
    }
    let value = if rows == 1 && cols == 1 {
        cells.remove(0).into_value()
    } else if rows == 1 {
        Value::Vector(VectorValue::new(cells, Orientation::Row))
    } else if cols == 1 {
        Value::Vector(VectorValue::new(cells, Orientation::Column))
    } else {
        Value::Matrix(MatrixValue::new(cells, rows, cols)?)
    };
    Ok(Operand::with_unit(value, unit))
}

/// Assemble a map from interleaved key/value operands. One unit covers the
/// whole map, so value units must agree.
fn build_map(items: Vec<Operand>) -> Result<Operand, CalcError> {
    let mut map = MapValue::new();
    let mut unit = UnitTag::None;
    for pair in items.chunks(2) {
        let key: String = (&pair[0]).try_into()?;
        let value = &pair[1];
        match (&unit, value.expos()) {
            (UnitTag::None, Some(_)) => unit = value.unit.clone(),
            (UnitTag::Expos(d) | UnitTag::Named(metron_units::Unit { dims: d, .. }), Some(e)) => {
                if !metron_units::units_are_compatible(d, e) {
                    return Err(CalcError::new(ErrorKind::UnitAppend));
                }
            }
            _ => {}
        }
        let cell = Scalar::from_value(&value.value)
            .ok_or_else(|| CalcError::with(ErrorKind::BadType, "map"))?;
        map = map.with_entry(key, cell);
    }
    Ok(Operand::with_unit(Value::Map(map), unit))
}

/// `∑` recurses into the evaluator once per iteration with the dummy
/// variable bound in an overlay environment.
#[allow(clippy::too_many_arguments)]
fn summation(
    body: &str,
    dummy: &str,
    start: &Operand,
    end: &Operand,
    env: &Environment,
    config: &EvalConfig,
    lib: Option<&FunctionLibrary>,
    depth: usize,
    prints: &mut Vec<String>,
) -> Result<Operand, CalcError> {
    let lo: Rational = start
        .try_into()
        .map_err(|_| CalcError::new(ErrorKind::SumBounds))?;
    let hi: Rational = end
        .try_into()
        .map_err(|_| CalcError::new(ErrorKind::SumBounds))?;
    if !lo.is_integer() || !hi.is_integer() || !start.is_unitless() || !end.is_unitless() {
        return Err(CalcError::new(ErrorKind::SumBounds));
    }
    let mut overlay = env.clone();
    let mut total = Operand::rational(Rational::zero());
    let mut cursor = lo;
    let mut iterations = 0usize;
    while cursor <= hi {
        iterations += 1;
        if iterations > config.max_loop_iterations {
            log::warn!("summation budget exhausted after {iterations} terms");
            return Err(CalcError::new(ErrorKind::MaxIteration));
        }
        overlay.insert(
            dummy.to_string(),
            record_from_operand(dummy, &Operand::rational(cursor.clone())),
        );
        let term = eval_tokens(body, &overlay, config, lib, depth + 1, prints)?;
        total = binary_op(BinaryOp::Add, &total, &term)?;
        cursor = cursor.add(&Rational::one());
    }
    Ok(total)
}

fn one_based(index: &Operand, len: usize) -> Result<usize, CalcError> {
    let r: Rational = index.try_into().map_err(|_| {
        CalcError::with(ErrorKind::BadIndex, format!("{}", index.value))
    })?;
    if !r.is_integer() || !r.is_positive() {
        return Err(CalcError::with(ErrorKind::BadIndex, format!("{r}")));
    }
    let i: usize = (&Operand::rational(r)).try_into()?;
    if i == 0 || i > len {
        return Err(CalcError::new(ErrorKind::BigIndex));
    }
    Ok(i - 1)
}

/// Produce one data-frame column as a vector operand, converting through
/// the column's declared unit when evaluation is unit-aware.
fn dataframe_column(df: &DataFrame, col: usize, config: &EvalConfig) -> Result<Operand, CalcError> {
    let cells = df.columns[col].clone();
    match &df.units[col] {
        None => Ok(Operand::new(Value::Vector(VectorValue::new(
            cells,
            Orientation::Column,
        )))),
        Some(name) => {
            let unit =
                unit_from_name(name).map_err(|_| CalcError::with(ErrorKind::UnitName, name))?;
            if config.unit_aware {
                let converted = cells
                    .iter()
                    .map(|s| match s {
                        Scalar::Rational(r) => {
                            Ok(Scalar::Rational(metron_units::to_base_units(r, &unit)))
                        }
                        other => Ok(other.clone()),
                    })
                    .collect::<Result<Vec<_>, CalcError>>()?;
                Ok(Operand::with_unit(
                    Value::Vector(VectorValue::new(converted, Orientation::Column)),
                    UnitTag::Expos(unit.dims),
                ))
            } else {
                Ok(Operand::with_unit(
                    Value::Vector(VectorValue::new(cells, Orientation::Column)),
                    UnitTag::Named(unit),
                ))
            }
        }
    }
}

fn dataframe_cell(df: &DataFrame, row: usize, col: usize, config: &EvalConfig) -> Result<Operand, CalcError> {
    let cell = df.columns[col][row].clone();
    match &df.units[col] {
        None => Ok(Operand::new(cell.into_value())),
        Some(name) => {
            let unit =
                unit_from_name(name).map_err(|_| CalcError::with(ErrorKind::UnitName, name))?;
            if config.unit_aware {
                match cell {
                    Scalar::Rational(r) => Ok(Operand::with_unit(
                        Value::Rational(metron_units::to_base_units(&r, &unit)),
                        UnitTag::Expos(unit.dims),
                    )),
                    other => Ok(Operand::new(other.into_value())),
                }
            } else {
                Ok(Operand::with_unit(cell.into_value(), UnitTag::Named(unit)))
            }
        }
    }
}

/// The bracket accessor: vectors and strings take one index, matrices one
/// or two, maps a key, data frames column/row selectors by name or number.
fn access(base: &Operand, indices: &[Operand], config: &EvalConfig) -> Result<Operand, CalcError> {
    if let Value::Error(e) = &base.value {
        return Err(e.clone());
    }
    match &base.value {
        Value::Vector(v) => match indices {
            [index] => match &index.value {
                Value::Range(r) => {
                    let picks = r.materialize()?;
                    let mut data = Vec::with_capacity(picks.len());
                    for p in &picks {
                        let at = one_based(&Operand::rational(p.clone()), v.len())?;
                        data.push(v.data[at].clone());
                    }
                    Ok(Operand::with_unit(
                        Value::Vector(VectorValue::new(data, v.orientation)),
                        base.unit.clone(),
                    ))
                }
                _ => {
                    let at = one_based(index, v.len())?;
                    Ok(Operand::with_unit(
                        v.data[at].clone().into_value(),
                        base.unit.clone(),
                    ))
                }
            },
            _ => Err(CalcError::new(ErrorKind::Count)),
        },
        Value::Str(s) => match indices {
            [index] => {
                let chars: Vec<char> = s.chars().collect();
                match &index.value {
                    Value::Range(r) => {
                        let picks = r.materialize()?;
                        let mut out = String::new();
                        for p in &picks {
                            let at = one_based(&Operand::rational(p.clone()), chars.len())?;
                            out.push(chars[at]);
                        }
                        Ok(Operand::string(out))
                    }
                    _ => {
                        let at = one_based(index, chars.len())?;
                        Ok(Operand::string(chars[at].to_string()))
                    }
                }
            }
            _ => Err(CalcError::new(ErrorKind::Count)),
        },
        Value::Matrix(m) => match indices {
            [row] => {
                let at = one_based(row, m.rows)?;
                Ok(Operand::with_unit(
                    Value::Vector(VectorValue::new(m.row(at)?, Orientation::Row)),
                    base.unit.clone(),
                ))
            }
            [row, col] => {
                let r = one_based(row, m.rows)?;
                let c = one_based(col, m.cols)?;
                Ok(Operand::with_unit(
                    m.get(r, c)?.clone().into_value(),
                    base.unit.clone(),
                ))
            }
            _ => Err(CalcError::new(ErrorKind::Count)),
        },
        Value::Map(map) => match indices {
            [key] => {
                let k: String = key
                    .try_into()
                    .map_err(|_| CalcError::with(ErrorKind::BadKey, format!("{}", key.value)))?;
                let value = map
                    .get(&k)
                    .ok_or_else(|| CalcError::with(ErrorKind::BadKey, &k))?;
                Ok(Operand::with_unit(value.clone().into_value(), base.unit.clone()))
            }
            _ => Err(CalcError::new(ErrorKind::Count)),
        },
        Value::DataFrame(df) => match indices {
            [selector] => match &selector.value {
                Value::Str(name) => {
                    let col = df.column_named(name)?;
                    dataframe_column(df, col, config)
                }
                _ => {
                    let col = one_based(selector, df.headings.len())?;
                    dataframe_column(df, col, config)
                }
            },
            [row_sel, col_sel] => {
                let row = match &row_sel.value {
                    Value::Str(name) => match &df.row_map {
                        Some(map) => *map
                            .get(name)
                            .ok_or_else(|| CalcError::with(ErrorKind::BadRow, name))?,
                        None => return Err(CalcError::with(ErrorKind::BadRow, name)),
                    },
                    _ => one_based(row_sel, df.row_count())?,
                };
                let col = match &col_sel.value {
                    Value::Str(name) => df.column_named(name)?,
                    _ => one_based(col_sel, df.headings.len())?,
                };
                dataframe_cell(df, row, col, config)
            }
            _ => Err(CalcError::new(ErrorKind::Count)),
        },
        Value::Range(_) => {
            let materialized = Operand::with_unit(
                match &base.value {
                    Value::Range(r) => Value::Vector(VectorValue::new(
                        r.materialize()?.into_iter().map(Scalar::Rational).collect(),
                        Orientation::Row,
                    )),
                    _ => unreachable!(),
                },
                base.unit.clone(),
            );
            access(&materialized, indices, config)
        }
        _ => Err(CalcError::with(ErrorKind::Unsupported, "[]")),
    }
}
