//! The control-flow interpreter for user-defined function bodies.
//!
//! A function body is a flat statement list walked by an instruction
//! pointer. Branching statements push a control frame recording whether
//! their guard was satisfied and the index of their matching `end`; `end`
//! pops the frame or jumps back to the owning loop; `break` unwinds through
//! any `if` frames to the nearest enclosing loop. Expression statements hand
//! their RPN back to the stack machine. A statement budget bounds runaway
//! loops.

use metron_num::Rational;
use metron_values::{
    record_from_operand, CalcError, ErrorKind, Operand, Orientation, Scalar, Value, VectorValue,
};

use crate::functions::{FunctionLibrary, Statement, UserFunction};
use crate::vm::eval_tokens;
use crate::{Environment, EvalConfig};

/// One bound element per iteration, per iterable kind. Strings yield one
/// character per step: a multi-byte character advances the cursor by its
/// full width, never by single bytes.
enum LoopIterator {
    Range {
        cursor: Rational,
        step: Rational,
        end: Rational,
    },
    Items(std::vec::IntoIter<Operand>),
}

impl LoopIterator {
    fn next(&mut self) -> Option<Operand> {
        match self {
            LoopIterator::Range { cursor, step, end } => {
                let in_bounds = if step.is_negative() {
                    &*cursor >= end
                } else {
                    &*cursor <= end
                };
                if !in_bounds {
                    return None;
                }
                let current = cursor.clone();
                *cursor = cursor.add(step);
                Some(Operand::rational(current))
            }
            LoopIterator::Items(iter) => iter.next(),
        }
    }
}

fn for_iterator(op: &Operand) -> Result<LoopIterator, CalcError> {
    match &op.value {
        Value::Range(r) => {
            if r.step.is_zero() {
                return Err(CalcError::new(ErrorKind::ZeroStep));
            }
            Ok(LoopIterator::Range {
                cursor: r.start.clone(),
                step: r.step.clone(),
                end: r.end.clone(),
            })
        }
        Value::Vector(v) => Ok(LoopIterator::Items(
            v.data
                .iter()
                .map(|s| Operand::with_unit(s.clone().into_value(), op.unit.clone()))
                .collect::<Vec<_>>()
                .into_iter(),
        )),
        Value::Matrix(m) => {
            let mut rows = Vec::with_capacity(m.rows);
            for r in 0..m.rows {
                rows.push(Operand::with_unit(
                    Value::Vector(VectorValue::new(m.row(r)?, Orientation::Row)),
                    op.unit.clone(),
                ));
            }
            Ok(LoopIterator::Items(rows.into_iter()))
        }
        Value::Str(s) => Ok(LoopIterator::Items(
            s.chars()
                .map(|c| Operand::string(c.to_string()))
                .collect::<Vec<_>>()
                .into_iter(),
        )),
        _ => Err(CalcError::new(ErrorKind::ForIterable)),
    }
}

enum FrameKind {
    If,
    While { start: usize },
    For { start: usize, dummy: String, iter: LoopIterator },
}

/// One active block during execution.
struct Frame {
    kind: FrameKind,
    satisfied: bool,
    end: usize,
}

/// Index of the `End` matching the block opened at `open`.
fn find_block_end(statements: &[Statement], open: usize) -> Result<usize, CalcError> {
    let mut nesting = 0usize;
    for (i, statement) in statements.iter().enumerate().skip(open + 1) {
        if statement.opens_block() {
            nesting += 1;
        } else if matches!(statement, Statement::End) {
            if nesting == 0 {
                return Ok(i);
            }
            nesting -= 1;
        }
    }
    Err(CalcError::new(ErrorKind::UnbalancedEnd))
}

/// Index of the next `ElseIf`/`Else` at this nesting level, or the block's
/// `end` when there is none.
fn find_next_branch(statements: &[Statement], from: usize, end: usize) -> usize {
    let mut nesting = 0usize;
    for (i, statement) in statements.iter().enumerate().take(end).skip(from + 1) {
        if statement.opens_block() {
            nesting += 1;
        } else if matches!(statement, Statement::End) {
            nesting = nesting.saturating_sub(1);
        } else if nesting == 0
            && matches!(statement, Statement::ElseIf { .. } | Statement::Else)
        {
            return i;
        }
    }
    end
}

fn condition(rpn: &str, env: &Environment, config: &EvalConfig, lib: Option<&FunctionLibrary>, depth: usize, prints: &mut Vec<String>) -> Result<bool, CalcError> {
    let value = eval_tokens(rpn, env, config, lib, depth, prints)?;
    (&value).try_into()
}

/// Call a user-defined function: bind parameters positionally (trailing
/// defaults fill missing arguments, surplus arguments are an error), then
/// interpret the statement list.
pub(crate) fn call_function(
    function: &UserFunction,
    args: &[Operand],
    config: &EvalConfig,
    lib: Option<&FunctionLibrary>,
    depth: usize,
    prints: &mut Vec<String>,
) -> Result<Operand, CalcError> {
    if depth > config.max_recursion_depth {
        log::warn!("function recursion budget exhausted in {}", function.name);
        return Err(CalcError::new(ErrorKind::MaxDepth));
    }
    if args.len() > function.parameters.len() {
        return Err(CalcError::with(ErrorKind::NumArgs, &function.name));
    }
    let mut locals = Environment::new();
    let empty = Environment::new();
    for (position, parameter) in function.parameters.iter().enumerate() {
        let bound = match args.get(position) {
            Some(arg) => arg.clone(),
            None => match &parameter.default {
                Some(rpn) => eval_tokens(rpn, &empty, config, lib, depth + 1, prints)?,
                None => return Err(CalcError::with(ErrorKind::NumArgs, &function.name)),
            },
        };
        locals.insert(parameter.name.clone(), record_from_operand(&parameter.name, &bound));
    }
    interpret(function, locals, config, lib, depth, prints)
}

fn interpret(
    function: &UserFunction,
    mut locals: Environment,
    config: &EvalConfig,
    lib: Option<&FunctionLibrary>,
    depth: usize,
    prints: &mut Vec<String>,
) -> Result<Operand, CalcError> {
    let statements = &function.statements;
    let mut frames: Vec<Frame> = Vec::new();
    let mut i = 0usize;
    let mut steps = 0usize;

    while i < statements.len() {
        steps += 1;
        if steps > config.max_loop_iterations {
            log::warn!("statement budget exhausted in {}", function.name);
            return Err(CalcError::new(ErrorKind::MaxIteration));
        }
        match &statements[i] {
            Statement::Assignment { name, rpn } => {
                let value = eval_tokens(rpn, &locals, config, lib, depth, prints)?;
                if let Some(variable) = name {
                    locals.insert(variable.clone(), record_from_operand(variable, &value));
                }
                i += 1;
            }
            Statement::If { rpn } => {
                let end = find_block_end(statements, i)?;
                let taken = condition(rpn, &locals, config, lib, depth, prints)?;
                frames.push(Frame { kind: FrameKind::If, satisfied: taken, end });
                i = if taken { i + 1 } else { find_next_branch(statements, i, end) };
            }
            Statement::ElseIf { rpn } => {
                let frame = frames
                    .last_mut()
                    .ok_or_else(|| CalcError::new(ErrorKind::UnbalancedEnd))?;
                if frame.satisfied {
                    i = frame.end;
                } else {
                    let taken = condition(rpn, &locals, config, lib, depth, prints)?;
                    if taken {
                        frame.satisfied = true;
                        i += 1;
                    } else {
                        let end = frame.end;
                        i = find_next_branch(statements, i, end);
                    }
                }
            }
            Statement::Else => {
                let frame = frames
                    .last_mut()
                    .ok_or_else(|| CalcError::new(ErrorKind::UnbalancedEnd))?;
                if frame.satisfied {
                    i = frame.end;
                } else {
                    frame.satisfied = true;
                    i += 1;
                }
            }
            Statement::While { rpn } => {
                let looped_back = matches!(
                    frames.last(),
                    Some(Frame { kind: FrameKind::While { start }, .. }) if *start == i
                );
                if looped_back {
                    if condition(rpn, &locals, config, lib, depth, prints)? {
                        i += 1;
                    } else {
                        let frame = frames.pop().expect("while frame");
                        i = frame.end + 1;
                    }
                } else {
                    let end = find_block_end(statements, i)?;
                    if condition(rpn, &locals, config, lib, depth, prints)? {
                        frames.push(Frame {
                            kind: FrameKind::While { start: i },
                            satisfied: true,
                            end,
                        });
                        i += 1;
                    } else {
                        i = end + 1;
                    }
                }
            }
            Statement::For { dummy, rpn } => {
                let looped_back = matches!(
                    frames.last(),
                    Some(Frame { kind: FrameKind::For { start, .. }, .. }) if *start == i
                );
                if looped_back {
                    let frame = frames.last_mut().expect("for frame");
                    let next = match &mut frame.kind {
                        FrameKind::For { iter, dummy, .. } => {
                            iter.next().map(|v| (dummy.clone(), v))
                        }
                        _ => unreachable!(),
                    };
                    match next {
                        Some((name, value)) => {
                            locals.insert(name.clone(), record_from_operand(&name, &value));
                            i += 1;
                        }
                        None => {
                            let frame = frames.pop().expect("for frame");
                            i = frame.end + 1;
                        }
                    }
                } else {
                    let end = find_block_end(statements, i)?;
                    let iterable = eval_tokens(rpn, &locals, config, lib, depth, prints)?;
                    let mut iter = for_iterator(&iterable)?;
                    match iter.next() {
                        Some(first) => {
                            locals.insert(dummy.clone(), record_from_operand(dummy, &first));
                            frames.push(Frame {
                                kind: FrameKind::For {
                                    start: i,
                                    dummy: dummy.clone(),
                                    iter,
                                },
                                satisfied: true,
                                end,
                            });
                            i += 1;
                        }
                        None => i = end + 1,
                    }
                }
            }
            Statement::Break => {
                // Unwind through if frames to the nearest enclosing loop.
                let mut target: Option<usize> = None;
                while let Some(frame) = frames.pop() {
                    match frame.kind {
                        FrameKind::If => continue,
                        FrameKind::While { .. } | FrameKind::For { .. } => {
                            target = Some(frame.end);
                            break;
                        }
                    }
                }
                match target {
                    Some(end) => i = end + 1,
                    None => return Err(CalcError::new(ErrorKind::BreakOutsideLoop)),
                }
            }
            Statement::Return { rpn } => {
                return match rpn {
                    Some(expression) => {
                        let value = eval_tokens(expression, &locals, config, lib, depth, prints)?;
                        Ok(Operand::with_unit(value.value.resolve_chain(), value.unit))
                    }
                    None => Ok(Operand::rational(Rational::zero())),
                };
            }
            Statement::Print { rpn } => {
                let value = eval_tokens(rpn, &locals, config, lib, depth, prints)?;
                prints.push(render(&value));
                i += 1;
            }
            Statement::Throw { message } => {
                return Err(CalcError::with(ErrorKind::Custom, message));
            }
            Statement::End => {
                let loop_start = match frames.last() {
                    None => return Err(CalcError::new(ErrorKind::UnbalancedEnd)),
                    Some(Frame { kind: FrameKind::If, .. }) => None,
                    Some(Frame { kind: FrameKind::While { start }, .. })
                    | Some(Frame { kind: FrameKind::For { start, .. }, .. }) => Some(*start),
                };
                match loop_start {
                    // An if block simply closes; a loop end jumps back to
                    // its owning while/for statement.
                    None => {
                        frames.pop();
                        i += 1;
                    }
                    Some(start) => i = start,
                }
            }
        }
    }
    // Falling off the end of the body yields rational zero, like a bare
    // return.
    Ok(Operand::rational(Rational::zero()))
}

fn render(op: &Operand) -> String {
    match &op.value {
        Value::Str(s) => s.clone(),
        Value::Vector(v) if v.data.iter().all(|s| matches!(s, Scalar::Str(_))) => v
            .data
            .iter()
            .map(|s| match s {
                Scalar::Str(text) => text.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" "),
        _ => format!("{op}"),
    }
}
