//! The Metron evaluation engine.
//!
//! `evaluate` consumes an RPN token stream produced by an external parser,
//! resolves variables through an environment of assignment records, and
//! returns exactly one operand: the result, or a single ERROR operand. The
//! statement-list interpreter in [`interpreter`] executes user-defined
//! function bodies, calling back into the evaluator for each expression.

use std::collections::HashMap;

use metron_values::{AssignmentRecord, Operand};

pub mod functions;
pub mod interpreter;
pub mod token;
pub mod vm;

pub use functions::{FunctionLibrary, Parameter, Statement, UserFunction};

/// The variable environment: name → assignment record. Owned by the
/// document layer; the evaluator only reads it.
pub type Environment = HashMap<String, AssignmentRecord>;

/// Per-call evaluation settings.
///
/// `decimal_format` rides along for downstream display formatting and never
/// affects computation. The two budgets are hardening guards with no
/// counterpart in the source system: expression recursion (`cases`, `∑`,
/// user-function calls) and statement-interpreter loops are both bounded so
/// pathological input degrades to a typed error instead of unbounded stack
/// or time.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalConfig {
    pub decimal_format: String,
    pub unit_aware: bool,
    pub max_loop_iterations: usize,
    pub max_recursion_depth: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            decimal_format: "1,000,000.".to_string(),
            unit_aware: true,
            max_loop_iterations: 1_000_000,
            max_recursion_depth: 100,
        }
    }
}

/// The result of one evaluation: the single result operand (possibly an
/// ERROR operand) and any `print` output produced by user functions.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalOutcome {
    pub operand: Operand,
    pub printed: Vec<String>,
}

/// Evaluate one RPN token stream. This is the public entry point: every
/// internal failure surfaces here as the single ERROR operand required by
/// the error contract — the engine never panics on expected failure modes.
pub fn evaluate(
    rpn: &str,
    env: &Environment,
    config: &EvalConfig,
    lib: Option<&FunctionLibrary>,
) -> EvalOutcome {
    let mut printed = Vec::new();
    log::debug!("evaluate: {} tokens", rpn.split(token::SEPARATOR).count());
    let operand = match vm::eval_tokens(rpn, env, config, lib, 0, &mut printed) {
        Ok(op) => op,
        Err(e) => Operand::error(e),
    };
    EvalOutcome { operand, printed }
}
