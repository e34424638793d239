//! User-defined functions: parameter lists, the flattened statement arena,
//! and the library that holds them.
//!
//! A function body is a flat statement list executed by instruction-pointer
//! jumps (see [`crate::interpreter`]), not host control flow: user functions
//! are constructed and edited at the statement-list level by the caller.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One statement of a function body. Every embedded expression is an RPN
/// token stream handed back to the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// An assignment (`name` set) or a bare expression statement.
    Assignment { name: Option<String>, rpn: String },
    If { rpn: String },
    ElseIf { rpn: String },
    Else,
    While { rpn: String },
    /// `for dummy in <iterable rpn>`
    For { dummy: String, rpn: String },
    Break,
    /// `return` with no expression yields rational zero.
    Return { rpn: Option<String> },
    Print { rpn: String },
    Throw { message: String },
    End,
}

impl Statement {
    /// Does this statement open a block that a matching `End` closes?
    pub fn opens_block(&self) -> bool {
        matches!(
            self,
            Statement::If { .. } | Statement::While { .. } | Statement::For { .. }
        )
    }
}

/// A declared parameter. A trailing parameter may carry a default,
/// expressed as an RPN stream evaluated when the caller supplies fewer
/// arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub default: Option<String>,
}

impl Parameter {
    pub fn required(name: impl Into<String>) -> Self {
        Parameter { name: name.into(), default: None }
    }

    pub fn with_default(name: impl Into<String>, rpn: impl Into<String>) -> Self {
        Parameter { name: name.into(), default: Some(rpn.into()) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFunction {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub statements: Vec<Statement>,
}

impl UserFunction {
    pub fn new(name: impl Into<String>, parameters: Vec<Parameter>, statements: Vec<Statement>) -> Self {
        UserFunction { name: name.into(), parameters, statements }
    }
}

/// The function library handed to the evaluator beside the environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionLibrary {
    pub functions: HashMap<String, UserFunction>,
}

impl FunctionLibrary {
    pub fn new() -> Self {
        FunctionLibrary::default()
    }

    pub fn insert(&mut self, function: UserFunction) {
        self.functions.insert(function.name.clone(), function);
    }

    pub fn get(&self, name: &str) -> Option<&UserFunction> {
        self.functions.get(name)
    }
}
