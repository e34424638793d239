//! Operator dispatch and builtin functions.
//!
//! Binary, unary and relational operators dispatch on operand shape through
//! exhaustive matches; an undeclared shape pair is a typed error, never a
//! silent coercion. Named functions register through the `#[calc_builtin]`
//! inventory and are reached with `call_builtin`.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use metron_values::{builtin_functions, BuiltinFunction, CalcError, ErrorKind, Operand};

pub mod binary;
pub mod comparison;
pub mod dtype;
pub mod mathematics;
pub mod matrix;
pub mod unary;

pub use binary::{binary_op, BinaryOp, MulStyle};
pub use comparison::relate;
pub use dtype::binary_result_dtype;
pub use unary::unary_op;

static BUILTIN_INDEX: Lazy<HashMap<&'static str, &'static BuiltinFunction>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for func in builtin_functions() {
        map.insert(func.name, func);
    }
    map
});

/// Dispatch a named builtin function discovered from the inventory.
pub fn call_builtin(name: &str, args: &[Operand]) -> Result<Operand, CalcError> {
    match BUILTIN_INDEX.get(name) {
        Some(func) => {
            log::trace!("builtin {name} with {} args", args.len());
            (func.implementation)(args)
        }
        None => Err(CalcError::with(ErrorKind::FName, name)),
    }
}

/// Look up a named constant (pi, e, …).
pub fn lookup_constant(name: &str) -> Option<Operand> {
    metron_values::constants()
        .into_iter()
        .find(|c| c.name == name)
        .map(|c| (c.builder)())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_builtin_is_a_typed_error() {
        let err = call_builtin("nosuchfn", &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::FName);
        assert_eq!(err.message(), "Function nosuchfn is not defined.");
    }

    #[test]
    fn constants_are_discoverable() {
        let pi = lookup_constant("pi").unwrap();
        let r: metron_num::Rational = (&pi).try_into().unwrap();
        assert!((r.to_f64() - std::f64::consts::PI).abs() < 1e-12);
    }
}
