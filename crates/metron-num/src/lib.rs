//! Exact numeric tower for the Metron calculator engine.
//!
//! `Rational` is an arbitrary-precision fraction with the sign carried in the
//! numerator; `Complex` is a pair of rationals. Transcendental operations that
//! have no exact rational result fall back to `f64` and re-rationalize.

pub mod complex;
pub mod rational;

pub use complex::Complex;
pub use rational::{lanczos_gamma, Rational};
