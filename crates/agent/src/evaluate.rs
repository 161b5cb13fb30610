//! The arithmetic a worker performs on a pulled task.

use tally_core::Operator;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum EvalError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("result of {lhs} {op} {rhs} is not a finite number")]
    NotFinite { lhs: f64, op: Operator, rhs: f64 },
}

/// Apply `op` to the two operands.
///
/// Division by zero and overflow to infinity are reported as errors so the
/// orchestrator can mark the owning expression failed.
pub fn evaluate(op: Operator, lhs: f64, rhs: f64) -> Result<f64, EvalError> {
    let value = match op {
        Operator::Add => lhs + rhs,
        Operator::Sub => lhs - rhs,
        Operator::Mul => lhs * rhs,
        Operator::Div => {
            if rhs == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            lhs / rhs
        }
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::NotFinite { lhs, op, rhs })
    }
}
