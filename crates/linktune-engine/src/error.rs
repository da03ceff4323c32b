//! Decision engine error types.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("coding index {target} outside [{min}, {max}]")]
    BoundaryViolation { target: u8, min: u8, max: u8 },
}
