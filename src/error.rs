//! Top-level error type: every public entry point returns `Result<_, IldlError>`, with
//! sub-errors wrapped transparently (the same shallow-wrapping style as
//! `solver::matrix::error::MatrixError`).

use crate::config::ConfigError;
use crate::factor::FactorError;
use crate::solver::matrix::error::MatrixError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IldlError {
    #[error(transparent)]
    Matrix(#[from] MatrixError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Factor(#[from] FactorError),
    #[error("right-hand-side length {actual} does not match matrix dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}
