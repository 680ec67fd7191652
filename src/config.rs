//! Ambient configuration (C8 surface, C11 CLI): a single `Config` struct shared by the
//! library entry point and both CLI binaries, serde-derived so it can round-trip through
//! the JSON side-channel the root `spicy` package already uses for its own config, and
//! validated the way `solver::klu::KluConfig::validate` clamps/rejects out-of-range values
//! before a run starts rather than failing deep inside the factorization loop.

use crate::pivot::PivotStrategy;
use crate::reorder::ReorderStrategy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("pp_tol must be in (0, 1], got {0}")]
    InvalidPpTol(f64),
    #[error("drop_tol must be >= 0, got {0}")]
    InvalidDropTol(f64),
    #[error("singular_tol must be >= 0, got {0}")]
    InvalidSingularTol(f64),
    #[error("fill must be > 0, got {0}")]
    InvalidFill(f64),
    #[error("minres_iters > 0 requires inplace = false, since MINRES needs A's original values")]
    InplaceWithMinres,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Bunch-Kaufman / Rook pivoting threshold, used literally as the stability bound alpha.
    pub pp_tol: f64,
    /// Entries of L smaller than this magnitude are dropped rather than stored.
    pub drop_tol: f64,
    /// Pivots with |value| (or |det| for a 2x2 block) below this are treated as singular.
    pub singular_tol: f64,
    /// Per-column fill factor: at most `floor(fill * nnz(A) / n)` entries are kept per column
    /// of L once the relative drop threshold has been applied, keeping the largest-magnitude
    /// survivors first.
    pub fill: f64,
    pub pivot_strategy: PivotStrategy,
    pub reorder: ReorderStrategy,
    pub equilibrate: bool,
    /// Overwrite the input matrix's storage in place rather than copying; incompatible
    /// with running MINRES afterward, since MINRES needs the original A.
    pub inplace: bool,
    /// Number of MINRES iterations to run after factorization, as a preconditioned solve
    /// of A x = b. Zero disables the solve step entirely.
    pub minres_iters: usize,
    pub minres_tol: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            pp_tol: 1.0,
            drop_tol: 0.001,
            singular_tol: 1e-12,
            fill: 1.0,
            pivot_strategy: PivotStrategy::Rook,
            reorder: ReorderStrategy::Amd,
            equilibrate: true,
            inplace: false,
            minres_iters: 0,
            minres_tol: 1e-6,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.pp_tol > 0.0 && self.pp_tol <= 1.0) {
            return Err(ConfigError::InvalidPpTol(self.pp_tol));
        }
        if self.drop_tol < 0.0 {
            return Err(ConfigError::InvalidDropTol(self.drop_tol));
        }
        if self.singular_tol < 0.0 {
            return Err(ConfigError::InvalidSingularTol(self.singular_tol));
        }
        if self.fill <= 0.0 {
            return Err(ConfigError::InvalidFill(self.fill));
        }
        if self.inplace && self.minres_iters > 0 {
            return Err(ConfigError::InplaceWithMinres);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn inplace_with_minres_is_rejected() {
        let config = Config {
            inplace: true,
            minres_iters: 50,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InplaceWithMinres));
    }

    #[test]
    fn out_of_range_pp_tol_is_rejected() {
        let config = Config {
            pp_tol: 1.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_positive_fill_is_rejected() {
        let config = Config {
            fill: 0.0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidFill(0.0)));
    }
}
