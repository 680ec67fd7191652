//! Incomplete `LDL^T` factorization of symmetric and skew-symmetric sparse matrices.
//!
//! Given a lower-triangular sparse `A` (symmetric or skew-symmetric), this crate computes
//! `P^T S A S P ~= L D L^T` — an equilibrated, permuted, approximate factorization with a
//! unit lower-triangular `L`, a block-diagonal `D` (1x1 and 2x2 blocks from Bunch-Kaufman
//! or Rook pivoting), a permutation `P`, and a diagonal scaling `S` — suitable as a
//! preconditioner for [`minres`], a MINRES iterative solver.

pub mod cli;
pub mod config;
pub mod crout;
pub mod equil;
pub mod error;
pub mod factor;
pub mod minres;
pub mod pivot;
pub mod reorder;
pub mod solver;
pub mod store;
pub mod swap;
pub mod write_l;

pub use config::Config;
pub use error::IldlError;
pub use factor::{factorize, FactorError, Factorization};
