//! Shared CLI surface (C11) for the `ildl_driver` and `skew_ildl_driver` binaries —
//! mirroring the original project's `ldl_driver`/`skew_ldl_driver` split, where both tools
//! parse the same flags and differ only in which `sign` they pass through. Grounded in
//! `src/bin/klu_mtx.rs`'s timing-breakdown and stats-printing style.

use crate::config::Config;
use crate::error::IldlError;
use crate::factor::{factorize, FactorError};
use crate::minres::{self, LdltPreconditioner};
use crate::pivot::PivotStrategy;
use crate::reorder::ReorderStrategy;
use crate::solver::matrix::builder::MatrixBuilder;
use crate::solver::matrix::csc::CscMatrix;
use crate::solver::matrix::error::{MatrixError, MatrixMarketError};
use crate::solver::matrix::mtx::{
    load_matrix_market_csc_file, load_matrix_market_vector_file, write_matrix_market_csc, write_matrix_market_vector,
};
use crate::store::{DBlock, LStore};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// Path to the MatrixMarket coordinate matrix (.mtx) to factorize.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Bunch-Kaufman / Rook pivoting threshold (alpha).
    #[arg(long, default_value_t = 1.0)]
    pub pp_tol: f64,

    /// Entries of L below `drop_tol * ||col||_1` are dropped.
    #[arg(long, default_value_t = 0.001)]
    pub drop_tol: f64,

    /// Pivots with |value| below this are treated as singular.
    #[arg(long, default_value_t = 1e-12)]
    pub singular_tol: f64,

    /// Controls memory usage: each column of L keeps at most `fill * nnz(A) / n` entries.
    #[arg(long, default_value_t = 1.0)]
    pub fill: f64,

    /// Pivoting strategy: "bunch-kaufman" or "rook".
    #[arg(long, default_value = "rook")]
    pub pivot: String,

    /// Fill-reducing reordering: "amd", "rcm", or "none".
    #[arg(long, default_value = "amd")]
    pub reorder: String,

    /// Disable Bunch max-norm equilibration.
    #[arg(long)]
    pub no_equilibrate: bool,

    /// Factor in place, overwriting A's storage (saves memory, incompatible with MINRES).
    #[arg(long)]
    pub inplace: bool,

    /// Number of MINRES iterations to run after factorization (0 disables solving).
    #[arg(long, default_value_t = 0)]
    pub minres_iters: usize,

    /// MINRES relative residual tolerance.
    #[arg(long, default_value_t = 1e-6)]
    pub minres_tol: f64,

    /// Right-hand-side vector to solve against, in MatrixMarket array format. When absent,
    /// an all-ones vector is used (mirrors the upstream driver: "for testing purposes only").
    #[arg(long, value_name = "PATH")]
    pub rhs_file: Option<PathBuf>,

    /// Write the resulting solution vector to this path in MatrixMarket array format, in
    /// addition to `output_matrices/outsol.mtx` when `save` is on.
    #[arg(long, value_name = "PATH")]
    pub write_solution: Option<PathBuf>,

    /// Disable saving the factorization outputs (A, S, P, B, L, D, and the MINRES solution
    /// when requested) as MatrixMarket files under `output_matrices/`.
    #[arg(long)]
    pub no_save: bool,

    /// Print a human-readable dump of the factors to stdout.
    #[arg(long)]
    pub display: bool,
}

const OUTPUT_DIR: &str = "output_matrices";

fn fmt_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs >= 1.0 {
        format!("{secs:.3}s")
    } else if secs >= 1e-3 {
        format!("{:.3}ms", secs * 1e3)
    } else if secs >= 1e-6 {
        format!("{:.3}us", secs * 1e6)
    } else {
        format!("{}ns", d.as_nanos())
    }
}

fn print_timing_breakdown(stages: &[(&str, Duration)], total_elapsed: Duration) {
    let accounted_secs = stages.iter().map(|(_, d)| d.as_secs_f64()).sum::<f64>();
    let total_secs = total_elapsed.as_secs_f64();

    println!();
    println!(
        "timing breakdown (accounted {}, total {}):",
        fmt_duration(Duration::from_secs_f64(accounted_secs)),
        fmt_duration(total_elapsed)
    );
    for (name, dur) in stages {
        let pct = if total_secs > 0.0 {
            (dur.as_secs_f64() / total_secs) * 100.0
        } else {
            0.0
        };
        println!("  {name:<22} {:>12} ({pct:>6.2}%)", fmt_duration(*dur));
    }
}

fn format_pivot_summary(one_by_one: usize, two_by_two: usize, singular: usize) -> String {
    format!("pivots: {one_by_one} 1x1, {two_by_two} 2x2, {singular} singular")
}

/// Default right-hand side when none is supplied: all-ones, "for testing purposes only"
/// (mirrors the upstream driver's `ldl_driver.cpp`).
fn default_rhs(n: usize) -> Vec<f64> {
    vec![1.0; n]
}

/// Materialize `L` (unit lower triangular, diagonal included) as a plain `CscMatrix` for
/// MatrixMarket output.
fn l_to_csc(l: &LStore, n: usize) -> CscMatrix {
    let mut b = MatrixBuilder::new(n, n);
    for k in 0..n {
        b.push(k, k, 1.0).expect("unit diagonal");
        let (rows, vals) = l.col(k);
        for (&row, &val) in rows.iter().zip(vals.iter()) {
            b.push(k, row, val).expect("L entries are already deduplicated");
        }
    }
    b.build_csc().expect("L is already lower-triangular by construction")
}

/// Materialize block-diagonal `D` as a plain `CscMatrix` for MatrixMarket output.
fn d_to_csc(l: &LStore, n: usize) -> CscMatrix {
    let mut b = MatrixBuilder::new(n, n);
    for block in l.blocks() {
        match *block {
            DBlock::One { k, d } => {
                b.push(k, k, d).expect("diagonal block");
            }
            DBlock::Two { k, r, d_kk, d_kr, d_rr } => {
                b.push(k, k, d_kk).expect("2x2 block diagonal");
                b.push(k, r, d_kr).expect("2x2 block off-diagonal");
                b.push(r, r, d_rr).expect("2x2 block diagonal");
            }
        }
    }
    b.build_csc().expect("D is block-diagonal and lower-triangular by construction")
}

/// Materialize the diagonal equilibration `S` as a plain `CscMatrix` for MatrixMarket output.
fn s_to_csc(s: &[f64]) -> CscMatrix {
    let n = s.len();
    let mut b = MatrixBuilder::new(n, n);
    for (i, &si) in s.iter().enumerate() {
        b.push(i, i, si).expect("diagonal entry");
    }
    b.build_csc().expect("S is diagonal by construction")
}

/// Materialize the composite permutation `P` (final index -> original index) as a sparse
/// 0/1 `CscMatrix` for MatrixMarket output: column `j` carries a single `1` at row `perm[j]`.
fn perm_to_csc(perm: &[usize]) -> CscMatrix {
    let n = perm.len();
    let mut b = MatrixBuilder::new(n, n);
    for (j, &i) in perm.iter().enumerate() {
        b.push(j, i, 1.0).expect("permutation entry");
    }
    b.build_csc().expect("P is a permutation matrix by construction")
}

/// Materialize `B = P^T S A S P` (lower-triangle only) from the original lower-triangular
/// `a`, the composite permutation `perm` and the equilibration `s`, for MatrixMarket output.
fn b_to_csc(a: &CscMatrix, sign: f64, perm: &[usize], s: &[f64]) -> CscMatrix {
    let n = a.dim.ncols;
    let mut inv = vec![0usize; n];
    for (new_idx, &orig_idx) in perm.iter().enumerate() {
        inv[orig_idx] = new_idx;
    }

    let mut b = MatrixBuilder::new(n, n);
    for col in 0..n {
        let (rows, vals) = a.col(col);
        for (&row, &val) in rows.iter().zip(vals.iter()) {
            let new_row = inv[row];
            let new_col = inv[col];
            let scaled = s[new_row] * val * s[new_col];
            if new_row >= new_col {
                b.push(new_col, new_row, scaled).expect("B entry");
            } else {
                b.push(new_row, new_col, sign * scaled).expect("B entry (reflected)");
            }
        }
    }
    b.build_csc().expect("B is lower-triangular by construction")
}

/// Write every `save` artifact (`outA.mtx`, `outS.mtx`, `outP.mtx`, `outB.mtx`, `outL.mtx`,
/// `outD.mtx`) under `output_matrices/`, created next to the invocation.
fn save_factorization(
    dir: &Path,
    a: &CscMatrix,
    sign: f64,
    result: &crate::factor::Factorization,
    n: usize,
) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;

    let write = |name: &str, m: &CscMatrix, mirror: bool| -> std::io::Result<()> {
        let f = std::fs::File::create(dir.join(name))?;
        write_matrix_market_csc(f, m, sign, mirror)
    };

    write("outA.mtx", a, true)?;
    write("outS.mtx", &s_to_csc(&result.equilibration.s), false)?;
    write("outP.mtx", &perm_to_csc(&result.perm), false)?;
    write("outB.mtx", &b_to_csc(a, sign, &result.perm, &result.equilibration.s), true)?;
    write("outL.mtx", &l_to_csc(&result.l, n), false)?;
    write("outD.mtx", &d_to_csc(&result.l, n), true)?;
    Ok(())
}

fn parse_pivot_strategy(s: &str) -> PivotStrategy {
    match s {
        "rook" => PivotStrategy::Rook,
        _ => PivotStrategy::BunchKaufman,
    }
}

fn parse_reorder_strategy(s: &str) -> ReorderStrategy {
    match s {
        "rcm" => ReorderStrategy::Rcm,
        "none" => ReorderStrategy::None,
        _ => ReorderStrategy::Amd,
    }
}

/// Run the driver for a `sign`-symmetric matrix (`1.0` symmetric, `-1.0` skew-symmetric).
/// Structural/format errors and configuration errors surface immediately as `Err`; numerical
/// anomalies (singular steps) are only ever recorded as diagnostics on the `Factorization`
/// itself, never as an `Err` here.
pub fn try_run(sign: f64) -> Result<(), IldlError> {
    env_logger::init();
    let total_start = Instant::now();
    let mut stages: Vec<(&str, Duration)> = Vec::new();
    let args = Args::parse();

    let config = Config {
        pp_tol: args.pp_tol,
        drop_tol: args.drop_tol,
        singular_tol: args.singular_tol,
        fill: args.fill,
        pivot_strategy: parse_pivot_strategy(&args.pivot),
        reorder: parse_reorder_strategy(&args.reorder),
        equilibrate: !args.no_equilibrate,
        inplace: args.inplace,
        minres_iters: args.minres_iters,
        minres_tol: args.minres_tol,
    };
    if let Err(e) = config.validate() {
        eprintln!("invalid configuration: {e}");
        return Err(e.into());
    }

    let t = Instant::now();
    let (a, symmetry) = match load_matrix_market_csc_file(&args.path) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("failed to load MatrixMarket file: {e}");
            return Err(e.into());
        }
    };
    stages.push(("load_matrix", t.elapsed()));

    println!("matrix: {}", args.path.display());
    println!("dim: {} x {}", a.dim.nrows, a.dim.ncols);
    println!("nnz: {}", a.nnz());
    println!("declared symmetry: {}", symmetry.label());

    if !a.is_square() {
        eprintln!("this factorization requires a square matrix");
        print_timing_breakdown(&stages, total_start.elapsed());
        return Err(FactorError::NotSquare {
            rows: a.dim.nrows,
            cols: a.dim.ncols,
        }
        .into());
    }

    let n = a.dim.ncols;
    let t = Instant::now();
    let result = match factorize(&a, sign, &config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("factorization failed: {e}");
            print_timing_breakdown(&stages, total_start.elapsed());
            return Err(e.into());
        }
    };
    stages.push(("factorize", t.elapsed()));

    println!(
        "{}",
        format_pivot_summary(
            result.one_by_one_steps,
            result.two_by_two_steps,
            result.singular_steps.len()
        )
    );
    let output_dir = PathBuf::from(OUTPUT_DIR);
    if !args.no_save {
        if let Err(e) = save_factorization(&output_dir, &a, sign, &result, n) {
            eprintln!("failed to save factorization outputs: {e}");
            print_timing_breakdown(&stages, total_start.elapsed());
            return Err(MatrixError::from(MatrixMarketError::from(e)).into());
        }
    }

    if config.minres_iters > 0 {
        let t = Instant::now();
        let b = match &args.rhs_file {
            Some(path) => match load_matrix_market_vector_file(path) {
                Ok(v) => v,
                Err(e) => {
                    eprintln!("failed to load rhs file: {e}");
                    return Err(e.into());
                }
            },
            None => default_rhs(n),
        };
        if b.len() != n {
            eprintln!("the right hand side dimensions ({}) do not match the dimensions of A ({n})", b.len());
            print_timing_breakdown(&stages, total_start.elapsed());
            return Err(IldlError::DimensionMismatch {
                expected: n,
                actual: b.len(),
            });
        }
        let mut x = vec![0.0; n];
        let precond = LdltPreconditioner {
            factorization: &result,
        };
        let report = minres::minres(
            &a,
            sign,
            &b,
            &mut x,
            &precond,
            config.minres_iters,
            config.minres_tol,
        );
        stages.push(("minres", t.elapsed()));
        println!(
            "minres: {} iterations, residual {:.3e}, converged = {}",
            report.iterations, report.residual_norm, report.converged
        );

        if let Some(path) = &args.write_solution {
            if let Ok(file) = std::fs::File::create(path) {
                let _ = write_matrix_market_vector(file, &x);
            }
        }
        if !args.no_save {
            if let Ok(file) = std::fs::File::create(output_dir.join("outsol.mtx")) {
                let _ = write_matrix_market_vector(file, &x);
            }
        }
    }

    if !args.no_save {
        println!("All output written to {OUTPUT_DIR}/.");
    }

    print_timing_breakdown(&stages, total_start.elapsed());
    Ok(())
}

/// Run the driver and translate any `Err` into a process exit, matching the upstream
/// driver's exit-code contract ("0 on success; 1 on dimension mismatch; non-zero on file
/// I/O failure").
pub fn run(sign: f64) {
    if let Err(e) = try_run(sign) {
        let code = match e {
            IldlError::Config(_) | IldlError::DimensionMismatch { .. } => 2,
            IldlError::Factor(FactorError::NotSquare { .. }) => 1,
            IldlError::Matrix(_) | IldlError::Factor(_) => 1,
        };
        eprintln!("error: {e}");
        std::process::exit(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pivot_summary_shape_is_stable() {
        insta::assert_snapshot!(format_pivot_summary(12, 3, 1));
    }

    #[test]
    fn pivot_summary_with_no_singular_steps() {
        insta::assert_snapshot!(format_pivot_summary(7, 0, 0));
    }

    #[test]
    fn strategy_parsing_defaults_to_bunch_kaufman_and_amd() {
        assert_eq!(parse_pivot_strategy("nonsense"), PivotStrategy::BunchKaufman);
        assert_eq!(parse_pivot_strategy("rook"), PivotStrategy::Rook);
        assert_eq!(parse_reorder_strategy("rcm"), ReorderStrategy::Rcm);
        assert_eq!(parse_reorder_strategy("none"), ReorderStrategy::None);
    }

    #[test]
    fn perm_to_csc_places_a_single_one_per_column() {
        let p = perm_to_csc(&[2, 0, 1]);
        assert_eq!(p.nnz(), 3);
        let (rows, vals) = p.col(0);
        assert_eq!(rows, &[2]);
        assert_eq!(vals, &[1.0]);
    }

    #[test]
    fn s_to_csc_is_diagonal() {
        let s = s_to_csc(&[2.0, 3.0, 4.0]);
        assert_eq!(s.nnz(), 3);
        for i in 0..3 {
            let (rows, _) = s.col(i);
            assert_eq!(rows, &[i]);
        }
    }
}
