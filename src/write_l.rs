//! Drop rule and `L`/`D` writer (C7): given a resolved pivot (after any swap has already
//! been applied and the Crout update already subtracted), solve for the corresponding
//! column(s) of `L`, drop small entries, and commit the result into `LStore`, finally
//! clearing the spent column(s) out of `AStore`.

use crate::store::{AStore, LStore};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedPivot {
    One { k: usize },
    Two { k: usize, r: usize },
}

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum WriteError {
    #[error("pivot at step {step} is numerically singular (|value| < {threshold:e})")]
    Singular { step: usize, threshold: f64 },
}

/// Apply the relative drop threshold `tau = tol * ||col||_1` and the per-column fill cap to a
/// candidate set of `(row, value)` entries, keeping the largest-magnitude survivors first.
fn apply_drop_and_fill(mut entries: Vec<(usize, f64)>, drop_tol: f64, fill_cap: usize) -> Vec<(usize, f64)> {
    let l1: f64 = entries.iter().map(|&(_, v)| v.abs()).sum();
    let tau = drop_tol * l1;
    entries.retain(|&(_, v)| v.abs() >= tau);
    if entries.len() > fill_cap {
        entries.sort_unstable_by(|a, b| b.1.abs().partial_cmp(&a.1.abs()).unwrap());
        entries.truncate(fill_cap);
    }
    entries
}

/// Write column `k`'s factor entries and commit its 1x1 `D` block. Entries surviving
/// `|L(i, k)| >= tau` (`tau` relative to the column's L1 norm) are kept, up to `fill_cap`
/// entries per column, largest magnitude first.
pub fn finalize_one(
    a: &mut AStore,
    l: &mut LStore,
    k: usize,
    drop_tol: f64,
    singular_tol: f64,
    fill_cap: usize,
) -> Result<(), WriteError> {
    let d = a.diagonal(k);
    if d.abs() < singular_tol {
        return Err(WriteError::Singular {
            step: k,
            threshold: singular_tol,
        });
    }

    let (rows, vals) = a.col(k);
    let mut candidates = Vec::new();
    for (&row, &val) in rows.iter().zip(vals.iter()) {
        if row <= k {
            continue;
        }
        candidates.push((row, val / d));
    }
    let entries = apply_drop_and_fill(candidates, drop_tol, fill_cap);

    l.push_column(k, &entries);
    l.push_block_one(k, d);
    a.finalize_column(k);
    Ok(())
}

/// Write columns `k` and `r`'s factor entries and commit the shared 2x2 `D` block. Each
/// column's drop threshold and fill cap are computed independently, since they have
/// independent L1 norms.
pub fn finalize_two(
    a: &mut AStore,
    l: &mut LStore,
    k: usize,
    r: usize,
    sign: f64,
    drop_tol: f64,
    singular_tol: f64,
    fill_cap: usize,
) -> Result<(), WriteError> {
    let d_kk = a.diagonal(k);
    let d_rr = a.diagonal(r);
    let d_kr = a.direct(r, k).unwrap_or(0.0);
    let det = d_kk * d_rr - sign * d_kr * d_kr;
    if det.abs() < singular_tol {
        return Err(WriteError::Singular {
            step: k,
            threshold: singular_tol,
        });
    }

    let mut rows: Vec<usize> = a
        .col(k)
        .0
        .iter()
        .copied()
        .chain(a.col(r).0.iter().copied())
        .filter(|&i| i > r)
        .collect();
    rows.sort_unstable();
    rows.dedup();

    let mut candidates_k = Vec::new();
    let mut candidates_r = Vec::new();
    for i in rows {
        let a_ik = a.direct(i, k).unwrap_or(0.0);
        let a_ir = a.direct(i, r).unwrap_or(0.0);
        let lik = (a_ik * d_rr - a_ir * d_kr) / det;
        let lir = (a_ir * d_kk - sign * a_ik * d_kr) / det;
        candidates_k.push((i, lik));
        candidates_r.push((i, lir));
    }
    let entries_k = apply_drop_and_fill(candidates_k, drop_tol, fill_cap);
    let entries_r = apply_drop_and_fill(candidates_r, drop_tol, fill_cap);

    l.push_column(k, &entries_k);
    l.push_column(r, &entries_r);
    l.push_block_two(k, r, d_kk, d_kr, d_rr);
    a.finalize_column(k);
    a.finalize_column(r);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::matrix::builder::MatrixBuilder;

    #[test]
    fn finalize_one_drops_small_entries() {
        // L(1,0) = 0.1, L(2,0) = 0.001; L1 norm = 0.101, tau = 0.05 * 0.101 = 0.00505,
        // which drops L(2,0) = 0.001 but keeps L(1,0) = 0.1.
        let mut b = MatrixBuilder::new(3, 3);
        b.push(0, 0, 10.0).unwrap();
        b.push(0, 1, 1.0).unwrap();
        b.push(0, 2, 0.01).unwrap();
        let mut a = AStore::from_lower_csc(&b.build_csc().unwrap());
        let mut l = LStore::new(3);
        finalize_one(&mut a, &mut l, 0, 0.05, 1e-12, 10).unwrap();
        assert_eq!(l.col(0).0, &[1]);
        assert!(a.col(0).0.is_empty());
    }

    #[test]
    fn finalize_one_reports_singular() {
        let mut b = MatrixBuilder::new(2, 2);
        b.push(0, 0, 0.0).unwrap();
        let mut a = AStore::from_lower_csc(&b.build_csc().unwrap());
        let mut l = LStore::new(2);
        let err = finalize_one(&mut a, &mut l, 0, 1e-8, 1e-10, 10);
        assert!(matches!(err, Err(WriteError::Singular { step: 0, .. })));
    }

    #[test]
    fn finalize_one_enforces_fill_cap_keeping_largest_magnitude() {
        let mut b = MatrixBuilder::new(4, 4);
        b.push(0, 0, 1.0).unwrap();
        b.push(0, 1, 3.0).unwrap();
        b.push(0, 2, 2.0).unwrap();
        b.push(0, 3, 1.0).unwrap();
        let mut a = AStore::from_lower_csc(&b.build_csc().unwrap());
        let mut l = LStore::new(4);
        finalize_one(&mut a, &mut l, 0, 0.0, 1e-12, 2).unwrap();
        let (rows, _) = l.col(0);
        assert_eq!(rows.len(), 2);
        assert!(rows.contains(&1));
        assert!(rows.contains(&2));
        assert!(!rows.contains(&3));
    }
}
