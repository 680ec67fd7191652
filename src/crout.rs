//! Crout-style left-looking update (C6): before pivoting on step `k` (and, for a 2x2 pivot,
//! step `k + 1` too), subtract the Schur-complement contribution of every already-finalized
//! column from the live entries of `A`'s columns `k` (and `k + 1`).
//!
//! Grounded in the column-by-column (Crout) organization the teacher's KLU factorization
//! (`solver::klu::factor`/`kernel`) uses for the analogous LU update, adapted from a single
//! rank-1 update per finalized pivot to a rank-1 (1x1 block) or rank-2 (2x2 block) update,
//! since `D` here is block-diagonal rather than purely diagonal.

use crate::store::{AStore, DBlock, LStore};

/// Apply the Schur-complement update to column `k` (and `extra`, if given, for the second
/// column of a 2x2 pivot candidate) using every finalized column of `L` that touches row
/// `k` (equivalently `extra`).
pub fn update_columns(a: &mut AStore, l: &LStore, k: usize, extra: Option<usize>, sign: f64) {
    let mut touched: Vec<usize> = l.row_list(k).to_vec();
    if let Some(e) = extra {
        touched.extend_from_slice(l.row_list(e));
    }
    touched.sort_unstable();
    touched.dedup();

    let mut blocks_seen: Vec<usize> = Vec::new();
    for &col in &touched {
        if let Some(block) = l.block_of_col(col) {
            let key = match block {
                DBlock::One { k: bk, .. } => bk,
                DBlock::Two { k: bk, .. } => bk,
            };
            if !blocks_seen.contains(&key) {
                blocks_seen.push(key);
                apply_block_update(a, l, block, k, extra, sign);
            }
        }
    }
}

fn l_at(l: &LStore, row: usize, col: usize) -> f64 {
    if row == col {
        return 1.0; // L is unit lower triangular
    }
    let (rows, vals) = l.col(col);
    rows.iter()
        .zip(vals.iter())
        .find(|&(&r, _)| r == row)
        .map(|(_, &v)| v)
        .unwrap_or(0.0)
}

fn apply_block_update(a: &mut AStore, l: &LStore, block: DBlock, k: usize, extra: Option<usize>, sign: f64) {
    match block {
        DBlock::One { k: j, d } => {
            let lkj = l_at(l, k, j);
            let lej = extra.map(|e| l_at(l, e, j));
            update_column_rank1(a, l, j, k, lkj * d, sign);
            if let (Some(e), Some(lej)) = (extra, lej) {
                update_column_rank1(a, l, j, e, lej * d, sign);
            }
        }
        DBlock::Two { k: j, r, d_kk, d_kr, d_rr } => {
            let lkj = l_at(l, k, j);
            let lkr = l_at(l, k, r);
            let coeff_j = lkj * d_kk + lkr * d_kr;
            let coeff_r = lkj * d_kr + lkr * d_rr;
            update_column_pair(a, l, j, r, k, coeff_j, coeff_r, sign);

            if let Some(e) = extra {
                let lej = l_at(l, e, j);
                let ler = l_at(l, e, r);
                let coeff_j = lej * d_kk + ler * d_kr;
                let coeff_r = lej * d_kr + ler * d_rr;
                update_column_pair(a, l, j, r, e, coeff_j, coeff_r, sign);
            }
        }
    }
}

/// Subtract `coeff * L(i, src)` from every live `A(i, target)` with `i >= target`.
fn update_column_rank1(a: &mut AStore, l: &LStore, src: usize, target: usize, coeff: f64, sign: f64) {
    if coeff == 0.0 {
        return;
    }
    let (rows, vals) = l.col(src);
    for (&i, &lij) in rows.iter().zip(vals.iter()) {
        if i < target {
            continue;
        }
        subtract_entry(a, i, target, coeff * lij, sign);
    }
    // L's diagonal is implicitly 1; account for i == src when src >= target (only relevant
    // when src == target, which cannot happen since src is already finalized and target is
    // still active).
    let _ = sign;
}

fn update_column_pair(
    a: &mut AStore,
    l: &LStore,
    src_j: usize,
    src_r: usize,
    target: usize,
    coeff_j: f64,
    coeff_r: f64,
    sign: f64,
) {
    update_column_rank1(a, l, src_j, target, coeff_j, sign);
    update_column_rank1(a, l, src_r, target, coeff_r, sign);
}

/// `A(row, target) -= delta`, respecting the canonical (`row >= target`) storage direction;
/// for `row < target` this instead updates `A(target, row)` scaled by `sign`, since that is
/// where the physical entry lives. When the touched position has no prior live entry, it is
/// scattered in as new fill rather than dropped — the Schur-complement update is free to
/// touch a structurally zero position.
fn subtract_entry(a: &mut AStore, row: usize, target: usize, delta: f64, sign: f64) {
    if row >= target {
        match a.direct(row, target) {
            Some(old) => a.set_direct(row, target, old - delta),
            None => a.append(row, target, -delta),
        }
    } else {
        match a.direct(target, row) {
            Some(old) => a.set_direct(target, row, old - delta / sign),
            None => a.append(target, row, -delta / sign),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::matrix::builder::MatrixBuilder;

    #[test]
    fn update_with_no_finalized_columns_is_a_no_op() {
        let mut b = MatrixBuilder::new(3, 3);
        b.push(0, 0, 1.0).unwrap();
        b.push(1, 1, 2.0).unwrap();
        b.push(1, 2, 3.0).unwrap();
        b.push(2, 2, 4.0).unwrap();
        let mut a = AStore::from_lower_csc(&b.build_csc().unwrap());
        let l = LStore::new(3);
        let before = a.diagonal(1);
        update_columns(&mut a, &l, 1, None, 1.0);
        assert_eq!(a.diagonal(1), before);
    }

    #[test]
    fn rank_one_update_scatters_fill_into_a_structurally_zero_position() {
        // column 0 finalized: L(1,0) = 2.0, L(2,0) = 3.0, D(0,0) = 5.0; A(2,1) is not
        // structurally present on input, but the Schur update must still touch it.
        let mut b = MatrixBuilder::new(3, 3);
        b.push(1, 1, 100.0).unwrap();
        b.push(2, 2, 200.0).unwrap();
        let mut a = AStore::from_lower_csc(&b.build_csc().unwrap());
        let mut l = LStore::new(3);
        l.push_column(0, &[(1, 2.0), (2, 3.0)]);
        l.push_block_one(0, 5.0);

        assert!(a.direct(2, 1).is_none());
        update_columns(&mut a, &l, 1, None, 1.0);
        // A(2,1) -= L(2,0)*d*L(1,0) = 3*5*2 = 30 -> fill of -30
        assert!((a.direct(2, 1).unwrap() - (-30.0)).abs() < 1e-9);
    }

    #[test]
    fn rank_one_update_subtracts_schur_complement() {
        // column 0 finalized: L(1,0) = 2.0, L(2,0) = 3.0, D(0,0) = 5.0
        let mut b = MatrixBuilder::new(3, 3);
        b.push(1, 1, 100.0).unwrap();
        b.push(1, 2, 50.0).unwrap();
        b.push(2, 2, 200.0).unwrap();
        let mut a = AStore::from_lower_csc(&b.build_csc().unwrap());
        let mut l = LStore::new(3);
        l.push_column(0, &[(1, 2.0), (2, 3.0)]);
        l.push_block_one(0, 5.0);

        update_columns(&mut a, &l, 1, None, 1.0);
        // A(1,1) -= L(1,0)*d*L(1,0) = 2*5*2 = 20 -> 80
        assert!((a.diagonal(1) - 80.0).abs() < 1e-9);
    }
}
