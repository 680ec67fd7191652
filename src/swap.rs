//! Symmetric permutation swap (C5): applying transposition `(k, r)` consistently across
//! every piece of state the driver carries — `A`'s active store, `L`'s finalized store, the
//! permutation `P`, and the scaling vector `S`.
//!
//! `A`'s half of the swap (the suffix/middle/diagonal regions) and `L`'s half (relabeling
//! already-frozen columns) are independent operations on disjoint data, grounded in
//! `square_matrix_pivot.h`'s `pivot()` routine: the original operates on a single matrix
//! because it never discards a finalized column's row entries, but this store deletes a
//! column's `A`-side data as soon as it freezes (see `AStore::finalize_column`), so the
//! "row-row prefix" region of the original routine has no counterpart left in `A` by the
//! time a later swap needs it — it is exactly what `LStore::swap_rows` reconstructs instead.

use crate::store::{AStore, LStore};

/// Swap indices `k` and `r` (`k < r`) across all permutation-carrying state.
pub fn apply_swap(
    a: &mut AStore,
    l: &mut LStore,
    perm: &mut [usize],
    s: &mut [f64],
    sign: f64,
    k: usize,
    r: usize,
) {
    debug_assert!(k < r);
    a.swap_rows_cols(k, r, sign);
    l.swap_rows(k, r);
    perm.swap(k, r);
    s.swap(k, r);
}
