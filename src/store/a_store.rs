use crate::solver::matrix::csc::CscMatrix;

/// Dynamic lower-triangular sparse store for the working matrix `A` during factorization (C1).
///
/// Two parallel structures are maintained: per-column unordered arrays (`col_idx`/`col_val`,
/// rows i >= column), and a per-row list of which columns currently carry a live entry at
/// that row. `row_list_first[i]` partitions `row_list[i]` into a frozen prefix (columns
/// already finalized into L) and an active suffix (columns still live in `A`). The prefix is
/// carried along for structural consistency of the row-list but this struct itself never
/// reads it again after the column freezes — the symmetric swap (`L`'s own row-list, not
/// this one) is what the factorization actually relies on for frozen-column bookkeeping.
#[derive(Debug, Clone)]
pub struct AStore {
    n: usize,
    col_idx: Vec<Vec<usize>>,
    col_val: Vec<Vec<f64>>,
    row_list: Vec<Vec<usize>>,
    row_list_first: Vec<usize>,
}

impl AStore {
    pub fn from_lower_csc(a: &CscMatrix) -> Self {
        let n = a.dim.ncols;
        let mut col_idx = vec![Vec::new(); n];
        let mut col_val = vec![Vec::new(); n];
        let mut row_list: Vec<Vec<usize>> = vec![Vec::new(); n];

        for j in 0..n {
            let (rows, vals) = a.col(j);
            col_idx[j] = rows.to_vec();
            col_val[j] = vals.to_vec();
            for &i in rows {
                if i != j {
                    row_list[i].push(j);
                }
            }
        }

        AStore {
            n,
            col_idx,
            col_val,
            row_list,
            row_list_first: vec![0; n],
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn col(&self, j: usize) -> (&[usize], &[f64]) {
        (&self.col_idx[j], &self.col_val[j])
    }

    fn find_in_col(&self, col: usize, row: usize) -> Option<usize> {
        self.col_idx[col].iter().position(|&r| r == row)
    }

    /// `A(row, col)` for `row >= col`, directly stored; `None` if structurally absent.
    pub fn direct(&self, row: usize, col: usize) -> Option<f64> {
        self.find_in_col(col, row).map(|p| self.col_val[col][p])
    }

    /// `A(i, j)` for arbitrary `i != j`, reflecting across the diagonal (multiplying by
    /// `sign`) when `i < j`.
    pub fn read(&self, i: usize, j: usize, sign: f64) -> f64 {
        if i == j {
            self.diagonal(i)
        } else if i > j {
            self.direct(i, j).unwrap_or(0.0)
        } else {
            sign * self.direct(j, i).unwrap_or(0.0)
        }
    }

    pub fn diagonal(&self, k: usize) -> f64 {
        self.direct(k, k).unwrap_or(0.0)
    }

    /// Overwrite the value of an existing stored entry `A(row, col)` (`row >= col`).
    /// Panics if the entry is structurally absent — equilibration and scaling only ever
    /// rescale entries that are already live.
    pub fn set_direct(&mut self, row: usize, col: usize, val: f64) {
        let pos = self
            .find_in_col(col, row)
            .expect("set_direct on a structurally absent entry");
        self.col_val[col][pos] = val;
    }

    /// Scatter a brand-new structural entry `A(row, col) = val` (`row >= col`) into the live
    /// store, where none was previously stored. This is how the Crout update acquires fill
    /// outside `A`'s original sparsity pattern: the Schur-complement contribution touches a
    /// position that was structurally zero on input. Panics if the entry is already live
    /// (callers must check `direct` first).
    pub fn append(&mut self, row: usize, col: usize, val: f64) {
        debug_assert!(row >= col);
        debug_assert!(
            self.find_in_col(col, row).is_none(),
            "append on an already-live entry"
        );
        self.col_idx[col].push(row);
        self.col_val[col].push(val);
        if row != col {
            self.row_list[row].push(col);
        }
    }

    /// Active (suffix) row-list entries for row `i`: columns `j < i` that still carry a
    /// live entry `A(i, j)` in `A`'s own store.
    pub fn active_row_entries(&self, i: usize) -> &[usize] {
        &self.row_list[i][self.row_list_first[i]..]
    }

    /// `max_{row > col} |A(row, col)|` and the row attaining it (ties -> smallest row).
    pub fn col_max_below(&self, col: usize) -> Option<(usize, f64)> {
        let (rows, vals) = self.col(col);
        let mut best: Option<(usize, f64)> = None;
        for (&row, &v) in rows.iter().zip(vals.iter()) {
            if row <= col {
                continue;
            }
            let av = v.abs();
            best = match best {
                Some((br, bv)) if bv > av || (bv == av && br < row) => Some((br, bv)),
                _ => Some((row, av)),
            };
        }
        best
    }

    /// `max_{i != except, i >= floor} |A(i, col)|`.
    pub fn col_max_excluding(&self, col: usize, except: usize, floor: usize, sign: f64) -> f64 {
        let mut best = 0.0f64;
        let (rows, vals) = self.col(col);
        for (&row, &v) in rows.iter().zip(vals.iter()) {
            if row == col || row == except || row < floor {
                continue;
            }
            best = best.max(v.abs());
        }
        for &j in self.active_row_entries(col) {
            if j == except || j < floor {
                continue;
            }
            let v = sign * self.direct(col, j).unwrap_or(0.0);
            best = best.max(v.abs());
        }
        best
    }

    /// Finalize column `k`: clear its own arrays (its contents have been written into `L`)
    /// and advance every touched row's cursor past `k`, reclassifying that membership from
    /// active to frozen.
    pub fn finalize_column(&mut self, k: usize) {
        let rows: Vec<usize> = self.col_idx[k].clone();
        for row in rows {
            if row != k {
                self.freeze(row, k);
            }
        }
        self.col_idx[k].clear();
        self.col_val[k].clear();
    }

    fn freeze(&mut self, row: usize, col: usize) {
        let first = self.row_list_first[row];
        let list = &mut self.row_list[row];
        let pos = list[first..]
            .iter()
            .position(|&j| j == col)
            .map(|p| p + first)
            .expect("row-list/column-store desync: column missing from active suffix");
        list.swap(first, pos);
        self.row_list_first[row] += 1;
    }

    fn remove_active(&mut self, row: usize, col: usize) {
        let first = self.row_list_first[row];
        let list = &mut self.row_list[row];
        let pos = list[first..]
            .iter()
            .position(|&j| j == col)
            .map(|p| p + first)
            .expect("row-list/column-store desync: column missing from active suffix");
        list.swap_remove(pos);
    }

    /// Rename `a` to `b` (and vice versa) wherever they occur in row `row`'s active suffix,
    /// in a single pass so that a row holding both labels gets them truly exchanged rather
    /// than collapsed onto one value by a naive sequential rename.
    fn safe_swap_active(&mut self, row: usize, a: usize, b: usize) {
        let first = self.row_list_first[row];
        for x in self.row_list[row][first..].iter_mut() {
            if *x == a {
                *x = b;
            } else if *x == b {
                *x = a;
            }
        }
    }

    /// Perform the symmetric permutation swap(k, r), k < r, on `A`'s lower-triangular store
    /// (the L-side row-row swap is a separate, simpler operation — see [`crate::store::l_store::LStore::swap_rows`]).
    pub fn swap_rows_cols(&mut self, k: usize, r: usize, sign: f64) {
        debug_assert!(k < r && r < self.n);

        let mut row_k: Vec<usize> = self.row_list[r][..self.row_list_first[r]].to_vec();
        let mut row_r: Vec<usize> = self.row_list[k][..self.row_list_first[k]].to_vec();

        let mut col_k_idx = Vec::new();
        let mut col_k_val = Vec::new();
        let mut col_r_idx = Vec::new();
        let mut col_r_val = Vec::new();
        let mut suffix_rows_to_swap: Vec<usize> = Vec::new();

        // Entries (r, j) for k <= j < r, currently stored in column j.
        let active_in_r: Vec<usize> = self.active_row_entries(r).to_vec();
        for j in active_in_r {
            let pos = self
                .find_in_col(j, r)
                .expect("row-list says A(r, j) is live but column j disagrees");
            let val = self.col_val[j][pos] * sign;
            self.col_idx[j].swap_remove(pos);
            self.col_val[j].swap_remove(pos);
            if j == k {
                // A(r, k) is fixed under the transposition; it stays at canonical (r, k).
                col_k_idx.push(r);
                col_k_val.push(val);
                row_r.push(k);
            } else {
                // A(r, j) becomes A(j, k) for k < j < r.
                col_k_idx.push(j);
                col_k_val.push(val);
                self.row_list[j].push(k);
            }
        }

        // Column r's own remaining entries: rows > r move into column k unchanged; the
        // diagonal (r, r) becomes (k, k).
        let old_col_r_idx = std::mem::take(&mut self.col_idx[r]);
        let old_col_r_val = std::mem::take(&mut self.col_val[r]);
        for (row, val) in old_col_r_idx.into_iter().zip(old_col_r_val) {
            if row > r {
                col_k_idx.push(row);
                col_k_val.push(val);
                suffix_rows_to_swap.push(row);
            } else {
                debug_assert_eq!(row, r);
                col_k_idx.push(k);
                col_k_val.push(val);
            }
        }

        // Column k's own remaining entries: the (k, r) middle region moves into column
        // `row` as a new entry at row r; the (r, n) suffix moves into column r.
        let old_col_k_idx = std::mem::take(&mut self.col_idx[k]);
        let old_col_k_val = std::mem::take(&mut self.col_val[k]);
        for (row, val) in old_col_k_idx.into_iter().zip(old_col_k_val) {
            if row > k && row < r {
                self.col_idx[row].push(r);
                self.col_val[row].push(val * sign);
                self.remove_active(row, k);
                row_r.push(row);
            } else if row > r {
                col_r_idx.push(row);
                col_r_val.push(val);
                suffix_rows_to_swap.push(row);
            } else {
                debug_assert_eq!(row, k);
                col_r_idx.push(r);
                col_r_val.push(val);
            }
        }

        suffix_rows_to_swap.sort_unstable();
        suffix_rows_to_swap.dedup();
        for row in suffix_rows_to_swap {
            self.safe_swap_active(row, k, r);
        }

        self.col_idx[k] = col_k_idx;
        self.col_val[k] = col_k_val;
        self.col_idx[r] = col_r_idx;
        self.col_val[r] = col_r_val;

        let first_r_old = self.row_list_first[r];
        let first_k_old = self.row_list_first[k];
        self.row_list_first[k] = first_r_old.min(row_k.len());
        self.row_list_first[r] = first_k_old;
        self.row_list[k] = row_k;
        self.row_list[r] = row_r;
    }

    #[cfg(debug_assertions)]
    pub fn check_invariants(&self) -> bool {
        for j in 0..self.n {
            if self.col_idx[j].len() != self.col_val[j].len() {
                return false;
            }
            for &i in &self.col_idx[j] {
                if i < j {
                    return false;
                }
            }
        }
        for i in 0..self.n {
            if self.row_list_first[i] > self.row_list[i].len() {
                return false;
            }
            for &j in self.active_row_entries(i) {
                if self.find_in_col(j, i).is_none() {
                    return false;
                }
            }
        }
        true
    }
}
