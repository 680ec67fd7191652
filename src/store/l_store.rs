/// The block-diagonal scaling factor `D` accumulates one entry per pivot step: either a
/// 1x1 scalar or a 2x2 block spanning two adjacent steps `k` and `r = k + 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DBlock {
    One { k: usize, d: f64 },
    Two { k: usize, r: usize, d_kk: f64, d_kr: f64, d_rr: f64 },
}

/// Growing sparse store for the unit-lower-triangular factor `L` and its block-diagonal `D`
/// (C1/C7). Unlike [`crate::store::a_store::AStore`], columns of `L` are appended once and
/// never revisited, so its row-list carries no frozen/active distinction — every column it
/// records is final.
#[derive(Debug, Clone)]
pub struct LStore {
    n: usize,
    col_idx: Vec<Vec<usize>>,
    col_val: Vec<Vec<f64>>,
    row_list: Vec<Vec<usize>>,
    blocks: Vec<DBlock>,
    block_of_col: Vec<Option<usize>>,
}

impl LStore {
    pub fn new(n: usize) -> Self {
        LStore {
            n,
            col_idx: vec![Vec::new(); n],
            col_val: vec![Vec::new(); n],
            row_list: vec![Vec::new(); n],
            blocks: Vec::new(),
            block_of_col: vec![None; n],
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn col(&self, j: usize) -> (&[usize], &[f64]) {
        (&self.col_idx[j], &self.col_val[j])
    }

    /// Columns with a recorded entry at row `i` (i.e. `j` such that `L(i, j)` is live).
    pub fn row_list(&self, i: usize) -> &[usize] {
        &self.row_list[i]
    }

    pub fn blocks(&self) -> &[DBlock] {
        &self.blocks
    }

    /// Append column `k`'s off-diagonal entries (rows strictly below the pivot). `entries`
    /// need not be sorted.
    pub fn push_column(&mut self, k: usize, entries: &[(usize, f64)]) {
        debug_assert!(self.col_idx[k].is_empty());
        for &(row, val) in entries {
            debug_assert!(row > k);
            self.col_idx[k].push(row);
            self.col_val[k].push(val);
            self.row_list[row].push(k);
        }
    }

    pub fn push_block_one(&mut self, k: usize, d: f64) {
        let idx = self.blocks.len();
        self.blocks.push(DBlock::One { k, d });
        self.block_of_col[k] = Some(idx);
    }

    pub fn push_block_two(&mut self, k: usize, r: usize, d_kk: f64, d_kr: f64, d_rr: f64) {
        let idx = self.blocks.len();
        self.blocks.push(DBlock::Two { k, r, d_kk, d_kr, d_rr });
        self.block_of_col[k] = Some(idx);
        self.block_of_col[r] = Some(idx);
    }

    /// The `D` block that finalized column `col` belongs to, if `col` has been finalized.
    pub fn block_of_col(&self, col: usize) -> Option<DBlock> {
        self.block_of_col[col].map(|idx| self.blocks[idx])
    }

    fn safe_swap_label(v: &mut [usize], a: usize, b: usize) {
        for x in v.iter_mut() {
            if *x == a {
                *x = b;
            } else if *x == b {
                *x = a;
            }
        }
    }

    /// Rename row `k` to `r` (and vice versa) across every finalized column that touches
    /// either row, then swap the two rows' own membership lists wholesale. This is the
    /// "row-row prefix" half of the symmetric swap (k, r): since a finalized column has
    /// nothing left in `A`, relabeling its already-written `L` entries is the only way the
    /// permutation reaches columns that froze before step k.
    pub fn swap_rows(&mut self, k: usize, r: usize) {
        debug_assert!(k < r && r < self.n);
        let mut touched: Vec<usize> = Vec::new();
        touched.extend_from_slice(&self.row_list[k]);
        touched.extend_from_slice(&self.row_list[r]);
        touched.sort_unstable();
        touched.dedup();

        for j in touched {
            Self::safe_swap_label(&mut self.col_idx[j], k, r);
        }
        self.row_list.swap(k, r);
    }

    pub fn check_invariants(&self) -> bool {
        for j in 0..self.n {
            if self.col_idx[j].len() != self.col_val[j].len() {
                return false;
            }
            for &i in &self.col_idx[j] {
                if i <= j {
                    return false;
                }
                if !self.row_list[i].contains(&j) {
                    return false;
                }
            }
        }
        true
    }
}
