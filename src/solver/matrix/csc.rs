use crate::solver::matrix::Dim;
use crate::solver::matrix::error::CscError;

/// Compressed Sparse Column matrix.
///
/// - column pointers are the indices of the start and end of each column
/// - row indices are the indices of the rows of the non zero values
/// - values are the non zero values
#[derive(Debug, Clone)]
pub struct CscMatrix {
    pub dim: Dim,
    /// Column pointers, len = ncols + 1
    pub column_pointers: Vec<usize>,
    /// Row indices, len = nnz
    pub row_indices: Vec<usize>,
    /// Nonzero values, len = nnz
    pub values: Vec<f64>,
}

impl CscMatrix {
    /// number of non zero values
    pub fn nnz(&self) -> usize {
        self.row_indices.len()
    }

    pub fn is_square(&self) -> bool {
        self.dim.nrows == self.dim.ncols
    }

    pub fn check_invariants(&self) -> Result<(), CscError> {
        if self.column_pointers.len() != self.dim.ncols + 1 {
            return Err(CscError::InvalidColumnPointersLength {
                expected: self.dim.ncols + 1,
                actual: self.column_pointers.len(),
            });
        }
        if *self.column_pointers.first().unwrap_or(&1) != 0 {
            return Err(CscError::InvalidColumnPointers {
                index: 0,
                expected: 0,
                actual: *self.column_pointers.first().unwrap_or(&1),
            });
        }
        if *self.column_pointers.last().unwrap() != self.nnz() {
            return Err(CscError::InvalidColumnPointers {
                index: self.dim.ncols,
                expected: self.nnz(),
                actual: *self.column_pointers.last().unwrap(),
            });
        }
        if self.row_indices.len() != self.values.len() {
            return Err(CscError::RowIndicesValuesLengthMismatch {
                values: self.values.len(),
                row_indices: self.row_indices.len(),
            });
        }
        for j in 0..self.dim.ncols {
            let (start, end) = (self.column_pointers[j], self.column_pointers[j + 1]);
            if start > end || end > self.nnz() {
                return Err(CscError::InvalidColumnPointers {
                    index: j,
                    expected: start,
                    actual: end,
                });
            }
            let mut prev = None;
            for &r in &self.row_indices[start..end] {
                if r >= self.dim.nrows {
                    return Err(CscError::OutOfBoundsIndex {
                        index: r,
                        max: self.dim.nrows,
                    });
                }
                if let Some(p) = prev {
                    if r <= p {
                        return Err(CscError::RowsNotStrictlyIncreasing {
                            index: j,
                            expected: p,
                            actual: r,
                        });
                    }
                }
                prev = Some(r);
            }
        }
        Ok(())
    }

    pub fn col_start(&self, j: usize) -> usize {
        self.column_pointers[j]
    }

    pub fn col_end(&self, j: usize) -> usize {
        self.column_pointers[j + 1]
    }

    pub fn row_index(&self, p: usize) -> usize {
        self.row_indices[p]
    }

    /// Return (row_indices, values) slice for column j
    pub fn col(&self, j: usize) -> (&[usize], &[f64]) {
        let (s, e) = (self.column_pointers[j], self.column_pointers[j + 1]);
        (&self.row_indices[s..e], &self.values[s..e])
    }

    /// Apply a column permutation: returns A(:, q) where q maps new_j -> old_j.
    pub fn permute_columns(&self, q: &[usize]) -> CscMatrix {
        assert_eq!(q.len(), self.dim.ncols);
        let mut column_pointers = Vec::with_capacity(self.dim.ncols + 1);
        column_pointers.push(0);
        let mut row_indices = Vec::with_capacity(self.nnz());
        let mut values = Vec::with_capacity(self.nnz());

        for &old_j in q {
            let (rows, vals) = self.col(old_j);
            column_pointers.push(column_pointers.last().unwrap() + rows.len());
            row_indices.extend_from_slice(rows);
            values.extend_from_slice(vals);
        }
        CscMatrix {
            dim: self.dim,
            column_pointers,
            row_indices,
            values,
        }
    }

    /// Transpose into CSR arrays (row_pointers, column_indices, values). O(n + nnz).
    pub fn transpose_to_csr(&self) -> (Vec<usize>, Vec<usize>, Vec<f64>) {
        let m = self.dim.nrows;
        let n = self.dim.ncols;
        let nnz = self.nnz();

        let mut rp = vec![0usize; m + 1];
        for &r in &self.row_indices {
            rp[r + 1] += 1;
        }
        for i in 0..m {
            rp[i + 1] += rp[i];
        }

        let mut ci = vec![0usize; nnz];
        let mut cx = vec![0f64; nnz];
        let mut next = rp.clone();

        for j in 0..n {
            let (rows, vals) = self.col(j);
            for (&r, &v) in rows.iter().zip(vals.iter()) {
                let p = next[r];
                ci[p] = j;
                cx[p] = v;
                next[r] += 1;
            }
        }
        (rp, ci, cx)
    }
}
