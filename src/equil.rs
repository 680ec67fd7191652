//! Bunch max-norm equilibration (C2): a diagonal scaling `S` chosen so that, after
//! `S*A*S`, every row/column of the scaled matrix has max absolute value close to 1.
//!
//! Grounded in the scaling pass of `solver::klu::scale` (max-abs accumulation per row),
//! generalized from KLU's one-sided row scaling to Bunch's symmetric two-sided diagonal
//! scaling: entries are visited in decreasing magnitude and each visit "fixes" the scale of
//! whichever of its two incident rows/columns has not yet been fixed, so that once an index
//! is fixed its effective scaled magnitude never exceeds 1.

use crate::store::AStore;

/// `s[i]` is the diagonal scale factor applied to both row and column `i`.
#[derive(Debug, Clone)]
pub struct Equilibration {
    pub s: Vec<f64>,
}

impl Equilibration {
    pub fn identity(n: usize) -> Self {
        Equilibration { s: vec![1.0; n] }
    }
}

/// Compute and apply Bunch max-norm equilibration in place on `a`.
///
/// Processes entries in decreasing order of magnitude. When an entry `A(i, j)` (`i > j`,
/// or `i == j` for the diagonal) is visited, any index among `{i, j}` not yet fixed is
/// assigned the scale that makes this entry's scaled magnitude exactly 1; an index already
/// fixed is left alone (it was pinned by a larger entry). Indices touched by no nonzero
/// keep scale 1.
pub fn equilibrate(a: &mut AStore, sign: f64) -> Equilibration {
    let n = a.n();
    let mut s = vec![1.0f64; n];
    let mut fixed = vec![false; n];

    let mut entries: Vec<(usize, usize, f64)> = Vec::new();
    for j in 0..n {
        let (rows, vals) = a.col(j);
        for (&i, &v) in rows.iter().zip(vals.iter()) {
            entries.push((i, j, v.abs()));
        }
    }
    entries.sort_by(|x, y| y.2.partial_cmp(&x.2).unwrap_or(std::cmp::Ordering::Equal));

    for (i, j, mag) in entries {
        if mag == 0.0 {
            continue;
        }
        if i == j {
            if !fixed[i] {
                s[i] = 1.0 / mag.sqrt();
                fixed[i] = true;
            }
            continue;
        }
        match (fixed[i], fixed[j]) {
            (true, true) => {}
            (true, false) => {
                s[j] = 1.0 / (s[i] * mag);
                fixed[j] = true;
            }
            (false, true) => {
                s[i] = 1.0 / (s[j] * mag);
                fixed[i] = true;
            }
            (false, false) => {
                // neither index constrained yet: split the scaling evenly between them.
                let t = 1.0 / mag.sqrt();
                s[i] = t;
                s[j] = t;
                fixed[i] = true;
                fixed[j] = true;
            }
        }
    }

    apply_scaling(a, &s, sign);
    Equilibration { s }
}

fn apply_scaling(a: &mut AStore, s: &[f64], sign: f64) {
    let n = a.n();
    for j in 0..n {
        let rows: Vec<usize> = a.col(j).0.to_vec();
        for row in rows {
            if let Some(v) = a.direct(row, j) {
                let scaled = v * s[row] * s[j];
                a.set_direct(row, j, scaled);
            }
        }
    }
    let _ = sign;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::matrix::builder::MatrixBuilder;
    use approx::assert_relative_eq;

    #[test]
    fn scales_down_large_entries() {
        let mut b = MatrixBuilder::new(2, 2);
        b.push(0, 0, 100.0).unwrap();
        b.push(0, 1, 50.0).unwrap();
        b.push(1, 1, 4.0).unwrap();
        let mut a = AStore::from_lower_csc(&b.build_csc().unwrap());
        let eq = equilibrate(&mut a, 1.0);
        assert!(eq.s.iter().all(|v| v.is_finite() && *v > 0.0));
        // the largest-magnitude diagonal entry scales to magnitude 1
        assert_relative_eq!(a.diagonal(0).abs(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn identity_is_all_ones() {
        let eq = Equilibration::identity(3);
        assert_eq!(eq.s, vec![1.0, 1.0, 1.0]);
    }
}
