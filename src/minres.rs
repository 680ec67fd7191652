//! MINRES (C10, ambient): a preconditioned minimum-residual Krylov solver for symmetric
//! (and, via the same three-term recurrence, skew-handled-by-the-caller) indefinite linear
//! systems, consuming the incomplete factorization through a narrow [`Preconditioner`]
//! trait rather than reaching into `Factorization`'s internals directly — mirroring how the
//! teacher's own solvers (`solver::klu::solve`) are handed a finished factorization and
//! asked only to apply it, not to know how it was built.

use crate::factor::Factorization;
use crate::solver::matrix::csc::CscMatrix;
use crate::store::DBlock;

pub trait Preconditioner {
    /// Apply an approximate inverse of `A` to `r`, writing the result into `out`.
    fn apply(&self, r: &[f64], out: &mut [f64]);
}

/// Solve `(L D L^T) x = rhs` in place, where `D`'s blocks may be 1x1 or 2x2.
fn solve_ldlt(l: &crate::store::LStore, sign: f64, rhs: &mut [f64]) {
    let n = l.n();
    // forward solve: L w = rhs
    for k in 0..n {
        let (rows, vals) = l.col(k);
        for (&row, &val) in rows.iter().zip(vals.iter()) {
            rhs[row] -= val * rhs[k];
        }
    }
    // block-diagonal solve: D v = w
    for block in l.blocks() {
        match *block {
            DBlock::One { k, d } => {
                if d != 0.0 {
                    rhs[k] /= d;
                }
            }
            DBlock::Two { k, r, d_kk, d_kr, d_rr } => {
                let det = d_kk * d_rr - sign * d_kr * d_kr;
                if det != 0.0 {
                    let wk = rhs[k];
                    let wr = rhs[r];
                    rhs[k] = (wk * d_rr - wr * d_kr) / det;
                    rhs[r] = (wr * d_kk - sign * wk * d_kr) / det;
                }
            }
        }
    }
    // backward solve: L^T u = v
    for k in (0..n).rev() {
        let (rows, vals) = l.col(k);
        let mut acc = rhs[k];
        for (&row, &val) in rows.iter().zip(vals.iter()) {
            acc -= val * rhs[row];
        }
        rhs[k] = acc;
    }
}

/// Preconditions with the incomplete factorization: `M^{-1} r = S P L^{-T} D^{-1} L^{-1} P^T S r`.
pub struct LdltPreconditioner<'a> {
    pub factorization: &'a Factorization,
}

impl Preconditioner for LdltPreconditioner<'_> {
    fn apply(&self, r: &[f64], out: &mut [f64]) {
        let f = self.factorization;
        let n = f.l.n();
        let s = &f.equilibration.s;
        let perm = &f.perm;

        // `s` is indexed by working position (kept in lockstep with swaps during
        // factorization, see `swap::apply_swap`), while `perm` maps a working position to
        // the original column index: gather r through perm, scale by s in position space.
        let mut scratch = vec![0.0; n];
        for i in 0..n {
            scratch[i] = s[i] * r[perm[i]];
        }
        solve_ldlt(&f.l, f.sign, &mut scratch);
        for i in 0..n {
            out[perm[i]] = s[i] * scratch[i];
        }
    }
}

/// A no-op preconditioner (`M = I`), used when the caller wants unpreconditioned MINRES.
pub struct IdentityPreconditioner;

impl Preconditioner for IdentityPreconditioner {
    fn apply(&self, r: &[f64], out: &mut [f64]) {
        out.copy_from_slice(r);
    }
}

fn mat_vec(a: &CscMatrix, sign: f64, x: &[f64], out: &mut [f64]) {
    out.fill(0.0);
    let n = a.dim.ncols;
    for j in 0..n {
        let (rows, vals) = a.col(j);
        for (&i, &v) in rows.iter().zip(vals.iter()) {
            out[i] += v * x[j];
            if i != j {
                out[j] += sign * v * x[i];
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MinresReport {
    pub iterations: usize,
    pub residual_norm: f64,
    pub converged: bool,
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// Preconditioned MINRES for `A x = b`, where `A` is `sign`-symmetric (symmetric for
/// `sign = 1`, skew-symmetric for `sign = -1`) and stored as a lower-triangular `CscMatrix`.
/// `x` is used as the initial guess and overwritten with the result.
pub fn minres(
    a: &CscMatrix,
    sign: f64,
    b: &[f64],
    x: &mut [f64],
    precond: &dyn Preconditioner,
    max_iters: usize,
    tol: f64,
) -> MinresReport {
    let n = a.dim.ncols;
    let mut r = vec![0.0; n];
    mat_vec(a, sign, x, &mut r);
    for i in 0..n {
        r[i] = b[i] - r[i];
    }

    let b_norm = norm(b).max(1e-300);
    let mut residual_norm = norm(&r);
    if residual_norm / b_norm <= tol {
        return MinresReport {
            iterations: 0,
            residual_norm,
            converged: true,
        };
    }

    let mut z = vec![0.0; n];
    precond.apply(&r, &mut z);
    let mut beta = dot(&r, &z).max(0.0).sqrt();
    let beta1 = beta;

    let mut v_old = vec![0.0; n];
    let mut v = r.clone();
    let mut z_old = vec![0.0; n];
    let mut z_cur = z.clone();
    if beta > 0.0 {
        for i in 0..n {
            v[i] /= beta;
            z_cur[i] /= beta;
        }
    }

    let mut w = vec![0.0; n];
    let mut w_old = vec![0.0; n];

    let mut cs = -1.0;
    let mut sn = 0.0;
    let mut dbar = 0.0;
    let mut phibar = beta1;

    let mut iterations = 0;
    for iter in 1..=max_iters {
        iterations = iter;

        let mut av = vec![0.0; n];
        mat_vec(a, sign, &z_cur, &mut av);
        let alpha = dot(&z_cur, &av);
        for i in 0..n {
            av[i] -= alpha * v[i] - beta * v_old[i];
        }
        let v_new = av;

        let mut z_new = vec![0.0; n];
        precond.apply(&v_new, &mut z_new);
        let beta_new = dot(&v_new, &z_new).max(0.0).sqrt();

        let delta = cs * dbar + sn * alpha;
        let gamma_bar = sn * dbar - cs * alpha;
        let epsilon = sn * beta_new;
        dbar = -cs * beta_new;

        let gamma = (gamma_bar * gamma_bar + beta_new * beta_new).sqrt().max(1e-300);
        let cs_new = gamma_bar / gamma;
        let sn_new = beta_new / gamma;
        let phi = cs_new * phibar;
        phibar *= sn_new;

        for i in 0..n {
            let w_new_i = (z_cur[i] - delta * w[i] - epsilon * w_old[i]) / gamma;
            w_old[i] = w[i];
            w[i] = w_new_i;
            x[i] += phi * w[i];
        }

        cs = cs_new;
        sn = sn_new;
        residual_norm = phibar.abs();

        if beta_new > 0.0 {
            v_old = v;
            v = v_new.iter().map(|&val| val / beta_new).collect();
            z_old = z_cur;
            z_cur = z_new.iter().map(|&val| val / beta_new).collect();
        }
        beta = beta_new;
        let _ = &z_old;

        if residual_norm / b_norm <= tol || beta_new == 0.0 {
            break;
        }
    }

    MinresReport {
        iterations,
        residual_norm,
        converged: residual_norm / b_norm <= tol,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::matrix::builder::MatrixBuilder;
    use approx::assert_relative_eq;

    #[test]
    fn converges_on_identity_system() {
        let mut b = MatrixBuilder::new(3, 3);
        b.push(0, 0, 1.0).unwrap();
        b.push(1, 1, 1.0).unwrap();
        b.push(2, 2, 1.0).unwrap();
        let a = b.build_csc().unwrap();
        let rhs = vec![1.0, 2.0, 3.0];
        let mut x = vec![0.0; 3];
        let report = minres(&a, 1.0, &rhs, &mut x, &IdentityPreconditioner, 50, 1e-10);
        assert!(report.converged);
        for i in 0..3 {
            assert_relative_eq!(x[i], rhs[i], epsilon = 1e-6);
        }
    }
}
