//! Loads a symmetric MatrixMarket matrix, runs the incomplete LDL^T factorization, and
//! optionally solves A x = b with MINRES using it as a preconditioner.

fn main() {
    ildl::cli::run(1.0);
}
