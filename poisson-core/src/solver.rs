//! Linear system solvers.
//!
//! Provides direct and iterative solvers for the assembled system `A u = b`.
//!
//! # Solver Backends
//!
//! - [`FaerCholeskySolver`]: Sparse Cholesky factorization using the faer library.
//!   The matrix stays symmetric positive definite after symmetric Dirichlet
//!   elimination, so this is the default direct solver.
//! - [`DenseLUSolver`]: nalgebra dense LU (small problems and tests only).
//! - [`ConjugateGradientSolver`]: Jacobi-preconditioned conjugate gradients.

use crate::error::{Error, Result};
use crate::sparse::{diagonal, spmv, CsrMatrix};
use faer::linalg::cholesky::llt::factor::LltError;
use faer::prelude::*;
use faer::sparse::linalg::solvers::{Llt, SymbolicLlt};
use faer::sparse::linalg::LltError as SparseLltError;
use faer::sparse::{SparseColMat, SymbolicSparseColMat};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// Linear solver interface.
pub trait Solver: Send + Sync {
    /// Solve `A x = b`, returning the solution and solve statistics.
    fn solve_with_stats(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<(Vec<f64>, SolveStats)>;

    /// Solve `A x = b`.
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>> {
        self.solve_with_stats(matrix, rhs).map(|(x, _)| x)
    }

    /// Solver name for diagnostics.
    fn name(&self) -> &str;
}

/// Solver selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverType {
    /// Sparse Cholesky (faer).
    Direct,
    /// Dense LU (nalgebra).
    Lu,
    /// Conjugate gradients with Jacobi preconditioning.
    Iterative,
    /// Direct below `auto_threshold` dofs, iterative above.
    #[default]
    Auto,
}

/// Solver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Solver type to use.
    pub solver_type: SolverType,
    /// Relative residual tolerance for iterative solvers.
    pub tolerance: f64,
    /// Maximum iterations for iterative solvers.
    pub max_iterations: usize,
    /// Problem size threshold for auto-selection (direct below, iterative above).
    pub auto_threshold: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            solver_type: SolverType::Auto,
            tolerance: 1e-10,
            max_iterations: 10_000,
            auto_threshold: 100_000,
        }
    }
}

impl SolverConfig {
    /// Check tolerance and iteration limits.
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance > 0.0 && self.tolerance < 1.0) {
            return Err(Error::Config(format!(
                "solver tolerance must be in (0, 1), got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::Config("solver max_iterations must be positive".into()));
        }
        Ok(())
    }
}

/// Solution statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SolveStats {
    /// Solver name used.
    pub solver: String,
    /// Number of iterations (iterative solvers only).
    pub iterations: Option<usize>,
    /// Final relative residual norm (iterative solvers only).
    pub residual: Option<f64>,
    /// Number of dofs in the system.
    pub n_dofs: usize,
    /// Number of stored non-zeros in the matrix.
    pub n_nonzeros: usize,
    /// Symbolic analysis / setup time in seconds.
    pub setup_time_seconds: f64,
    /// Numerical factorization time in seconds (direct solvers).
    pub factorization_time_seconds: f64,
    /// Back-substitution or iteration time in seconds.
    pub solve_time_seconds: f64,
    /// Wall-clock time in seconds.
    pub total_time_seconds: f64,
}

impl SolveStats {
    fn new(solver: &str, matrix: &CsrMatrix) -> Self {
        Self {
            solver: solver.to_string(),
            n_dofs: matrix.nrows(),
            n_nonzeros: matrix.nnz(),
            ..Self::default()
        }
    }
}

fn check_system(matrix: &CsrMatrix, rhs: &[f64]) -> Result<()> {
    if matrix.nrows() != matrix.ncols() {
        return Err(Error::Solver("Matrix must be square".into()));
    }
    if matrix.nrows() != rhs.len() {
        return Err(Error::Solver("RHS size mismatch".into()));
    }
    Ok(())
}

/// Direct solver using nalgebra dense LU factorization.
///
/// Converts the matrix to dense storage, so it is only suitable for small problems.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseLUSolver;

impl DenseLUSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Solver for DenseLUSolver {
    fn solve_with_stats(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<(Vec<f64>, SolveStats)> {
        use nalgebra::{DMatrix, DVector};

        check_system(matrix, rhs)?;
        let mut stats = SolveStats::new(self.name(), matrix);
        if rhs.is_empty() {
            return Ok((vec![], stats));
        }

        let start = Instant::now();
        let dense = DMatrix::from(matrix);
        let b = DVector::from_column_slice(rhs);

        let lu = dense.lu();
        stats.factorization_time_seconds = start.elapsed().as_secs_f64();
        let solution = lu
            .solve(&b)
            .ok_or_else(|| Error::SingularMatrix("LU factorization failed".into()))?;

        stats.total_time_seconds = start.elapsed().as_secs_f64();
        stats.solve_time_seconds = stats.total_time_seconds - stats.factorization_time_seconds;
        Ok((solution.as_slice().to_vec(), stats))
    }

    fn name(&self) -> &str {
        "Dense LU"
    }
}

/// Convert nalgebra-sparse CSR matrix to faer SparseColMat (CSC format).
///
/// Each CSR row becomes a CSC column of the transpose; for the symmetric
/// matrices produced by assembly this is the matrix itself.
fn csr_to_faer_csc(csr: &CsrMatrix) -> SparseColMat<usize, f64> {
    let nrows = csr.nrows();
    let ncols = csr.ncols();

    let row_offsets = csr.row_offsets();
    let col_indices = csr.col_indices();
    let values = csr.values();

    let mut col_counts = vec![0usize; ncols];
    for &col in col_indices {
        col_counts[col] += 1;
    }

    let mut col_offsets = vec![0usize; ncols + 1];
    for i in 0..ncols {
        col_offsets[i + 1] = col_offsets[i] + col_counts[i];
    }

    let nnz = values.len();
    let mut csc_row_indices = vec![0usize; nnz];
    let mut csc_values = vec![0.0f64; nnz];
    let mut col_positions = col_offsets[..ncols].to_vec();

    for row in 0..nrows {
        for idx in row_offsets[row]..row_offsets[row + 1] {
            let col = col_indices[idx];
            let pos = col_positions[col];
            csc_row_indices[pos] = row;
            csc_values[pos] = values[idx];
            col_positions[col] += 1;
        }
    }

    // SAFETY: offsets are monotone, row indices are in bounds and sorted within
    // each column because rows are visited in increasing order.
    unsafe {
        SparseColMat::new(
            SymbolicSparseColMat::new_unchecked(nrows, ncols, col_offsets, None, csc_row_indices),
            csc_values,
        )
    }
}

fn map_llt_error(e: SparseLltError) -> Error {
    match e {
        SparseLltError::Generic(err) => Error::Solver(format!("Sparse Cholesky error: {:?}", err)),
        SparseLltError::Numeric(LltError::NonPositivePivot { index }) => Error::SingularMatrix(
            format!("Matrix is not positive definite at pivot {}", index),
        ),
    }
}

/// Sparse Cholesky solver using the faer library.
///
/// # Example
///
/// ```ignore
/// let solver = FaerCholeskySolver::new();
/// let solution = solver.solve(&system.matrix, &system.rhs)?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FaerCholeskySolver;

impl FaerCholeskySolver {
    /// Create a new sparse Cholesky solver.
    pub fn new() -> Self {
        Self
    }
}

impl Solver for FaerCholeskySolver {
    fn solve_with_stats(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<(Vec<f64>, SolveStats)> {
        check_system(matrix, rhs)?;
        let mut stats = SolveStats::new(self.name(), matrix);
        let n = rhs.len();
        if n == 0 {
            return Ok((vec![], stats));
        }

        let start = Instant::now();
        let csc = csr_to_faer_csc(matrix);
        let csc_ref = csc.as_ref();

        let symbolic = SymbolicLlt::try_new(csc_ref.symbolic(), faer::Side::Lower)
            .map_err(|_| Error::Solver("Symbolic Cholesky analysis failed".into()))?;
        stats.setup_time_seconds = start.elapsed().as_secs_f64();

        let factor_start = Instant::now();
        let llt = Llt::try_new_with_symbolic(symbolic, csc_ref, faer::Side::Lower)
            .map_err(map_llt_error)?;
        stats.factorization_time_seconds = factor_start.elapsed().as_secs_f64();

        let solve_start = Instant::now();
        let mut x = faer::Mat::from_fn(n, 1, |i, _| rhs[i]);
        llt.solve_in_place(x.as_mut());
        stats.solve_time_seconds = solve_start.elapsed().as_secs_f64();
        stats.total_time_seconds = start.elapsed().as_secs_f64();

        Ok(((0..n).map(|i| x[(i, 0)]).collect(), stats))
    }

    fn name(&self) -> &str {
        "faer Sparse Cholesky (LLᵀ)"
    }
}

/// Conjugate gradient solver with Jacobi (diagonal) preconditioning.
///
/// Converges when `‖b - A x‖ ≤ tolerance · ‖b‖`.
#[derive(Debug, Clone, Copy)]
pub struct ConjugateGradientSolver {
    tolerance: f64,
    max_iterations: usize,
}

impl ConjugateGradientSolver {
    /// Create a solver with the given relative tolerance and iteration limit.
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }
}

impl Default for ConjugateGradientSolver {
    fn default() -> Self {
        let config = SolverConfig::default();
        Self::new(config.tolerance, config.max_iterations)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl Solver for ConjugateGradientSolver {
    fn solve_with_stats(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<(Vec<f64>, SolveStats)> {
        check_system(matrix, rhs)?;
        let mut stats = SolveStats::new(self.name(), matrix);
        let n = rhs.len();
        let start = Instant::now();

        let mut inv_diag = diagonal(matrix);
        for (i, d) in inv_diag.iter_mut().enumerate() {
            if *d <= 0.0 {
                return Err(Error::SingularMatrix(format!(
                    "Non-positive diagonal {} at row {}",
                    d, i
                )));
            }
            *d = d.recip();
        }
        stats.setup_time_seconds = start.elapsed().as_secs_f64();

        let b_norm = dot(rhs, rhs).sqrt();
        let mut x = vec![0.0; n];
        if b_norm == 0.0 {
            stats.iterations = Some(0);
            stats.residual = Some(0.0);
            stats.total_time_seconds = start.elapsed().as_secs_f64();
            return Ok((x, stats));
        }

        let mut r = rhs.to_vec();
        let mut z: Vec<f64> = r.iter().zip(&inv_diag).map(|(ri, di)| ri * di).collect();
        let mut p = z.clone();
        let mut ap = vec![0.0; n];
        let mut rz = dot(&r, &z);
        let mut rel = 1.0;

        for k in 1..=self.max_iterations {
            spmv(matrix, &p, &mut ap);
            let pap = dot(&p, &ap);
            if pap <= 0.0 {
                return Err(Error::SingularMatrix(
                    "Matrix is not positive definite (pᵀAp ≤ 0)".into(),
                ));
            }
            let alpha = rz / pap;
            for i in 0..n {
                x[i] += alpha * p[i];
                r[i] -= alpha * ap[i];
            }

            rel = dot(&r, &r).sqrt() / b_norm;
            if rel <= self.tolerance {
                stats.iterations = Some(k);
                stats.residual = Some(rel);
                stats.solve_time_seconds = start.elapsed().as_secs_f64() - stats.setup_time_seconds;
                stats.total_time_seconds = start.elapsed().as_secs_f64();
                debug!(iterations = k, residual = rel, "conjugate gradients converged");
                return Ok((x, stats));
            }

            for i in 0..n {
                z[i] = r[i] * inv_diag[i];
            }
            let rz_new = dot(&r, &z);
            let beta = rz_new / rz;
            rz = rz_new;
            for i in 0..n {
                p[i] = z[i] + beta * p[i];
            }
        }

        warn!(
            iterations = self.max_iterations,
            residual = rel,
            "conjugate gradients hit the iteration limit"
        );
        Err(Error::NotConverged {
            iterations: self.max_iterations,
            residual: rel,
        })
    }

    fn name(&self) -> &str {
        "Conjugate Gradient (Jacobi)"
    }
}

/// Select solver based on configuration and problem size.
pub fn select_solver(config: &SolverConfig, n_dofs: usize) -> Box<dyn Solver> {
    let iterative = || -> Box<dyn Solver> {
        Box::new(ConjugateGradientSolver::new(
            config.tolerance,
            config.max_iterations,
        ))
    };
    match config.solver_type {
        SolverType::Direct => Box::new(FaerCholeskySolver::new()),
        SolverType::Lu => Box::new(DenseLUSolver::new()),
        SolverType::Iterative => iterative(),
        SolverType::Auto if n_dofs < config.auto_threshold => Box::new(FaerCholeskySolver::new()),
        SolverType::Auto => iterative(),
    }
}
