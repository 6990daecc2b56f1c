//! Eigendecomposition of rate matrices and transition probabilities.

use crate::error::{ModelError, Result};
use nalgebra::{DMatrix, DVector, Schur, SymmetricEigen};
use tracing::{trace, warn};

/// Tolerance for rows of a rate matrix to sum to zero, relative to its largest rate.
const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// Tolerance of the detailed-balance check.
const REVERSIBILITY_TOLERANCE: f64 = 1e-9;

/// Tolerance of `V * V^-1 = I`.
const INVERSE_TOLERANCE: f64 = 1e-6;

/// Iteration cap of the Schur decomposition.
const SCHUR_MAX_ITERATIONS: usize = 10_000;

// =#========================================================================#=
// EIGEN SYSTEM
// =#========================================================================#=
/// Eigenvalues, eigenvectors and inverse eigenvectors of a rate matrix `Q`,
/// so that `Q = V * diag(λ) * V^-1`.
///
/// Reversible matrices are symmetrised with their stationary distribution and
/// decomposed with a symmetric eigensolver. Other matrices go through a real
/// Schur decomposition, which fails for complex eigenvalues. The inverse is
/// computed by LU decomposition with partial pivoting.
///
/// # Example
/// ```
/// use nalgebra::DMatrix;
/// use phylogen::ctmc::EigenSystem;
///
/// let q = DMatrix::from_row_slice(2, 2, &[-1.0, 1.0, 1.0, -1.0]);
/// let eigen = EigenSystem::decompose(&q).unwrap();
/// let p = eigen.transition_probabilities(0.0);
/// assert!((p[(0, 0)] - 1.0).abs() < 1e-12);
/// assert!((p[(0, 1)]).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct EigenSystem {
    eigenvalues: DVector<f64>,
    eigenvectors: DMatrix<f64>,
    inverse: DMatrix<f64>,
}

impl EigenSystem {
    /// Decomposes the rate matrix `q`.
    ///
    /// # Errors
    /// Returns [ModelError::InvalidArgument] if `q` is not a square rate matrix
    /// (non-negative off-diagonal entries, rows summing to zero) or has complex
    /// eigenvalues, and [ModelError::SingularMatrix] if its eigenvector matrix
    /// cannot be inverted.
    pub fn decompose(q: &DMatrix<f64>) -> Result<Self> {
        validate_rate_matrix(q)?;

        let (eigenvalues, eigenvectors) = match stationary_distribution(q) {
            Some(pi) if is_reversible(q, &pi) => {
                trace!("decomposing reversible rate matrix");
                symmetric_decomposition(q, &pi)
            }
            _ => {
                trace!("decomposing non-reversible rate matrix");
                schur_decomposition(q)?
            }
        };

        let inverse = eigenvectors
            .clone()
            .lu()
            .try_inverse()
            .ok_or_else(|| ModelError::SingularMatrix("eigenvector matrix of Q".to_string()))?;

        let n = q.nrows();
        let residual = (&eigenvectors * &inverse - DMatrix::<f64>::identity(n, n)).amax();
        if !residual.is_finite() || residual > INVERSE_TOLERANCE {
            return Err(ModelError::SingularMatrix(format!(
                "eigenvector matrix of Q is ill-conditioned (residual {:e})",
                residual
            )));
        }

        Ok(EigenSystem {
            eigenvalues,
            eigenvectors,
            inverse,
        })
    }

    pub fn num_states(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn eigenvalues(&self) -> &DVector<f64> {
        &self.eigenvalues
    }

    pub fn eigenvectors(&self) -> &DMatrix<f64> {
        &self.eigenvectors
    }

    pub fn inverse_eigenvectors(&self) -> &DMatrix<f64> {
        &self.inverse
    }

    /// Returns `P(t) = V * diag(exp(λ t)) * V^-1` with every entry made non-negative.
    pub fn transition_probabilities(&self, t: f64) -> DMatrix<f64> {
        let mut scaled = self.eigenvectors.clone();
        for (j, &lambda) in self.eigenvalues.iter().enumerate() {
            scaled.column_mut(j).scale_mut((lambda * t).exp());
        }
        let mut p = scaled * &self.inverse;
        p.apply(|x| *x = x.abs());
        p
    }

    /// Returns `P(t)` as rows, logging a warning if a row does not sum to 1.
    pub fn transition_rows(&self, t: f64, tolerance: f64) -> Vec<Vec<f64>> {
        let p = self.transition_probabilities(t);
        (0..p.nrows())
            .map(|i| {
                let row: Vec<f64> = p.row(i).iter().copied().collect();
                let sum: f64 = row.iter().sum();
                if (sum - 1.0).abs() > tolerance {
                    warn!(row = i, sum, t, "transition probabilities do not sum to 1");
                }
                row
            })
            .collect()
    }

    /// Returns the first row of `P(branch_length)` as root frequencies.
    ///
    /// A warning is logged if any other row differs from the first by more than `tolerance`.
    pub fn equilibrium_frequencies(&self, branch_length: f64, tolerance: f64) -> Vec<f64> {
        let p = self.transition_probabilities(branch_length);
        let first: Vec<f64> = p.row(0).iter().copied().collect();
        let deviation = (1..p.nrows())
            .flat_map(|i| (0..p.ncols()).map(move |j| (i, j)))
            .map(|(i, j)| (p[(i, j)] - first[j]).abs())
            .fold(0.0, f64::max);
        if deviation > tolerance {
            warn!(
                deviation,
                branch_length, "rows of P(t) differ; root frequencies may not be stationary"
            );
        }
        first
    }
}

/// Checks shape and rate-matrix properties of `q`.
pub fn validate_rate_matrix(q: &DMatrix<f64>) -> Result<()> {
    let n = q.nrows();
    if n < 2 || q.ncols() != n {
        return Err(ModelError::invalid_argument(format!(
            "rate matrix must be square with at least 2 states, got {}x{}",
            q.nrows(),
            q.ncols()
        )));
    }
    if q.iter().any(|x| !x.is_finite()) {
        return Err(ModelError::invalid_argument("rate matrix has non-finite entries"));
    }

    let scale = 1.0 + q.amax();
    for i in 0..n {
        for j in 0..n {
            if i != j && q[(i, j)] < 0.0 {
                return Err(ModelError::invalid_argument(format!(
                    "rate matrix entry ({}, {}) is negative",
                    i, j
                )));
            }
        }
        let row_sum: f64 = q.row(i).iter().sum();
        if row_sum.abs() > ROW_SUM_TOLERANCE * scale {
            return Err(ModelError::invalid_argument(format!(
                "row {} of rate matrix sums to {} instead of 0",
                i, row_sum
            )));
        }
    }
    Ok(())
}

/// Solves `pi Q = 0` with `sum(pi) = 1`; `None` if singular or not strictly positive.
fn stationary_distribution(q: &DMatrix<f64>) -> Option<DVector<f64>> {
    let n = q.nrows();
    let mut a = q.transpose();
    for j in 0..n {
        a[(n - 1, j)] = 1.0;
    }
    let mut b = DVector::zeros(n);
    b[n - 1] = 1.0;

    let pi = a.lu().solve(&b)?;
    if pi.iter().all(|&p| p > 0.0 && p.is_finite()) {
        Some(pi)
    } else {
        None
    }
}

/// Detailed balance: `pi_i q_ij = pi_j q_ji` for all pairs.
fn is_reversible(q: &DMatrix<f64>, pi: &DVector<f64>) -> bool {
    let n = q.nrows();
    let scale = 1.0 + q.amax();
    (0..n).all(|i| {
        (i + 1..n).all(|j| (pi[i] * q[(i, j)] - pi[j] * q[(j, i)]).abs() <= REVERSIBILITY_TOLERANCE * scale)
    })
}

/// Decomposes `Pi^1/2 Q Pi^-1/2` with the symmetric eigensolver and maps the
/// eigenvectors back with `Pi^-1/2`.
fn symmetric_decomposition(q: &DMatrix<f64>, pi: &DVector<f64>) -> (DVector<f64>, DMatrix<f64>) {
    let n = q.nrows();
    let root = pi.map(f64::sqrt);
    let b = DMatrix::from_fn(n, n, |i, j| root[i] * q[(i, j)] / root[j]);
    let symmetric = (&b + b.transpose()) * 0.5;

    let eigen = SymmetricEigen::new(symmetric);
    let vectors = DMatrix::from_fn(n, n, |i, j| eigen.eigenvectors[(i, j)] / root[i]);
    (eigen.eigenvalues, vectors)
}

/// Decomposes `Q = U T U^T` (real Schur form) and solves `T y = λ y` by back substitution.
fn schur_decomposition(q: &DMatrix<f64>) -> Result<(DVector<f64>, DMatrix<f64>)> {
    let n = q.nrows();
    let schur = Schur::try_new(q.clone(), f64::EPSILON, SCHUR_MAX_ITERATIONS)
        .ok_or_else(|| ModelError::invalid_argument("Schur decomposition of rate matrix did not converge"))?;
    let (orthogonal, t) = schur.unpack();

    let scale = 1.0 + q.amax();
    for i in 0..n - 1 {
        if t[(i + 1, i)].abs() > 1e-10 * scale {
            return Err(ModelError::invalid_argument("rate matrix has complex eigenvalues"));
        }
    }

    let eigenvalues = DVector::from_fn(n, |k, _| t[(k, k)]);
    let tiny = f64::EPSILON * scale;
    let mut y = DMatrix::<f64>::zeros(n, n);
    for k in 0..n {
        let lambda = eigenvalues[k];
        y[(k, k)] = 1.0;
        for i in (0..k).rev() {
            let sum: f64 = (i + 1..=k).map(|j| t[(i, j)] * y[(j, k)]).sum();
            let mut denominator = t[(i, i)] - lambda;
            if denominator.abs() < tiny {
                denominator = tiny.copysign(denominator);
            }
            y[(i, k)] = -sum / denominator;
        }
    }

    let mut vectors = orthogonal * y;
    for mut column in vectors.column_iter_mut() {
        let norm = column.norm();
        if norm > 0.0 {
            column /= norm;
        }
    }
    Ok((eigenvalues, vectors))
}

/// Converts row-major nested vectors into a matrix.
///
/// # Errors
/// Fails if rows have different lengths or the matrix is empty.
pub fn matrix_from_rows(rows: &[Vec<f64>]) -> Result<DMatrix<f64>> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    if n_rows == 0 || n_cols == 0 || rows.iter().any(|r| r.len() != n_cols) {
        return Err(ModelError::invalid_argument("matrix rows must be non-empty and of equal length"));
    }
    Ok(DMatrix::from_fn(n_rows, n_cols, |i, j| rows[i][j]))
}
