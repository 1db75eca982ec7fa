//! Linear algebra operations for beta estimation.

use ndarray::{Array1, Array2};

use crate::MathError;

/// Relative tolerance on the pivoted diagonal of `R` below which a column is
/// treated as linearly dependent.
pub const RANK_TOLERANCE: f64 = 1e-12;

/// Solution of a least squares problem.
#[derive(Debug, Clone)]
pub struct LeastSquaresResult {
    /// Estimated coefficients, in the column order of the design matrix.
    pub coefficients: Array1<f64>,
    /// Residuals `y - X b`.
    pub residuals: Array1<f64>,
}

/// Result of ordinary least squares with an intercept.
#[derive(Debug, Clone)]
pub struct OlsResult {
    /// Intercept.
    pub intercept: f64,
    /// Slopes, one per regressor column.
    pub slopes: Array1<f64>,
    /// Residuals.
    pub residuals: Array1<f64>,
    /// R-squared, `None` when the response has no variance.
    pub r_squared: Option<f64>,
    /// Number of observations.
    pub n_obs: usize,
}

/// Solve `argmin_b ||y - X b||²` by Householder QR with column pivoting.
///
/// The normal equations are never formed. A design whose numerical rank is
/// below its column count is rejected rather than given a minimum-norm
/// solution.
///
/// # Arguments
/// * `y` - Response vector (n,)
/// * `x` - Design matrix (n x p), n >= p
///
/// # Errors
/// Returns an error if dimensions mismatch, there are fewer rows than
/// columns, or `x` is rank deficient.
pub fn least_squares(y: &Array1<f64>, x: &Array2<f64>) -> Result<LeastSquaresResult, MathError> {
    let n = y.len();
    let p = x.ncols();

    if x.nrows() != n {
        return Err(MathError::DimensionMismatch { expected: n, actual: x.nrows() });
    }
    if n == 0 || p == 0 {
        return Err(MathError::EmptyData);
    }
    if n < p {
        return Err(MathError::InsufficientData { required: p, actual: n });
    }

    let mut a = x.clone();
    let mut qty = y.clone();
    let mut perm: Vec<usize> = (0..p).collect();
    let mut r00 = 0.0_f64;

    for k in 0..p {
        // Pivot: remaining column with the largest trailing norm
        let mut pivot = k;
        let mut pivot_norm = -1.0;
        for j in k..p {
            let norm: f64 = (k..n).map(|i| a[[i, j]] * a[[i, j]]).sum::<f64>().sqrt();
            if norm > pivot_norm {
                pivot_norm = norm;
                pivot = j;
            }
        }
        if pivot != k {
            for i in 0..n {
                a.swap([i, k], [i, pivot]);
            }
            perm.swap(k, pivot);
        }

        if k == 0 {
            r00 = pivot_norm;
        }
        let independent = pivot_norm > 0.0 && pivot_norm > RANK_TOLERANCE * r00;
        if !independent {
            return Err(MathError::RankDeficient { rank: k, columns: p });
        }

        // Householder reflector zeroing a[k+1.., k]
        let alpha = if a[[k, k]] >= 0.0 { -pivot_norm } else { pivot_norm };
        let mut v: Vec<f64> = (k..n).map(|i| a[[i, k]]).collect();
        v[0] -= alpha;
        let v_norm_sq: f64 = v.iter().map(|vi| vi * vi).sum();

        if v_norm_sq > 0.0 {
            for j in k..p {
                let dot: f64 = v.iter().enumerate().map(|(t, vi)| vi * a[[k + t, j]]).sum();
                let scale = 2.0 * dot / v_norm_sq;
                for (t, vi) in v.iter().enumerate() {
                    a[[k + t, j]] -= scale * vi;
                }
            }
            let dot: f64 = v.iter().enumerate().map(|(t, vi)| vi * qty[k + t]).sum();
            let scale = 2.0 * dot / v_norm_sq;
            for (t, vi) in v.iter().enumerate() {
                qty[k + t] -= scale * vi;
            }
        }
        a[[k, k]] = alpha;
        for i in (k + 1)..n {
            a[[i, k]] = 0.0;
        }
    }

    // Back substitution on the upper triangle
    let mut z = Array1::zeros(p);
    for i in (0..p).rev() {
        let mut sum = qty[i];
        for j in (i + 1)..p {
            sum -= a[[i, j]] * z[j];
        }
        z[i] = sum / a[[i, i]];
    }

    let mut coefficients = Array1::zeros(p);
    for (k, &col) in perm.iter().enumerate() {
        coefficients[col] = z[k];
    }

    let residuals = y - &x.dot(&coefficients);
    Ok(LeastSquaresResult { coefficients, residuals })
}

/// Fit `y = intercept + x * slopes` by ordinary least squares.
///
/// R² is `1 - SS_res / SS_tot`. It is `None` when `SS_tot` is zero, which
/// includes a response that is constant up to rounding.
///
/// # Errors
/// Returns an error if dimensions mismatch, there are fewer observations than
/// coefficients, or the design (with its intercept column) is rank deficient.
pub fn ols(y: &Array1<f64>, x: &Array2<f64>) -> Result<OlsResult, MathError> {
    let n = y.len();
    let p = x.ncols();

    if x.nrows() != n {
        return Err(MathError::DimensionMismatch { expected: n, actual: x.nrows() });
    }
    if n < p + 1 {
        return Err(MathError::InsufficientData { required: p + 1, actual: n });
    }

    let mut design = Array2::ones((n, p + 1));
    for i in 0..n {
        for j in 0..p {
            design[[i, j + 1]] = x[[i, j]];
        }
    }

    let solution = least_squares(y, &design)?;

    let y_mean = y.mean().unwrap_or(0.0);
    let ss_tot: f64 = y.iter().map(|yi| (yi - y_mean).powi(2)).sum();
    let ss_res: f64 = solution.residuals.iter().map(|r| r.powi(2)).sum();
    let scale: f64 = y.iter().map(|yi| yi * yi).sum();
    let r_squared = if ss_tot > f64::EPSILON * scale { Some(1.0 - ss_res / ss_tot) } else { None };

    Ok(OlsResult {
        intercept: solution.coefficients[0],
        slopes: solution.coefficients.slice(ndarray::s![1..]).to_owned(),
        residuals: solution.residuals,
        r_squared,
        n_obs: n,
    })
}
