//! Principal-component reduction of standardized feature matrices.
//!
//! The feature matrices here are at most four columns wide, so the eigenvalue
//! problem is solved with cyclic Jacobi rotations rather than a LAPACK
//! binding. Components are ordered largest-eigenvalue-first and sign-fixed so
//! repeated runs on identical input return the same orientation.

use std::cmp::Ordering;

use ndarray::{Array1, Array2, Axis};

use crate::error::{Error, Result};

const MAX_SWEEPS: usize = 50;
const OFF_DIAGONAL_TOLERANCE: f64 = 1e-12;

/// A fitted principal-component model.
#[derive(Debug, Clone)]
pub struct Pca {
    mean: Array1<f64>,
    /// Loadings, one column per retained component.
    components: Array2<f64>,
    /// Fraction of total variance captured by each retained component.
    pub explained_variance_ratio: Vec<f64>,
}

impl Pca {
    /// Fit on a matrix of shape (n, d), retaining `target_dims` components.
    pub fn fit(matrix: &Array2<f64>, target_dims: usize) -> Result<Self> {
        let (n, d) = matrix.dim();
        if target_dims == 0 {
            return Err(Error::InvalidParameter {
                name: "target_dims",
                message: "must be at least 1".to_string(),
            });
        }
        if n < target_dims || d < target_dims {
            return Err(Error::InsufficientData {
                rows: n,
                cols: d,
                target: target_dims,
            });
        }
        check_finite(matrix, "reduce")?;

        let mean = matrix.sum_axis(Axis(0)) / n as f64;
        let centered = matrix - &mean;
        let cov = centered.t().dot(&centered) / (n as f64 - 1.0).max(1.0);

        let (eigenvalues, eigenvectors) = jacobi_eigen(&cov);

        let mut order: Vec<usize> = (0..d).collect();
        order.sort_by(|&a, &b| {
            eigenvalues[b]
                .partial_cmp(&eigenvalues[a])
                .unwrap_or(Ordering::Equal)
        });

        let total: f64 = eigenvalues.iter().map(|v| v.max(0.0)).sum();
        let mut components = Array2::zeros((d, target_dims));
        let mut explained_variance_ratio = Vec::with_capacity(target_dims);

        for (out, &src) in order.iter().take(target_dims).enumerate() {
            let mut loading: Vec<f64> = eigenvectors.column(src).to_vec();
            orient(&mut loading);
            for (row, &v) in loading.iter().enumerate() {
                components[[row, out]] = v;
            }
            explained_variance_ratio.push(if total > 0.0 {
                eigenvalues[src].max(0.0) / total
            } else {
                0.0
            });
        }

        Ok(Self {
            mean,
            components,
            explained_variance_ratio,
        })
    }

    /// Project a matrix with the same column layout into component space.
    pub fn transform(&self, matrix: &Array2<f64>) -> Array2<f64> {
        let centered = matrix - &self.mean;
        centered.dot(&self.components)
    }
}

/// Fit-and-project in one call; the contract the pipeline consumes.
///
/// Row i of the embedding corresponds to row i of the input matrix.
pub fn reduce(matrix: &Array2<f64>, target_dims: usize) -> Result<Array2<f64>> {
    let pca = Pca::fit(matrix, target_dims)?;
    Ok(pca.transform(matrix))
}

fn check_finite(matrix: &Array2<f64>, stage: &'static str) -> Result<()> {
    for ((row, col), v) in matrix.indexed_iter() {
        if !v.is_finite() {
            return Err(Error::NonFinite { stage, row, col });
        }
    }
    Ok(())
}

/// Flip a component so its largest-magnitude loading is positive.
fn orient(loading: &mut [f64]) {
    let mut pivot = 0;
    for (i, v) in loading.iter().enumerate() {
        if v.abs() > loading[pivot].abs() {
            pivot = i;
        }
    }
    if loading[pivot] < 0.0 {
        for v in loading.iter_mut() {
            *v = -*v;
        }
    }
}

/// Eigen-decompose a symmetric matrix with cyclic Jacobi rotations.
///
/// Returns eigenvalues and an eigenvector matrix whose column i pairs with
/// eigenvalue i.
fn jacobi_eigen(matrix: &Array2<f64>) -> (Vec<f64>, Array2<f64>) {
    let d = matrix.nrows();
    let mut a = matrix.clone();
    let mut v: Array2<f64> = Array2::eye(d);

    for _ in 0..MAX_SWEEPS {
        let mut off = 0.0;
        for p in 0..d {
            for q in (p + 1)..d {
                off += a[[p, q]] * a[[p, q]];
            }
        }
        if off.sqrt() < OFF_DIAGONAL_TOLERANCE {
            break;
        }

        for p in 0..d {
            for q in (p + 1)..d {
                if a[[p, q]].abs() < f64::EPSILON {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * a[[p, q]]);
                let t = if theta >= 0.0 {
                    1.0 / (theta + (theta * theta + 1.0).sqrt())
                } else {
                    -1.0 / (-theta + (theta * theta + 1.0).sqrt())
                };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for i in 0..d {
                    let aip = a[[i, p]];
                    let aiq = a[[i, q]];
                    a[[i, p]] = c * aip - s * aiq;
                    a[[i, q]] = s * aip + c * aiq;
                }
                for i in 0..d {
                    let api = a[[p, i]];
                    let aqi = a[[q, i]];
                    a[[p, i]] = c * api - s * aqi;
                    a[[q, i]] = s * api + c * aqi;
                }
                for i in 0..d {
                    let vip = v[[i, p]];
                    let viq = v[[i, q]];
                    v[[i, p]] = c * vip - s * viq;
                    v[[i, q]] = s * vip + c * viq;
                }
            }
        }
    }

    let eigenvalues = (0..d).map(|i| a[[i, i]]).collect();
    (eigenvalues, v)
}
