//! Fuzzy c-means clustering over segment embeddings.
//!
//! The update loop is an explicit state machine: the state is the membership
//! matrix plus the centers it implies, one transition is a Lloyd-style update,
//! and the terminal states are convergence or the iteration cap. Hitting the
//! cap is a reported outcome, not an error.

use std::cmp::Ordering;
use std::ops::RangeInclusive;

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::catalog::CatalogRecord;
use crate::error::{Error, Result};
use crate::segment::SegmentKind;
use crate::vocab::Vocabulary;

/// Membership change below which the update loop is considered converged.
pub const TOLERANCE: f64 = 1e-4;
/// Hard cap on update iterations.
pub const MAX_ITERATIONS: usize = 300;
/// Fixed seed for membership initialisation, so runs are reproducible.
pub const INIT_SEED: u64 = 42;

/// How a clustering run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Membership change dropped below [`TOLERANCE`].
    Converged {
        /// Updates performed before convergence.
        iterations: usize,
    },
    /// [`MAX_ITERATIONS`] reached; memberships are best-effort.
    IterationCap,
}

/// Result of one fuzzy c-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct FcmFit {
    /// (k × n) membership degrees; every column sums to 1.
    pub membership: Array2<f64>,
    /// Cluster centers, one row per cluster, in input coordinate space.
    pub centers: Array2<f64>,
    /// Terminal state of the update loop.
    pub termination: Termination,
}

impl FcmFit {
    /// Hard label per record: arg-max membership, ties to the lowest index.
    pub fn hard_labels(&self) -> Vec<usize> {
        let (k, n) = self.membership.dim();
        (0..n)
            .map(|i| {
                let mut best = 0;
                for j in 1..k {
                    if self.membership[[j, i]] > self.membership[[best, i]] {
                        best = j;
                    }
                }
                best
            })
            .collect()
    }

    /// Fuzzy partition coefficient: mean over records of the summed squared
    /// membership degrees. Lies in [1/k, 1]; closer to 1 is crisper.
    pub fn partition_coefficient(&self) -> f64 {
        let n = self.membership.ncols().max(1) as f64;
        self.membership.iter().map(|u| u * u).sum::<f64>() / n
    }
}

/// The update-loop state: memberships and the centers they imply.
#[derive(Debug, Clone)]
struct FcmState {
    membership: Array2<f64>,
    centers: Array2<f64>,
}

impl FcmState {
    /// Random membership columns, each normalized to sum 1.
    fn init(k: usize, n: usize, d: usize, rng: &mut StdRng) -> Self {
        let mut membership = Array2::zeros((k, n));
        for i in 0..n {
            let mut sum = 0.0;
            for j in 0..k {
                let v: f64 = rng.gen_range(1e-3..1.0);
                membership[[j, i]] = v;
                sum += v;
            }
            for j in 0..k {
                membership[[j, i]] /= sum;
            }
        }
        Self {
            membership,
            centers: Array2::zeros((k, d)),
        }
    }

    /// One transition: centers from membership-weighted means, then
    /// memberships from inverse-distance ratios. Returns the largest
    /// membership change.
    fn step(&mut self, data: &Array2<f64>, fuzziness: f64) -> f64 {
        let (k, n) = self.membership.dim();
        let d = data.ncols();

        for j in 0..k {
            let mut weight_sum = 0.0;
            let mut center = vec![0.0; d];
            for i in 0..n {
                let w = self.membership[[j, i]].powf(fuzziness);
                weight_sum += w;
                for c in 0..d {
                    center[c] += w * data[[i, c]];
                }
            }
            for c in 0..d {
                self.centers[[j, c]] = if weight_sum > 0.0 {
                    center[c] / weight_sum
                } else {
                    0.0
                };
            }
        }

        let exponent = 2.0 / (fuzziness - 1.0);
        let mut max_delta: f64 = 0.0;
        for i in 0..n {
            let distances: Vec<f64> = (0..k)
                .map(|j| euclidean(data.row(i), self.centers.row(j)))
                .collect();
            let column = membership_column(&distances, exponent);
            for j in 0..k {
                max_delta = max_delta.max((column[j] - self.membership[[j, i]]).abs());
                self.membership[[j, i]] = column[j];
            }
        }
        max_delta
    }
}

/// Membership distribution for one record given its distances to all centers.
///
/// A zero distance pins the full membership on the coincident cluster, so the
/// inverse-distance ratio never divides by zero.
fn membership_column(distances: &[f64], exponent: f64) -> Vec<f64> {
    if let Some(hit) = distances.iter().position(|&d| d == 0.0) {
        let mut column = vec![0.0; distances.len()];
        column[hit] = 1.0;
        return column;
    }
    distances
        .iter()
        .map(|&dj| {
            let denominator: f64 = distances.iter().map(|&dl| (dj / dl).powf(exponent)).sum();
            1.0 / denominator
        })
        .collect()
}

fn euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Run fuzzy c-means on `data` (n rows, d columns) with `k` clusters.
pub fn fit_fcm(data: &Array2<f64>, k: usize, fuzziness: f64) -> Result<FcmFit> {
    let (n, d) = data.dim();
    if k == 0 || n < k {
        return Err(Error::InvalidClusterCount {
            requested: k,
            n_items: n,
        });
    }
    if fuzziness <= 1.0 {
        return Err(Error::InvalidParameter {
            name: "fuzziness",
            message: format!("must be greater than 1, got {fuzziness}"),
        });
    }
    for ((row, col), v) in data.indexed_iter() {
        if !v.is_finite() {
            return Err(Error::NonFinite {
                stage: "cluster",
                row,
                col,
            });
        }
    }

    let mut rng = StdRng::seed_from_u64(INIT_SEED);
    let mut state = FcmState::init(k, n, d, &mut rng);
    let mut termination = Termination::IterationCap;
    for iteration in 0..MAX_ITERATIONS {
        let delta = state.step(data, fuzziness);
        if delta < TOLERANCE {
            termination = Termination::Converged {
                iterations: iteration + 1,
            };
            break;
        }
    }

    Ok(FcmFit {
        membership: state.membership,
        centers: state.centers,
        termination,
    })
}

/// A catalog record with its segment and global cluster code attached.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRecord {
    /// The original record, unchanged.
    pub record: CatalogRecord,
    /// Segment the record classified into.
    pub segment: SegmentKind,
    /// Global cluster code, 1 through 8.
    pub cluster: u8,
}

/// Outcome of clustering one segment.
#[derive(Debug, Clone)]
pub struct SegmentClustering {
    /// Raw records with labels attached, in segment order.
    pub labeled: Vec<LabeledRecord>,
    /// Centers in embedding space; row order matches local cluster index.
    pub centers: Array2<f64>,
    /// Terminal state of the underlying fit.
    pub termination: Termination,
    /// Crispness diagnostic of the fit.
    pub fpc: f64,
}

/// Cluster one segment's records on its embedding and attach global labels.
///
/// Local cluster indices are stabilized by ordering centers descending on the
/// first embedding coordinate before the static vocabulary mapping applies.
pub fn cluster(
    kind: SegmentKind,
    records: &[CatalogRecord],
    embedding: &Array2<f64>,
    k: usize,
    fuzziness: f64,
    vocabulary: &Vocabulary,
) -> Result<SegmentClustering> {
    if records.len() != embedding.nrows() {
        return Err(Error::DimensionMismatch {
            expected: records.len(),
            found: embedding.nrows(),
        });
    }

    let fit = fit_fcm(embedding, k, fuzziness)?;
    let fit = stabilize(fit);
    let fpc = fit.partition_coefficient();

    let labeled = records
        .iter()
        .zip(fit.hard_labels())
        .map(|(record, local)| {
            Ok(LabeledRecord {
                record: record.clone(),
                segment: kind,
                cluster: vocabulary.global_code(kind, local)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SegmentClustering {
        labeled,
        centers: fit.centers,
        termination: fit.termination,
        fpc,
    })
}

/// Reorder clusters by descending first center coordinate.
///
/// Fuzzy c-means assigns local indices in initialisation order; sorting makes
/// the index→label mapping stable across parameter tweaks.
fn stabilize(fit: FcmFit) -> FcmFit {
    let (k, n) = fit.membership.dim();
    let d = fit.centers.ncols();

    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| {
        fit.centers[[b, 0]]
            .partial_cmp(&fit.centers[[a, 0]])
            .unwrap_or(Ordering::Equal)
    });

    let mut centers = Array2::zeros((k, d));
    let mut membership = Array2::zeros((k, n));
    for (new_idx, &old_idx) in order.iter().enumerate() {
        for c in 0..d {
            centers[[new_idx, c]] = fit.centers[[old_idx, c]];
        }
        for i in 0..n {
            membership[[new_idx, i]] = fit.membership[[old_idx, i]];
        }
    }

    FcmFit {
        membership,
        centers,
        termination: fit.termination,
    }
}

/// Fitness diagnostic: run fuzzy c-means on the matrix and report the fuzzy
/// partition coefficient of the resulting membership matrix.
pub fn fitness(matrix: &Array2<f64>, k: usize, fuzziness: f64) -> Result<f64> {
    Ok(fit_fcm(matrix, k, fuzziness)?.partition_coefficient())
}

/// FPC for every candidate cluster count in `k_range` — the series behind the
/// crispness chart.
pub fn fitness_scan(
    matrix: &Array2<f64>,
    fuzziness: f64,
    k_range: RangeInclusive<usize>,
) -> Result<Vec<(usize, f64)>> {
    k_range
        .map(|k| fitness(matrix, k, fuzziness).map(|score| (k, score)))
        .collect()
}
