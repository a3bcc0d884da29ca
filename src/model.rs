//! Clustering strategies and the native K-Means implementation

use crate::error::{Result, SegmentationError};
use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info};

/// Assigns one label in `[0, k)` to every row of a matrix.
///
/// Implementations must be deterministic for a fixed `seed`.
pub trait ClusteringStrategy: Send + Sync {
    /// Short name used in logs and on the command line.
    fn name(&self) -> &'static str;

    /// Fit on `data` and return one label per row.
    fn fit(&self, data: ArrayView2<'_, f64>, k: usize, seed: u64) -> Result<Vec<usize>>;
}

fn check_input(data: ArrayView2<'_, f64>, k: usize) -> Result<()> {
    if data.nrows() == 0 {
        return Err(SegmentationError::InsufficientData { stage: "clustering" });
    }
    if k == 0 || k > data.nrows() {
        return Err(SegmentationError::invalid(
            "k",
            format!("must be between 1 and the row count ({}), got {k}", data.nrows()),
        ));
    }
    Ok(())
}

/// Result of a K-Means fit
#[derive(Debug, Clone)]
pub struct KMeansFit {
    /// Cluster index per input row
    pub labels: Vec<usize>,
    /// Centroids in the space of the fitted matrix, shape `(k, n_features)`
    pub centroids: Array2<f64>,
    /// Within-cluster sum of squared distances
    pub inertia: f64,
    /// Lloyd iterations used by the winning restart
    pub n_iter: usize,
}

impl KMeansFit {
    pub fn n_clusters(&self) -> usize {
        self.centroids.nrows()
    }

    /// Get cluster sizes
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }

    /// Mean silhouette coefficient over the first `sample_size` rows.
    pub fn silhouette_sample(&self, data: ArrayView2<'_, f64>, sample_size: usize) -> f64 {
        silhouette_sample(data, &self.labels, sample_size)
    }
}

/// Mean silhouette coefficient over the first `sample_size` rows of `data`.
///
/// Returns 0 when fewer than two rows are sampled.
pub fn silhouette_sample(data: ArrayView2<'_, f64>, labels: &[usize], sample_size: usize) -> f64 {
    let n_samples = data.nrows().min(sample_size).min(labels.len());
    if n_samples < 2 {
        return 0.0;
    }
    let n_clusters = labels[..n_samples].iter().max().map_or(0, |&l| l + 1);

    let mut silhouette_sum = 0.0;
    for i in 0..n_samples {
        let point = data.row(i);
        let own = labels[i];

        let mut sums = vec![0.0; n_clusters];
        let mut counts = vec![0usize; n_clusters];
        for j in (0..n_samples).filter(|&j| j != i) {
            sums[labels[j]] += euclidean_distance(point, data.row(j));
            counts[labels[j]] += 1;
        }

        let a_i = if counts[own] == 0 {
            0.0
        } else {
            sums[own] / counts[own] as f64
        };
        let b_i = (0..n_clusters)
            .filter(|&c| c != own && counts[c] > 0)
            .map(|c| sums[c] / counts[c] as f64)
            .fold(f64::INFINITY, f64::min);

        silhouette_sum += if b_i.is_infinite() || counts[own] == 0 || a_i.max(b_i) == 0.0 {
            0.0
        } else {
            (b_i - a_i) / a_i.max(b_i)
        };
    }

    silhouette_sum / n_samples as f64
}

/// Native K-Means: k-means++ seeding, Lloyd iterations, best of `n_init` restarts.
///
/// Restarts run in parallel. Restart `r` is seeded with `seed + r`, and the
/// lowest-inertia restart wins with ties going to the lower `r`, so labels do
/// not depend on thread scheduling.
#[derive(Debug, Clone)]
pub struct KMeans {
    n_init: usize,
    max_iter: usize,
    tolerance: f64,
}

impl Default for KMeans {
    fn default() -> Self {
        Self {
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
        }
    }
}

impl KMeans {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Stop once no centroid moves farther than this between iterations.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    fn check_params(&self) -> Result<()> {
        if self.n_init == 0 {
            return Err(SegmentationError::invalid("n_init", "must be at least 1"));
        }
        if self.max_iter == 0 {
            return Err(SegmentationError::invalid("max_iter", "must be at least 1"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(SegmentationError::invalid(
                "tolerance",
                "must be a finite, non-negative number",
            ));
        }
        Ok(())
    }

    /// Fit and keep centroids, inertia and iteration count alongside the labels.
    pub fn fit_detailed(&self, data: ArrayView2<'_, f64>, k: usize, seed: u64) -> Result<KMeansFit> {
        self.check_params()?;
        check_input(data, k)?;

        let runs: Vec<KMeansFit> = (0..self.n_init)
            .into_par_iter()
            .map(|run| self.single_run(data, k, seed.wrapping_add(run as u64)))
            .collect();

        // min_by keeps the first of equal elements, i.e. the lowest run index
        let (best_run, best) = runs
            .into_iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.inertia.total_cmp(&b.inertia))
            .ok_or_else(|| SegmentationError::Clustering("no restart produced a result".into()))?;

        info!(
            k,
            seed,
            best_run,
            inertia = best.inertia,
            n_iter = best.n_iter,
            "k-means converged"
        );
        Ok(best)
    }

    fn single_run(&self, data: ArrayView2<'_, f64>, k: usize, seed: u64) -> KMeansFit {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut centroids = kmeans_plus_plus(data, k, &mut rng);
        let mut labels = vec![usize::MAX; data.nrows()];
        let mut n_iter = 0;

        while n_iter < self.max_iter {
            n_iter += 1;
            if !assign_nearest(data, &centroids, &mut labels) {
                break;
            }
            if update_centroids(data, &labels, &mut centroids) <= self.tolerance {
                break;
            }
        }
        // labels must match the final centroids
        assign_nearest(data, &centroids, &mut labels);

        let inertia = compute_inertia(data, &labels, &centroids);
        debug!(seed, inertia, n_iter, "k-means restart finished");
        KMeansFit {
            labels,
            centroids,
            inertia,
            n_iter,
        }
    }
}

impl ClusteringStrategy for KMeans {
    fn name(&self) -> &'static str {
        "native"
    }

    fn fit(&self, data: ArrayView2<'_, f64>, k: usize, seed: u64) -> Result<Vec<usize>> {
        Ok(self.fit_detailed(data, k, seed)?.labels)
    }
}

/// K-Means from `linfa-clustering`, seeded with a `StdRng`.
#[derive(Debug, Clone)]
pub struct LinfaKMeans {
    n_runs: usize,
    max_iter: u64,
    tolerance: f64,
}

impl Default for LinfaKMeans {
    fn default() -> Self {
        Self {
            n_runs: 10,
            max_iter: 300,
            tolerance: 1e-4,
        }
    }
}

impl LinfaKMeans {
    pub fn new(n_runs: usize, max_iter: usize, tolerance: f64) -> Self {
        Self {
            n_runs,
            max_iter: max_iter as u64,
            tolerance,
        }
    }
}

impl ClusteringStrategy for LinfaKMeans {
    fn name(&self) -> &'static str {
        "linfa"
    }

    fn fit(&self, data: ArrayView2<'_, f64>, k: usize, seed: u64) -> Result<Vec<usize>> {
        check_input(data, k)?;

        let records = data.to_owned();
        let dataset = DatasetBase::from(records.clone());
        let model = linfa_clustering::KMeans::params_with(k, StdRng::seed_from_u64(seed), L2Dist)
            .n_runs(self.n_runs)
            .max_n_iterations(self.max_iter)
            .tolerance(self.tolerance)
            .fit(&dataset)
            .map_err(|e| SegmentationError::Clustering(e.to_string()))?;

        let labels: Array1<usize> = model.predict(&records);
        Ok(labels.to_vec())
    }
}

/// k-means++ seeding: first centroid uniform, the rest drawn proportionally
/// to squared distance from the nearest chosen centroid.
fn kmeans_plus_plus(data: ArrayView2<'_, f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = data.nrows();
    let mut centroids = Array2::zeros((k, data.ncols()));

    let first = rng.gen_range(0..n);
    centroids.row_mut(0).assign(&data.row(first));
    let mut closest: Vec<f64> = data
        .outer_iter()
        .map(|row| squared_distance(row, centroids.row(0)))
        .collect();

    for c in 1..k {
        let total: f64 = closest.iter().sum();
        let chosen = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = n - 1;
            for (i, &d) in closest.iter().enumerate() {
                if target < d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // every point sits on a centroid already
            rng.gen_range(0..n)
        };

        centroids.row_mut(c).assign(&data.row(chosen));
        for (i, row) in data.outer_iter().enumerate() {
            closest[i] = closest[i].min(squared_distance(row, centroids.row(c)));
        }
    }

    centroids
}

/// Move every row to its nearest centroid; returns whether any label changed.
fn assign_nearest(data: ArrayView2<'_, f64>, centroids: &Array2<f64>, labels: &mut [usize]) -> bool {
    let mut changed = false;
    for (i, row) in data.outer_iter().enumerate() {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (c, centroid) in centroids.outer_iter().enumerate() {
            let distance = squared_distance(row, centroid);
            if distance < best_distance {
                best_distance = distance;
                best = c;
            }
        }
        if labels[i] != best {
            labels[i] = best;
            changed = true;
        }
    }
    changed
}

/// Recompute centroids as member means and return the largest centroid shift.
///
/// An empty cluster takes over the row farthest from its current centroid.
fn update_centroids(data: ArrayView2<'_, f64>, labels: &[usize], centroids: &mut Array2<f64>) -> f64 {
    let k = centroids.nrows();
    let mut sums = Array2::<f64>::zeros(centroids.raw_dim());
    let mut counts = vec![0usize; k];
    for (row, &label) in data.outer_iter().zip(labels) {
        let mut sum = sums.row_mut(label);
        sum += &row;
        counts[label] += 1;
    }

    let mut distances: Vec<f64> = data
        .outer_iter()
        .zip(labels)
        .map(|(row, &label)| squared_distance(row, centroids.row(label)))
        .collect();

    let mut max_shift: f64 = 0.0;
    for c in 0..k {
        let new_centroid = if counts[c] > 0 {
            sums.row(c).mapv(|s| s / counts[c] as f64)
        } else {
            let farthest = distances
                .iter()
                .enumerate()
                .fold(0, |best, (i, &d)| if d > distances[best] { i } else { best });
            distances[farthest] = f64::NEG_INFINITY;
            data.row(farthest).to_owned()
        };
        max_shift = max_shift.max(squared_distance(centroids.row(c), new_centroid.view()).sqrt());
        centroids.row_mut(c).assign(&new_centroid);
    }
    max_shift
}

/// Compute within-cluster sum of squares (inertia)
fn compute_inertia(data: ArrayView2<'_, f64>, labels: &[usize], centroids: &Array2<f64>) -> f64 {
    data.outer_iter()
        .zip(labels)
        .map(|(row, &label)| squared_distance(row, centroids.row(label)))
        .sum()
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

fn euclidean_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    squared_distance(a, b).sqrt()
}
