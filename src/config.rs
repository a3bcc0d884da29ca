//! Pipeline configuration

use crate::error::{Result, SegmentationError};
use crate::features::{CleaningPolicy, FeatureSet};
use crate::model::{KMeans, LinfaKMeans};

/// Everything a pipeline run needs, passed explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationConfig {
    pub features: FeatureSet,
    pub policy: CleaningPolicy,
    /// Number of segments
    pub k: usize,
    /// Seed for the clustering restarts
    pub seed: u64,
    /// Independent k-means restarts; the best one is kept
    pub n_init: usize,
    /// Iteration cap per restart
    pub max_iter: usize,
    /// Centroid movement below which a restart counts as converged
    pub tolerance: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            features: FeatureSet::default(),
            policy: CleaningPolicy::default(),
            k: 5,
            seed: 42,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
        }
    }
}

impl SegmentationConfig {
    pub fn with_features(mut self, features: FeatureSet) -> Self {
        self.features = features;
        self
    }

    pub fn with_policy(mut self, policy: CleaningPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Reject parameter values no run could succeed with.
    ///
    /// `k` is only checked against zero here; the upper bound depends on the
    /// table and is enforced by the clusterer.
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(SegmentationError::invalid("k", "must be at least 1"));
        }
        if self.n_init == 0 {
            return Err(SegmentationError::invalid("n_init", "must be at least 1"));
        }
        if self.max_iter == 0 {
            return Err(SegmentationError::invalid("max_iter", "must be at least 1"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(SegmentationError::invalid(
                "tolerance",
                format!("must be a finite, non-negative number, got {}", self.tolerance),
            ));
        }
        Ok(())
    }

    /// Native k-means configured from this run's parameters.
    pub fn kmeans(&self) -> KMeans {
        KMeans::new()
            .with_n_init(self.n_init)
            .with_max_iter(self.max_iter)
            .with_tolerance(self.tolerance)
    }

    /// `linfa` k-means configured from this run's parameters.
    pub fn linfa_kmeans(&self) -> LinfaKMeans {
        LinfaKMeans::new(self.n_init, self.max_iter, self.tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SegmentationConfig::default();
        assert_eq!(config.k, 5);
        assert_eq!(config.seed, 42);
        assert_eq!(config.n_init, 10);
        assert_eq!(config.features, FeatureSet::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(SegmentationConfig::default().with_k(0).validate().is_err());
        assert!(SegmentationConfig::default().with_n_init(0).validate().is_err());
        assert!(SegmentationConfig::default().with_max_iter(0).validate().is_err());
        assert!(SegmentationConfig::default()
            .with_tolerance(f64::NAN)
            .validate()
            .is_err());
    }
}
