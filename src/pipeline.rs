//! End-to-end segmentation: build, scale, cluster, profile

use crate::config::SegmentationConfig;
use crate::data::{build_cluster_matrix, FeatureMatrix};
use crate::error::Result;
use crate::model::ClusteringStrategy;
use crate::profile::{segment_profile, SegmentProfile};
use crate::scaler::standardize;
use crate::segment::assign_segments;
use polars::prelude::DataFrame;
use std::time::Instant;
use tracing::{info, info_span};

/// Intermediate and final products of one run.
#[derive(Debug, Clone)]
pub struct SegmentationOutput {
    /// Cleaned, unscaled feature matrix
    pub cleaned: FeatureMatrix,
    /// Standardized matrix the clustering ran on
    pub scaled: FeatureMatrix,
    /// Input table plus the `segment` column
    pub labeled: DataFrame,
    pub profile: SegmentProfile,
}

/// Runs the four stages in order with a fixed configuration and strategy.
pub struct SegmentationPipeline {
    config: SegmentationConfig,
    strategy: Box<dyn ClusteringStrategy>,
}

impl SegmentationPipeline {
    /// Pipeline using `linfa` k-means; see [`with_strategy`](Self::with_strategy)
    /// for the parallel native implementation.
    pub fn new(config: SegmentationConfig) -> Result<Self> {
        config.validate()?;
        let strategy = Box::new(config.linfa_kmeans());
        Ok(Self { config, strategy })
    }

    /// Swap in another clustering strategy.
    pub fn with_strategy(mut self, strategy: Box<dyn ClusteringStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn run(&self, table: &DataFrame) -> Result<SegmentationOutput> {
        let span = info_span!("segmentation", strategy = self.strategy.name(), k = self.config.k);
        let _guard = span.enter();
        let start = Instant::now();

        let cleaned = build_cluster_matrix(table, &self.config.features, &self.config.policy)?;
        let scaled = standardize(&cleaned)?;
        let labeled = assign_segments(
            table,
            &scaled,
            self.config.k,
            self.strategy.as_ref(),
            self.config.seed,
        )?;
        let profile = segment_profile(&labeled, &self.config.features)?;

        info!(
            rows = labeled.height(),
            segments = profile.rows().len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "segmentation complete"
        );

        Ok(SegmentationOutput {
            cleaned,
            scaled,
            labeled,
            profile,
        })
    }
}
