//! Command-line interface definitions and argument parsing

use crate::config::SegmentationConfig;
use crate::features::FeatureSet;
use crate::model::ClusteringStrategy;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Clustering backend selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// K-means from linfa-clustering
    Linfa,
    /// Built-in k-means with parallel restarts and fit diagnostics
    Native,
}

/// Customer segmentation CLI using K-Means clustering on behavioral features
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "customers.csv")]
    pub input: PathBuf,

    /// Number of segments
    #[arg(short = 'k', long, default_value = "5")]
    pub clusters: usize,

    /// Random seed for the clustering restarts
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Comma-separated feature columns, overriding the default eight
    /// Example: --features "tenure_days,recency_days,value_proxy"
    #[arg(short, long)]
    pub features: Option<String>,

    /// Number of k-means restarts
    #[arg(long, default_value = "10")]
    pub n_init: usize,

    /// Maximum iterations per restart
    #[arg(long, default_value = "300")]
    pub max_iters: usize,

    /// Tolerance for K-Means convergence
    #[arg(long, default_value = "1e-4")]
    pub tolerance: f64,

    /// Clustering backend
    #[arg(long, value_enum, default_value = "linfa")]
    pub strategy: Strategy,

    /// Round profile means to this many decimals before printing
    #[arg(long)]
    pub round: Option<u32>,

    /// Write the labeled table to this CSV path
    #[arg(long)]
    pub labeled_output: Option<PathBuf>,

    /// Write the segment profile to this CSV path
    #[arg(long)]
    pub profile_output: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Parse the feature override, if any
    pub fn feature_set(&self) -> crate::Result<FeatureSet> {
        match self.features.as_deref() {
            Some(list) => FeatureSet::parse(list),
            None => Ok(FeatureSet::default()),
        }
    }

    /// Map the flags onto a pipeline configuration
    pub fn to_config(&self) -> crate::Result<SegmentationConfig> {
        let config = SegmentationConfig::default()
            .with_features(self.feature_set()?)
            .with_k(self.clusters)
            .with_seed(self.seed)
            .with_n_init(self.n_init)
            .with_max_iter(self.max_iters)
            .with_tolerance(self.tolerance);
        config.validate()?;
        Ok(config)
    }

    /// Build the selected clustering strategy
    pub fn build_strategy(&self, config: &SegmentationConfig) -> Box<dyn ClusteringStrategy> {
        match self.strategy {
            Strategy::Native => Box::new(config.kmeans()),
            Strategy::Linfa => Box::new(config.linfa_kmeans()),
        }
    }

    /// Log filter for the configured verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
