//! segmentforge: customer segmentation using K-Means clustering
//!
//! The pipeline turns a record table into behavioral segments in four steps:
//! build a cleaned feature matrix, standardize it, cluster it, and profile
//! each segment by its mean feature values.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod profile;
pub mod scaler;
pub mod segment;

// Re-export public items for easier access
pub use cli::{Args, Strategy};
pub use config::SegmentationConfig;
pub use data::{build_cluster_matrix, load_records, write_csv, FeatureMatrix};
pub use error::{Result, SegmentationError};
pub use features::{CleaningPolicy, ColumnTreatment, FeatureSet, DEFAULT_FEATURES};
pub use model::{silhouette_sample, ClusteringStrategy, KMeans, KMeansFit, LinfaKMeans};
pub use pipeline::{SegmentationOutput, SegmentationPipeline};
pub use profile::{segment_profile, SegmentProfile, SegmentSummary};
pub use scaler::standardize;
pub use segment::{assign_segments, segment_ids, SEGMENT_COLUMN};
