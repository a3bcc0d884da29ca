//! Feature sets and the per-column cleaning policy

use crate::error::{Result, SegmentationError};

/// Default clustering features, in matrix column order.
pub const DEFAULT_FEATURES: [&str; 8] = [
    "tenure_days",
    "recency_days",
    "value_proxy",
    "true_cancellation_rate",
    "discount_sensitivity",
    "bundling_ratio",
    "avg_nights_stayed",
    "avg_bags",
];

/// Magnitudes that may legitimately be absent; missing means zero.
pub const DEFAULT_MAGNITUDE_FEATURES: [&str; 4] =
    ["value_proxy", "bundling_ratio", "avg_nights_stayed", "avg_bags"];

/// Probabilities bounded to `[0, 1]`.
pub const DEFAULT_RATE_FEATURES: [&str; 2] = ["true_cancellation_rate", "discount_sensitivity"];

/// Ordered, duplicate-free list of feature names.
///
/// Order determines matrix column order, so the same `FeatureSet` must be
/// handed to the builder and the profiler within one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSet {
    names: Vec<String>,
}

impl FeatureSet {
    /// Build a feature set from caller-supplied names.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(SegmentationError::invalid(
                "features",
                "at least one feature is required",
            ));
        }
        for (i, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(SegmentationError::invalid(
                    "features",
                    "feature names must not be blank",
                ));
            }
            if names[..i].contains(name) {
                return Err(SegmentationError::invalid(
                    "features",
                    format!("duplicate feature '{name}'"),
                ));
            }
        }
        Ok(Self { names })
    }

    /// Parse a comma-separated list such as `"tenure_days,avg_bags"`.
    pub fn parse(list: &str) -> Result<Self> {
        Self::new(list.split(',').map(str::trim).filter(|s| !s.is_empty()))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self {
            names: DEFAULT_FEATURES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// How the matrix builder treats a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnTreatment {
    /// Missing values become 0.
    Magnitude,
    /// Parse, substitute 0 for failures and missing values, clip to `[0, 1]`.
    Rate,
    /// Numeric parse only; missing values stay missing.
    PassThrough,
}

/// Names of the columns that receive magnitude or rate cleaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleaningPolicy {
    pub magnitude: Vec<String>,
    pub rate: Vec<String>,
}

impl CleaningPolicy {
    pub fn new<M, R>(magnitude: M, rate: R) -> Self
    where
        M: IntoIterator,
        M::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            magnitude: magnitude.into_iter().map(Into::into).collect(),
            rate: rate.into_iter().map(Into::into).collect(),
        }
    }

    /// Rate cleaning wins when a column is listed under both.
    pub fn treatment(&self, column: &str) -> ColumnTreatment {
        if self.rate.iter().any(|c| c == column) {
            ColumnTreatment::Rate
        } else if self.magnitude.iter().any(|c| c == column) {
            ColumnTreatment::Magnitude
        } else {
            ColumnTreatment::PassThrough
        }
    }
}

impl Default for CleaningPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAGNITUDE_FEATURES, DEFAULT_RATE_FEATURES)
    }
}
