//! Error types for the segmentation pipeline

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors returned by the segmentation pipeline stages.
#[derive(Debug, Error)]
pub enum SegmentationError {
    /// One or more required columns are absent from the input table.
    #[error("missing column(s): {}", .columns.join(", "))]
    MissingColumn {
        /// Names of the absent columns, in the order they were requested.
        columns: Vec<String>,
    },

    /// A parameter is outside its valid range.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// A stage received no rows to work with.
    #[error("insufficient data: {stage} requires at least one row")]
    InsufficientData {
        /// Pipeline stage that rejected the input.
        stage: &'static str,
    },

    /// Matrix and table row counts disagree.
    #[error("dimension mismatch: expected {expected} rows, found {found}")]
    DimensionMismatch {
        /// Row count of the record table.
        expected: usize,
        /// Row count of the matrix.
        found: usize,
    },

    /// A matrix column holds a NaN or infinite value.
    #[error("non-finite value in column {column}")]
    NonFiniteValue {
        /// Name of the offending column.
        column: String,
    },

    /// A magnitude or pass-through column holds a value that is not a number.
    #[error("non-numeric value in column {column}")]
    NonNumericValue {
        /// Name of the offending column.
        column: String,
    },

    /// Fitting the standard scaler failed.
    #[error("scaling failed: {0}")]
    Scaling(String),

    /// The clustering strategy failed or returned unusable labels.
    #[error("clustering failed: {0}")]
    Clustering(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SegmentationError {
    pub(crate) fn missing(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::MissingColumn {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub(crate) fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, SegmentationError>;
