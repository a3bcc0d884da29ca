//! Per-column standardization of cleaned feature matrices

use crate::data::FeatureMatrix;
use crate::error::{Result, SegmentationError};
use linfa::traits::{Fit, Transformer};
use linfa::DatasetBase;
use linfa_preprocessing::linear_scaling::LinearScaler;
use ndarray::Axis;
use tracing::{debug, warn};

pub(crate) fn ensure_finite(matrix: &FeatureMatrix) -> Result<()> {
    for (j, column) in matrix.values().axis_iter(Axis(1)).enumerate() {
        if column.iter().any(|x| !x.is_finite()) {
            return Err(SegmentationError::NonFiniteValue {
                column: matrix.columns()[j].clone(),
            });
        }
    }
    Ok(())
}

fn warn_zero_variance(matrix: &FeatureMatrix) {
    for (j, column) in matrix.values().axis_iter(Axis(1)).enumerate() {
        let first = column[0];
        if column.iter().all(|&x| x == first) {
            warn!(
                column = %matrix.columns()[j],
                "zero-variance column standardizes to all zeros"
            );
        }
    }
}

/// Standardize every column to zero mean and unit variance.
///
/// Uses the population standard deviation; a zero-variance column becomes all
/// zeros. The scaler is fitted on `matrix` itself and dropped on return, so
/// nothing carries over between calls.
///
/// # Errors
/// * `InsufficientData` when the matrix has no rows
/// * `NonFiniteValue` when a column contains NaN or infinity
/// * `Scaling` when the fit itself fails
pub fn standardize(matrix: &FeatureMatrix) -> Result<FeatureMatrix> {
    if matrix.nrows() == 0 {
        return Err(SegmentationError::InsufficientData { stage: "scaling" });
    }
    ensure_finite(matrix)?;
    warn_zero_variance(matrix);

    let values = matrix.values().to_owned();
    let scaler = LinearScaler::standard()
        .fit(&DatasetBase::from(values.clone()))
        .map_err(|e| SegmentationError::Scaling(e.to_string()))?;
    let scaled = scaler.transform(values);
    debug!(
        rows = scaled.nrows(),
        columns = scaled.ncols(),
        "standardized feature matrix"
    );
    FeatureMatrix::new(matrix.columns().to_vec(), scaled)
}
