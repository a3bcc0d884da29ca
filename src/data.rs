//! Record loading and cluster matrix construction using Polars

use crate::error::{Result, SegmentationError};
use crate::features::{CleaningPolicy, ColumnTreatment, FeatureSet};
use ndarray::{Array2, ArrayView1, ArrayView2};
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, warn};

/// Numeric feature matrix, row-aligned with the record table it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    values: Array2<f64>,
}

impl FeatureMatrix {
    /// Pair column names with a `(rows, columns)` array.
    pub fn new(columns: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if columns.len() != values.ncols() {
            return Err(SegmentationError::invalid(
                "columns",
                format!(
                    "{} column names for a matrix with {} columns",
                    columns.len(),
                    values.ncols()
                ),
            ));
        }
        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Values of a named column.
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|j| self.values.column(j))
    }
}

/// Load a CSV file with a header row into a record table.
pub fn load_records(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "loaded record table"
    );
    Ok(df)
}

/// Write a table to CSV with a header row.
pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let mut file = std::fs::File::create(path.as_ref())?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

/// Names from `features` that `table` does not have, in feature order.
pub(crate) fn missing_columns<'a>(
    table: &DataFrame,
    features: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    features
        .into_iter()
        .filter(|name| table.get_column_index(name).is_none())
        .map(str::to_string)
        .collect()
}

/// Attempt a numeric parse of every cell; cells that fail to parse become missing.
pub fn parse_numeric(series: &Series) -> Result<Float64Chunked> {
    let parsed = series.cast(&DataType::Float64)?;
    Ok(parsed.f64()?.clone())
}

/// Replace missing (and `NaN`) cells with `fill`.
pub fn substitute_missing(values: &Float64Chunked, fill: f64) -> Vec<f64> {
    values
        .into_iter()
        .map(|v| match v {
            Some(x) if !x.is_nan() => x,
            _ => fill,
        })
        .collect()
}

/// Clip every value into the closed unit interval.
pub fn clip_unit(values: &mut [f64]) {
    for v in values.iter_mut() {
        *v = v.clamp(0.0, 1.0);
    }
}

/// Reject cells that were present before the numeric parse but missing after.
///
/// Only rate columns tolerate unparseable text; everywhere else it is an error.
fn ensure_numeric(series: &Series, parsed: &Float64Chunked) -> Result<()> {
    if parsed.null_count() > series.null_count() {
        return Err(SegmentationError::NonNumericValue {
            column: series.name().to_string(),
        });
    }
    Ok(())
}

fn clean_column(series: &Series, treatment: ColumnTreatment) -> Result<Vec<f64>> {
    let parsed = parse_numeric(series)?;
    let values = match treatment {
        ColumnTreatment::Magnitude => {
            ensure_numeric(series, &parsed)?;
            substitute_missing(&parsed, 0.0)
        }
        ColumnTreatment::Rate => {
            let mut values = substitute_missing(&parsed, 0.0);
            clip_unit(&mut values);
            values
        }
        ColumnTreatment::PassThrough => {
            ensure_numeric(series, &parsed)?;
            if parsed.null_count() > 0 {
                warn!(
                    column = series.name(),
                    missing = parsed.null_count(),
                    "pass-through feature has missing values; they stay NaN"
                );
            }
            parsed
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect()
        }
    };
    Ok(values)
}

/// Select and clean the feature columns of a record table.
///
/// The table itself is never modified. The returned matrix has exactly the
/// requested features as columns, in the requested order, with one row per
/// table row.
///
/// # Errors
/// * `MissingColumn` listing every feature the table lacks
/// * `NonNumericValue` when a magnitude or pass-through column holds text that
///   does not parse as a number
pub fn build_cluster_matrix(
    table: &DataFrame,
    features: &FeatureSet,
    policy: &CleaningPolicy,
) -> Result<FeatureMatrix> {
    let missing = missing_columns(table, features.iter());
    if !missing.is_empty() {
        return Err(SegmentationError::MissingColumn { columns: missing });
    }

    let n_rows = table.height();
    let mut cleaned = Vec::with_capacity(features.len());
    for name in features.iter() {
        let series = table.column(name)?;
        cleaned.push(clean_column(series, policy.treatment(name))?);
    }

    let values = Array2::from_shape_fn((n_rows, features.len()), |(i, j)| cleaned[j][i]);
    debug!(rows = n_rows, features = features.len(), "built cluster matrix");

    FeatureMatrix::new(features.names().to_vec(), values)
}
