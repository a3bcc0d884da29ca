//! Attaching segment labels to a record table

use crate::data::FeatureMatrix;
use crate::error::{Result, SegmentationError};
use crate::model::ClusteringStrategy;
use crate::scaler::ensure_finite;
use polars::prelude::*;
use tracing::debug;

/// Name of the integer column holding the segment id.
pub const SEGMENT_COLUMN: &str = "segment";

/// Cluster `scaled` into `k` segments and return a copy of `table` with a
/// `segment` column appended.
///
/// `scaled` must be row-aligned with `table`. Row order is preserved and the
/// caller's table is left untouched. An existing `segment` column is replaced.
///
/// # Errors
/// * `InsufficientData` for an empty matrix
/// * `DimensionMismatch` when matrix and table row counts differ
/// * `InvalidParameter` unless `1 <= k <= rows`
/// * `NonFiniteValue` when the matrix holds NaN or infinity
/// * `Clustering` when the strategy returns malformed labels
pub fn assign_segments(
    table: &DataFrame,
    scaled: &FeatureMatrix,
    k: usize,
    strategy: &dyn ClusteringStrategy,
    seed: u64,
) -> Result<DataFrame> {
    let n_rows = scaled.nrows();
    if n_rows == 0 {
        return Err(SegmentationError::InsufficientData { stage: "clustering" });
    }
    if n_rows != table.height() {
        return Err(SegmentationError::DimensionMismatch {
            expected: table.height(),
            found: n_rows,
        });
    }
    if k == 0 || k > n_rows {
        return Err(SegmentationError::invalid(
            "k",
            format!("must be between 1 and the row count ({n_rows}), got {k}"),
        ));
    }
    ensure_finite(scaled)?;

    let labels = strategy.fit(scaled.view(), k, seed)?;
    if labels.len() != n_rows {
        return Err(SegmentationError::Clustering(format!(
            "{} returned {} labels for {n_rows} rows",
            strategy.name(),
            labels.len()
        )));
    }
    if let Some(&bad) = labels.iter().find(|&&l| l >= k) {
        return Err(SegmentationError::Clustering(format!(
            "{} returned label {bad} outside [0, {k})",
            strategy.name()
        )));
    }

    let segment: Vec<u32> = labels.iter().map(|&l| l as u32).collect();
    let mut labeled = table.clone();
    labeled.with_column(Series::new(SEGMENT_COLUMN, segment))?;

    debug!(
        strategy = strategy.name(),
        rows = n_rows,
        k,
        "attached segment labels"
    );
    Ok(labeled)
}

/// Segment id of every row of a labeled table; `None` where the id is missing.
///
/// # Errors
/// * `MissingColumn` when the table has no segment column
pub fn segment_ids(labeled: &DataFrame) -> Result<Vec<Option<u32>>> {
    if labeled.get_column_index(SEGMENT_COLUMN).is_none() {
        return Err(SegmentationError::missing([SEGMENT_COLUMN]));
    }
    let ids = labeled.column(SEGMENT_COLUMN)?.cast(&DataType::UInt32)?;
    let ids = ids.u32()?.into_iter().collect();
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::KMeans;
    use ndarray::{array, Array2};

    struct FixedLabels(Vec<usize>);

    impl ClusteringStrategy for FixedLabels {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn fit(&self, _data: ndarray::ArrayView2<'_, f64>, _k: usize, _seed: u64) -> Result<Vec<usize>> {
            Ok(self.0.clone())
        }
    }

    fn table() -> DataFrame {
        df!(
            "customer_id" => &[10i64, 20, 30, 40],
            "note" => &["a", "b", "c", "d"],
        )
        .unwrap()
    }

    fn scaled() -> FeatureMatrix {
        FeatureMatrix::new(
            vec!["x".into(), "y".into()],
            array![[-1.0, -1.0], [-0.9, -1.1], [1.0, 1.0], [1.1, 0.9]],
        )
        .unwrap()
    }

    #[test]
    fn test_appends_segment_column_and_keeps_rows() {
        let table = table();
        let labeled = assign_segments(&table, &scaled(), 2, &KMeans::new(), 42).unwrap();

        assert_eq!(labeled.height(), 4);
        assert_eq!(labeled.width(), 3);
        assert_eq!(table.width(), 2);
        assert!(labeled.column("customer_id").unwrap().equals(table.column("customer_id").unwrap()));

        let segment: Vec<u32> = segment_ids(&labeled).unwrap().into_iter().flatten().collect();
        assert_eq!(segment[0], segment[1]);
        assert_eq!(segment[2], segment[3]);
        assert_ne!(segment[0], segment[2]);
    }

    #[test]
    fn test_k_larger_than_rows() {
        let table = df!("id" => &[1i64, 2]).unwrap();
        let matrix = FeatureMatrix::new(vec!["x".into()], array![[0.0], [1.0]]).unwrap();

        assert!(matches!(
            assign_segments(&table, &matrix, 3, &KMeans::new(), 42),
            Err(SegmentationError::InvalidParameter { name: "k", .. })
        ));
    }

    #[test]
    fn test_zero_rows() {
        let table = df!("id" => Vec::<i64>::new()).unwrap();
        let matrix = FeatureMatrix::new(vec!["x".into()], Array2::zeros((0, 1))).unwrap();

        assert!(matches!(
            assign_segments(&table, &matrix, 1, &KMeans::new(), 42),
            Err(SegmentationError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_row_mismatch() {
        let table = df!("id" => &[1i64, 2, 3]).unwrap();
        assert!(matches!(
            assign_segments(&table, &scaled(), 2, &KMeans::new(), 42),
            Err(SegmentationError::DimensionMismatch { expected: 3, found: 4 })
        ));
    }

    #[test]
    fn test_rejects_malformed_strategy_output() {
        let short = FixedLabels(vec![0, 1]);
        assert!(matches!(
            assign_segments(&table(), &scaled(), 2, &short, 42),
            Err(SegmentationError::Clustering(_))
        ));

        let out_of_range = FixedLabels(vec![0, 1, 2, 1]);
        assert!(matches!(
            assign_segments(&table(), &scaled(), 2, &out_of_range, 42),
            Err(SegmentationError::Clustering(_))
        ));
    }

    #[test]
    fn test_uses_strategy_labels_verbatim() {
        let strategy = FixedLabels(vec![1, 0, 1, 0]);
        let labeled = assign_segments(&table(), &scaled(), 2, &strategy, 42).unwrap();

        let segment: Vec<u32> = segment_ids(&labeled).unwrap().into_iter().flatten().collect();
        assert_eq!(segment, vec![1, 0, 1, 0]);
    }

    #[test]
    fn test_segment_ids_requires_column() {
        assert!(matches!(
            segment_ids(&table()),
            Err(SegmentationError::MissingColumn { .. })
        ));
    }
}
