//! Per-segment feature profiles

use crate::data::{missing_columns, parse_numeric};
use crate::error::{Result, SegmentationError};
use crate::features::FeatureSet;
use crate::segment::{segment_ids, SEGMENT_COLUMN};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// Aggregates for one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSummary {
    pub segment: u32,
    /// Number of rows carrying this segment id.
    pub size: usize,
    /// Mean of each feature, in profile feature order. `None` when no member
    /// has a numeric value for the feature.
    pub means: Vec<Option<f64>>,
}

/// One row per observed segment, ordered by ascending segment id.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentProfile {
    features: Vec<String>,
    rows: Vec<SegmentSummary>,
}

impl SegmentProfile {
    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn rows(&self) -> &[SegmentSummary] {
        &self.rows
    }

    pub fn segment(&self, segment: u32) -> Option<&SegmentSummary> {
        self.rows.iter().find(|row| row.segment == segment)
    }

    /// Mean of `feature` within `segment`.
    pub fn mean(&self, segment: u32, feature: &str) -> Option<f64> {
        let j = self.features.iter().position(|f| f == feature)?;
        self.segment(segment)?.means[j]
    }

    /// Copy of the profile with every mean rounded to `decimals` places.
    ///
    /// Presentation only; the aggregation itself never rounds. Precision past
    /// `f64::DIGITS` places is already at the limit of the type, so larger
    /// `decimals` behave like `f64::DIGITS`.
    pub fn round(&self, decimals: u32) -> SegmentProfile {
        let factor = 10f64.powi(decimals.min(f64::DIGITS) as i32);
        let rows = self
            .rows
            .iter()
            .map(|row| SegmentSummary {
                means: row
                    .means
                    .iter()
                    .map(|m| m.map(|v| round_to(v, factor)))
                    .collect(),
                ..row.clone()
            })
            .collect();
        SegmentProfile {
            features: self.features.clone(),
            rows,
        }
    }

    /// Table with a `segment` column followed by one column per feature.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.features.len() + 1);
        let segments: Vec<u32> = self.rows.iter().map(|row| row.segment).collect();
        columns.push(Series::new(SEGMENT_COLUMN, segments));

        for (j, feature) in self.features.iter().enumerate() {
            let means: Vec<Option<f64>> = self.rows.iter().map(|row| row.means[j]).collect();
            columns.push(Series::new(feature.as_str(), means));
        }

        Ok(DataFrame::new(columns)?)
    }
}

struct Accumulator {
    size: usize,
    sums: Vec<f64>,
    counts: Vec<usize>,
}

/// Mean of every feature within each segment present in `labeled`.
///
/// Rows with a missing segment id are ignored, as are missing or non-numeric
/// feature cells. Segment ids that never occur produce no row.
///
/// # Errors
/// * `MissingColumn` when the segment column or any feature is absent
pub fn segment_profile(labeled: &DataFrame, features: &FeatureSet) -> Result<SegmentProfile> {
    let missing = missing_columns(
        labeled,
        std::iter::once(SEGMENT_COLUMN).chain(features.iter()),
    );
    if !missing.is_empty() {
        return Err(SegmentationError::MissingColumn { columns: missing });
    }

    let ids = segment_ids(labeled)?;

    let mut columns = Vec::with_capacity(features.len());
    for name in features.iter() {
        let parsed = parse_numeric(labeled.column(name)?)?;
        let values: Vec<Option<f64>> = parsed
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        columns.push(values);
    }

    let mut groups: BTreeMap<u32, Accumulator> = BTreeMap::new();
    for (i, segment) in ids.iter().enumerate() {
        let Some(segment) = segment else { continue };
        let acc = groups.entry(*segment).or_insert_with(|| Accumulator {
            size: 0,
            sums: vec![0.0; features.len()],
            counts: vec![0; features.len()],
        });
        acc.size += 1;
        for (j, column) in columns.iter().enumerate() {
            if let Some(value) = column[i] {
                acc.sums[j] += value;
                acc.counts[j] += 1;
            }
        }
    }

    let rows: Vec<SegmentSummary> = groups
        .into_iter()
        .map(|(segment, acc)| SegmentSummary {
            segment,
            size: acc.size,
            means: acc
                .sums
                .iter()
                .zip(&acc.counts)
                .map(|(&sum, &count)| (count > 0).then(|| sum / count as f64))
                .collect(),
        })
        .collect();

    debug!(segments = rows.len(), features = features.len(), "built segment profile");
    Ok(SegmentProfile {
        features: features.names().to_vec(),
        rows,
    })
}

fn round_to(v: f64, factor: f64) -> f64 {
    let scaled = v * factor;
    if scaled.is_finite() {
        scaled.round() / factor
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled() -> DataFrame {
        df!(
            "customer_id" => &[1i64, 2, 3, 4, 5],
            "value_proxy" => &[Some(100.0), Some(300.0), None, Some(10.0), Some(20.0)],
            "avg_bags" => &[1.0, 2.0, 3.0, 0.0, 1.0],
            "segment" => &[2u32, 2, 2, 0, 0],
        )
        .unwrap()
    }

    fn features() -> FeatureSet {
        FeatureSet::new(["value_proxy", "avg_bags"]).unwrap()
    }

    #[test]
    fn test_means_per_segment_in_ascending_order() {
        let profile = segment_profile(&labeled(), &features()).unwrap();

        let ids: Vec<u32> = profile.rows().iter().map(|r| r.segment).collect();
        assert_eq!(ids, vec![0, 2]);
        assert_eq!(profile.mean(0, "value_proxy"), Some(15.0));
        assert_eq!(profile.mean(2, "value_proxy"), Some(200.0));
        assert_eq!(profile.mean(2, "avg_bags"), Some(2.0));
        assert_eq!(profile.segment(2).unwrap().size, 3);
    }

    #[test]
    fn test_unassigned_segment_has_no_row() {
        let profile = segment_profile(&labeled(), &features()).unwrap();
        assert!(profile.segment(1).is_none());
        assert_eq!(profile.rows().len(), 2);
    }

    #[test]
    fn test_missing_segment_column() {
        let table = labeled().drop("segment").unwrap();
        match segment_profile(&table, &features()) {
            Err(SegmentationError::MissingColumn { columns }) => {
                assert_eq!(columns, vec!["segment"])
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_missing_feature_column() {
        let features = FeatureSet::new(["value_proxy", "tenure_days"]).unwrap();
        match segment_profile(&labeled(), &features) {
            Err(SegmentationError::MissingColumn { columns }) => {
                assert_eq!(columns, vec!["tenure_days"])
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_round_is_a_separate_step() {
        let table = df!(
            "rate" => &[0.1, 0.2, 0.25],
            "segment" => &[0u32, 0, 0],
        )
        .unwrap();
        let features = FeatureSet::new(["rate"]).unwrap();
        let profile = segment_profile(&table, &features).unwrap();

        let raw = profile.mean(0, "rate").unwrap();
        assert!((raw - 0.55 / 3.0).abs() < 1e-12);

        let rounded = profile.round(2);
        assert_eq!(rounded.mean(0, "rate"), Some(0.18));
        assert_eq!(profile.mean(0, "rate"), Some(raw));
    }

    #[test]
    fn test_round_with_huge_decimals_keeps_means() {
        let table = df!(
            "rate" => &[0.1, 0.2, 0.25, f64::MAX / 2.0, f64::MAX / 2.0],
            "segment" => &[0u32, 0, 0, 1, 1],
        )
        .unwrap();
        let features = FeatureSet::new(["rate"]).unwrap();
        let profile = segment_profile(&table, &features).unwrap();
        let small = profile.mean(0, "rate").unwrap();
        let large = profile.mean(1, "rate").unwrap();

        for decimals in [16, 400, u32::MAX] {
            let rounded = profile.round(decimals);
            let v = rounded.mean(0, "rate").unwrap();
            assert!(v.is_finite());
            assert!((v - small).abs() < 1e-12);
            assert_eq!(rounded.mean(1, "rate"), Some(large));
        }
        assert_eq!(profile.round(2).mean(1, "rate"), Some(large));
    }

    #[test]
    fn test_all_missing_feature_mean_is_none() {
        let table = df!(
            "value_proxy" => &[None::<f64>, None],
            "segment" => &[1u32, 1],
        )
        .unwrap();
        let features = FeatureSet::new(["value_proxy"]).unwrap();
        let profile = segment_profile(&table, &features).unwrap();
        assert_eq!(profile.mean(1, "value_proxy"), None);
        assert_eq!(profile.segment(1).unwrap().size, 2);
    }

    #[test]
    fn test_to_dataframe_layout() {
        let profile = segment_profile(&labeled(), &features()).unwrap();
        let df = profile.to_dataframe().unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.get_column_names(), vec!["segment", "value_proxy", "avg_bags"]);
    }
}
