use ndarray::Array2;
use polars::prelude::*;
use proptest::prelude::*;
use segmentforge::{
    build_cluster_matrix, segment_ids, standardize, CleaningPolicy, ClusteringStrategy,
    FeatureMatrix, FeatureSet, KMeans, SegmentationConfig, SegmentationPipeline,
};

fn rate_table(rates: &[Option<f64>], discounts: &[Option<f64>]) -> DataFrame {
    df!(
        "true_cancellation_rate" => rates,
        "discount_sensitivity" => discounts,
    )
    .unwrap()
}

proptest! {
    #[test]
    fn prop_rates_are_clipped(
        pairs in prop::collection::vec(
            (prop::option::of(-5.0f64..5.0), prop::option::of(-5.0f64..5.0)),
            1..30,
        )
    ) {
        let rates: Vec<Option<f64>> = pairs.iter().map(|p| p.0).collect();
        let discounts: Vec<Option<f64>> = pairs.iter().map(|p| p.1).collect();
        let table = rate_table(&rates, &discounts);
        let features = FeatureSet::new(["true_cancellation_rate", "discount_sensitivity"]).unwrap();

        let cleaned = build_cluster_matrix(&table, &features, &CleaningPolicy::default()).unwrap();

        prop_assert_eq!(cleaned.nrows(), pairs.len());
        prop_assert!(cleaned.values().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn prop_kmeans_all_assigned(
        data in prop::collection::vec(prop::collection::vec(-10.0f64..10.0, 2), 1..20),
        k in 1usize..5,
        seed in any::<u64>(),
    ) {
        // Skip if k > n
        if k <= data.len() {
            let flat: Vec<f64> = data.iter().flatten().copied().collect();
            let matrix = Array2::from_shape_vec((data.len(), 2), flat).unwrap();
            let model = KMeans::new().with_n_init(3);

            let labels = model.fit(matrix.view(), k, seed).unwrap();
            prop_assert_eq!(labels.len(), data.len());
            prop_assert!(labels.iter().all(|&l| l < k));

            let again = model.fit(matrix.view(), k, seed).unwrap();
            prop_assert_eq!(labels, again);
        }
    }

    #[test]
    fn prop_standardize_is_finite(
        data in prop::collection::vec(prop::collection::vec(-1e3f64..1e3, 3), 1..25),
    ) {
        let flat: Vec<f64> = data.iter().flatten().copied().collect();
        let values = Array2::from_shape_vec((data.len(), 3), flat).unwrap();
        let matrix = FeatureMatrix::new(vec!["a".into(), "b".into(), "c".into()], values).unwrap();

        let scaled = standardize(&matrix).unwrap();
        prop_assert_eq!(scaled.values().dim(), (data.len(), 3));
        prop_assert!(scaled.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn prop_pipeline_preserves_rows(
        rows in prop::collection::vec((0.0f64..2000.0, prop::option::of(0.0f64..5000.0)), 3..25),
        k in 1usize..4,
    ) {
        let tenure: Vec<f64> = rows.iter().map(|r| r.0).collect();
        let value: Vec<Option<f64>> = rows.iter().map(|r| r.1).collect();
        let table = df!("tenure_days" => &tenure, "value_proxy" => &value).unwrap();

        let config = SegmentationConfig::default()
            .with_features(FeatureSet::new(["tenure_days", "value_proxy"]).unwrap())
            .with_k(k)
            .with_n_init(2);
        let output = SegmentationPipeline::new(config).unwrap().run(&table).unwrap();

        prop_assert_eq!(output.labeled.height(), rows.len());
        let ids = segment_ids(&output.labeled).unwrap();
        prop_assert!(ids.iter().all(|id| matches!(id, Some(s) if (*s as usize) < k)));
        prop_assert!(output.profile.rows().iter().all(|r| r.size > 0));
    }
}
