//! Property-based tests for metric accumulation.
//!
//! Counts must not depend on how rows are split into chunks or how chunk
//! accumulators are grouped when merged.

use approx::assert_relative_eq;
use proptest::collection::vec as prop_vec;
use proptest::prelude::*;

use framescore::metrics::{default_thresholds, MetricBuilder, MetricContext, ModelMetrics};
use framescore::testing::{binary_frame, binary_model};
use framescore::{Domain, Job, Key, MemStore, ScoreConfig};

// =============================================================================
// Strategies
// =============================================================================

/// A binomial row: predicted class, probability of class 1, label (maybe missing).
fn arb_row() -> impl Strategy<Value = (u8, f32, Option<u8>)> {
    (0u8..2, 0.0f32..=1.0, prop::option::weighted(0.9, 0u8..2))
}

fn context() -> MetricContext {
    MetricContext {
        key: Key::new("metrics"),
        model: Key::new("model"),
        frame: Key::new("frame"),
        model_checksum: 0,
        frame_checksum: 0,
    }
}

fn template() -> MetricBuilder {
    MetricBuilder::classification(Domain::new(["no", "yes"]), 2, default_thresholds())
}

fn feed(builder: &mut MetricBuilder, rows: &[(u8, f32, Option<u8>)]) {
    for &(class, p1, label) in rows {
        let preds = [f32::from(class), 1.0 - p1, p1];
        builder.update(&preds, label.map_or(f64::NAN, f64::from));
    }
}

fn sequential(rows: &[(u8, f32, Option<u8>)]) -> ModelMetrics {
    let mut builder = template();
    feed(&mut builder, rows);
    builder.finalize(context())
}

fn assert_same_counts(a: &ModelMetrics, b: &ModelMetrics) {
    assert_eq!(a.n_rows, b.n_rows);
    assert_eq!(a.n_missing, b.n_missing);
    assert_eq!(a.confusion(), b.confusion());
    assert!(a.threshold_curve().is_some());
    assert_eq!(a.threshold_curve(), b.threshold_curve());
    if a.n_rows > 0 {
        assert_relative_eq!(a.mse, b.mse, epsilon = 1e-9);
    }
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn chunking_does_not_change_counts(
        rows in prop_vec(arb_row(), 0..300),
        chunk in 1usize..64,
    ) {
        let expected = sequential(&rows);

        let parts: Vec<MetricBuilder> = rows
            .chunks(chunk)
            .map(|part| {
                let mut builder = template();
                feed(&mut builder, part);
                builder
            })
            .collect();
        let merged = MetricBuilder::reduce_pairwise(parts).unwrap_or_else(template);

        assert_same_counts(&merged.finalize(context()), &expected);
    }

    #[test]
    fn merge_order_does_not_change_counts(
        rows in prop_vec(arb_row(), 1..200),
        cut in 0usize..200,
    ) {
        let cut = cut.min(rows.len());
        let (left_rows, right_rows) = rows.split_at(cut);
        let mut left = template();
        feed(&mut left, left_rows);
        let mut right = template();
        feed(&mut right, right_rows);

        let mut lr = left.clone();
        lr.merge(&right);
        let mut rl = right;
        rl.merge(&left);

        let lr = lr.finalize(context());
        let rl = rl.finalize(context());
        assert_same_counts(&lr, &rl);
        prop_assert_eq!(lr.n_rows + lr.n_missing, rows.len() as u64);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn scoring_counts_ignore_chunk_size(chunk_rows in 1usize..200, n_threads in 1usize..4) {
        let reference_store = MemStore::new();
        let reference_model = binary_model(&reference_store, 100).unwrap();
        let test = binary_frame("binary_test", 257).unwrap();
        let config = ScoreConfig::builder().n_threads(n_threads).build().unwrap();
        let reference = reference_model
            .score(&test, &Job::start("reference"), &reference_store, &config)
            .unwrap();

        let store = MemStore::with_chunk_rows(chunk_rows);
        let model = binary_model(&store, 100).unwrap();
        let scored = model
            .score(&test, &Job::start("chunked"), &store, &config)
            .unwrap();

        assert_same_counts(&scored.metrics, &reference.metrics);
        prop_assert_eq!(scored.predictions.n_rows(), 257);
    }
}
