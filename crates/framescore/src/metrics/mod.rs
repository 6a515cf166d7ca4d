//! Evaluation metrics.
//!
//! Scoring accumulates statistics per chunk in a [`MetricBuilder`], merges
//! the chunk accumulators and finalizes the result into [`ModelMetrics`].
//!
//! # Key Types
//!
//! - [`MetricBuilder`]: Mergeable per-chunk accumulator
//! - [`ModelMetrics`]: Finalized, serializable metrics
//! - [`ConfusionMatrix`] / [`ThresholdCurve`]: Classification details

mod builder;
mod confusion;
mod report;

pub use builder::{default_thresholds, MetricBuilder, MULTINOMIAL_THRESHOLD};
pub use confusion::{BinaryCounts, ConfusionMatrix, ThresholdCurve};
pub use report::{MetricContext, MetricDetail, ModelMetrics};
