//! Finalized metrics.

use serde::{Deserialize, Serialize};

use super::confusion::{ConfusionMatrix, ThresholdCurve};
use crate::model::ModelCategory;
use crate::store::Key;

/// Identity of one scoring run, attached to finalized metrics.
#[derive(Debug, Clone)]
pub struct MetricContext {
    pub key: Key,
    pub model: Key,
    pub frame: Key,
    pub model_checksum: u64,
    pub frame_checksum: u64,
}

/// Metrics of one model on one frame.
///
/// Stored in the [`Store`](crate::store::Store) under `key`. The model's
/// output refers to it by key only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub key: Key,
    pub model: Key,
    pub frame: Key,
    pub model_checksum: u64,
    pub frame_checksum: u64,
    pub category: ModelCategory,
    /// Rows that contributed to the statistics.
    pub n_rows: u64,
    /// Rows skipped for a missing label or prediction.
    pub n_missing: u64,
    /// Mean squared error. For classifiers, of the probability assigned to
    /// the actual class.
    pub mse: f64,
    pub detail: MetricDetail,
}

/// Category-specific part of [`ModelMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetricDetail {
    Regression {
        mae: f64,
        r2: f64,
    },
    Classification {
        confusion: ConfusionMatrix,
        /// Per-threshold counts, binomial models only.
        thresholds: Option<ThresholdCurve>,
    },
    Unlabeled,
}

impl ModelMetrics {
    /// Confusion matrix, for classifiers.
    pub fn confusion(&self) -> Option<&ConfusionMatrix> {
        match &self.detail {
            MetricDetail::Classification { confusion, .. } => Some(confusion),
            _ => None,
        }
    }

    /// Per-threshold binary counts, for binomial classifiers.
    pub fn threshold_curve(&self) -> Option<&ThresholdCurve> {
        match &self.detail {
            MetricDetail::Classification { thresholds, .. } => thresholds.as_ref(),
            _ => None,
        }
    }

    /// Classification error rate, NaN for other categories.
    pub fn error_rate(&self) -> f64 {
        self.confusion().map_or(f64::NAN, ConfusionMatrix::error_rate)
    }

    /// Whether these metrics still describe the given model and frame.
    pub fn is_current(&self, model_checksum: u64, frame_checksum: u64) -> bool {
        self.model_checksum == model_checksum && self.frame_checksum == frame_checksum
    }
}
