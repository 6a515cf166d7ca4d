//! Confusion matrices and binary threshold curves.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::frame::Domain;

// =============================================================================
// ConfusionMatrix
// =============================================================================

/// Square matrix of `(actual, predicted)` counts over a class domain.
///
/// Rows are actual classes, columns are predicted classes. The domain is the
/// training classes followed by any classes only seen while scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub domain: Domain,
    pub counts: Array2<u64>,
}

impl ConfusionMatrix {
    #[inline]
    pub fn n_classes(&self) -> usize {
        self.counts.nrows()
    }

    /// Number of counted rows.
    pub fn total(&self) -> u64 {
        self.counts.sum()
    }

    /// Fraction of rows off the diagonal. NaN when empty.
    pub fn error_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return f64::NAN;
        }
        let correct: u64 = self.counts.diag().sum();
        (total - correct) as f64 / total as f64
    }

    /// Per-class error: for each actual class, the fraction predicted as
    /// something else. NaN for classes that never occur.
    pub fn class_errors(&self) -> Vec<f64> {
        self.counts
            .rows()
            .into_iter()
            .enumerate()
            .map(|(c, row)| {
                let n = row.sum();
                if n == 0 {
                    f64::NAN
                } else {
                    (n - row[c]) as f64 / n as f64
                }
            })
            .collect()
    }
}

// =============================================================================
// ThresholdCurve
// =============================================================================

/// Binary outcome counts at one decision threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryCounts {
    pub tp: u64,
    pub fp: u64,
    pub tn: u64,
    pub fn_: u64,
}

impl BinaryCounts {
    pub fn total(&self) -> u64 {
        self.tp + self.fp + self.tn + self.fn_
    }

    /// Fraction of correct decisions. NaN when empty.
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            f64::NAN
        } else {
            (self.tp + self.tn) as f64 / total as f64
        }
    }
}

/// Binary counts for each threshold of a threshold list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdCurve {
    pub thresholds: Vec<f32>,
    pub counts: Vec<BinaryCounts>,
}

impl ThresholdCurve {
    /// Threshold with the highest accuracy. Ties go to the lowest threshold.
    pub fn best_threshold(&self) -> Option<f32> {
        let mut best: Option<(f32, f64)> = None;
        for (&t, counts) in self.thresholds.iter().zip(&self.counts) {
            let acc = counts.accuracy();
            if acc.is_nan() {
                continue;
            }
            if best.map_or(true, |(_, b)| acc > b) {
                best = Some((t, acc));
            }
        }
        best.map(|(t, _)| t)
    }
}
