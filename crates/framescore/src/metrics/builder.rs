//! Mergeable metric accumulators.

use ndarray::Array2;

use super::confusion::{BinaryCounts, ConfusionMatrix, ThresholdCurve};
use super::report::{MetricContext, MetricDetail, ModelMetrics};
use crate::frame::Domain;
use crate::model::ModelCategory;

/// Default decision thresholds for binomial models: 0.00, 0.01, ..., 1.00.
pub fn default_thresholds() -> Vec<f32> {
    (0..=100).map(|i| i as f32 / 100.0).collect()
}

/// Single threshold used for multinomial models.
pub const MULTINOMIAL_THRESHOLD: f32 = 0.5;

/// Per-chunk accumulator of scoring statistics.
///
/// Built fresh for every chunk, fed row by row with [`update`](Self::update)
/// and combined with [`merge`](Self::merge). Counts add exactly, so merging
/// is associative and commutative. Float sums are combined in a fixed order
/// by [`reduce_pairwise`](Self::reduce_pairwise) to keep repeated runs
/// bit-identical.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricBuilder {
    category: ModelCategory,
    n_rows: u64,
    n_missing: u64,
    stats: Stats,
}

#[derive(Debug, Clone, PartialEq)]
enum Stats {
    Regression {
        sum_sq_err: f64,
        sum_abs_err: f64,
        sum_y: f64,
        sum_y2: f64,
    },
    Classification {
        domain: Domain,
        n_classes: usize,
        confusion: Array2<u64>,
        sum_sq_err: f64,
        thresholds: Vec<f32>,
        /// `[n_thresholds, 4]` as (tp, fp, tn, fn). Binomial only.
        binary: Option<Array2<u64>>,
    },
    Unlabeled,
}

impl MetricBuilder {
    /// Accumulator for a regression model.
    pub fn regression() -> Self {
        Self {
            category: ModelCategory::Regression,
            n_rows: 0,
            n_missing: 0,
            stats: Stats::Regression {
                sum_sq_err: 0.0,
                sum_abs_err: 0.0,
                sum_y: 0.0,
                sum_y2: 0.0,
            },
        }
    }

    /// Accumulator for a classifier with `n_classes` training classes.
    ///
    /// `domain` is the prediction domain: the training classes followed by
    /// classes only present in the scored data. Per-threshold counts are
    /// kept when `n_classes == 2`.
    pub fn classification(domain: Domain, n_classes: usize, thresholds: Vec<f32>) -> Self {
        let n = domain.len().max(n_classes);
        let binary = (n_classes == 2).then(|| Array2::zeros((thresholds.len(), 4)));
        let category = if n_classes > 2 {
            ModelCategory::Multinomial
        } else {
            ModelCategory::Binomial
        };
        Self {
            category,
            n_rows: 0,
            n_missing: 0,
            stats: Stats::Classification {
                domain,
                n_classes,
                confusion: Array2::zeros((n, n)),
                sum_sq_err: 0.0,
                thresholds,
                binary,
            },
        }
    }

    /// Accumulator that only counts rows, for models without a label.
    pub fn unlabeled(category: ModelCategory) -> Self {
        Self {
            category,
            n_rows: 0,
            n_missing: 0,
            stats: Stats::Unlabeled,
        }
    }

    #[inline]
    pub fn category(&self) -> ModelCategory {
        self.category
    }

    /// Rows that contributed to the statistics.
    #[inline]
    pub fn n_rows(&self) -> u64 {
        self.n_rows
    }

    /// Rows skipped because the label or prediction was missing.
    #[inline]
    pub fn n_missing(&self) -> u64 {
        self.n_missing
    }

    /// Account for one row.
    ///
    /// `preds[0]` is the predicted value or class code; for classifiers
    /// `preds[1 + c]` is the probability of training class `c`. `actual` is
    /// the label (a class code for classifiers), NaN when missing.
    pub fn update(&mut self, preds: &[f32], actual: f64) {
        match &mut self.stats {
            Stats::Unlabeled => {
                self.n_rows += 1;
            }
            Stats::Regression {
                sum_sq_err,
                sum_abs_err,
                sum_y,
                sum_y2,
            } => {
                let predicted = preds.first().map_or(f64::NAN, |&p| f64::from(p));
                if actual.is_nan() || predicted.is_nan() {
                    self.n_missing += 1;
                    return;
                }
                let err = predicted - actual;
                *sum_sq_err += err * err;
                *sum_abs_err += err.abs();
                *sum_y += actual;
                *sum_y2 += actual * actual;
                self.n_rows += 1;
            }
            Stats::Classification {
                n_classes,
                confusion,
                sum_sq_err,
                thresholds,
                binary,
                ..
            } => {
                let n = confusion.nrows();
                let predicted = preds.first().map_or(f32::NAN, |&p| p);
                let (Some(a), Some(p)) = (class_code(actual, n), class_code(f64::from(predicted), n))
                else {
                    self.n_missing += 1;
                    return;
                };
                confusion[[a, p]] += 1;

                let err = if a < *n_classes {
                    1.0 - preds.get(1 + a).map_or(0.0, |&q| f64::from(q))
                } else {
                    1.0
                };
                *sum_sq_err += err * err;

                if let (Some(counts), true) = (binary.as_mut(), a < 2) {
                    let prob = preds.get(2).copied().unwrap_or(f32::NAN);
                    for (i, &t) in thresholds.iter().enumerate() {
                        let slot = match (prob >= t, a == 1) {
                            (true, true) => 0,
                            (true, false) => 1,
                            (false, false) => 2,
                            (false, true) => 3,
                        };
                        counts[[i, slot]] += 1;
                    }
                }
                self.n_rows += 1;
            }
        }
    }

    /// Add another accumulator's statistics into this one.
    ///
    /// # Panics
    ///
    /// Panics if the accumulators were built for different shapes.
    pub fn merge(&mut self, other: &Self) {
        self.n_rows += other.n_rows;
        self.n_missing += other.n_missing;
        match (&mut self.stats, &other.stats) {
            (Stats::Unlabeled, Stats::Unlabeled) => {}
            (
                Stats::Regression {
                    sum_sq_err,
                    sum_abs_err,
                    sum_y,
                    sum_y2,
                },
                Stats::Regression {
                    sum_sq_err: o_sq,
                    sum_abs_err: o_abs,
                    sum_y: o_y,
                    sum_y2: o_y2,
                },
            ) => {
                *sum_sq_err += o_sq;
                *sum_abs_err += o_abs;
                *sum_y += o_y;
                *sum_y2 += o_y2;
            }
            (
                Stats::Classification {
                    confusion,
                    sum_sq_err,
                    binary,
                    ..
                },
                Stats::Classification {
                    confusion: o_confusion,
                    sum_sq_err: o_sq,
                    binary: o_binary,
                    ..
                },
            ) => {
                *confusion += o_confusion;
                *sum_sq_err += o_sq;
                if let (Some(counts), Some(o_counts)) = (binary.as_mut(), o_binary.as_ref()) {
                    *counts += o_counts;
                }
            }
            _ => panic!("cannot merge metric builders of different kinds"),
        }
    }

    /// Merge accumulators as a balanced pairwise tree in input order.
    ///
    /// Returns `None` for an empty input.
    pub fn reduce_pairwise(mut parts: Vec<Self>) -> Option<Self> {
        while parts.len() > 1 {
            let mut next = Vec::with_capacity(parts.len().div_ceil(2));
            let mut iter = parts.into_iter();
            while let Some(mut left) = iter.next() {
                if let Some(right) = iter.next() {
                    left.merge(&right);
                }
                next.push(left);
            }
            parts = next;
        }
        parts.pop()
    }

    /// Derive the final metrics. Does not modify the accumulator.
    pub fn finalize(&self, context: MetricContext) -> ModelMetrics {
        let n = self.n_rows as f64;
        let (mse, detail) = match &self.stats {
            Stats::Unlabeled => (f64::NAN, MetricDetail::Unlabeled),
            Stats::Regression {
                sum_sq_err,
                sum_abs_err,
                sum_y,
                sum_y2,
            } => {
                if self.n_rows == 0 {
                    (
                        f64::NAN,
                        MetricDetail::Regression {
                            mae: f64::NAN,
                            r2: f64::NAN,
                        },
                    )
                } else {
                    let total = sum_y2 - sum_y * sum_y / n;
                    let r2 = if total > 0.0 {
                        1.0 - sum_sq_err / total
                    } else {
                        f64::NAN
                    };
                    (
                        sum_sq_err / n,
                        MetricDetail::Regression {
                            mae: sum_abs_err / n,
                            r2,
                        },
                    )
                }
            }
            Stats::Classification {
                domain,
                confusion,
                sum_sq_err,
                thresholds,
                binary,
                ..
            } => {
                let mse = if self.n_rows == 0 {
                    f64::NAN
                } else {
                    sum_sq_err / n
                };
                let curve = binary.as_ref().map(|counts| ThresholdCurve {
                    thresholds: thresholds.clone(),
                    counts: counts
                        .rows()
                        .into_iter()
                        .map(|r| BinaryCounts {
                            tp: r[0],
                            fp: r[1],
                            tn: r[2],
                            fn_: r[3],
                        })
                        .collect(),
                });
                (
                    mse,
                    MetricDetail::Classification {
                        confusion: ConfusionMatrix {
                            domain: domain.clone(),
                            counts: confusion.clone(),
                        },
                        thresholds: curve,
                    },
                )
            }
        };

        ModelMetrics {
            key: context.key,
            model: context.model,
            frame: context.frame,
            model_checksum: context.model_checksum,
            frame_checksum: context.frame_checksum,
            category: self.category,
            n_rows: self.n_rows,
            n_missing: self.n_missing,
            mse,
            detail,
        }
    }
}

/// Class index of a code, if it is a valid index below `n`.
#[inline]
fn class_code(code: f64, n: usize) -> Option<usize> {
    if code.is_nan() || code < 0.0 {
        return None;
    }
    let c = code as usize;
    (c < n).then_some(c)
}
