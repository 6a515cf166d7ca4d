//! Verbosity-gated logging.
//!
//! Events go through `tracing`, so the host application decides where they
//! end up. [`Verbosity`] only filters what the scoring core emits.

use serde::{Deserialize, Serialize};

use crate::metrics::{ConfusionMatrix, ModelMetrics};
use crate::store::Key;

/// How much the scoring core reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Nothing.
    #[default]
    Silent,
    /// Adaptation warnings only.
    Warning,
    /// Warnings and a summary per scoring call.
    Info,
    /// Everything, including per-call chunk counts.
    Debug,
}

/// Logger for one scoring call.
#[derive(Debug, Clone, Copy)]
pub struct ScoreLogger {
    verbosity: Verbosity,
}

impl ScoreLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    #[inline]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    #[inline]
    fn enabled(&self, level: Verbosity) -> bool {
        self.verbosity >= level
    }

    /// Adapter warnings, one event each.
    pub fn warnings(&self, model: &Key, warnings: &[String]) {
        if !self.enabled(Verbosity::Warning) {
            return;
        }
        for warning in warnings {
            tracing::warn!(model = %model, "{warning}");
        }
    }

    pub fn chunks(&self, frame: &Key, n_chunks: usize, n_rows: usize) {
        if self.enabled(Verbosity::Debug) {
            tracing::debug!(frame = %frame, n_chunks, n_rows, "scoring chunks");
        }
    }

    /// One-line summary of a finished scoring call.
    pub fn scored(&self, metrics: &ModelMetrics, elapsed_ms: u128) {
        if !self.enabled(Verbosity::Info) {
            return;
        }
        tracing::info!(
            model = %metrics.model,
            frame = %metrics.frame,
            category = ?metrics.category,
            n_rows = metrics.n_rows,
            n_missing = metrics.n_missing,
            mse = metrics.mse,
            error_rate = metrics.error_rate(),
            elapsed_ms = elapsed_ms as u64,
            "scored frame"
        );
    }

    /// Confusion matrix counts at debug level. Matrices with more than
    /// `max_classes` classes are skipped. Returns whether an event was emitted.
    pub fn confusion(&self, model: &Key, confusion: &ConfusionMatrix, max_classes: usize) -> bool {
        if !self.enabled(Verbosity::Debug) || confusion.n_classes() > max_classes {
            return false;
        }
        tracing::debug!(
            model = %model,
            classes = ?confusion.domain.levels(),
            counts = ?confusion.counts.rows().into_iter().map(|r| r.to_vec()).collect::<Vec<_>>(),
            "confusion matrix"
        );
        true
    }

    pub fn cancelled(&self, job: &Key, frame: &Key) {
        if self.enabled(Verbosity::Warning) {
            tracing::warn!(job = %job, frame = %frame, "scoring cancelled, partial metrics discarded");
        }
    }
}
