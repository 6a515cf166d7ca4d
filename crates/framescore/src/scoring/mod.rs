//! Scoring engine.
//!
//! Scores a frame with any model family through the [`PointPredictor`]
//! contract: adaptation, a parallel map over row chunks, a pairwise reduce of
//! the chunk metrics, and assembly of the prediction frame.
//!
//! # Key Types
//!
//! - [`PointPredictor`]: Per-row prediction supplied by a model family
//! - [`ScoreConfig`]: Threads, verbosity and binary thresholds
//! - [`Scored`]: Prediction frame, metrics and warnings of one call

mod config;
mod engine;
mod predict;

pub use config::ScoreConfig;
pub use engine::{score, Scored, PREDICT_COLUMN};
pub use predict::{arg_max, PointPredictor};
