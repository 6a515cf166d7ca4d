//! framescore: schema adaptation and parallel scoring for tabular models.
//!
//! A trained model remembers the column names and categorical domains it was
//! trained on. Before a new frame can be scored it is reshaped to that
//! schema: columns reordered, missing ones synthesized, categorical codes
//! remapped onto the training levels. Scoring then runs a parallel map over
//! row chunks and a deterministic reduce into metrics.
//!
//! # Key Types
//!
//! - [`Frame`] / [`Column`] / [`Domain`] - Columnar data
//! - [`Store`] / [`MemStore`] - Storage, column lifetimes and read locks
//! - [`Model`] / [`Parameters`] / [`ModelOutput`] - Trained models and their schema
//! - [`ScoreConfig`] / [`PointPredictor`] - Scoring
//! - [`ModelMetrics`] - Finalized evaluation metrics
//!
//! # Adaptation
//!
//! See [`adapt::adapt_test_for_train`] for the rules applied per column.
//!
//! # Scoring
//!
//! Build a model with [`Model::new`], then call [`Model::score`]. See the
//! [`scoring`] module for the pipeline.

pub mod adapt;
pub mod error;
pub mod frame;
pub mod logger;
pub mod metrics;
pub mod model;
pub mod scoring;
pub mod store;
pub mod testing;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// Errors
pub use error::{ConfigError, Result, ScoreError};

// Data and storage
pub use frame::{Column, Domain, Frame};
pub use store::{Key, MemStore, Store};

// Models and scoring
pub use metrics::{ConfusionMatrix, ModelMetrics, ThresholdCurve};
pub use model::{Job, JobState, Model, ModelCategory, ModelOutput, Parameters, TrainingSetup};
pub use scoring::{PointPredictor, ScoreConfig, Scored};

// Logging
pub use logger::{ScoreLogger, Verbosity};

// Shared utilities
pub use utils::{Parallelism, run_with_threads};
