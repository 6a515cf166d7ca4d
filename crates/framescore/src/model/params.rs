//! Training parameters.
//!
//! [`Parameters`] names the frames a model is built from and the settings
//! every model family shares. It is built with `bon` and validated on
//! `build()`.
//!
//! # Example
//!
//! ```
//! use framescore::model::Parameters;
//!
//! let params = Parameters::builder()
//!     .train("train.csv")
//!     .valid("valid.csv")
//!     .ignored_columns(vec!["id".to_string()])
//!     .build()
//!     .unwrap();
//! assert_eq!(params.max_confusion_matrix_size, 20);
//! ```

use bon::Builder;

use crate::error::{ConfigError, Result, ScoreError};
use crate::frame::Frame;
use crate::store::{Key, ReadLocks, Store};
use crate::utils::{combine_checksums, hash_strings};

/// Settings shared by every model family.
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct Parameters {
    /// Key for the built model. `None` lets the builder pick one.
    #[builder(into)]
    pub destination: Option<Key>,

    /// Training frame.
    #[builder(into)]
    pub train: Key,

    /// Validation frame. Defaults to the training frame.
    #[builder(into)]
    pub valid: Option<Key>,

    /// Columns excluded from training.
    pub ignored_columns: Option<Vec<String>>,

    /// Drop predictor columns with more than 20% missing values.
    #[builder(default)]
    pub drop_na20_cols: bool,

    /// Score the partial model after every training iteration.
    #[builder(default)]
    pub score_each_iteration: bool,

    /// Largest confusion matrix (in classes) written to the debug log after
    /// scoring. Default: 20.
    #[builder(default = 20)]
    pub max_confusion_matrix_size: usize,

    /// Value substituted for training columns absent at scoring time.
    #[builder(default = f64::NAN)]
    pub missing_value: f64,
}

impl<S: parameters_builder::IsComplete> ParametersBuilder<S> {
    /// Build and validate the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a frame key or an ignored column name is
    /// empty.
    pub fn build(self) -> std::result::Result<Parameters, ConfigError> {
        let params = self.__build_internal();
        params.validate()?;
        Ok(params)
    }
}

impl Parameters {
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.train.is_empty() {
            return Err(ConfigError::EmptyKey { field: "train" });
        }
        if self.valid.as_ref().is_some_and(Key::is_empty) {
            return Err(ConfigError::EmptyKey { field: "valid" });
        }
        if self.destination.as_ref().is_some_and(Key::is_empty) {
            return Err(ConfigError::EmptyKey {
                field: "destination",
            });
        }
        if self
            .ignored_columns
            .as_ref()
            .is_some_and(|cols| cols.iter().any(String::is_empty))
        {
            return Err(ConfigError::EmptyColumnName);
        }
        Ok(())
    }

    /// Key of the validation frame, falling back to the training frame.
    pub fn valid_key(&self) -> &Key {
        self.valid.as_ref().unwrap_or(&self.train)
    }

    /// Whether a validation frame distinct from the training frame is set.
    pub fn has_distinct_valid(&self) -> bool {
        self.valid.as_ref().is_some_and(|v| *v != self.train)
    }

    /// The training frame.
    pub fn train_frame(&self, store: &dyn Store) -> Result<Frame> {
        store
            .get_frame(&self.train)
            .ok_or_else(|| ScoreError::UnknownFrame(self.train.clone()))
    }

    /// The validation frame, or the training frame if none is set.
    pub fn valid_frame(&self, store: &dyn Store) -> Result<Frame> {
        let key = self.valid_key();
        store
            .get_frame(key)
            .ok_or_else(|| ScoreError::UnknownFrame(key.clone()))
    }

    /// Read-lock the training frame and, if distinct, the validation frame.
    pub fn lock_frames<'s>(&self, store: &'s dyn Store, job: &Key) -> Result<ReadLocks<'s>> {
        let mut frames = vec![self.train.clone()];
        if self.has_distinct_valid() {
            frames.push(self.valid_key().clone());
        }
        ReadLocks::acquire(store, job, &frames)
    }

    /// Fingerprint over the settings and the referenced frames' content.
    ///
    /// Changes whenever the training frame, the validation frame or the
    /// ignored column list changes.
    pub fn checksum(&self, store: &dyn Store) -> Result<u64> {
        let train = self.train_frame(store)?.checksum();
        let valid = match &self.valid {
            Some(_) => self.valid_frame(store)?.checksum(),
            None => 17,
        };
        let ignored = self
            .ignored_columns
            .as_deref()
            .map_or(23, hash_strings);
        let flags = if self.drop_na20_cols { 17 } else { 1 };
        Ok(combine_checksums(&[flags, train, valid, ignored]))
    }

    /// Whether a training loop should score its partial model now.
    ///
    /// Always true with `score_each_iteration` or on the last iteration;
    /// otherwise only while scoring has taken under 10% of the build time.
    pub fn should_score(&self, is_last: bool, scoring_time_ms: u64, total_time_ms: u64) -> bool {
        self.score_each_iteration || is_last || scoring_time_ms.saturating_mul(10) < total_time_ms
    }
}
