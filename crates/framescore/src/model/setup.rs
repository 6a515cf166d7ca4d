//! Training-frame preparation and validation.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::params::Parameters;
use crate::adapt::adapt_test_for_train;
use crate::frame::Frame;
use crate::store::Store;

/// Share of missing rows above which `drop_na20_cols` drops a predictor.
const NA_DROP_FRACTION: f64 = 0.2;

/// What kind of model is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LearningTask {
    /// A response column is required and placed last.
    #[default]
    Supervised,
    Unsupervised,
    Clustering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessageLevel {
    Info,
    Warn,
    Error,
}

/// One finding from validating a training setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationMessage {
    pub level: MessageLevel,
    /// Parameter the message is about.
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A training frame prepared for model building.
///
/// Built by [`TrainingSetup::init`], which never fails: problems are
/// collected as [`ValidationMessage`]s so they can be reported together.
/// [`ModelOutput::new`](super::ModelOutput::new) refuses a setup with errors.
#[derive(Debug, Clone)]
pub struct TrainingSetup {
    params: Parameters,
    task: LearningTask,
    train: Frame,
    valid: Option<Frame>,
    messages: Vec<ValidationMessage>,
}

impl TrainingSetup {
    /// Prepare the training frame named by `params`.
    ///
    /// - ignored columns are removed;
    /// - with `drop_na20_cols`, predictors more than 20% missing are removed;
    /// - for supervised tasks the response column is moved last;
    /// - a distinct validation frame is checked against the prepared schema.
    pub fn init(
        params: Parameters,
        response: Option<&str>,
        task: LearningTask,
        store: &dyn Store,
    ) -> Self {
        let mut setup = Self {
            task,
            train: Frame::new(params.train.clone()),
            valid: None,
            messages: Vec::new(),
            params,
        };

        let Some(train) = store.get_frame(&setup.params.train) else {
            let key = setup.params.train.clone();
            setup.error("train", format!("training frame {key} not found"));
            return setup;
        };
        setup.train = train;

        setup.remove_ignored(response);
        if task == LearningTask::Supervised {
            setup.place_response(response);
        } else if let Some(name) = response {
            setup.info("response_column", format!("response column {name} is ignored"));
        }
        if setup.params.drop_na20_cols {
            setup.drop_sparse_columns();
        }

        let n_predictors = match task {
            LearningTask::Supervised => setup.train.n_cols().saturating_sub(1),
            _ => setup.train.n_cols(),
        };
        if n_predictors == 0 {
            setup.error("train", "training frame has no predictor columns");
        }
        if setup.train.n_rows() == 0 {
            setup.error("train", "training frame has no rows");
        }

        if setup.error_count() == 0 {
            setup.check_valid(store);
        }
        setup
    }

    // =========================================================================
    // Steps
    // =========================================================================

    fn remove_ignored(&mut self, response: Option<&str>) {
        let ignored = self.params.ignored_columns.clone().unwrap_or_default();
        for name in &ignored {
            if self.task == LearningTask::Supervised && Some(name.as_str()) == response {
                self.error(
                    "ignored_columns",
                    format!("response column {name} cannot be ignored"),
                );
                continue;
            }
            if self.train.remove(name).is_none() {
                self.warn(
                    "ignored_columns",
                    format!("ignored column {name} not found in the training frame"),
                );
            }
        }
    }

    fn place_response(&mut self, response: Option<&str>) {
        let Some(name) = response else {
            self.error("response_column", "a response column is required");
            return;
        };
        let Some(column) = self.train.remove(name) else {
            self.error(
                "response_column",
                format!("response column {name} not found in the training frame"),
            );
            return;
        };
        // Re-adding a column just removed from the same frame cannot fail.
        if let Err(e) = self.train.add(name, column) {
            self.error("response_column", e.to_string());
        }
    }

    fn drop_sparse_columns(&mut self) {
        let n_rows = self.train.n_rows();
        if n_rows == 0 {
            return;
        }
        let response = match self.task {
            LearningTask::Supervised => self.train.last().map(|(n, _)| n.to_string()),
            _ => None,
        };
        let sparse: Vec<String> = self
            .train
            .names()
            .iter()
            .zip(self.train.columns())
            .filter(|(name, _)| response.as_deref() != Some(name.as_str()))
            .filter(|(_, column)| {
                let missing = column.values().iter().filter(|v| v.is_nan()).count();
                missing as f64 > NA_DROP_FRACTION * n_rows as f64
            })
            .map(|(name, _)| name.clone())
            .collect();
        for name in sparse {
            self.train.remove(&name);
            self.info(
                "drop_na20_cols",
                format!("dropping column {name}: more than 20% missing values"),
            );
        }
    }

    fn check_valid(&mut self, store: &dyn Store) {
        if !self.params.has_distinct_valid() {
            return;
        }
        let key = self.params.valid_key().clone();
        let Some(valid) = store.get_frame(&key) else {
            self.error("valid", format!("validation frame {key} not found"));
            return;
        };

        let names = self.train.names().to_vec();
        let domains = self.train.domains();
        let mut trial = valid.clone();
        match adapt_test_for_train(
            &names,
            &domains,
            &mut trial,
            self.params.missing_value,
            false,
            store,
        ) {
            Ok(warnings) => {
                for w in warnings {
                    self.warn("valid", w);
                }
            }
            Err(e) => self.error("valid", e.to_string()),
        }
        self.valid = Some(valid);
    }

    fn push(&mut self, level: MessageLevel, field: &str, message: impl Into<String>) {
        self.messages.push(ValidationMessage {
            level,
            field: field.to_string(),
            message: message.into(),
        });
    }

    fn info(&mut self, field: &str, message: impl Into<String>) {
        self.push(MessageLevel::Info, field, message);
    }

    fn warn(&mut self, field: &str, message: impl Into<String>) {
        self.push(MessageLevel::Warn, field, message);
    }

    fn error(&mut self, field: &str, message: impl Into<String>) {
        self.push(MessageLevel::Error, field, message);
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    #[inline]
    pub fn task(&self) -> LearningTask {
        self.task
    }

    /// Prepared training frame: predictors, then the response if supervised.
    #[inline]
    pub fn train(&self) -> &Frame {
        &self.train
    }

    /// Validation frame, if one distinct from the training frame was given.
    #[inline]
    pub fn valid(&self) -> Option<&Frame> {
        self.valid.as_ref()
    }

    #[inline]
    pub fn messages(&self) -> &[ValidationMessage] {
        &self.messages
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationMessage> {
        self.messages
            .iter()
            .filter(|m| m.level == MessageLevel::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationMessage> {
        self.messages.iter().filter(|m| m.level == MessageLevel::Warn)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }
}
