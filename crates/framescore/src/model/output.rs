//! Learned schema of a model.

use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use super::job::{Job, JobSnapshot};
use super::registry::AppendLog;
use super::setup::{LearningTask, TrainingSetup};
use crate::error::{Result, ScoreError};
use crate::frame::Domain;
use crate::store::Key;
use crate::utils::{combine_checksums, hash_strings, Fingerprint};

/// Prediction category of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelCategory {
    Unknown,
    Binomial,
    Multinomial,
    Regression,
    Clustering,
}

impl ModelCategory {
    #[inline]
    pub fn is_classification(self) -> bool {
        matches!(self, Self::Binomial | Self::Multinomial)
    }
}

/// The schema a model was trained on, plus its metric registry.
///
/// Names and domains are fixed at construction. Only two parts change
/// afterwards, both written by the owning job: the append-only registries
/// (metric keys, warnings) and the job status snapshot.
#[derive(Debug)]
pub struct ModelOutput {
    names: Vec<String>,
    domains: Vec<Option<Domain>>,
    task: LearningTask,
    model_metrics: AppendLog<Key>,
    warnings: AppendLog<String>,
    job: RwLock<Option<JobSnapshot>>,
}

impl ModelOutput {
    /// Capture the schema of a validated training setup.
    ///
    /// # Errors
    ///
    /// [`ScoreError::InvalidParameters`] listing every validation error if the
    /// setup has any.
    pub fn new(setup: &TrainingSetup) -> Result<Self> {
        if setup.error_count() > 0 {
            return Err(ScoreError::InvalidParameters {
                messages: setup.errors().map(|m| m.to_string()).collect(),
            });
        }
        let train = setup.train();
        let output = Self::from_schema(train.names().to_vec(), train.domains(), setup.task())?;
        for warning in setup.warnings() {
            output.warnings.push(warning.to_string());
        }
        Ok(output)
    }

    /// Output over an explicit schema. For supervised tasks the last column
    /// is the response.
    ///
    /// # Errors
    ///
    /// [`ScoreError::InvalidParameters`] if the schema is empty or names and
    /// domains differ in length.
    pub fn from_schema(
        names: Vec<String>,
        domains: Vec<Option<Domain>>,
        task: LearningTask,
    ) -> Result<Self> {
        let mut messages = Vec::new();
        if names.is_empty() {
            messages.push("schema has no columns".to_string());
        }
        if names.len() != domains.len() {
            messages.push(format!(
                "schema has {} names but {} domains",
                names.len(),
                domains.len()
            ));
        }
        if !messages.is_empty() {
            return Err(ScoreError::InvalidParameters { messages });
        }
        Ok(Self {
            names,
            domains,
            task,
            model_metrics: AppendLog::new(),
            warnings: AppendLog::new(),
            job: RwLock::new(None),
        })
    }

    // =========================================================================
    // Schema
    // =========================================================================

    /// All column names, the response last for supervised models.
    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[inline]
    pub fn domains(&self) -> &[Option<Domain>] {
        &self.domains
    }

    #[inline]
    pub fn task(&self) -> LearningTask {
        self.task
    }

    /// Number of predictor columns.
    pub fn n_features(&self) -> usize {
        match self.task {
            LearningTask::Supervised => self.names.len() - 1,
            LearningTask::Unsupervised | LearningTask::Clustering => self.names.len(),
        }
    }

    /// Response column name, for supervised models.
    pub fn response_name(&self) -> Option<&str> {
        match self.task {
            LearningTask::Supervised => self.names.last().map(String::as_str),
            _ => None,
        }
    }

    /// Class labels of a classifier's response.
    pub fn class_names(&self) -> Option<&Domain> {
        match self.task {
            LearningTask::Supervised => self.domains.last()?.as_ref(),
            _ => None,
        }
    }

    #[inline]
    pub fn is_classifier(&self) -> bool {
        self.class_names().is_some()
    }

    /// Number of classes; 1 for non-classifiers.
    pub fn n_classes(&self) -> usize {
        self.class_names().map_or(1, Domain::len)
    }

    pub fn category(&self) -> ModelCategory {
        match self.task {
            LearningTask::Clustering => ModelCategory::Clustering,
            LearningTask::Unsupervised => ModelCategory::Unknown,
            LearningTask::Supervised => match self.class_names() {
                None => ModelCategory::Regression,
                Some(d) if d.len() > 2 => ModelCategory::Multinomial,
                Some(_) => ModelCategory::Binomial,
            },
        }
    }

    /// Length of a prediction vector: the prediction followed by one
    /// probability per class for classifiers.
    pub fn prediction_width(&self) -> usize {
        if self.is_classifier() {
            self.n_classes() + 1
        } else {
            1
        }
    }

    // =========================================================================
    // Registries
    // =========================================================================

    /// Record a metrics key. Returns `false` if it was already recorded.
    pub fn add_model_metrics(&self, key: Key) -> bool {
        self.model_metrics.push_unique(key)
    }

    pub fn model_metrics(&self) -> Vec<Key> {
        self.model_metrics.snapshot()
    }

    pub fn add_warning(&self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.snapshot()
    }

    // =========================================================================
    // Job status
    // =========================================================================

    /// Copy the job's current status into the snapshot and return it.
    pub fn refresh_job_status(&self, job: &Job) -> JobSnapshot {
        let snapshot = job.snapshot();
        *self.job.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
        snapshot
    }

    /// Last refreshed snapshot. Never updated implicitly.
    pub fn job_status(&self) -> Option<JobSnapshot> {
        *self.job.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fingerprint over names, domains and category.
    pub fn checksum(&self) -> u64 {
        let mut fp = Fingerprint::new();
        for domain in &self.domains {
            match domain {
                Some(d) => d.fingerprint(&mut fp),
                None => fp.write_u64(u64::MAX),
            }
        }
        combine_checksums(&[
            hash_strings(&self.names),
            fp.finish(),
            self.category() as u64,
        ])
    }
}
