//! Models and their training-time schema.
//!
//! A [`Model`] pairs the schema it learned ([`ModelOutput`]) with the
//! settings it was built from ([`Parameters`]) and a [`PointPredictor`]
//! supplied by the model family. Everything else, adaptation and scoring
//! included, is written once against that contract.
//!
//! # Key Types
//!
//! - [`Model`]: Schema + parameters + predictor
//! - [`Parameters`]: Frames and shared settings, built with `bon`
//! - [`TrainingSetup`]: Validated, prepared training frame
//! - [`ModelOutput`]: Learned names/domains, metric registry, job snapshot
//! - [`Job`]: Lifecycle and cancellation of a unit of work

mod job;
mod output;
mod params;
mod registry;
mod setup;

pub use job::{Job, JobSnapshot, JobState};
pub use output::{ModelCategory, ModelOutput};
pub use params::Parameters;
pub use registry::AppendLog;
pub use setup::{LearningTask, MessageLevel, TrainingSetup, ValidationMessage};

use crate::adapt::adapt_test_for_train;
use crate::error::{Result, ScoreError};
use crate::frame::Frame;
use crate::metrics::ModelMetrics;
use crate::scoring::{self, arg_max, PointPredictor, ScoreConfig, Scored};
use crate::store::{Key, Store};
use crate::utils::combine_checksums;

/// A trained model.
#[derive(Debug)]
pub struct Model<P> {
    key: Key,
    params: Parameters,
    output: ModelOutput,
    predictor: P,
}

impl<P: PointPredictor> Model<P> {
    /// Assemble a model. The key is `params.destination`, or a fresh one.
    pub fn new(params: Parameters, output: ModelOutput, predictor: P) -> Self {
        let key = params
            .destination
            .clone()
            .unwrap_or_else(|| Key::make("model"));
        Self {
            key,
            params,
            output,
            predictor,
        }
    }

    #[inline]
    pub fn key(&self) -> &Key {
        &self.key
    }

    #[inline]
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    #[inline]
    pub fn output(&self) -> &ModelOutput {
        &self.output
    }

    #[inline]
    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    /// Adapt `test` to this model's schema. See
    /// [`adapt_test_for_train`](crate::adapt::adapt_test_for_train).
    pub fn adapt_test_for_train(
        &self,
        test: &mut Frame,
        expensive: bool,
        store: &dyn Store,
    ) -> Result<Vec<String>> {
        adapt_test_for_train(
            self.output.names(),
            self.output.domains(),
            test,
            self.params.missing_value,
            expensive,
            store,
        )
    }

    /// Score a frame. See [`scoring::score`].
    pub fn score(
        &self,
        frame: &Frame,
        job: &Job,
        store: &dyn Store,
        config: &ScoreConfig,
    ) -> Result<Scored> {
        scoring::score(self, frame, job, store, config)
    }

    /// Prediction vector for one row of features in training order.
    ///
    /// # Errors
    ///
    /// [`ScoreError::FeatureCount`] if `features` is not `n_features` long.
    pub fn score_row(&self, features: &[f64]) -> Result<Vec<f32>> {
        let expected = self.output.n_features();
        if features.len() != expected {
            return Err(ScoreError::FeatureCount {
                expected,
                got: features.len(),
            });
        }
        let mut preds = vec![0.0; self.output.prediction_width()];
        self.predictor.predict(features, &mut preds);
        Ok(preds)
    }

    /// Most probable class for one row, `None` for non-classifiers.
    pub fn predict_class(&self, features: &[f64]) -> Result<Option<usize>> {
        let preds = self.score_row(features)?;
        if !self.output.is_classifier() {
            return Ok(None);
        }
        Ok(arg_max(&preds[1..]))
    }

    /// Fingerprint over parameters, referenced frames and learned schema.
    pub fn checksum(&self, store: &dyn Store) -> Result<u64> {
        Ok(combine_checksums(&[
            self.params.checksum(store)?,
            self.output.checksum(),
        ]))
    }

    /// Refresh the output's job snapshot from `job` and return it.
    pub fn job_status(&self, job: &Job) -> JobSnapshot {
        self.output.refresh_job_status(job)
    }

    /// Stored metrics of this model on `frame`.
    ///
    /// # Errors
    ///
    /// [`ScoreError::UnknownMetrics`] if the frame was never scored.
    pub fn metrics_for(&self, frame: &Key, store: &dyn Store) -> Result<ModelMetrics> {
        let key = Key::metrics_for(&self.key, frame);
        store
            .get_metrics(&key)
            .ok_or(ScoreError::UnknownMetrics(key))
    }

    /// Remove every metrics object this model registered. Returns how many
    /// were still stored.
    pub fn delete(&self, store: &dyn Store) -> usize {
        self.output
            .model_metrics()
            .iter()
            .filter(|key| store.remove_metrics(key))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Domain;

    fn classifier() -> Model<impl PointPredictor> {
        let params = Parameters::builder()
            .train("train")
            .destination("clf")
            .build()
            .unwrap();
        let output = ModelOutput::from_schema(
            vec!["x".into(), "class".into()],
            vec![None, Some(Domain::new(["a", "b", "c"]))],
            LearningTask::Supervised,
        )
        .unwrap();
        Model::new(params, output, |x: &[f64], preds: &mut [f32]| {
            preds[1..].fill(0.1);
            preds[1 + (x[0] as usize).min(2)] = 0.8;
        })
    }

    #[test]
    fn key_comes_from_destination() {
        assert_eq!(classifier().key(), &Key::new("clf"));
    }

    #[test]
    fn score_row_checks_width() {
        let model = classifier();
        let preds = model.score_row(&[2.0]).unwrap();
        assert_eq!(preds.len(), 4);
        assert_eq!(model.predict_class(&[1.0]).unwrap(), Some(1));
        assert!(matches!(
            model.score_row(&[1.0, 2.0]),
            Err(ScoreError::FeatureCount { expected: 1, got: 2 })
        ));
    }
}
