//! Fixtures for tests and benchmarks.
//!
//! Toy predictors for each model category and small deterministic frames
//! with models trained on them.

use crate::error::Result;
use crate::frame::{Column, Domain, Frame};
use crate::model::{LearningTask, Model, ModelOutput, Parameters, TrainingSetup};
use crate::scoring::PointPredictor;
use crate::store::Store;

// =============================================================================
// Predictors
// =============================================================================

/// `bias + Σ wᵢ·xᵢ`, missing features count as zero.
#[derive(Debug, Clone)]
pub struct LinearPredictor {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl PointPredictor for LinearPredictor {
    fn predict(&self, features: &[f64], preds: &mut [f32]) {
        let sum: f64 = self
            .weights
            .iter()
            .zip(features)
            .filter(|(_, x)| !x.is_nan())
            .map(|(w, x)| w * x)
            .sum();
        preds[0] = (self.bias + sum) as f32;
    }
}

/// Binary classifier splitting on one feature: class 1 with probability 0.9
/// above the threshold, 0.1 otherwise.
#[derive(Debug, Clone)]
pub struct StumpClassifier {
    pub feature: usize,
    pub threshold: f64,
}

impl PointPredictor for StumpClassifier {
    fn predict(&self, features: &[f64], preds: &mut [f32]) {
        let x = features[self.feature];
        let p1 = if x > self.threshold { 0.9 } else { 0.1 };
        preds[1] = 1.0 - p1;
        preds[2] = p1;
        preds[0] = if p1 >= 0.5 { 1.0 } else { 0.0 };
    }
}

/// Multinomial classifier that predicts the class whose code equals the
/// first feature, with probability 0.8. Unknown codes get a uniform
/// distribution and class 0.
#[derive(Debug, Clone)]
pub struct LookupClassifier {
    pub n_classes: usize,
}

impl PointPredictor for LookupClassifier {
    fn predict(&self, features: &[f64], preds: &mut [f32]) {
        let code = features[0];
        let known = !code.is_nan() && code >= 0.0 && (code as usize) < self.n_classes;
        if known {
            let class = code as usize;
            let rest = 0.2 / self.n_classes.saturating_sub(1).max(1) as f32;
            for p in preds[1..].iter_mut() {
                *p = rest;
            }
            preds[1 + class] = 0.8;
            preds[0] = class as f32;
        } else {
            let uniform = 1.0 / self.n_classes as f32;
            for p in preds[1..].iter_mut() {
                *p = uniform;
            }
            preds[0] = 0.0;
        }
    }
}

// =============================================================================
// Frames
// =============================================================================

/// Numeric frame with `x1`, `x2` and `y = 2·x1 - x2 + 1`.
pub fn regression_frame(key: &str, n_rows: usize) -> Result<Frame> {
    let x1: Vec<f64> = (0..n_rows).map(|i| i as f64 * 0.5).collect();
    let x2: Vec<f64> = (0..n_rows).map(|i| (i % 7) as f64).collect();
    let y: Vec<f64> = x1.iter().zip(&x2).map(|(a, b)| 2.0 * a - b + 1.0).collect();
    Frame::from_columns(
        key,
        vec![
            ("x1".into(), Column::numeric(x1)),
            ("x2".into(), Column::numeric(x2)),
            ("y".into(), Column::numeric(y)),
        ],
    )
}

/// Frame with numeric `x`, categorical `color` and a `label` of `no`/`yes`
/// that is `yes` exactly when `x > 0.5`.
pub fn binary_frame(key: &str, n_rows: usize) -> Result<Frame> {
    let x: Vec<f64> = (0..n_rows).map(|i| (i % 10) as f64 / 10.0).collect();
    let colors = ["blue", "green", "red"];
    let color: Vec<f64> = (0..n_rows).map(|i| (i % colors.len()) as f64).collect();
    let label: Vec<f64> = x.iter().map(|&v| if v > 0.5 { 1.0 } else { 0.0 }).collect();
    Frame::from_columns(
        key,
        vec![
            ("x".into(), Column::numeric(x)),
            ("color".into(), Column::categorical(color, Domain::new(colors))),
            ("label".into(), Column::categorical(label, Domain::new(["no", "yes"]))),
        ],
    )
}

/// Frame whose `class` response repeats the `code` feature's level.
pub fn multinomial_frame(key: &str, n_rows: usize, levels: &[&str]) -> Result<Frame> {
    let n = levels.len().max(1);
    let codes: Vec<f64> = (0..n_rows).map(|i| (i % n) as f64).collect();
    let domain = Domain::new(levels.iter().copied());
    Frame::from_columns(
        key,
        vec![
            ("code".into(), Column::categorical(codes.clone(), domain.clone())),
            ("class".into(), Column::categorical(codes, domain)),
        ],
    )
}

// =============================================================================
// Models
// =============================================================================

/// Store `frame` and build a supervised model on it with `predictor`.
pub fn train_model<P: PointPredictor>(
    store: &dyn Store,
    frame: Frame,
    response: &str,
    predictor: P,
) -> Result<Model<P>> {
    let params = Parameters::builder().train(frame.key().clone()).build()?;
    store.put_frame(frame)?;
    let setup = TrainingSetup::init(params.clone(), Some(response), LearningTask::Supervised, store);
    let output = ModelOutput::new(&setup)?;
    Ok(Model::new(params, output, predictor))
}

/// Regression model with the exact weights of [`regression_frame`].
pub fn regression_model(store: &dyn Store, n_rows: usize) -> Result<Model<LinearPredictor>> {
    let predictor = LinearPredictor {
        weights: vec![2.0, -1.0],
        bias: 1.0,
    };
    train_model(store, regression_frame("regression_train", n_rows)?, "y", predictor)
}

/// Binomial model on [`binary_frame`] splitting on `x` at 0.5.
pub fn binary_model(store: &dyn Store, n_rows: usize) -> Result<Model<StumpClassifier>> {
    let predictor = StumpClassifier {
        feature: 0,
        threshold: 0.5,
    };
    train_model(store, binary_frame("binary_train", n_rows)?, "label", predictor)
}
