//! Parallel scoring of a frame.
//!
//! # Pipeline
//!
//! 1. Read-lock the model's training (and validation) frames for the job.
//! 2. Adapt a shallow copy of the frame to the model's schema.
//! 3. Map: split rows into chunks; each chunk predicts its rows into a
//!    feature-major `[width, rows]` buffer and feeds a chunk-local
//!    [`MetricBuilder`]. Chunks share nothing mutable.
//! 4. Reduce: merge the chunk builders pairwise in chunk order and join the
//!    prediction buffers.
//! 5. Assemble the prediction frame, store it with the finalized metrics and
//!    record the metrics key on the model.
//!
//! Temporaries from adaptation and the read locks are released when the
//! call returns, on every path.

use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use ndarray::{concatenate, s, Array1, Array2, ArrayView1, ArrayView2, Axis};

use super::config::ScoreConfig;
use super::predict::PointPredictor;
use crate::adapt::AdaptedFrame;
use crate::error::{Result, ScoreError};
use crate::frame::{Column, Domain, Frame};
use crate::logger::ScoreLogger;
use crate::metrics::{
    default_thresholds, MetricBuilder, MetricContext, ModelMetrics, MULTINOMIAL_THRESHOLD,
};
use crate::model::{Job, Model, ModelCategory, ModelOutput};
use crate::store::{Key, Store};
use crate::utils::run_with_threads;

/// Name of the first prediction column.
pub const PREDICT_COLUMN: &str = "predict";

/// Result of scoring one frame.
#[derive(Debug, Clone)]
pub struct Scored {
    /// `predict`, then one probability column per class for classifiers.
    /// Already stored; the caller owns it.
    pub predictions: Frame,
    pub metrics: ModelMetrics,
    /// Adaptation warnings, in training-column order.
    pub warnings: Vec<String>,
}

/// Output of one chunk of the map phase.
struct ChunkResult {
    builder: MetricBuilder,
    /// `[width, chunk_rows]`
    preds: Array2<f32>,
}

/// Score `frame` with `model` under `job`.
///
/// # Errors
///
/// - adaptation errors ([`ScoreError::NoCommonColumns`],
///   [`ScoreError::TypeMismatch`]);
/// - [`ScoreError::UnknownFrame`] if the model's training frames are gone;
/// - [`ScoreError::Cancelled`] if the job was cancelled while scoring. No
///   metrics are stored in that case.
pub fn score<P: PointPredictor>(
    model: &Model<P>,
    frame: &Frame,
    job: &Job,
    store: &dyn Store,
    config: &ScoreConfig,
) -> Result<Scored> {
    let start = Instant::now();
    let logger = ScoreLogger::new(config.verbosity);
    let output = model.output();

    let _locks = model.params().lock_frames(store, job.key())?;
    let model_checksum = model.checksum(store)?;

    let original_response = output
        .response_name()
        .filter(|_| output.is_classifier())
        .and_then(|name| frame.column(name))
        .map(Arc::clone);

    let (adapted, warnings) = AdaptedFrame::new(
        output.names(),
        output.domains(),
        frame,
        model.params().missing_value,
        store,
    )?;
    logger.warnings(model.key(), &warnings);
    let adapted_frame = adapted.frame();

    // Training classes followed by classes only seen in this frame.
    let prediction_domain = if output.is_classifier() {
        adapted_frame
            .last()
            .and_then(|(_, column)| column.domain().cloned())
    } else {
        None
    };
    let template = metric_template(output, prediction_domain.as_ref(), config);

    let ranges = adapted_frame.chunk_ranges(store.chunk_rows());
    logger.chunks(frame.key(), ranges.len(), adapted_frame.n_rows());

    let columns: Vec<ArrayView1<'_, f64>> =
        adapted_frame.columns().iter().map(|c| c.values()).collect();
    let n_features = output.n_features();
    let width = output.prediction_width();
    let supervised = output.response_name().is_some();

    let run_chunk = |range: Range<usize>| -> Option<ChunkResult> {
        if job.is_cancelled() {
            return None;
        }
        let chunk: Vec<ArrayView1<'_, f64>> = columns
            .iter()
            .map(|c| c.slice(s![range.clone()]))
            .collect();
        let response = supervised.then(|| chunk[n_features]);
        let n_rows = range.len();

        let mut builder = template.clone();
        let mut preds_out = Array2::<f32>::zeros((width, n_rows));
        let mut features = vec![0.0f64; n_features];
        let mut preds = vec![0.0f32; width];

        for row in 0..n_rows {
            preds.fill(0.0);
            model
                .predictor()
                .predict_chunk_row(&chunk[..n_features], row, &mut features, &mut preds);
            let actual = response.map_or(f64::NAN, |r| r[row]);
            builder.update(&preds, actual);
            for (c, &p) in preds.iter().enumerate() {
                preds_out[[c, row]] = p;
            }
        }
        Some(ChunkResult {
            builder,
            preds: preds_out,
        })
    };

    let results = run_with_threads(config.n_threads, |parallelism| {
        parallelism.maybe_par_map(ranges, &run_chunk)
    })?;

    if job.is_cancelled() || results.iter().any(Option::is_none) {
        logger.cancelled(job.key(), frame.key());
        return Err(ScoreError::Cancelled {
            job: job.key().clone(),
        });
    }

    let (builders, buffers): (Vec<_>, Vec<_>) = results
        .into_iter()
        .flatten()
        .map(|r| (r.builder, r.preds))
        .unzip();
    let merged = MetricBuilder::reduce_pairwise(builders).unwrap_or(template);
    let all_preds = if buffers.is_empty() {
        Array2::zeros((width, 0))
    } else {
        let views: Vec<ArrayView2<'_, f32>> = buffers.iter().map(|b| b.view()).collect();
        concatenate(Axis(1), &views)?
    };

    let predictions = assemble_predictions(
        output,
        &all_preds,
        prediction_domain.as_ref(),
        original_response.as_deref(),
    )?;
    store.put_frame(predictions.clone())?;

    let metrics_key = Key::metrics_for(model.key(), frame.key());
    let metrics = merged.finalize(MetricContext {
        key: metrics_key.clone(),
        model: model.key().clone(),
        frame: frame.key().clone(),
        model_checksum,
        frame_checksum: frame.checksum(),
    });
    store.put_metrics(metrics.clone());
    output.add_model_metrics(metrics_key);
    output.refresh_job_status(job);
    logger.scored(&metrics, start.elapsed().as_millis());
    if let Some(confusion) = metrics.confusion() {
        logger.confusion(model.key(), confusion, model.params().max_confusion_matrix_size);
    }

    Ok(Scored {
        predictions,
        metrics,
        warnings,
    })
}

fn metric_template(
    output: &ModelOutput,
    prediction_domain: Option<&Domain>,
    config: &ScoreConfig,
) -> MetricBuilder {
    match (output.category(), prediction_domain) {
        (ModelCategory::Regression, _) => MetricBuilder::regression(),
        (ModelCategory::Binomial, Some(domain)) => {
            let thresholds = config.thresholds.clone().unwrap_or_else(default_thresholds);
            MetricBuilder::classification(domain.clone(), output.n_classes(), thresholds)
        }
        (ModelCategory::Multinomial, Some(domain)) => MetricBuilder::classification(
            domain.clone(),
            output.n_classes(),
            vec![MULTINOMIAL_THRESHOLD],
        ),
        (category, _) => MetricBuilder::unlabeled(category),
    }
}

/// Build the prediction frame from the `[width, rows]` buffer.
fn assemble_predictions(
    output: &ModelOutput,
    preds: &Array2<f32>,
    prediction_domain: Option<&Domain>,
    original_response: Option<&Column>,
) -> Result<Frame> {
    let to_f64 = |row: usize| preds.row(row).mapv(f64::from);

    let predict = match prediction_domain {
        Some(domain) => {
            let codes = to_f64(0);
            match original_response {
                Some(original) => remap_to_original(&codes, domain, original),
                None => Column::categorical(codes, domain.clone()),
            }
        }
        None => Column::numeric(to_f64(0)),
    };

    let mut columns = vec![(PREDICT_COLUMN.to_string(), predict)];
    if let Some(classes) = output.class_names() {
        for (c, label) in classes.iter().enumerate() {
            columns.push((label.to_string(), Column::numeric(to_f64(c + 1))));
        }
    }
    Frame::from_columns(Key::make("predictions"), columns)
}

/// Express predicted codes in the scored frame's own response encoding.
///
/// Levels absent from the original domain become missing. A numeric
/// original response gets the predicted levels parsed back to numbers.
fn remap_to_original(codes: &Array1<f64>, domain: &Domain, original: &Column) -> Column {
    let level = |code: f64| {
        if code.is_nan() || code < 0.0 {
            None
        } else {
            domain.get(code as usize)
        }
    };
    match original.domain() {
        Some(original_domain) if original_domain == domain => {
            Column::categorical(codes.clone(), original_domain.clone())
        }
        Some(original_domain) => {
            let index = original_domain.index();
            let remapped = codes.mapv(|c| {
                level(c)
                    .and_then(|l| index.get(l))
                    .map_or(f64::NAN, |&i| i as f64)
            });
            Column::categorical(remapped, original_domain.clone())
        }
        None => Column::numeric(codes.mapv(|c| {
            level(c)
                .and_then(|l| l.parse::<f64>().ok())
                .unwrap_or(f64::NAN)
        })),
    }
}
