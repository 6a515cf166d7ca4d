//! Point-prediction contract.

use ndarray::ArrayView1;

/// Per-row prediction supplied by a model family.
///
/// `features` holds the row's predictor values in training-column order, with
/// categorical values as training-domain codes (codes past the training
/// domain are levels the model never saw). NaN is missing.
///
/// `preds` has the model's prediction width. Index 0 receives the predicted
/// value, or the predicted class code for classifiers; indices `1..` receive
/// the class probabilities for classifiers.
///
/// Closures `Fn(&[f64], &mut [f32])` implement this trait.
pub trait PointPredictor: Send + Sync {
    fn predict(&self, features: &[f64], preds: &mut [f32]);

    /// Predict row `row` of a chunk.
    ///
    /// The default loads the row into the reusable `features` buffer and
    /// calls [`predict`](Self::predict). Implementations may read the columns
    /// directly instead.
    fn predict_chunk_row(
        &self,
        columns: &[ArrayView1<'_, f64>],
        row: usize,
        features: &mut [f64],
        preds: &mut [f32],
    ) {
        for (slot, column) in features.iter_mut().zip(columns) {
            *slot = column[row];
        }
        self.predict(features, preds);
    }
}

impl<F> PointPredictor for F
where
    F: Fn(&[f64], &mut [f32]) + Send + Sync,
{
    #[inline]
    fn predict(&self, features: &[f64], preds: &mut [f32]) {
        self(features, preds)
    }
}

/// Index of the largest value. NaNs are skipped and ties go to the lowest
/// index. `None` if every value is NaN.
pub fn arg_max(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}
