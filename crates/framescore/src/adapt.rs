//! Schema adaptation.
//!
//! Reconciles a scoring frame against the column names and categorical
//! domains a model was trained on:
//!
//! - training columns are looked up by name; missing ones produce a warning
//!   and, when adapting for real, a constant column of the missing-value
//!   sentinel;
//! - categorical columns are recoded onto the training domain, with levels
//!   the model never saw appended after the training levels;
//! - extra scoring-only columns are dropped from the adapted view.
//!
//! With `expensive == false` the adapter only answers whether the frame would
//! adapt, and with which warnings. It never registers a column or touches the
//! frame.

use std::collections::HashMap;
use std::sync::Arc;

use ndarray::Array1;

use crate::error::{Result, ScoreError};
use crate::frame::{Column, Domain, Frame};
use crate::store::{Store, TempColumns};

/// Adapt `test` to the training schema `names` / `domains`.
///
/// Returns the warnings in training-column order.
///
/// # Errors
///
/// - [`ScoreError::TypeMismatch`] if a numeric training column is matched by
///   a categorical scoring column.
/// - [`ScoreError::NoCommonColumns`] if no training column is found in `test`.
///
/// Columns created here are registered with `store` and, on success, owned by
/// the adapted frame. Callers release them once done, typically through
/// [`AdaptedFrame`]. On failure they are released before returning.
pub fn adapt_test_for_train(
    names: &[String],
    domains: &[Option<Domain>],
    test: &mut Frame,
    missing: f64,
    expensive: bool,
    store: &dyn Store,
) -> Result<Vec<String>> {
    debug_assert_eq!(names.len(), domains.len());

    if names == test.names() && domains == test.domains().as_slice() {
        return Ok(Vec::new());
    }

    let mut warnings = Vec::new();
    let mut temps = TempColumns::new(store);
    let mut adapted: Vec<Arc<Column>> = Vec::with_capacity(names.len());
    let mut matched = 0usize;
    let n_rows = test.n_rows();

    for (name, train_domain) in names.iter().zip(domains) {
        let Some(found) = test.column(name) else {
            warnings.push(format!("Validation set is missing training column {name}"));
            if expensive {
                adapted.push(temps.create(Column::constant(missing, n_rows, train_domain.clone())));
            }
            continue;
        };

        match train_domain {
            None if found.is_categorical() => {
                return Err(ScoreError::TypeMismatch {
                    column: name.clone(),
                });
            }
            None => {
                matched += 1;
                adapted.push(Arc::clone(found));
            }
            Some(train_domain) => {
                matched += 1;
                if found.domain() == Some(train_domain) {
                    adapted.push(Arc::clone(found));
                    continue;
                }
                let mapping = LevelMapping::new(train_domain, found);
                if !mapping.extra.is_empty() {
                    warnings.push(format!(
                        "Validation column {name} has levels not trained on: [{}]",
                        mapping.extra.join(", ")
                    ));
                }
                if expensive {
                    adapted.push(temps.create(mapping.apply(found)));
                }
            }
        }
    }

    if matched == 0 {
        return Err(ScoreError::NoCommonColumns);
    }

    if expensive && adapted.len() == names.len() {
        test.restructure(names.to_vec(), adapted)?;
        temps.commit();
    }
    Ok(warnings)
}

// =============================================================================
// Level mapping
// =============================================================================

/// How one scoring column's values map onto a training domain.
struct LevelMapping {
    /// Training domain followed by the extra levels.
    domain: Domain,
    /// Extra levels, in discovery order.
    extra: Vec<String>,
    source: Source,
}

enum Source {
    /// Union code for every code of the scoring column's domain.
    Codes(Vec<f64>),
    /// Sorted distinct numeric values and their union codes.
    Values { values: Vec<f64>, codes: Vec<f64> },
}

impl LevelMapping {
    fn new(train: &Domain, column: &Column) -> Self {
        let index = train.index();
        let mut extra: Vec<String> = Vec::new();
        let mut code_of = |level: &str| -> f64 {
            if let Some(&code) = index.get(level) {
                return code as f64;
            }
            let pos = match extra.iter().position(|l| l == level) {
                Some(pos) => pos,
                None => {
                    extra.push(level.to_string());
                    extra.len() - 1
                }
            };
            (train.len() + pos) as f64
        };

        let source = match column.domain() {
            Some(test_domain) => Source::Codes(test_domain.iter().map(&mut code_of).collect()),
            None => {
                let mut values: Vec<f64> =
                    column.values().iter().copied().filter(|v| !v.is_nan()).collect();
                values.sort_unstable_by(f64::total_cmp);
                values.dedup();
                let codes = values.iter().map(|v| code_of(&format!("{v}"))).collect();
                Source::Values { values, codes }
            }
        };

        let domain = if extra.is_empty() {
            train.clone()
        } else {
            train.iter().map(str::to_string).chain(extra.iter().cloned()).collect()
        };
        Self {
            domain,
            extra,
            source,
        }
    }

    fn apply(&self, column: &Column) -> Column {
        let codes: Array1<f64> = match &self.source {
            Source::Codes(map) => column.values().mapv(|c| {
                if c.is_nan() {
                    f64::NAN
                } else {
                    map.get(c as usize).copied().unwrap_or(f64::NAN)
                }
            }),
            Source::Values { values, codes } => column.values().mapv(|v| {
                if v.is_nan() {
                    return f64::NAN;
                }
                match values.binary_search_by(|level| level.total_cmp(&v)) {
                    Ok(i) => codes[i],
                    Err(_) => f64::NAN,
                }
            }),
        };
        Column::categorical(codes, self.domain.clone())
    }
}

// =============================================================================
// Adapted frame guard
// =============================================================================

/// An adapted working copy of a caller's frame.
///
/// On drop, releases every column of the working copy that the original
/// frame does not hold. Columns aliasing the caller's data are left alone.
pub struct AdaptedFrame<'s> {
    store: &'s dyn Store,
    original: Frame,
    adapted: Frame,
}

impl<'s> AdaptedFrame<'s> {
    /// Adapt a shallow copy of `original` with `expensive = true`.
    ///
    /// Returns the guard and the adapter's warnings.
    pub fn new(
        names: &[String],
        domains: &[Option<Domain>],
        original: &Frame,
        missing: f64,
        store: &'s dyn Store,
    ) -> Result<(Self, Vec<String>)> {
        let mut adapted = original.clone();
        let warnings = adapt_test_for_train(names, domains, &mut adapted, missing, true, store)?;
        Ok((
            Self {
                store,
                original: original.clone(),
                adapted,
            },
            warnings,
        ))
    }

    pub fn frame(&self) -> &Frame {
        &self.adapted
    }
}

impl Drop for AdaptedFrame<'_> {
    fn drop(&mut self) {
        for column in self.adapted.columns() {
            if !self.original.contains_column(column.key()) {
                self.store.release_column(column.key());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;

    fn schema() -> (Vec<String>, Vec<Option<Domain>>) {
        (
            vec!["x".into(), "color".into(), "y".into()],
            vec![None, Some(Domain::new(["blue", "red"])), None],
        )
    }

    #[test]
    fn numeric_values_map_through_their_text() {
        let train = Domain::new(["1", "2", "3"]);
        let column = Column::numeric(vec![3.0, 1.0, f64::NAN, 7.5, 3.0]);
        let mapping = LevelMapping::new(&train, &column);
        assert_eq!(mapping.extra, vec!["7.5".to_string()]);

        let out = mapping.apply(&column);
        assert_eq!(out.at(0), 2.0);
        assert_eq!(out.at(1), 0.0);
        assert!(out.at(2).is_nan());
        assert_eq!(out.at(3), 3.0);
        assert_eq!(out.domain().unwrap().levels(), ["1", "2", "3", "7.5"]);
    }

    #[test]
    fn subset_domain_reuses_training_domain() {
        let train = Domain::new(["a", "b", "c"]);
        let column = Column::categorical(vec![0.0, 1.0], Domain::new(["c", "a"]));
        let mapping = LevelMapping::new(&train, &column);
        assert!(mapping.extra.is_empty());
        assert!(mapping.domain.ptr_eq(&train));

        let out = mapping.apply(&column);
        assert_eq!(out.at(0), 2.0);
        assert_eq!(out.at(1), 0.0);
    }

    #[test]
    fn failed_adaptation_releases_temporaries() {
        let store = MemStore::new();
        let (names, domains) = schema();
        // "color" is present but remapped, "x" is categorical where training is numeric.
        let mut test = Frame::from_columns(
            "test",
            vec![
                ("color".into(), Column::from_levels(&[Some("red"), Some("green")])),
                ("x".into(), Column::from_levels(&[Some("a"), Some("b")])),
            ],
        )
        .unwrap();

        let names = vec![names[1].clone(), names[0].clone()];
        let domains = vec![domains[1].clone(), domains[0].clone()];
        let err = adapt_test_for_train(&names, &domains, &mut test, f64::NAN, true, &store)
            .unwrap_err();
        assert!(matches!(err, ScoreError::TypeMismatch { ref column } if column == "x"));
        assert_eq!(store.live_columns(), 0);
        assert_eq!(test.names(), ["color", "x"]);
    }

    #[test]
    fn adapted_frame_releases_only_new_columns() {
        let store = MemStore::new();
        let (names, domains) = schema();
        let original = Frame::from_columns(
            "test",
            vec![
                ("x".into(), Column::numeric(vec![1.0, 2.0])),
                ("color".into(), Column::from_levels(&[Some("red"), Some("green")])),
            ],
        )
        .unwrap();
        store.put_frame(original.clone()).unwrap();
        assert_eq!(store.live_columns(), 2);

        {
            let (adapted, warnings) =
                AdaptedFrame::new(&names, &domains, &original, f64::NAN, &store).unwrap();
            assert_eq!(warnings.len(), 2);
            assert_eq!(adapted.frame().names(), names.as_slice());
            // Remapped color and synthesized y.
            assert_eq!(store.live_columns(), 4);
        }
        assert_eq!(store.live_columns(), 2);
        assert!(store.is_live(original.columns()[0].key()));
    }
}
