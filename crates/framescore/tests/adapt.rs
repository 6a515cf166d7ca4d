//! Schema adaptation against a fixed training schema.

use rstest::rstest;

use framescore::adapt::{adapt_test_for_train, AdaptedFrame};
use framescore::{Column, Domain, Frame, MemStore, ScoreError, Store};

// =============================================================================
// Fixtures
// =============================================================================

/// `x` numeric, `color` over `[blue, red]`, response `y` numeric.
fn schema() -> (Vec<String>, Vec<Option<Domain>>) {
    (
        vec!["x".into(), "color".into(), "y".into()],
        vec![None, Some(Domain::new(["blue", "red"])), None],
    )
}

fn frame(columns: Vec<(&str, Column)>) -> Frame {
    Frame::from_columns(
        "test",
        columns
            .into_iter()
            .map(|(name, column)| (name.to_string(), column))
            .collect(),
    )
    .unwrap()
}

fn matching_frame(domains: &[Option<Domain>]) -> Frame {
    let color = domains[1].clone().unwrap();
    frame(vec![
        ("x", Column::numeric(vec![1.0, 2.0, 3.0])),
        ("color", Column::categorical(vec![0.0, 1.0, 0.0], color)),
        ("y", Column::numeric(vec![0.5, 1.5, 2.5])),
    ])
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn identical_schema_is_untouched() {
    let (names, domains) = schema();
    let store = MemStore::new();
    let mut test = matching_frame(&domains);
    let keys: Vec<_> = test.columns().iter().map(|c| c.key()).collect();

    let warnings = adapt_test_for_train(&names, &domains, &mut test, f64::NAN, true, &store).unwrap();

    assert!(warnings.is_empty());
    let after: Vec<_> = test.columns().iter().map(|c| c.key()).collect();
    assert_eq!(keys, after);
    assert_eq!(store.live_columns(), 0);
}

#[test]
fn reorders_and_drops_extra_columns() {
    let (names, domains) = schema();
    let store = MemStore::new();
    let color = domains[1].clone().unwrap();
    let mut test = frame(vec![
        ("y", Column::numeric(vec![0.5, 1.5])),
        ("extra", Column::numeric(vec![9.0, 9.0])),
        ("color", Column::categorical(vec![1.0, 0.0], color)),
        ("x", Column::numeric(vec![1.0, 2.0])),
    ]);
    let x_key = test.column("x").unwrap().key();

    let warnings = adapt_test_for_train(&names, &domains, &mut test, f64::NAN, true, &store).unwrap();

    assert!(warnings.is_empty());
    assert_eq!(test.names(), names.as_slice());
    // Unchanged columns are aliased, not copied.
    assert_eq!(test.column("x").unwrap().key(), x_key);
    assert!(test.column("extra").is_none());
    assert_eq!(store.live_columns(), 0);
}

#[test]
fn missing_column_is_synthesized() {
    let (names, domains) = schema();
    let store = MemStore::new();
    let mut test = frame(vec![
        ("x", Column::numeric(vec![1.0, 2.0])),
        ("y", Column::numeric(vec![0.5, 1.5])),
    ]);

    let warnings = adapt_test_for_train(&names, &domains, &mut test, f64::NAN, true, &store).unwrap();

    assert_eq!(warnings, vec!["Validation set is missing training column color"]);
    let color = test.column("color").unwrap();
    assert_eq!(color.len(), 2);
    assert!(color.values().iter().all(|v| v.is_nan()));
    assert_eq!(color.domain(), domains[1].as_ref());
    assert!(store.is_live(color.key()));
}

#[test]
fn missing_column_uses_sentinel() {
    let (names, domains) = schema();
    let store = MemStore::new();
    let color = domains[1].clone().unwrap();
    let mut test = frame(vec![
        ("x", Column::numeric(vec![1.0, 2.0])),
        ("color", Column::categorical(vec![0.0, 1.0], color)),
    ]);

    adapt_test_for_train(&names, &domains, &mut test, -1.0, true, &store).unwrap();

    let y = test.column("y").unwrap();
    assert_eq!(y.values().to_vec(), vec![-1.0, -1.0]);
}

#[test]
fn cheap_check_never_materializes() {
    let (names, domains) = schema();
    let store = MemStore::new();
    let mut test = frame(vec![
        ("color", Column::from_levels(&[Some("green"), Some("red")])),
        ("x", Column::numeric(vec![1.0, 2.0])),
    ]);
    let before = test.clone();

    let warnings =
        adapt_test_for_train(&names, &domains, &mut test, f64::NAN, false, &store).unwrap();

    assert_eq!(
        warnings,
        vec![
            "Validation column color has levels not trained on: [green]",
            "Validation set is missing training column y",
        ]
    );
    assert_eq!(test.names(), before.names());
    assert_eq!(test.checksum(), before.checksum());
    assert_eq!(store.live_columns(), 0);
}

#[test]
fn unseen_levels_extend_training_domain() {
    let (names, domains) = schema();
    let store = MemStore::new();
    // Sorted domain: [green, purple, red].
    let mut test = frame(vec![
        ("x", Column::numeric(vec![1.0, 2.0, 3.0, 4.0])),
        (
            "color",
            Column::from_levels(&[Some("red"), Some("purple"), Some("green"), None]),
        ),
        ("y", Column::numeric(vec![0.0; 4])),
    ]);

    let warnings = adapt_test_for_train(&names, &domains, &mut test, f64::NAN, true, &store).unwrap();

    assert_eq!(
        warnings,
        vec!["Validation column color has levels not trained on: [green, purple]"]
    );
    let color = test.column("color").unwrap();
    let domain = color.domain().unwrap();
    assert_eq!(domain.levels(), ["blue", "red", "green", "purple"]);
    assert!(domain.starts_with(domains[1].as_ref().unwrap()));
    assert_eq!(color.at(0), 1.0);
    assert_eq!(color.at(1), 3.0);
    assert_eq!(color.at(2), 2.0);
    assert!(color.at(3).is_nan());
    assert_eq!(color.level_at(0), Some("red"));
}

#[test]
fn subset_domain_reuses_training_levels() {
    let (names, domains) = schema();
    let store = MemStore::new();
    let mut test = frame(vec![
        ("x", Column::numeric(vec![1.0, 2.0])),
        ("color", Column::from_levels(&[Some("red"), Some("red")])),
        ("y", Column::numeric(vec![0.0, 0.0])),
    ]);

    let warnings = adapt_test_for_train(&names, &domains, &mut test, f64::NAN, true, &store).unwrap();

    assert!(warnings.is_empty());
    let color = test.column("color").unwrap();
    assert!(color.domain().unwrap().ptr_eq(domains[1].as_ref().unwrap()));
    assert_eq!(color.values().to_vec(), vec![1.0, 1.0]);
}

#[test]
fn numeric_scoring_column_maps_by_text() {
    let names = vec!["grade".to_string(), "y".to_string()];
    let domains = vec![Some(Domain::new(["1", "2", "3"])), None];
    let store = MemStore::new();
    let mut test = frame(vec![
        ("grade", Column::numeric(vec![3.0, 1.0, 4.0, f64::NAN])),
        ("y", Column::numeric(vec![0.0; 4])),
    ]);

    let warnings = adapt_test_for_train(&names, &domains, &mut test, f64::NAN, true, &store).unwrap();

    assert_eq!(
        warnings,
        vec!["Validation column grade has levels not trained on: [4]"]
    );
    let grade = test.column("grade").unwrap();
    assert_eq!(grade.domain().unwrap().levels(), ["1", "2", "3", "4"]);
    assert_eq!(grade.at(0), 2.0);
    assert_eq!(grade.at(1), 0.0);
    assert_eq!(grade.at(2), 3.0);
    assert!(grade.at(3).is_nan());
}

#[test]
fn categorical_for_numeric_column_fails() {
    let (names, domains) = schema();
    let store = MemStore::new();
    let mut test = frame(vec![
        ("x", Column::from_levels(&[Some("a"), Some("b")])),
        ("color", Column::from_levels(&[Some("blue"), Some("green")])),
        ("y", Column::numeric(vec![0.0, 0.0])),
    ]);

    let err = adapt_test_for_train(&names, &domains, &mut test, f64::NAN, true, &store).unwrap_err();

    assert!(matches!(err, ScoreError::TypeMismatch { ref column } if column == "x"));
    assert_eq!(store.live_columns(), 0);
}

#[rstest]
#[case(true)]
#[case(false)]
fn no_common_columns_fails(#[case] expensive: bool) {
    let (names, domains) = schema();
    let store = MemStore::new();
    let mut test = frame(vec![("other", Column::numeric(vec![1.0, 2.0]))]);

    let err =
        adapt_test_for_train(&names, &domains, &mut test, f64::NAN, expensive, &store).unwrap_err();

    assert!(matches!(err, ScoreError::NoCommonColumns));
    assert_eq!(test.names(), ["other"]);
    assert_eq!(store.live_columns(), 0);
}

#[rstest]
#[case(true)]
#[case(false)]
fn warnings_do_not_depend_on_mode(#[case] expensive: bool) {
    let (names, domains) = schema();
    let store = MemStore::new();
    let mut test = frame(vec![
        ("x", Column::numeric(vec![1.0])),
        ("color", Column::from_levels(&[Some("teal")])),
    ]);

    let warnings =
        adapt_test_for_train(&names, &domains, &mut test, f64::NAN, expensive, &store).unwrap();

    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].contains("[teal]"));
    assert!(warnings[1].ends_with("column y"));
}

#[test]
fn adapted_frame_releases_only_its_own_columns() {
    let (names, domains) = schema();
    let store = MemStore::new();
    let original = frame(vec![
        ("x", Column::numeric(vec![1.0, 2.0])),
        ("color", Column::from_levels(&[Some("red"), Some("red")])),
    ]);
    store.put_frame(original.clone()).unwrap();
    let live = store.live_columns();

    {
        let (adapted, warnings) =
            AdaptedFrame::new(&names, &domains, &original, f64::NAN, &store).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(adapted.frame().names(), names.as_slice());
        // Recoded color plus the synthesized response.
        assert_eq!(store.live_columns(), live + 2);
        // Caller's frame is not modified.
        assert_eq!(original.names(), ["x", "color"]);
    }

    assert_eq!(store.live_columns(), live);
    for column in original.columns() {
        assert!(store.is_live(column.key()));
    }
}
