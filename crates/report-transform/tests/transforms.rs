//! Integration tests for the transformation engine.

use std::collections::BTreeMap;

use polars::prelude::DataFrame;
use report_model::{
    CalculateTransform, ExtractTransform, FilterTransform, GlobalStep, GroupByTransform,
    JoinTransform, RenameTransform, Row, Scalar, SortTransform, Transformation,
};
use report_transform::{
    GlobalPipeline, SourceTable, TableStep, TransformError, apply_join, apply_local_chain,
    column_names, frame_from_rows, frame_to_rows, row_columns,
};

fn rows(records: &[&[(&str, Scalar)]]) -> Vec<Row> {
    records
        .iter()
        .map(|record| {
            record
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect()
        })
        .collect()
}

fn test_df(columns: &[&str], records: &[&[(&str, Scalar)]]) -> DataFrame {
    let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
    frame_from_rows(&columns, &rows(records)).expect("test frame")
}

fn column(df: &DataFrame, name: &str) -> Vec<Scalar> {
    frame_to_rows(df)
        .expect("rows")
        .into_iter()
        .map(|mut row| row.remove(name).unwrap_or_default())
        .collect()
}

fn group_by(columns: &[&str], aggs: &[(&str, &str)]) -> Transformation {
    Transformation::GroupBy(GroupByTransform {
        source: "t".into(),
        columns: columns.iter().map(|c| c.to_string()).collect(),
        aggregations: aggs
            .iter()
            .map(|(c, f)| (c.to_string(), f.to_string()))
            .collect(),
    })
}

#[test]
fn group_by_sum_without_keys_collapses_to_one_row() {
    let df = test_df(
        &["x"],
        &[
            &[("x", Scalar::Int(1))],
            &[("x", Scalar::Int(2))],
            &[("x", Scalar::Int(3))],
        ],
    );
    let out = group_by(&[], &[("x", "sum")]).apply(df).unwrap();
    assert_eq!(out.height(), 1);
    assert_eq!(column_names(&out), vec!["x"]);
    assert_eq!(column(&out, "x")[0].as_f64(), Some(6.0));
}

#[test]
fn group_by_unknown_function_is_unsupported() {
    let df = test_df(&["x"], &[&[("x", Scalar::Int(1))]]);
    let err = group_by(&[], &[("x", "median")]).apply(df).unwrap_err();
    assert!(matches!(err, TransformError::UnsupportedAggregation(name) if name == "median"));
}

#[test]
fn group_by_keeps_first_appearance_order() {
    let df = test_df(
        &["campaign", "clicks", "cost"],
        &[
            &[("campaign", "b".into()), ("clicks", Scalar::Int(1)), ("cost", Scalar::Float(1.5))],
            &[("campaign", "a".into()), ("clicks", Scalar::Int(2)), ("cost", Scalar::Float(2.0))],
            &[("campaign", "b".into()), ("clicks", Scalar::Int(3)), ("cost", Scalar::Float(0.5))],
        ],
    );
    let out = group_by(&["campaign"], &[("clicks", "sum"), ("cost", "max")])
        .apply(df)
        .unwrap();
    assert_eq!(column_names(&out), vec!["campaign", "clicks", "cost"]);
    assert_eq!(column(&out, "campaign"), vec![Scalar::from("b"), Scalar::from("a")]);
    let clicks: Vec<Option<f64>> = column(&out, "clicks").iter().map(Scalar::as_f64).collect();
    assert_eq!(clicks, vec![Some(4.0), Some(2.0)]);
    assert_eq!(column(&out, "cost")[0].as_f64(), Some(1.5));
}

#[test]
fn group_by_count_and_avg() {
    let df = test_df(
        &["k", "v"],
        &[
            &[("k", "a".into()), ("v", Scalar::Int(2))],
            &[("k", "a".into()), ("v", Scalar::Int(4))],
            &[("k", "a".into()), ("v", Scalar::Null)],
        ],
    );
    let count = group_by(&["k"], &[("v", "count")]).apply(df.clone()).unwrap();
    assert_eq!(column(&count, "v")[0].as_f64(), Some(2.0));
    let avg = group_by(&["k"], &[("v", "avg")]).apply(df).unwrap();
    assert_eq!(column(&avg, "v")[0].as_f64(), Some(3.0));
}

#[test]
fn extract_captures_first_group_and_nulls_non_matches() {
    let df = test_df(
        &["utm_source"],
        &[
            &[("utm_source", "google_cpc".into())],
            &[("utm_source", "_direct".into())],
            &[("utm_source", Scalar::Null)],
        ],
    );
    let step = Transformation::Extract(ExtractTransform {
        source: "t".into(),
        column: "utm_source".into(),
        pattern: "^([^_]+)".into(),
        output_column: "engine".into(),
    });
    let out = step.apply(df).unwrap();
    assert_eq!(out.height(), 3);
    assert_eq!(
        column(&out, "engine"),
        vec![Scalar::from("google"), Scalar::Null, Scalar::Null]
    );
}

#[test]
fn filter_null_checks_ignore_value() {
    let df = test_df(
        &["v"],
        &[&[("v", Scalar::Int(1))], &[("v", Scalar::Null)], &[("v", Scalar::Int(3))]],
    );
    let step = Transformation::Filter(FilterTransform {
        source: "t".into(),
        column: "v".into(),
        operator: "not_null".into(),
        value: Some(Scalar::from("ignored")),
    });
    assert_eq!(step.apply(df.clone()).unwrap().height(), 2);

    let step = Transformation::Filter(FilterTransform {
        source: "t".into(),
        column: "v".into(),
        operator: "is_null".into(),
        value: None,
    });
    assert_eq!(step.apply(df).unwrap().height(), 1);
}

#[test]
fn filter_comparisons() {
    let df = test_df(
        &["name", "clicks"],
        &[
            &[("name", "brand_search".into()), ("clicks", Scalar::Int(10))],
            &[("name", "generic".into()), ("clicks", Scalar::Int(3))],
            &[("name", "brand_display".into()), ("clicks", Scalar::Int(7))],
        ],
    );
    let filter = |column: &str, operator: &str, value: Scalar| {
        Transformation::Filter(FilterTransform {
            source: "t".into(),
            column: column.into(),
            operator: operator.into(),
            value: Some(value),
        })
    };
    let out = filter("name", "contains", "brand".into()).apply(df.clone()).unwrap();
    assert_eq!(out.height(), 2);
    let out = filter("clicks", "gt", Scalar::Int(5)).apply(df.clone()).unwrap();
    assert_eq!(
        column(&out, "name"),
        vec![Scalar::from("brand_search"), Scalar::from("brand_display")]
    );
    let out = filter("clicks", "ne", Scalar::Int(3)).apply(df.clone()).unwrap();
    assert_eq!(out.height(), 2);
    let err = filter("clicks", "between", Scalar::Int(3)).apply(df).unwrap_err();
    assert!(matches!(err, TransformError::UnsupportedOperator(_)));
}

#[test]
fn filter_comparison_requires_value() {
    let df = test_df(&["v"], &[&[("v", Scalar::Int(1))]]);
    let step = Transformation::Filter(FilterTransform {
        source: "t".into(),
        column: "v".into(),
        operator: "eq".into(),
        value: None,
    });
    assert!(matches!(
        step.apply(df),
        Err(TransformError::MissingFilterValue { .. })
    ));
}

#[test]
fn calculate_is_row_local() {
    let df = test_df(
        &["Cost", "Clicks"],
        &[
            &[("Cost", Scalar::Float(10.0)), ("Clicks", Scalar::Int(4))],
            &[("Cost", Scalar::Float(5.0)), ("Clicks", Scalar::Int(0))],
            &[("Cost", Scalar::Null), ("Clicks", Scalar::Int(2))],
        ],
    );
    let step = Transformation::Calculate(CalculateTransform {
        source: "t".into(),
        output_column: "Cpc".into(),
        formula: "Cost / Clicks".into(),
    });
    let out = step.apply(df).unwrap();
    assert_eq!(
        column(&out, "Cpc"),
        vec![Scalar::Float(2.5), Scalar::Null, Scalar::Null]
    );
}

#[test]
fn calculate_unknown_column_fails() {
    let df = test_df(&["a"], &[&[("a", Scalar::Int(1))]]);
    let step = Transformation::Calculate(CalculateTransform {
        source: "t".into(),
        output_column: "b".into(),
        formula: "a + missing".into(),
    });
    assert!(matches!(step.apply(df), Err(TransformError::MissingColumn(name)) if name == "missing"));
}

#[test]
fn sort_is_stable_with_nulls_last() {
    let df = test_df(
        &["k", "order"],
        &[
            &[("k", Scalar::Int(2)), ("order", Scalar::Int(0))],
            &[("k", Scalar::Null), ("order", Scalar::Int(1))],
            &[("k", Scalar::Int(1)), ("order", Scalar::Int(2))],
            &[("k", Scalar::Int(2)), ("order", Scalar::Int(3))],
        ],
    );
    let step = Transformation::Sort(SortTransform {
        source: "t".into(),
        columns: vec!["k".into()],
    });
    let out = step.apply(df).unwrap();
    assert_eq!(
        column(&out, "order"),
        vec![Scalar::Int(2), Scalar::Int(0), Scalar::Int(3), Scalar::Int(1)]
    );
}

#[test]
fn join_is_rejected_as_single_input_step() {
    let df = test_df(&["a"], &[]);
    let step = Transformation::Join(JoinTransform::default());
    assert!(matches!(step.apply(df), Err(TransformError::JoinOutsideGlobal)));
}

fn join_inputs() -> (DataFrame, DataFrame) {
    let left = test_df(
        &["Date", "Clicks"],
        &[
            &[("Date", "2025-03-01".into()), ("Clicks", Scalar::Int(10))],
            &[("Date", "2025-03-02".into()), ("Clicks", Scalar::Int(20))],
        ],
    );
    let right = test_df(
        &["Date", "Clicks", "Visits"],
        &[
            &[("Date", "2025-03-02".into()), ("Clicks", Scalar::Int(1)), ("Visits", Scalar::Int(200))],
            &[("Date", "2025-03-03".into()), ("Clicks", Scalar::Int(2)), ("Visits", Scalar::Int(300))],
        ],
    );
    (left, right)
}

fn join(how: &str) -> JoinTransform {
    JoinTransform {
        left: "l".into(),
        right: "r".into(),
        on: "Date".into(),
        how: how.into(),
    }
}

#[test]
fn join_flavours() {
    let (left, right) = join_inputs();

    let out = apply_join(&left, &right, &join("left")).unwrap();
    assert_eq!(column_names(&out), vec!["Date", "Clicks", "Clicks_right", "Visits"]);
    assert_eq!(column(&out, "Visits"), vec![Scalar::Null, Scalar::Int(200)]);

    let out = apply_join(&left, &right, &join("inner")).unwrap();
    assert_eq!(column(&out, "Date"), vec![Scalar::from("2025-03-02")]);

    let out = apply_join(&left, &right, &join("right")).unwrap();
    assert_eq!(
        column(&out, "Date"),
        vec![Scalar::from("2025-03-02"), Scalar::from("2025-03-03")]
    );
    assert_eq!(column(&out, "Clicks"), vec![Scalar::Int(20), Scalar::Null]);

    let out = apply_join(&left, &right, &join("outer")).unwrap();
    assert_eq!(
        column(&out, "Date"),
        vec![
            Scalar::from("2025-03-01"),
            Scalar::from("2025-03-02"),
            Scalar::from("2025-03-03")
        ]
    );
}

#[test]
fn join_unknown_how_is_unsupported() {
    let (left, right) = join_inputs();
    let err = apply_join(&left, &right, &join("cross")).unwrap_err();
    assert!(matches!(err, TransformError::UnsupportedJoinType(name) if name == "cross"));
}

#[test]
fn local_chain_applies_in_order() {
    let df = test_df(
        &["utm", "visits"],
        &[
            &[("utm", "google_cpc".into()), ("visits", Scalar::Int(3))],
            &[("utm", "yandex_cpc".into()), ("visits", Scalar::Int(5))],
            &[("utm", "google_organic".into()), ("visits", Scalar::Int(1))],
        ],
    );
    let chain = vec![
        Transformation::Extract(ExtractTransform {
            source: "s".into(),
            column: "utm".into(),
            pattern: "^([^_]+)".into(),
            output_column: "engine".into(),
        }),
        group_by(&["engine"], &[("visits", "sum")]),
        Transformation::Rename(RenameTransform {
            source: "s".into(),
            mapping: BTreeMap::from([("visits".to_string(), "Visits".to_string())]),
        }),
    ];
    let out = apply_local_chain(df, &chain).unwrap();
    assert_eq!(column_names(&out), vec!["engine", "Visits"]);
    let visits: Vec<Option<f64>> = column(&out, "Visits").iter().map(Scalar::as_f64).collect();
    assert_eq!(visits, vec![Some(4.0), Some(5.0)]);
}

#[test]
fn global_pipeline_without_steps_unions_sources() {
    let (left, right) = join_inputs();
    let out = GlobalPipeline::new(&[])
        .run(vec![
            SourceTable::available("direct_1", left),
            SourceTable::available("metrika_2", right),
        ])
        .unwrap();
    assert_eq!(out.frame.height(), 4);
    assert_eq!(column_names(&out.frame), vec!["Date", "Clicks", "Visits"]);
}

#[test]
fn global_steps_address_named_outputs() {
    let (left, right) = join_inputs();
    let steps = vec![
        GlobalStep::new(Transformation::Join(JoinTransform {
            left: "direct_1".into(),
            right: "metrika_2".into(),
            on: "Date".into(),
            how: "left".into(),
        }))
        .with_output("combined"),
        GlobalStep::new(Transformation::Sort(SortTransform {
            source: "combined".into(),
            columns: vec!["Clicks".into()],
        })),
    ];
    let out = GlobalPipeline::new(&steps)
        .run(vec![
            SourceTable::available("direct_1", left),
            SourceTable::available("metrika_2", right),
        ])
        .unwrap();
    assert!(out.skipped_steps.is_empty());
    assert_eq!(out.frame.height(), 2);
    assert!(column_names(&out.frame).contains(&"Visits".to_string()));
}

#[test]
fn global_step_with_unknown_input_fails() {
    let (left, _) = join_inputs();
    let steps = vec![GlobalStep::new(Transformation::Sort(SortTransform {
        source: "nowhere".into(),
        columns: vec![],
    }))];
    let err = GlobalPipeline::new(&steps)
        .run(vec![SourceTable::available("direct_1", left)])
        .unwrap_err();
    assert!(matches!(err, TransformError::UnknownInput(name) if name == "nowhere"));
}

#[test]
fn steps_over_failed_sources_are_skipped() {
    let (left, _) = join_inputs();
    let steps = vec![
        GlobalStep::new(Transformation::Join(JoinTransform {
            left: "direct_1".into(),
            right: "metrika_2".into(),
            on: "Date".into(),
            how: "left".into(),
        }))
        .with_output("combined"),
        GlobalStep::new(Transformation::Sort(SortTransform {
            source: "combined".into(),
            columns: vec!["Date".into()],
        })),
        GlobalStep::new(Transformation::Sort(SortTransform {
            source: "direct_1".into(),
            columns: vec!["Clicks".into()],
        })),
    ];
    let out = GlobalPipeline::new(&steps)
        .run(vec![
            SourceTable::available("direct_1", left),
            SourceTable::unavailable("metrika_2"),
        ])
        .unwrap();
    assert_eq!(out.skipped_steps, vec![0, 1]);
    assert_eq!(column_names(&out.frame), vec!["Date", "Clicks"]);
}

#[test]
fn pipeline_is_deterministic() {
    let run = || {
        let (left, right) = join_inputs();
        let steps = vec![GlobalStep::new(Transformation::Join(join("outer")))];
        let out = GlobalPipeline::new(&steps)
            .run(vec![SourceTable::available("l", left), SourceTable::available("r", right)])
            .unwrap();
        frame_to_rows(&out.frame).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn declared_columns_drive_frame_order() {
    let records = rows(&[&[("b", Scalar::Int(1)), ("a", Scalar::Int(2))]]);
    let columns = row_columns(&["b".to_string()], &records);
    let df = frame_from_rows(&columns, &records).unwrap();
    assert_eq!(column_names(&df), vec!["b", "a"]);
}
