//! End-to-end range aggregation tests over in-memory columns.

use chrono::{TimeZone, Utc};
use rangebucket::aggregations::{
    execute, AggregationContext, AggregationRequest, AggregationResult, AggregationType,
    AggregationValue, Bucket, RangeEntry, RangeResult,
};
use rangebucket::aggregations::values::InMemoryColumns;
use rangebucket::config::AggregationConfig;
use rangebucket::Error;
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn run(req: &AggregationRequest, columns: &InMemoryColumns) -> AggregationResult {
    execute(req, columns, AggregationContext::new(), &AggregationConfig::default()).unwrap()
}

fn range_result(result: &AggregationResult) -> &RangeResult {
    match &result.value {
        AggregationValue::Range(r) => r,
        other => panic!("Expected range result, got {:?}", other),
    }
}

fn key_counts(result: &AggregationResult) -> Vec<(String, u64)> {
    range_result(result)
        .buckets
        .iter()
        .map(|b| (b.key.clone(), b.doc_count))
        .collect()
}

fn price_columns() -> InMemoryColumns {
    // doc 3 has no price at all
    InMemoryColumns::new(0).with_column(
        "price",
        vec![vec![7.0], vec![10.0], vec![1.0, 2.0, 3.0], vec![], vec![14.0, 4.0], vec![25.0]],
    )
}

fn range_request(ranges: Vec<RangeEntry>) -> AggregationRequest {
    AggregationRequest::new("prices", AggregationType::range("price".into(), ranges))
}

fn counts(kc: &[(&str, u64)]) -> Vec<(String, u64)> {
    kc.iter().map(|(k, c)| (k.to_string(), *c)).collect()
}

// ---------------------------------------------------------------------------
// Matching semantics
// ---------------------------------------------------------------------------

#[test]
fn test_overlapping_ranges_boundaries() {
    let req = range_request(vec![RangeEntry::between(0.0, 10.0), RangeEntry::between(5.0, 15.0)]);
    let result = run(&req, &price_columns());

    // 7 -> both, 10 -> second only, [1,2,3] -> first once, [14,4] -> both once, 25 -> none
    assert_eq!(
        key_counts(&result),
        counts(&[("0.0-10.0", 3), ("5.0-15.0", 3)])
    );
}

#[test]
fn test_multi_valued_document_counted_once() {
    let columns = InMemoryColumns::new(0).with_column("price", vec![vec![1.0, 2.0, 3.0]]);
    let req = range_request(vec![RangeEntry::between(0.0, 10.0)]);
    assert_eq!(key_counts(&run(&req, &columns)), counts(&[("0.0-10.0", 1)]));
}

#[test]
fn test_buckets_follow_sorted_order() {
    let req = range_request(vec![
        RangeEntry::between(10.0, 20.0),
        RangeEntry::between(0.0, 10.0),
        RangeEntry::between(0.0, 5.0),
    ]);
    let result = run(&req, &price_columns());
    let keys: Vec<_> = key_counts(&result).into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["0.0-5.0", "0.0-10.0", "10.0-20.0"]);
}

#[test]
fn test_unbounded_ranges() {
    let req = range_request(vec![
        RangeEntry::below(5.0).with_key("low"),
        RangeEntry::at_least(10.0).with_key("high"),
        RangeEntry::new(None::<f64>, None::<f64>).with_key("all"),
    ]);
    let result = run(&req, &price_columns());
    let r = range_result(&result);

    assert_eq!(r.bucket("low").unwrap().doc_count, 2);
    assert_eq!(r.bucket("high").unwrap().doc_count, 3);
    assert_eq!(r.bucket("all").unwrap().doc_count, 5);
    assert_eq!(r.bucket("low").unwrap().from, None);
    assert_eq!(r.bucket("high").unwrap().to, None);
}

#[test]
fn test_string_bounds_use_default_parser() {
    let req = range_request(vec![RangeEntry::between("0", "7.5"), RangeEntry::at_least("7.5")]);
    assert_eq!(
        key_counts(&run(&req, &price_columns())),
        counts(&[("0.0-7.5", 3), ("7.5-*", 3)])
    );
}

#[test]
fn test_invalid_bound_fails_before_collection() {
    let req = range_request(vec![RangeEntry::between("zero", 10.0)]);
    let err = execute(
        &req,
        &price_columns(),
        AggregationContext::new(),
        &AggregationConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidRangeBound { ref literal, .. } if literal == "zero"));
}

#[test]
fn test_same_input_same_output() {
    let req = range_request(vec![
        RangeEntry::between(0.0, 10.0),
        RangeEntry::between(5.0, 15.0),
        RangeEntry::at_least(3.0),
    ]);
    let first = run(&req, &price_columns());
    let second = run(&req, &price_columns());
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// Zero-fill path
// ---------------------------------------------------------------------------

#[test]
fn test_unmapped_field_zero_fills_in_declaration_order() {
    let req = AggregationRequest::new(
        "sizes",
        AggregationType::range(
            "size".into(),
            vec![RangeEntry::between(10.0, 20.0), RangeEntry::below("10")],
        ),
    )
    .with_sub_agg(AggregationRequest::new("n", AggregationType::count()));

    let result = run(&req, &price_columns());
    let r = range_result(&result);
    let keys: Vec<_> = r.buckets.iter().map(|b| b.key.as_str()).collect();
    assert_eq!(keys, vec!["10.0-20.0", "*-10.0"]);
    assert!(r.buckets.iter().all(|b| b.doc_count == 0));
    assert!(r.buckets.iter().all(|b| b.sub_aggs.is_empty()));
}

#[test]
fn test_unmapped_field_still_rejects_bad_bounds() {
    let req = AggregationRequest::new(
        "sizes",
        AggregationType::range("size".into(), vec![RangeEntry::below("ten")]),
    );
    let err = execute(
        &req,
        &price_columns(),
        AggregationContext::new(),
        &AggregationConfig::default(),
    );
    assert!(matches!(err, Err(Error::InvalidRangeBound { .. })));
}

#[test]
fn test_config_unmapped_field_via_removal() {
    let mut columns = price_columns();
    columns.remove_field("price");
    let req = range_request(vec![RangeEntry::between(0.0, 10.0)]);
    assert_eq!(key_counts(&run(&req, &columns)), counts(&[("0.0-10.0", 0)]));
}

// ---------------------------------------------------------------------------
// Sub-aggregations
// ---------------------------------------------------------------------------

#[test]
fn test_sub_aggregations_scoped_per_bucket() {
    let columns = price_columns().with_column(
        "qty",
        vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0], vec![5.0], vec![6.0]],
    );
    let req = range_request(vec![
        RangeEntry::between(0.0, 10.0).with_key("cheap"),
        RangeEntry::between(5.0, 15.0).with_key("mid"),
    ])
    .with_sub_agg(AggregationRequest::new("n", AggregationType::count()))
    .with_sub_agg(AggregationRequest::new("qty_sum", AggregationType::sum("qty".into())))
    .with_sub_agg(AggregationRequest::new("qty_avg", AggregationType::avg("qty".into())))
    .with_sub_agg(AggregationRequest::new("price_max", AggregationType::max("price".into())))
    .with_sub_agg(AggregationRequest::new("missing_min", AggregationType::min("nope".into())));

    let result = run(&req, &columns);
    let r = range_result(&result);

    // cheap: docs 0 (7), 2 ([1,2,3]), 4 ([14,4])
    let cheap: &Bucket = r.bucket("cheap").unwrap();
    assert_eq!(cheap.doc_count, 3);
    assert_eq!(cheap.sub_agg("n"), Some(&AggregationValue::Single(3.0)));
    assert_eq!(cheap.sub_agg("qty_sum"), Some(&AggregationValue::Single(9.0)));
    assert_eq!(cheap.sub_agg("qty_avg"), Some(&AggregationValue::Optional(Some(3.0))));
    assert_eq!(cheap.sub_agg("price_max"), Some(&AggregationValue::Optional(Some(14.0))));
    assert_eq!(cheap.sub_agg("missing_min"), Some(&AggregationValue::Optional(None)));

    // mid: docs 0 (7), 1 (10), 4 ([14,4])
    let mid = r.bucket("mid").unwrap();
    assert_eq!(mid.doc_count, 3);
    assert_eq!(mid.sub_agg("qty_sum"), Some(&AggregationValue::Single(8.0)));
}

#[test]
fn test_stats_sub_aggregation() {
    let req = range_request(vec![RangeEntry::below(100.0)])
        .with_sub_agg(AggregationRequest::new("s", AggregationType::stats("price".into())));
    let result = run(&req, &price_columns());
    match range_result(&result).buckets[0].sub_agg("s") {
        Some(AggregationValue::Stats(stats)) => {
            assert_eq!(stats.count, 8);
            assert_eq!(stats.min, Some(1.0));
            assert_eq!(stats.max, Some(25.0));
            assert_eq!(stats.sum, Some(66.0));
        }
        other => panic!("Expected stats, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Date ranges and presentation
// ---------------------------------------------------------------------------

#[test]
fn test_date_range_with_date_math() {
    let now = Utc.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap();
    let ctx = AggregationContext::at(now);
    let docs = vec![
        json!({"created": "2024-03-14T08:00:00Z"}),
        json!({"created": "2024-03-13T23:59:59Z"}),
        json!({"created": "2024-02-01T00:00:00Z"}),
        json!({"created": ["2024-03-14T09:00:00Z", "2024-03-14T10:00:00Z"]}),
    ];
    let columns = InMemoryColumns::from_documents(&docs, &["created".to_string()], &ctx);

    let req = AggregationRequest::new(
        "recent",
        AggregationType::date_range(
            "created".into(),
            vec![
                RangeEntry::at_least("now/d").with_key("today"),
                RangeEntry::between("now-1M/M", "now/d"),
            ],
            Some("%Y-%m-%d".to_string()),
        ),
    );
    let result = execute(&req, &columns, ctx, &AggregationConfig::default()).unwrap();
    let r = range_result(&result);

    // sorted by from: [2024-02-01, 2024-03-14) before [2024-03-14, *)
    assert_eq!(r.buckets[0].key, "2024-02-01-2024-03-14");
    assert_eq!(r.buckets[0].doc_count, 2);
    assert_eq!(r.buckets[0].from_as_string.as_deref(), Some("2024-02-01"));
    assert_eq!(r.buckets[1].key, "today");
    assert_eq!(r.buckets[1].doc_count, 2);
    assert_eq!(r.buckets[1].to_as_string, None);
}

#[test]
fn test_date_range_bad_format_is_an_error() {
    let columns = InMemoryColumns::new(0).with_column("ts", vec![vec![5.0]]);
    let req = AggregationRequest::new(
        "dates",
        AggregationType::date_range(
            "ts".into(),
            vec![RangeEntry::between(0.0, 10.0)],
            Some("%Q".to_string()),
        ),
    );
    let err = execute(&req, &columns, AggregationContext::new(), &AggregationConfig::default());
    assert!(matches!(err, Err(Error::InvalidRequest(_))));
}

#[test]
fn test_keyed_output_json() {
    let req = AggregationRequest::new(
        "prices",
        AggregationType::keyed_range(
            "price".into(),
            vec![RangeEntry::below(5.0).with_key("low"), RangeEntry::at_least(20.0)],
        ),
    );
    let result = run(&req, &price_columns());
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({
            "name": "prices",
            "buckets": {
                "low": {"key": "low", "to": 5.0, "doc_count": 2},
                "20.0-*": {"key": "20.0-*", "from": 20.0, "doc_count": 1}
            }
        })
    );
}

#[test]
fn test_config_default_keyed_applies() {
    let req = range_request(vec![RangeEntry::below(5.0)]);
    let defaults = AggregationConfig {
        keyed: true,
        ..Default::default()
    };
    let result = execute(&req, &price_columns(), AggregationContext::new(), &defaults).unwrap();
    assert!(range_result(&result).keyed);
}

#[test]
fn test_request_from_json_end_to_end() {
    let req = AggregationRequest::from_json(
        r#"{
            "name": "prices",
            "type": "range",
            "field": "price",
            "ranges": [{"key": "a", "to": 10}, {"key": "b", "from": "5", "to": 15}],
            "aggs": [{"name": "n", "type": "count"}]
        }"#,
    )
    .unwrap();
    let result = run(&req, &price_columns());
    assert_eq!(key_counts(&result), counts(&[("a", 3), ("b", 3)]));
}
