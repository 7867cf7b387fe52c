use super::table::Range;
use crate::aggregations::format::{RawFormatter, ValueFormatter};
use crate::aggregations::types::{AggregationResult, AggregationValue, Bucket, RangeResult};

/// Key shown for a range declared without one: `from-to`, `*` when unbounded.
pub fn default_key(from: f64, to: f64, formatter: Option<&dyn ValueFormatter>) -> String {
    let formatter = formatter.unwrap_or(&RawFormatter);
    let side = |v: f64| {
        if v.is_infinite() {
            "*".to_string()
        } else {
            formatter.format(v)
        }
    };
    format!("{}-{}", side(from), side(to))
}

pub(crate) fn build_bucket(
    range: &Range,
    doc_count: u64,
    sub_aggs: Vec<AggregationResult>,
    formatter: Option<&dyn ValueFormatter>,
) -> Bucket {
    let bounded = |v: f64| if v.is_infinite() { None } else { Some(v) };
    let from = bounded(range.from);
    let to = bounded(range.to);
    Bucket {
        key: range
            .key
            .clone()
            .unwrap_or_else(|| default_key(range.from, range.to, formatter)),
        from,
        to,
        from_as_string: formatter.zip(from).map(|(f, v)| f.format(v)),
        to_as_string: formatter.zip(to).map(|(f, v)| f.format(v)),
        doc_count,
        sub_aggs,
    }
}

pub(crate) fn build_result(name: &str, buckets: Vec<Bucket>, keyed: bool) -> AggregationResult {
    AggregationResult {
        name: name.to_string(),
        value: AggregationValue::Range(RangeResult { buckets, keyed }),
    }
}
