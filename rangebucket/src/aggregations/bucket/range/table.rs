use crate::aggregations::format::{AggregationContext, NumberParser, ValueParser};
use crate::aggregations::types::{BoundValue, RangeEntry};
use crate::error::{precondition, Error, Result};
use std::cmp::Ordering;

/// Half-open interval `[from, to)` with an optional display key.
///
/// String bounds are kept aside until [`Range::resolve`] runs; numeric
/// bounds are usable immediately. Unspecified bounds are infinite.
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    pub key: Option<String>,
    pub from: f64,
    from_literal: Option<String>,
    pub to: f64,
    to_literal: Option<String>,
}

impl Range {
    pub fn new(key: Option<String>, from: f64, to: f64) -> Self {
        Self {
            key,
            from,
            from_literal: None,
            to,
            to_literal: None,
        }
    }

    pub fn from_entry(entry: &RangeEntry) -> Self {
        let (from, from_literal) = split_bound(entry.from.as_ref(), f64::NEG_INFINITY);
        let (to, to_literal) = split_bound(entry.to.as_ref(), f64::INFINITY);
        Self {
            key: entry.key.clone(),
            from,
            from_literal,
            to,
            to_literal,
        }
    }

    pub fn matches(&self, value: f64) -> bool {
        value >= self.from && value < self.to
    }

    pub fn is_resolved(&self) -> bool {
        self.from_literal.is_none() && self.to_literal.is_none()
    }

    /// Parses pending string bounds. Each literal is consumed, so a second
    /// call is a no-op. Without a parser, literals are read as decimals.
    pub fn resolve(&mut self, parser: Option<&dyn ValueParser>, ctx: &AggregationContext) -> Result<()> {
        let parser = parser.unwrap_or(&NumberParser);
        if let Some(literal) = self.from_literal.take() {
            self.from = parse_bound(parser, &literal, ctx)?;
        }
        if let Some(literal) = self.to_literal.take() {
            self.to = parse_bound(parser, &literal, ctx)?;
        }
        Ok(())
    }

    fn sort_order(&self, other: &Range) -> Ordering {
        self.from
            .total_cmp(&other.from)
            .then_with(|| self.to.total_cmp(&other.to))
    }
}

fn split_bound(bound: Option<&BoundValue>, unbounded: f64) -> (f64, Option<String>) {
    match bound {
        None => (unbounded, None),
        Some(BoundValue::Number(v)) => (*v, None),
        Some(BoundValue::Literal(s)) => (unbounded, Some(s.clone())),
    }
}

fn parse_bound(parser: &dyn ValueParser, literal: &str, ctx: &AggregationContext) -> Result<f64> {
    let value = parser.parse(literal, ctx)?;
    if value.is_nan() {
        return Err(Error::invalid_bound(literal, "NaN is not a valid bound"));
    }
    Ok(value)
}

/// Declared ranges sorted by `(from, to)` with the running maximum of `to`.
///
/// `max_to[i]` is the largest `to` among `ranges[..=i]`, so it never
/// decreases. The matcher relies on both arrays being complete before the
/// first lookup; the table is immutable once built.
#[derive(Debug, Clone)]
pub struct RangeTable {
    ranges: Vec<Range>,
    max_to: Vec<f64>,
}

impl RangeTable {
    /// Sorts resolved ranges and derives `max_to`.
    ///
    /// The sort is stable, so ranges with identical bounds keep their
    /// declaration order.
    pub fn build(mut ranges: Vec<Range>) -> Result<Self> {
        if let Some(r) = ranges.iter().find(|r| !r.is_resolved()) {
            return Err(Error::PreconditionViolation(format!(
                "range {:?} has unresolved bounds",
                r
            )));
        }
        if let Some(r) = ranges.iter().find(|r| r.from.is_nan() || r.to.is_nan()) {
            return Err(Error::invalid_bound(format!("{:?}", r), "NaN is not a valid bound"));
        }

        ranges.sort_by(Range::sort_order);

        let mut max_to = Vec::with_capacity(ranges.len());
        let mut running = f64::NEG_INFINITY;
        for r in &ranges {
            running = running.max(r.to);
            max_to.push(running);
        }

        precondition!(
            max_to.windows(2).all(|w| w[0] <= w[1]),
            "max_to is not monotonic: {:?}",
            max_to
        );

        if ranges.windows(2).any(|w| w[0].sort_order(&w[1]) == Ordering::Equal) {
            tracing::warn!("duplicate (from, to) ranges declared; their bucket order follows declaration");
        }

        Ok(Self { ranges, max_to })
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn max_to(&self) -> &[f64] {
        &self.max_to
    }
}
