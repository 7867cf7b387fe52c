use super::accumulator::BucketAccumulator;
use super::matcher::MatchState;
use super::result::{build_bucket, build_result};
use super::table::{Range, RangeTable};
use crate::aggregations::agg_trait::{Aggregator, BucketOrd};
use crate::aggregations::format::AggregationContext;
use crate::aggregations::types::AggregationResult;
use crate::aggregations::values::{DocId, NumericValuesSource};
use crate::error::{precondition, Error, Result};

/// Range aggregator over a field that exists in the current data subset.
pub struct RangeAggregator {
    name: String,
    source: NumericValuesSource,
    table: RangeTable,
    keyed: bool,
    matches: MatchState,
    buckets: BucketAccumulator,
    docs_seen: u64,
}

impl RangeAggregator {
    /// Resolves every bound, sorts the table and sizes per-range state.
    ///
    /// `sub_aggs` receive one bucket ordinal per range, in sorted order.
    pub fn new(
        name: impl Into<String>,
        source: NumericValuesSource,
        mut ranges: Vec<Range>,
        keyed: bool,
        sub_aggs: Vec<Box<dyn Aggregator>>,
        ctx: &AggregationContext,
    ) -> Result<Self> {
        let name = name.into();
        let parser = source.config().parser.clone();
        for range in &mut ranges {
            range.resolve(parser.as_deref(), ctx)?;
        }
        let table = RangeTable::build(ranges)?;

        tracing::debug!(
            agg = %name,
            field = %source.config().field,
            ranges = table.len(),
            "built range table"
        );

        Ok(Self {
            matches: MatchState::new(table.len()),
            buckets: BucketAccumulator::new(table.len(), sub_aggs),
            name,
            source,
            table,
            keyed,
            docs_seen: 0,
        })
    }

    pub fn table(&self) -> &RangeTable {
        &self.table
    }

    /// Count of range `ord` in sorted order.
    pub fn doc_count(&self, ord: BucketOrd) -> u64 {
        self.buckets.count(ord)
    }

    fn collect_value(&mut self, doc: DocId, value: f64) -> Result<()> {
        let Some(window) = self.table.candidate_window(value)? else {
            return Ok(());
        };
        tracing::trace!(doc, value, start = window.start(), end = window.end(), "candidate window");

        for ord in window {
            if self.table.ranges()[ord].matches(value) && self.matches.mark(ord) {
                self.buckets.record(doc, ord)?;
            }
        }
        Ok(())
    }
}

impl Aggregator for RangeAggregator {
    fn name(&self) -> &str {
        &self.name
    }

    fn wants_collection(&self) -> bool {
        true
    }

    fn collect(&mut self, doc: DocId, bucket: BucketOrd) -> Result<()> {
        if bucket != 0 {
            return Err(Error::PreconditionViolation(format!(
                "range aggregation '{}' collects into owning bucket 0 only, got {}",
                self.name, bucket
            )));
        }
        if self.buckets.is_finalized() {
            return Err(Error::PreconditionViolation(format!(
                "range aggregation '{}' received a document after finalize",
                self.name
            )));
        }
        precondition!(
            self.matches.is_clear(),
            "match state of '{}' not empty before doc {}",
            self.name,
            doc
        );

        let count = self.source.values_mut().set_document(doc);
        let outcome = (0..count).try_for_each(|_| {
            let value = self.source.values_mut().next_value();
            self.collect_value(doc, value)
        });
        self.matches.reset();
        self.docs_seen += 1;
        outcome
    }

    fn finalize_collection(&mut self) -> Result<()> {
        tracing::debug!(agg = %self.name, docs = self.docs_seen, "range collection complete");
        self.buckets.finalize()
    }

    fn build_result(&self, bucket: BucketOrd) -> Result<AggregationResult> {
        if bucket != 0 {
            return Err(Error::PreconditionViolation(format!(
                "range aggregation '{}' builds owning bucket 0 only, got {}",
                self.name, bucket
            )));
        }
        if !self.buckets.is_finalized() {
            return Err(Error::PreconditionViolation(format!(
                "range aggregation '{}' built before finalize",
                self.name
            )));
        }

        let formatter = self.source.config().formatter.as_deref();
        let buckets = self
            .table
            .ranges()
            .iter()
            .enumerate()
            .map(|(ord, range)| {
                let sub_aggs = self.buckets.sub_results(ord)?;
                Ok(build_bucket(range, self.buckets.count(ord), sub_aggs, formatter))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(build_result(&self.name, buckets, self.keyed))
    }
}
