use crate::aggregations::agg_trait::{Aggregator, BucketOrd};
use crate::aggregations::types::AggregationResult;
use crate::aggregations::values::DocId;
use crate::error::{Error, Result};

/// Per-range document counts plus the sub-aggregations scoped to each range.
pub(crate) struct BucketAccumulator {
    counts: Vec<u64>,
    sub_aggs: Vec<Box<dyn Aggregator>>,
    finalized: bool,
}

impl BucketAccumulator {
    pub(crate) fn new(num_buckets: usize, sub_aggs: Vec<Box<dyn Aggregator>>) -> Self {
        Self {
            counts: vec![0; num_buckets],
            sub_aggs,
            finalized: false,
        }
    }

    /// Records the first match of `doc` in bucket `ord`.
    pub(crate) fn record(&mut self, doc: DocId, ord: BucketOrd) -> Result<()> {
        self.counts[ord] += 1;
        for agg in self.sub_aggs.iter_mut().filter(|a| a.wants_collection()) {
            agg.collect(doc, ord)?;
        }
        Ok(())
    }

    /// Propagates end of collection to every sub-aggregation, once.
    pub(crate) fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Err(Error::PreconditionViolation(
                "bucket accumulator finalized twice".to_string(),
            ));
        }
        self.finalized = true;
        for agg in &mut self.sub_aggs {
            agg.finalize_collection()?;
        }
        Ok(())
    }

    pub(crate) fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub(crate) fn count(&self, ord: BucketOrd) -> u64 {
        self.counts[ord]
    }

    pub(crate) fn sub_results(&self, ord: BucketOrd) -> Result<Vec<AggregationResult>> {
        self.sub_aggs.iter().map(|agg| agg.build_result(ord)).collect()
    }
}
