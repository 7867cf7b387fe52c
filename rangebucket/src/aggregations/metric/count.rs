use crate::aggregations::agg_trait::{Aggregator, BucketOrd};
use crate::aggregations::types::{AggregationResult, AggregationValue};
use crate::aggregations::values::DocId;
use crate::error::Result;

/// Number of documents collected into each bucket.
pub struct CountAgg {
    name: String,
    counts: Vec<u64>,
}

impl CountAgg {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            counts: Vec::new(),
        }
    }
}

impl Aggregator for CountAgg {
    fn name(&self) -> &str {
        &self.name
    }

    fn wants_collection(&self) -> bool {
        true
    }

    fn collect(&mut self, _doc: DocId, bucket: BucketOrd) -> Result<()> {
        *super::fruit_mut(&mut self.counts, bucket) += 1;
        Ok(())
    }

    fn finalize_collection(&mut self) -> Result<()> {
        Ok(())
    }

    fn build_result(&self, bucket: BucketOrd) -> Result<AggregationResult> {
        let count = self.counts.get(bucket).copied().unwrap_or(0);
        Ok(AggregationResult {
            name: self.name.clone(),
            value: AggregationValue::Single(count as f64),
        })
    }
}
