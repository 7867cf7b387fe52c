use super::result::{build_bucket, build_result};
use super::table::Range;
use crate::aggregations::agg_trait::{Aggregator, BucketOrd};
use crate::aggregations::format::AggregationContext;
use crate::aggregations::types::AggregationResult;
use crate::aggregations::values::{DocId, ValuesSourceConfig};
use crate::error::{Error, Result};

/// Range aggregator for a field absent from the current data subset.
///
/// Collects nothing and reports one zero-count bucket per declared range,
/// with bounds resolved up front and no sub-aggregation results.
/// Buckets keep declaration order: the ranges are never sorted here, unlike
/// [`super::RangeAggregator`].
pub struct UnmappedRangeAggregator {
    name: String,
    config: ValuesSourceConfig,
    ranges: Vec<Range>,
    keyed: bool,
    finalized: bool,
}

impl UnmappedRangeAggregator {
    pub fn new(
        name: impl Into<String>,
        config: ValuesSourceConfig,
        mut ranges: Vec<Range>,
        keyed: bool,
        ctx: &AggregationContext,
    ) -> Result<Self> {
        let name = name.into();
        for range in &mut ranges {
            range.resolve(config.parser.as_deref(), ctx)?;
        }
        tracing::debug!(agg = %name, field = %config.field, "field unmapped, zero-filling range buckets");
        Ok(Self {
            name,
            config,
            ranges,
            keyed,
            finalized: false,
        })
    }
}

impl Aggregator for UnmappedRangeAggregator {
    fn name(&self) -> &str {
        &self.name
    }

    fn wants_collection(&self) -> bool {
        false
    }

    fn collect(&mut self, _doc: DocId, _bucket: BucketOrd) -> Result<()> {
        Ok(())
    }

    fn finalize_collection(&mut self) -> Result<()> {
        if self.finalized {
            return Err(Error::PreconditionViolation(format!(
                "range aggregation '{}' finalized twice",
                self.name
            )));
        }
        self.finalized = true;
        Ok(())
    }

    fn build_result(&self, bucket: BucketOrd) -> Result<AggregationResult> {
        if bucket != 0 {
            return Err(Error::PreconditionViolation(format!(
                "range aggregation '{}' builds owning bucket 0 only, got {}",
                self.name, bucket
            )));
        }
        if !self.finalized {
            return Err(Error::PreconditionViolation(format!(
                "range aggregation '{}' built before finalize",
                self.name
            )));
        }

        let formatter = self.config.formatter.as_deref();
        let buckets = self
            .ranges
            .iter()
            .map(|range| build_bucket(range, 0, Vec::new(), formatter))
            .collect();
        Ok(build_result(&self.name, buckets, self.keyed))
    }
}
