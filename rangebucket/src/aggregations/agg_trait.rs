use crate::aggregations::types::AggregationResult;
use crate::aggregations::values::DocId;
use crate::error::Result;

/// Index of a bucket within its parent aggregator.
pub type BucketOrd = usize;

/// Lifecycle every aggregator in a tree exposes to its parent.
///
/// Documents are offered one at a time through `collect`, then
/// `finalize_collection` runs exactly once, after which results can be
/// built per bucket ordinal.
pub trait Aggregator: Send {
    fn name(&self) -> &str;

    /// `false` when there is nothing to collect, e.g. the field is absent.
    fn wants_collection(&self) -> bool;

    fn collect(&mut self, doc: DocId, bucket: BucketOrd) -> Result<()>;

    fn finalize_collection(&mut self) -> Result<()>;

    fn build_result(&self, bucket: BucketOrd) -> Result<AggregationResult>;
}
