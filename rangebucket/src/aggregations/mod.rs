mod agg_trait;
mod bucket;
mod builder;
mod collector;
pub mod format;
mod metric;
pub mod types;
pub mod values;

pub use agg_trait::{Aggregator, BucketOrd};
pub use bucket::{
    default_key, Range, RangeAgg, RangeAggregator, RangeTable, UnmappedRangeAggregator,
};
pub use builder::AggregatorBuilder;
pub use collector::{execute, AggregationCollector};
pub use format::AggregationContext;
pub use metric::{AvgAgg, CountAgg, MinMaxAgg, StatsAgg, SumAgg};
pub use types::{
    AggregationRequest, AggregationResult, AggregationType, AggregationValue, BoundValue, Bucket,
    RangeEntry, RangeResult, StatsResult,
};
