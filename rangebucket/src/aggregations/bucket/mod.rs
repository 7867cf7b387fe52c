mod range;

pub use range::{
    default_key, Range, RangeAgg, RangeAggregator, RangeTable, UnmappedRangeAggregator,
};
