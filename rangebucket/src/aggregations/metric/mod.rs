//! Metric aggregations computed per bucket ordinal of their parent.

mod avg;
mod count;
mod minmax;
mod stats;
mod sum;

pub use avg::AvgAgg;
pub use count::CountAgg;
pub use minmax::MinMaxAgg;
pub use stats::StatsAgg;
pub use sum::SumAgg;

use crate::aggregations::agg_trait::BucketOrd;
use crate::aggregations::values::{DocId, DoubleValues};

/// Grows `fruits` so that `bucket` is addressable and returns it.
fn fruit_mut<T: Default>(fruits: &mut Vec<T>, bucket: BucketOrd) -> &mut T {
    if fruits.len() <= bucket {
        fruits.resize_with(bucket + 1, T::default);
    }
    &mut fruits[bucket]
}

/// Feeds every value of `doc` to `f`.
fn for_each_value(values: &mut dyn DoubleValues, doc: DocId, mut f: impl FnMut(f64)) {
    let count = values.set_document(doc);
    for _ in 0..count {
        f(values.next_value());
    }
}
