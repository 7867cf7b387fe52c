mod accumulator;
mod aggregator;
mod matcher;
mod result;
mod table;
mod unmapped;

pub use aggregator::RangeAggregator;
pub use result::default_key;
pub use table::{Range, RangeTable};
pub use unmapped::UnmappedRangeAggregator;

use crate::aggregations::agg_trait::Aggregator;
use crate::aggregations::format::AggregationContext;
use crate::aggregations::types::RangeEntry;
use crate::aggregations::values::{NumericValuesSource, ValuesSourceConfig, ValuesSourceProvider};
use crate::error::Result;

/// Declared range aggregation, not yet bound to a data subset.
#[derive(Debug, Clone)]
pub struct RangeAgg {
    name: String,
    config: ValuesSourceConfig,
    ranges: Vec<RangeEntry>,
    keyed: bool,
}

impl RangeAgg {
    pub fn new(
        name: impl Into<String>,
        config: ValuesSourceConfig,
        ranges: Vec<RangeEntry>,
        keyed: bool,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            ranges,
            keyed,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Binds the aggregation to `provider`.
    ///
    /// A field the provider lacks yields an [`UnmappedRangeAggregator`] and
    /// `sub_aggs` is never called.
    pub fn prepare<F>(
        &self,
        provider: &dyn ValuesSourceProvider,
        ctx: &AggregationContext,
        sub_aggs: F,
    ) -> Result<Box<dyn Aggregator>>
    where
        F: FnOnce() -> Result<Vec<Box<dyn Aggregator>>>,
    {
        let ranges: Vec<Range> = self.ranges.iter().map(Range::from_entry).collect();

        match provider.double_values(&self.config.field) {
            Some(values) => {
                let source = NumericValuesSource::new(values, self.config.clone());
                Ok(Box::new(RangeAggregator::new(
                    self.name.clone(),
                    source,
                    ranges,
                    self.keyed,
                    sub_aggs()?,
                    ctx,
                )?))
            }
            None => Ok(Box::new(UnmappedRangeAggregator::new(
                self.name.clone(),
                self.config.clone(),
                ranges,
                self.keyed,
                ctx,
            )?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregations::values::InMemoryColumns;

    #[test]
    fn test_prepare_picks_path_by_field_presence() {
        let agg = RangeAgg::new(
            "r",
            ValuesSourceConfig::new("price"),
            vec![RangeEntry {
                key: None,
                from: None,
                to: Some(10.0.into()),
            }],
            false,
        );
        let ctx = AggregationContext::new();

        let mapped = InMemoryColumns::new(0).with_column("price", vec![vec![1.0]]);
        let agg_mapped = agg.prepare(&mapped, &ctx, || Ok(vec![])).unwrap();
        assert!(agg_mapped.wants_collection());

        let unmapped = InMemoryColumns::new(1);
        let agg_unmapped = agg
            .prepare(&unmapped, &ctx, || panic!("sub-aggregations built for unmapped field"))
            .unwrap();
        assert!(!agg_unmapped.wants_collection());
        assert_eq!(agg_unmapped.name(), "r");
    }
}
