use crate::aggregations::agg_trait::{Aggregator, BucketOrd};
use crate::aggregations::types::{AggregationResult, AggregationValue, StatsResult};
use crate::aggregations::values::{DocId, DoubleValues};
use crate::error::Result;

/// count, min, max, sum and avg over every value, per bucket.
pub struct StatsAgg {
    name: String,
    values: Option<Box<dyn DoubleValues>>,
    fruits: Vec<StatsFruit>,
}

#[derive(Debug, Clone, Default)]
pub struct StatsFruit {
    count: u64,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl StatsFruit {
    fn push(&mut self, v: f64) {
        self.count += 1;
        self.sum += v;
        self.min = Some(self.min.map_or(v, |m| m.min(v)));
        self.max = Some(self.max.map_or(v, |m| m.max(v)));
    }

    fn into_result(self) -> StatsResult {
        let has_values = self.count > 0;
        StatsResult {
            count: self.count,
            min: self.min,
            max: self.max,
            sum: has_values.then_some(self.sum),
            avg: has_values.then(|| self.sum / self.count as f64),
        }
    }
}

impl StatsAgg {
    pub fn new(name: impl Into<String>, values: Option<Box<dyn DoubleValues>>) -> Self {
        Self {
            name: name.into(),
            values,
            fruits: Vec::new(),
        }
    }
}

impl Aggregator for StatsAgg {
    fn name(&self) -> &str {
        &self.name
    }

    fn wants_collection(&self) -> bool {
        self.values.is_some()
    }

    fn collect(&mut self, doc: DocId, bucket: BucketOrd) -> Result<()> {
        if let Some(ref mut values) = self.values {
            let fruit = super::fruit_mut(&mut self.fruits, bucket);
            super::for_each_value(values.as_mut(), doc, |v| fruit.push(v));
        }
        Ok(())
    }

    fn finalize_collection(&mut self) -> Result<()> {
        Ok(())
    }

    fn build_result(&self, bucket: BucketOrd) -> Result<AggregationResult> {
        let fruit = self.fruits.get(bucket).cloned().unwrap_or_default();
        Ok(AggregationResult {
            name: self.name.clone(),
            value: AggregationValue::Stats(fruit.into_result()),
        })
    }
}
