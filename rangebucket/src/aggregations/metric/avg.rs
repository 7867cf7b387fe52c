use crate::aggregations::agg_trait::{Aggregator, BucketOrd};
use crate::aggregations::types::{AggregationResult, AggregationValue};
use crate::aggregations::values::{DocId, DoubleValues};
use crate::error::Result;

pub struct AvgAgg {
    name: String,
    values: Option<Box<dyn DoubleValues>>,
    fruits: Vec<AvgFruit>,
}

#[derive(Debug, Clone, Default)]
pub struct AvgFruit {
    sum: f64,
    count: u64,
}

impl AvgFruit {
    fn avg(&self) -> Option<f64> {
        if self.count > 0 {
            Some(self.sum / self.count as f64)
        } else {
            None
        }
    }
}

impl AvgAgg {
    pub fn new(name: impl Into<String>, values: Option<Box<dyn DoubleValues>>) -> Self {
        Self {
            name: name.into(),
            values,
            fruits: Vec::new(),
        }
    }
}

impl Aggregator for AvgAgg {
    fn name(&self) -> &str {
        &self.name
    }

    fn wants_collection(&self) -> bool {
        self.values.is_some()
    }

    fn collect(&mut self, doc: DocId, bucket: BucketOrd) -> Result<()> {
        if let Some(ref mut values) = self.values {
            let fruit = super::fruit_mut(&mut self.fruits, bucket);
            super::for_each_value(values.as_mut(), doc, |v| {
                fruit.sum += v;
                fruit.count += 1;
            });
        }
        Ok(())
    }

    fn finalize_collection(&mut self) -> Result<()> {
        Ok(())
    }

    fn build_result(&self, bucket: BucketOrd) -> Result<AggregationResult> {
        let avg = self.fruits.get(bucket).and_then(AvgFruit::avg);
        Ok(AggregationResult {
            name: self.name.clone(),
            value: AggregationValue::Optional(avg),
        })
    }
}
