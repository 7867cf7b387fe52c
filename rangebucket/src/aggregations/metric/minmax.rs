use crate::aggregations::agg_trait::{Aggregator, BucketOrd};
use crate::aggregations::types::{AggregationResult, AggregationValue};
use crate::aggregations::values::{DocId, DoubleValues};
use crate::error::Result;

pub struct MinMaxAgg {
    name: String,
    is_min: bool,
    values: Option<Box<dyn DoubleValues>>,
    fruits: Vec<MinMaxFruit>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MinMaxFruit(Option<f64>);

impl MinMaxAgg {
    pub fn min(name: impl Into<String>, values: Option<Box<dyn DoubleValues>>) -> Self {
        Self {
            name: name.into(),
            is_min: true,
            values,
            fruits: Vec::new(),
        }
    }

    pub fn max(name: impl Into<String>, values: Option<Box<dyn DoubleValues>>) -> Self {
        Self {
            is_min: false,
            ..Self::min(name, values)
        }
    }
}

impl Aggregator for MinMaxAgg {
    fn name(&self) -> &str {
        &self.name
    }

    fn wants_collection(&self) -> bool {
        self.values.is_some()
    }

    fn collect(&mut self, doc: DocId, bucket: BucketOrd) -> Result<()> {
        let is_min = self.is_min;
        if let Some(ref mut values) = self.values {
            let fruit = super::fruit_mut(&mut self.fruits, bucket);
            super::for_each_value(values.as_mut(), doc, |v| {
                fruit.0 = Some(fruit.0.map_or(v, |acc| if is_min { acc.min(v) } else { acc.max(v) }));
            });
        }
        Ok(())
    }

    fn finalize_collection(&mut self) -> Result<()> {
        Ok(())
    }

    fn build_result(&self, bucket: BucketOrd) -> Result<AggregationResult> {
        Ok(AggregationResult {
            name: self.name.clone(),
            value: AggregationValue::Optional(self.fruits.get(bucket).and_then(|f| f.0)),
        })
    }
}
