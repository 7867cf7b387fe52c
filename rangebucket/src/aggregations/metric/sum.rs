use crate::aggregations::agg_trait::{Aggregator, BucketOrd};
use crate::aggregations::types::{AggregationResult, AggregationValue};
use crate::aggregations::values::{DocId, DoubleValues};
use crate::error::Result;

/// Sum of every value of the field, per bucket.
pub struct SumAgg {
    name: String,
    values: Option<Box<dyn DoubleValues>>,
    sums: Vec<f64>,
}

impl SumAgg {
    pub fn new(name: impl Into<String>, values: Option<Box<dyn DoubleValues>>) -> Self {
        Self {
            name: name.into(),
            values,
            sums: Vec::new(),
        }
    }
}

impl Aggregator for SumAgg {
    fn name(&self) -> &str {
        &self.name
    }

    fn wants_collection(&self) -> bool {
        self.values.is_some()
    }

    fn collect(&mut self, doc: DocId, bucket: BucketOrd) -> Result<()> {
        if let Some(ref mut values) = self.values {
            let sum = super::fruit_mut(&mut self.sums, bucket);
            super::for_each_value(values.as_mut(), doc, |v| *sum += v);
        }
        Ok(())
    }

    fn finalize_collection(&mut self) -> Result<()> {
        Ok(())
    }

    fn build_result(&self, bucket: BucketOrd) -> Result<AggregationResult> {
        Ok(AggregationResult {
            name: self.name.clone(),
            value: AggregationValue::Single(self.sums.get(bucket).copied().unwrap_or(0.0)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregations::values::{InMemoryColumns, ValuesSourceProvider};

    #[test]
    fn test_sum_aggregation() {
        let columns = InMemoryColumns::new(0).with_column("price", vec![vec![1.5, 2.5], vec![6.0]]);
        let mut agg = SumAgg::new("total_price", columns.double_values("price"));
        agg.collect(0, 0).unwrap();
        agg.collect(1, 0).unwrap();
        agg.collect(1, 1).unwrap();

        assert_eq!(agg.build_result(0).unwrap().value, AggregationValue::Single(10.0));
        assert_eq!(agg.build_result(1).unwrap().value, AggregationValue::Single(6.0));
        assert_eq!(agg.build_result(5).unwrap().value, AggregationValue::Single(0.0));
    }

    #[test]
    fn test_sum_missing_field() {
        let agg = SumAgg::new("total_price", None);
        assert!(!agg.wants_collection());
        assert_eq!(agg.build_result(0).unwrap().value, AggregationValue::Single(0.0));
    }
}
