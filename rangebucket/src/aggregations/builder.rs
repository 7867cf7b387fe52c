use crate::aggregations::agg_trait::Aggregator;
use crate::aggregations::bucket::RangeAgg;
use crate::aggregations::format::{AggregationContext, DateFormatter, DateMathParser};
use crate::aggregations::metric::{AvgAgg, CountAgg, MinMaxAgg, StatsAgg, SumAgg};
use crate::aggregations::types::{AggregationRequest, AggregationType, BoundValue, RangeEntry};
use crate::aggregations::values::{ValuesSourceConfig, ValuesSourceProvider};
use crate::config::AggregationConfig;
use crate::error::{Error, Result};
use std::path::Path;
use std::sync::Arc;

impl AggregationType {
    pub fn count() -> AggregationType {
        AggregationType::Count
    }

    pub fn min(field: String) -> AggregationType {
        AggregationType::Min { field }
    }

    pub fn max(field: String) -> AggregationType {
        AggregationType::Max { field }
    }

    pub fn sum(field: String) -> AggregationType {
        AggregationType::Sum { field }
    }

    pub fn avg(field: String) -> AggregationType {
        AggregationType::Avg { field }
    }

    pub fn stats(field: String) -> AggregationType {
        AggregationType::Stats { field }
    }

    pub fn range(field: String, ranges: Vec<RangeEntry>) -> AggregationType {
        AggregationType::Range {
            field,
            ranges,
            keyed: None,
        }
    }

    pub fn keyed_range(field: String, ranges: Vec<RangeEntry>) -> AggregationType {
        AggregationType::Range {
            field,
            ranges,
            keyed: Some(true),
        }
    }

    pub fn date_range(field: String, ranges: Vec<RangeEntry>, format: Option<String>) -> AggregationType {
        AggregationType::DateRange {
            field,
            ranges,
            keyed: None,
            format,
        }
    }
}

impl RangeEntry {
    pub fn new(from: Option<impl Into<BoundValue>>, to: Option<impl Into<BoundValue>>) -> Self {
        Self {
            key: None,
            from: from.map(Into::into),
            to: to.map(Into::into),
        }
    }

    pub fn between(from: impl Into<BoundValue>, to: impl Into<BoundValue>) -> Self {
        Self {
            key: None,
            from: Some(from.into()),
            to: Some(to.into()),
        }
    }

    pub fn below(to: impl Into<BoundValue>) -> Self {
        Self {
            key: None,
            from: None,
            to: Some(to.into()),
        }
    }

    pub fn at_least(from: impl Into<BoundValue>) -> Self {
        Self {
            key: None,
            from: Some(from.into()),
            to: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

impl AggregationRequest {
    pub fn new(name: impl Into<String>, agg_type: AggregationType) -> Self {
        Self {
            name: name.into(),
            agg_type,
            aggs: None,
        }
    }

    pub fn with_sub_agg(mut self, sub: AggregationRequest) -> Self {
        self.aggs.get_or_insert_with(Vec::new).push(sub);
        self
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Reads a request file; `.yaml`/`.yml` as YAML, anything else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&text),
            _ => Self::from_json(&text),
        }
    }
}

/// Turns declarative requests into aggregators bound to one data subset.
pub struct AggregatorBuilder<'a> {
    provider: &'a dyn ValuesSourceProvider,
    ctx: AggregationContext,
    defaults: &'a AggregationConfig,
}

impl<'a> AggregatorBuilder<'a> {
    pub fn new(
        provider: &'a dyn ValuesSourceProvider,
        ctx: AggregationContext,
        defaults: &'a AggregationConfig,
    ) -> Self {
        Self {
            provider,
            ctx,
            defaults,
        }
    }

    /// Builds a root aggregator. Only range aggregations can be roots.
    pub fn build(&self, req: &AggregationRequest) -> Result<Box<dyn Aggregator>> {
        let range = self.range_agg(req)?.ok_or_else(|| {
            Error::InvalidRequest(format!(
                "'{}' is not a range aggregation and cannot be a root",
                req.name
            ))
        })?;
        let subs = req.aggs.as_deref().unwrap_or_default();
        range.prepare(self.provider, &self.ctx, || {
            subs.iter().map(|sub| self.build_sub(sub)).collect()
        })
    }

    fn range_agg(&self, req: &AggregationRequest) -> Result<Option<RangeAgg>> {
        let agg = match &req.agg_type {
            AggregationType::Range {
                field,
                ranges,
                keyed,
            } => RangeAgg::new(
                req.name.clone(),
                ValuesSourceConfig::new(field.clone()),
                ranges.clone(),
                keyed.unwrap_or(self.defaults.keyed),
            ),
            AggregationType::DateRange {
                field,
                ranges,
                keyed,
                format,
            } => {
                let pattern = format.clone().or_else(|| self.defaults.date_format.clone());
                let config = ValuesSourceConfig::new(field.clone())
                    .with_parser(Arc::new(DateMathParser))
                    .with_formatter(Arc::new(DateFormatter::validated(pattern)?));
                RangeAgg::new(
                    req.name.clone(),
                    config,
                    ranges.clone(),
                    keyed.unwrap_or(self.defaults.keyed),
                )
            }
            _ => return Ok(None),
        };
        Ok(Some(agg))
    }

    fn build_sub(&self, req: &AggregationRequest) -> Result<Box<dyn Aggregator>> {
        if req.aggs.as_ref().is_some_and(|a| !a.is_empty()) {
            return Err(Error::InvalidRequest(format!(
                "metric aggregation '{}' cannot have sub-aggregations",
                req.name
            )));
        }
        let values = |field: &str| self.provider.double_values(field);
        let name = req.name.clone();
        let agg: Box<dyn Aggregator> = match &req.agg_type {
            AggregationType::Count => Box::new(CountAgg::new(name)),
            AggregationType::Sum { field } => Box::new(SumAgg::new(name, values(field))),
            AggregationType::Avg { field } => Box::new(AvgAgg::new(name, values(field))),
            AggregationType::Min { field } => Box::new(MinMaxAgg::min(name, values(field))),
            AggregationType::Max { field } => Box::new(MinMaxAgg::max(name, values(field))),
            AggregationType::Stats { field } => Box::new(StatsAgg::new(name, values(field))),
            AggregationType::Range { .. } | AggregationType::DateRange { .. } => {
                return Err(Error::InvalidRequest(format!(
                    "range aggregation '{}' can only be used at the root",
                    req.name
                )))
            }
        };
        Ok(agg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregations::values::InMemoryColumns;

    #[test]
    fn test_range_entry_helpers() {
        let e = RangeEntry::between(0.0, "10").with_key("low");
        assert_eq!(e.key.as_deref(), Some("low"));
        assert_eq!(e.from, Some(BoundValue::Number(0.0)));
        assert_eq!(e.to, Some(BoundValue::Literal("10".to_string())));
        assert_eq!(RangeEntry::below(5.0).from, None);
        assert_eq!(RangeEntry::at_least(5.0).to, None);
        assert_eq!(RangeEntry::new(None::<f64>, Some(1.0)), RangeEntry::below(1.0));
    }

    #[test]
    fn test_non_range_root_rejected() {
        let columns = InMemoryColumns::new(1);
        let defaults = AggregationConfig::default();
        let builder = AggregatorBuilder::new(&columns, AggregationContext::new(), &defaults);
        let req = AggregationRequest::new("total", AggregationType::count());
        assert!(matches!(builder.build(&req), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_nested_range_rejected() {
        let columns = InMemoryColumns::new(0).with_column("price", vec![vec![1.0]]);
        let defaults = AggregationConfig::default();
        let builder = AggregatorBuilder::new(&columns, AggregationContext::new(), &defaults);
        let req = AggregationRequest::new(
            "outer",
            AggregationType::range("price".into(), vec![RangeEntry::below(10.0)]),
        )
        .with_sub_agg(AggregationRequest::new(
            "inner",
            AggregationType::range("price".into(), vec![RangeEntry::below(5.0)]),
        ));
        assert!(matches!(builder.build(&req), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_bad_date_format_rejected() {
        let columns = InMemoryColumns::new(0).with_column("ts", vec![vec![5.0]]);
        let mut defaults = AggregationConfig::default();
        let builder = AggregatorBuilder::new(&columns, AggregationContext::new(), &defaults);
        let req = AggregationRequest::new(
            "dates",
            AggregationType::date_range(
                "ts".into(),
                vec![RangeEntry::between(0.0, 10.0)],
                Some("%Q".to_string()),
            ),
        );
        assert!(matches!(builder.build(&req), Err(Error::InvalidRequest(_))));

        // the configured default is checked the same way
        defaults.date_format = Some("%Q".to_string());
        let builder = AggregatorBuilder::new(&columns, AggregationContext::new(), &defaults);
        let req = AggregationRequest::new(
            "dates",
            AggregationType::date_range("ts".into(), vec![RangeEntry::below(10.0)], None),
        );
        assert!(matches!(builder.build(&req), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_load_yaml_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("req.yaml");
        std::fs::write(
            &path,
            "name: prices\ntype: range\nfield: price\nranges:\n  - to: 10\n  - from: 10\n",
        )
        .unwrap();
        let req = AggregationRequest::load(&path).unwrap();
        assert_eq!(req.name, "prices");
        assert!(matches!(req.agg_type, AggregationType::Range { ref ranges, .. } if ranges.len() == 2));
    }
}
