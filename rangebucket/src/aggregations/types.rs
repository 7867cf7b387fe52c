use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationRequest {
    pub name: String,
    #[serde(flatten)]
    pub agg_type: AggregationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggs: Option<Vec<AggregationRequest>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AggregationType {
    Count,
    Min {
        field: String,
    },
    Max {
        field: String,
    },
    Sum {
        field: String,
    },
    Avg {
        field: String,
    },
    Stats {
        field: String,
    },
    Range {
        field: String,
        ranges: Vec<RangeEntry>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        keyed: Option<bool>,
    },
    DateRange {
        field: String,
        ranges: Vec<RangeEntry>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        keyed: Option<bool>,
        /// chrono pattern for `from_as_string` / `to_as_string`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
}

/// One declared range. Missing bounds are unbounded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RangeEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<BoundValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<BoundValue>,
}

/// A bound as written by the caller: a number, or a literal resolved by the
/// field's parser (e.g. `"now-1d/d"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoundValue {
    Number(f64),
    Literal(String),
}

impl From<f64> for BoundValue {
    fn from(v: f64) -> Self {
        BoundValue::Number(v)
    }
}

impl From<&str> for BoundValue {
    fn from(s: &str) -> Self {
        BoundValue::Literal(s.to_string())
    }
}

impl From<String> for BoundValue {
    fn from(s: String) -> Self {
        BoundValue::Literal(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub name: String,
    #[serde(flatten)]
    pub value: AggregationValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregationValue {
    Single(f64),
    /// A metric with no defined value for an empty bucket (avg, min, max).
    Optional(Option<f64>),
    Stats(StatsResult),
    Range(RangeResult),
}

impl Serialize for AggregationValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AggregationValue::Single(v) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("value", v)?;
                map.end()
            }
            AggregationValue::Optional(v) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("value", v)?;
                map.end()
            }
            AggregationValue::Stats(stats) => stats.serialize(serializer),
            AggregationValue::Range(range) => range.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsResult {
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub sum: Option<f64>,
    pub avg: Option<f64>,
}

/// Range buckets plus how they are presented.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeResult {
    pub buckets: Vec<Bucket>,
    /// Expose buckets as a `key -> bucket` map instead of a list.
    pub keyed: bool,
}

impl RangeResult {
    pub fn bucket(&self, key: &str) -> Option<&Bucket> {
        self.buckets.iter().find(|b| b.key == key)
    }
}

impl Serialize for RangeResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Keyed<'a>(&'a [Bucket]);

        impl Serialize for Keyed<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for bucket in self.0 {
                    map.serialize_entry(&bucket.key, bucket)?;
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(1))?;
        if self.keyed {
            map.serialize_entry("buckets", &Keyed(&self.buckets))?;
        } else {
            map.serialize_entry("buckets", &self.buckets)?;
        }
        map.end()
    }
}

/// One output bucket. Unbounded sides are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub key: String,
    pub from: Option<f64>,
    pub to: Option<f64>,
    pub from_as_string: Option<String>,
    pub to_as_string: Option<String>,
    pub doc_count: u64,
    pub sub_aggs: Vec<AggregationResult>,
}

impl Bucket {
    pub fn sub_agg(&self, name: &str) -> Option<&AggregationValue> {
        self.sub_aggs.iter().find(|a| a.name == name).map(|a| &a.value)
    }
}

impl Serialize for Bucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("key", &self.key)?;
        if let Some(from) = self.from {
            map.serialize_entry("from", &from)?;
        }
        if let Some(ref s) = self.from_as_string {
            map.serialize_entry("from_as_string", s)?;
        }
        if let Some(to) = self.to {
            map.serialize_entry("to", &to)?;
        }
        if let Some(ref s) = self.to_as_string {
            map.serialize_entry("to_as_string", s)?;
        }
        map.serialize_entry("doc_count", &self.doc_count)?;
        for sub in &self.sub_aggs {
            map.serialize_entry(&sub.name, &sub.value)?;
        }
        map.end()
    }
}
