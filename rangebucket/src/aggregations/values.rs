//! Per-document numeric value access.

use crate::aggregations::format::{AggregationContext, DateMathParser, ValueFormatter, ValueParser};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

pub type DocId = u32;

/// Cursor over the values of one field.
///
/// `set_document` positions the cursor and returns how many values the
/// document carries; `next_value` must then be called at most that many
/// times, yielding the values in stored order.
pub trait DoubleValues: Send {
    fn set_document(&mut self, doc: DocId) -> usize;
    fn next_value(&mut self) -> f64;
}

/// Supplies value cursors for the fields of one data subset.
pub trait ValuesSourceProvider {
    /// `None` when the field does not exist in this subset.
    fn double_values(&self, field: &str) -> Option<Box<dyn DoubleValues>>;

    /// Number of documents; ids are `0..max_doc`.
    fn max_doc(&self) -> DocId;
}

/// How bounds and keys of a field are parsed and rendered.
#[derive(Debug, Clone, Default)]
pub struct ValuesSourceConfig {
    pub field: String,
    pub parser: Option<Arc<dyn ValueParser>>,
    pub formatter: Option<Arc<dyn ValueFormatter>>,
}

impl ValuesSourceConfig {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            parser: None,
            formatter: None,
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn ValueParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn ValueFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }
}

/// A resolved field: its value cursor plus its parse/format config.
pub struct NumericValuesSource {
    values: Box<dyn DoubleValues>,
    config: ValuesSourceConfig,
}

impl NumericValuesSource {
    pub fn new(values: Box<dyn DoubleValues>, config: ValuesSourceConfig) -> Self {
        Self { values, config }
    }

    pub fn values_mut(&mut self) -> &mut dyn DoubleValues {
        self.values.as_mut()
    }

    pub fn config(&self) -> &ValuesSourceConfig {
        &self.config
    }
}

/// Column laid out as per-document offsets into a flat value array.
#[derive(Debug, Default)]
struct Column {
    offsets: Vec<usize>,
    values: Vec<f64>,
}

impl Column {
    fn from_docs(docs: &[Vec<f64>]) -> Self {
        let mut offsets = Vec::with_capacity(docs.len() + 1);
        let mut values = Vec::new();
        offsets.push(0);
        for doc in docs {
            values.extend_from_slice(doc);
            offsets.push(values.len());
        }
        Self { offsets, values }
    }

    fn doc_range(&self, doc: DocId) -> (usize, usize) {
        let doc = doc as usize;
        match (self.offsets.get(doc), self.offsets.get(doc + 1)) {
            (Some(&start), Some(&end)) => (start, end),
            _ => (0, 0),
        }
    }
}

struct ColumnValues {
    column: Arc<Column>,
    pos: usize,
    end: usize,
}

impl DoubleValues for ColumnValues {
    fn set_document(&mut self, doc: DocId) -> usize {
        let (start, end) = self.column.doc_range(doc);
        self.pos = start;
        self.end = end;
        end - start
    }

    fn next_value(&mut self) -> f64 {
        let value = if self.pos < self.end {
            self.column.values[self.pos]
        } else {
            f64::NAN
        };
        self.pos += 1;
        value
    }
}

/// Columnar values held in memory, one column per field.
#[derive(Debug, Default)]
pub struct InMemoryColumns {
    max_doc: DocId,
    columns: HashMap<String, Arc<Column>>,
}

impl InMemoryColumns {
    pub fn new(max_doc: DocId) -> Self {
        Self {
            max_doc,
            columns: HashMap::new(),
        }
    }

    /// Adds a column; `docs[i]` holds the values of document `i`.
    pub fn with_column(mut self, field: impl Into<String>, docs: Vec<Vec<f64>>) -> Self {
        self.max_doc = self.max_doc.max(docs.len() as DocId);
        self.columns.insert(field.into(), Arc::new(Column::from_docs(&docs)));
        self
    }

    /// Builds columns from JSON objects.
    ///
    /// Numbers and arrays of numbers become values. Strings on a field
    /// listed in `date_fields` are parsed as dates into epoch millis.
    /// Anything else is skipped. A field no document carries gets no column.
    pub fn from_documents(docs: &[Value], date_fields: &[String], ctx: &AggregationContext) -> Self {
        let date_fields: HashSet<&str> = date_fields.iter().map(String::as_str).collect();
        let mut per_field: HashMap<String, Vec<Vec<f64>>> = HashMap::new();

        for (doc_id, doc) in docs.iter().enumerate() {
            let Some(obj) = doc.as_object() else {
                tracing::debug!(doc_id, "skipping non-object document");
                continue;
            };
            for (field, value) in obj {
                let is_date = date_fields.contains(field.as_str());
                let mut extracted = Vec::new();
                collect_numbers(value, is_date, ctx, &mut extracted);
                if extracted.is_empty() {
                    continue;
                }
                let column = per_field
                    .entry(field.clone())
                    .or_insert_with(|| vec![Vec::new(); docs.len()]);
                column[doc_id] = extracted;
            }
        }

        let mut columns = InMemoryColumns::new(docs.len() as DocId);
        for (field, values) in per_field {
            columns = columns.with_column(field, values);
        }
        columns
    }

    /// Drops a field so that it reads as absent.
    pub fn remove_field(&mut self, field: &str) -> bool {
        self.columns.remove(field).is_some()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.columns.contains_key(field)
    }
}

fn collect_numbers(value: &Value, is_date: bool, ctx: &AggregationContext, out: &mut Vec<f64>) {
    match value {
        Value::Number(n) => out.extend(n.as_f64()),
        Value::String(s) if is_date => match DateMathParser.parse(s, ctx) {
            Ok(millis) => out.push(millis),
            Err(e) => tracing::debug!(error = %e, "skipping unparsable date value"),
        },
        Value::Array(items) => {
            for item in items {
                collect_numbers(item, is_date, ctx, out);
            }
        }
        _ => {}
    }
}

impl ValuesSourceProvider for InMemoryColumns {
    fn double_values(&self, field: &str) -> Option<Box<dyn DoubleValues>> {
        self.columns.get(field).map(|column| {
            Box::new(ColumnValues {
                column: Arc::clone(column),
                pos: 0,
                end: 0,
            }) as Box<dyn DoubleValues>
        })
    }

    fn max_doc(&self) -> DocId {
        self.max_doc
    }
}
