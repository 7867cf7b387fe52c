use crate::aggregations::agg_trait::Aggregator;
use crate::aggregations::builder::AggregatorBuilder;
use crate::aggregations::format::AggregationContext;
use crate::aggregations::types::{AggregationRequest, AggregationResult};
use crate::aggregations::values::{DocId, ValuesSourceProvider};
use crate::config::AggregationConfig;
use crate::error::{Error, Result};

/// Drives one root aggregator through collect, finalize and build.
pub struct AggregationCollector {
    agg: Box<dyn Aggregator>,
    finalized: bool,
    docs_collected: u64,
}

impl AggregationCollector {
    pub fn new(agg: Box<dyn Aggregator>) -> Self {
        Self {
            agg,
            finalized: false,
            docs_collected: 0,
        }
    }

    /// Offers documents in the given order. A no-op when the aggregator
    /// wants no collection.
    pub fn collect<I>(&mut self, docs: I) -> Result<()>
    where
        I: IntoIterator<Item = DocId>,
    {
        if self.finalized {
            return Err(Error::PreconditionViolation(format!(
                "'{}' received documents after finalize",
                self.agg.name()
            )));
        }
        if !self.agg.wants_collection() {
            return Ok(());
        }
        for doc in docs {
            self.agg.collect(doc, 0)?;
            self.docs_collected += 1;
        }
        Ok(())
    }

    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Err(Error::PreconditionViolation(format!(
                "'{}' finalized twice",
                self.agg.name()
            )));
        }
        self.finalized = true;
        self.agg.finalize_collection()
    }

    pub fn build(&self) -> Result<AggregationResult> {
        if !self.finalized {
            return Err(Error::PreconditionViolation(format!(
                "'{}' built before finalize",
                self.agg.name()
            )));
        }
        self.agg.build_result(0)
    }

    pub fn docs_collected(&self) -> u64 {
        self.docs_collected
    }

    /// Collects `0..max_doc`, finalizes and builds.
    pub fn run(mut self, max_doc: DocId) -> Result<AggregationResult> {
        self.collect(0..max_doc)?;
        self.finalize()?;
        self.build()
    }
}

/// Builds and runs `request` over every document of `provider`.
pub fn execute(
    request: &AggregationRequest,
    provider: &dyn ValuesSourceProvider,
    ctx: AggregationContext,
    defaults: &AggregationConfig,
) -> Result<AggregationResult> {
    let agg = AggregatorBuilder::new(provider, ctx, defaults).build(request)?;
    AggregationCollector::new(agg).run(provider.max_doc())
}
