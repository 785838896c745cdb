use std::sync::Arc;

use tracing::info;

use crate::aggregator::{AggregatedRow, Aggregator};
use crate::error::Result;
use crate::filter::{AliasTable, FilterBuilder, Predicate};
use crate::scorer::{ReallocationEngine, ReallocationSuggestion};
use crate::state::{AggregateQuery, RecordStore};
use crate::types::{Collection, Constraints};

/// A request that has already passed boundary validation.
#[derive(Debug, Clone, Default)]
pub struct AdviceRequest {
    pub from: Option<String>,
    pub to: Option<String>,
    pub channels: Vec<String>,
    pub constraints: Constraints,
    /// `None` = no cap.
    pub top_n: Option<usize>,
    pub collection: Collection,
}

/// Everything the pipeline computes for one request.
#[derive(Debug, Clone)]
pub struct Advice {
    pub predicate: Predicate,
    pub summary: Vec<AggregatedRow>,
    pub suggestions: Vec<ReallocationSuggestion>,
}

/// Filter -> aggregate -> reallocate over an injected record store.
/// Holds no per-request state; one instance serves all requests.
pub struct BudgetAdvisor {
    store: Arc<dyn RecordStore>,
    aliases: AliasTable,
}

impl BudgetAdvisor {
    pub fn new(store: Arc<dyn RecordStore>, aliases: AliasTable) -> Self {
        Self { store, aliases }
    }

    pub fn store_kind(&self) -> &'static str {
        self.store.kind()
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub async fn advise(&self, req: &AdviceRequest) -> Result<Advice> {
        let predicate = FilterBuilder::new(&self.aliases).build(
            req.from.as_deref(),
            req.to.as_deref(),
            &req.channels,
        );

        let query = AggregateQuery {
            collection: req.collection,
            predicate: &predicate,
            group_by: req.collection.dimension(),
            metrics: req.collection.metrics(),
            sort_by: req.collection.sort_by(),
            limit: req.top_n,
        };
        let summary = Aggregator::new(self.store.as_ref()).summarize(&query).await?;
        let suggestions = ReallocationEngine::new(req.constraints).suggest(&summary);

        info!(
            event = "ADVICE",
            collection = %req.collection,
            channels = req.channels.len(),
            rows = summary.len(),
            "Computed reallocation for {} rows",
            summary.len()
        );

        Ok(Advice {
            predicate,
            summary,
            suggestions,
        })
    }
}
