pub mod summary;

use tracing::debug;

use crate::error::Result;
use crate::state::{rank_order, AggregateQuery, RecordStore};

pub use summary::{derive_ratio, AggregatedRow};

/// Runs grouped aggregations through a `RecordStore` and derives ratios on the sums.
pub struct Aggregator<'s> {
    store: &'s dyn RecordStore,
}

impl<'s> Aggregator<'s> {
    pub fn new(store: &'s dyn RecordStore) -> Self {
        Self { store }
    }

    /// Up to `query.limit` rows, descending by the sort metric, ties by key ascending.
    pub async fn summarize(&self, query: &AggregateQuery<'_>) -> Result<Vec<AggregatedRow>> {
        query.validate()?;

        let mut groups = self.store.aggregate(query).await?;
        groups.sort_by(|a, b| rank_order(a, b, query.sort_by));
        if let Some(limit) = query.limit {
            groups.truncate(limit);
        }
        debug!(
            collection = %query.collection,
            group_by = %query.group_by,
            groups = groups.len(),
            "Aggregated groups"
        );

        Ok(groups
            .into_iter()
            .map(|g| AggregatedRow::from_sums(query.group_by, g))
            .collect())
    }
}
