use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::filter::Predicate;
use crate::types::{Collection, Dimension, Metric, MetricRecord};

// ---------------------------------------------------------------------------
// Store interface
// ---------------------------------------------------------------------------

/// One grouped aggregation request against a record collection.
#[derive(Debug, Clone)]
pub struct AggregateQuery<'a> {
    pub collection: Collection,
    pub predicate: &'a Predicate,
    pub group_by: Dimension,
    pub metrics: &'a [Metric],
    pub sort_by: Metric,
    /// `None` = no cap.
    pub limit: Option<usize>,
}

impl AggregateQuery<'_> {
    pub fn validate(&self) -> Result<()> {
        if self.metrics.is_empty() {
            return Err(AppError::InvalidQuery("no metrics requested".to_string()));
        }
        if !self.metrics.contains(&self.sort_by) {
            return Err(AppError::InvalidQuery(format!(
                "sort metric {} is not among the requested metrics",
                self.sort_by
            )));
        }
        Ok(())
    }
}

/// Metric sums for one group, in the order the metrics were requested.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSums {
    pub key: Option<String>,
    pub sums: Vec<(Metric, f64)>,
}

impl GroupSums {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.sums.iter().find(|(m, _)| *m == metric).map(|(_, v)| *v)
    }
}

/// Result order shared by every store: sort metric descending, then key ascending
/// with the absent key last.
pub fn rank_order(a: &GroupSums, b: &GroupSums, sort_by: Metric) -> Ordering {
    let av = a.get(sort_by).unwrap_or(0.0);
    let bv = b.get(sort_by).unwrap_or(0.0);
    bv.total_cmp(&av).then_with(|| match (&a.key, &b.key) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    })
}

/// Read-only access to daily performance records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short name reported by /health.
    fn kind(&self) -> &'static str;

    /// Group matching records and sum the requested metrics (absent values count as zero),
    /// returning at most `limit` groups in `rank_order`.
    async fn aggregate(&self, query: &AggregateQuery<'_>) -> Result<Vec<GroupSums>>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Immutable snapshot of records per collection, evaluated in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryRecordStore {
    records: HashMap<Collection, Vec<MetricRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, collection: Collection, records: Vec<MetricRecord>) -> Self {
        self.records.entry(collection).or_default().extend(records);
        self
    }

    /// Seed file format: `{"<collection name>": [record, ...], ...}`.
    pub fn from_seed_json(raw: &str) -> Result<Self> {
        let parsed: HashMap<String, Vec<MetricRecord>> = serde_json::from_str(raw)?;
        let mut store = Self::new();
        for (name, records) in parsed {
            let collection: Collection = name.parse()?;
            store = store.with_records(collection, records);
        }
        Ok(store)
    }

    pub fn from_seed_file(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_seed_json(&raw)
    }

    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn aggregate(&self, query: &AggregateQuery<'_>) -> Result<Vec<GroupSums>> {
        let Some(records) = self.records.get(&query.collection) else {
            return Ok(Vec::new());
        };

        let mut groups: BTreeMap<Option<String>, Vec<f64>> = BTreeMap::new();
        for record in records.iter().filter(|r| query.predicate.matches(r)) {
            let key = record.dimension_value(query.group_by).map(str::to_string);
            let sums = groups
                .entry(key)
                .or_insert_with(|| vec![0.0; query.metrics.len()]);
            for (slot, metric) in sums.iter_mut().zip(query.metrics) {
                *slot += record.metric(*metric);
            }
        }

        let mut rows: Vec<GroupSums> = groups
            .into_iter()
            .map(|(key, sums)| GroupSums {
                key,
                sums: query.metrics.iter().copied().zip(sums).collect(),
            })
            .collect();
        rows.sort_by(|a, b| rank_order(a, b, query.sort_by));
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }
}
