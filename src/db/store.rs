use async_trait::async_trait;
use sqlx::{QueryBuilder, Row, Sqlite};

use crate::error::Result;
use crate::filter::{MatchCondition, Predicate};
use crate::state::{AggregateQuery, GroupSums, RecordStore};

/// `RecordStore` backed by the per-collection SQLite tables.
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: sqlx::SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    async fn aggregate(&self, query: &AggregateQuery<'_>) -> Result<Vec<GroupSums>> {
        let mut qb = build_aggregate_sql(query);
        let rows = qb.build().fetch_all(&self.pool).await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in &rows {
            let key: Option<String> = row.try_get("group_key")?;
            let mut sums = Vec::with_capacity(query.metrics.len());
            for metric in query.metrics {
                let value: f64 = row.try_get(sum_alias(metric.as_str()).as_str())?;
                sums.push((*metric, value));
            }
            groups.push(GroupSums { key, sums });
        }
        Ok(groups)
    }
}

fn sum_alias(column: &str) -> String {
    format!("sum_{column}")
}

/// Column names come from closed enums; only predicate values are bound.
pub(crate) fn build_aggregate_sql<'q>(query: &AggregateQuery<'_>) -> QueryBuilder<'q, Sqlite> {
    let group_col = query.group_by.as_str();

    let mut qb = QueryBuilder::new(format!("SELECT CAST({group_col} AS TEXT) AS group_key"));
    for metric in query.metrics {
        let col = metric.as_str();
        qb.push(format!(
            ", CAST(COALESCE(SUM(COALESCE({col}, 0)), 0) AS REAL) AS {}",
            sum_alias(col)
        ));
    }
    qb.push(format!(" FROM {}", query.collection.as_str()));
    push_predicate(&mut qb, query.predicate);
    qb.push(format!(
        " GROUP BY {group_col} ORDER BY {} DESC, group_key ASC NULLS LAST",
        sum_alias(query.sort_by.as_str())
    ));
    if let Some(limit) = query.limit {
        qb.push(" LIMIT ");
        qb.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }
    qb
}

fn push_predicate(qb: &mut QueryBuilder<'_, Sqlite>, predicate: &Predicate) {
    let mut clauses = 0usize;

    if let Some(range) = predicate.date_range {
        if let Some(first) = range.first_day() {
            push_clause(qb, &mut clauses);
            qb.push("date >= ");
            qb.push_bind(first.format("%Y-%m-%d").to_string());
        }
        if let Some(last) = range.last_day() {
            push_clause(qb, &mut clauses);
            qb.push("date <= ");
            qb.push_bind(last.format("%Y-%m-%d").to_string());
        }
    }

    if predicate.channels.is_empty() {
        return;
    }
    push_clause(qb, &mut clauses);
    qb.push("(");
    for (i, condition) in predicate.channel_conditions().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        push_condition(qb, condition);
    }
    qb.push(")");
}

fn push_clause(qb: &mut QueryBuilder<'_, Sqlite>, clauses: &mut usize) {
    qb.push(if *clauses == 0 { " WHERE " } else { " AND " });
    *clauses += 1;
}

fn push_condition(qb: &mut QueryBuilder<'_, Sqlite>, condition: &MatchCondition) {
    match condition {
        MatchCondition::Contains { field, value } => {
            match field.folded_column() {
                Some(col) => qb.push(format!("{col} LIKE ")),
                None => qb.push(format!("LOWER({}) LIKE ", field.as_str())),
            };
            qb.push_bind(format!("%{}%", escape_like(value)));
            qb.push(" ESCAPE '\\'");
        }
        MatchCondition::Equals { field, value } => {
            qb.push(format!("{} = ", field.as_str()));
            qb.push_bind(value.clone());
        }
        MatchCondition::EqualsNumber { field, value } => {
            let col = field.as_str();
            qb.push(format!(
                "(TRIM({col}) <> '' AND TRIM({col}) NOT GLOB '*[^0-9]*' AND CAST(TRIM({col}) AS INTEGER) = "
            ));
            qb.push_bind(*value);
            qb.push(")");
        }
    }
}

fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{connect_in_memory, writer::RecordWriter};
    use crate::filter::{AliasTable, FilterBuilder};
    use crate::state::MemoryRecordStore;
    use crate::types::{Collection, Dimension, Metric, MetricRecord};
    use chrono::NaiveDate;

    fn record(d: u32, id: &str, name: &str, spend: Option<f64>, sales: f64) -> MetricRecord {
        MetricRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, d).unwrap(),
            retailer_id: Some(id.to_string()),
            retailer_name: Some(name.to_string()),
            channel: Some("sponsored_products".to_string()),
            impressions: Some(1000.0),
            clicks: Some(20.0),
            ad_spend: spend,
            ad_sales: Some(sales),
            ad_units: None,
            ..Default::default()
        }
    }

    fn fixture() -> Vec<MetricRecord> {
        vec![
            record(1, "1", "Amazon", Some(10.0), 40.0),
            record(2, "1", "Amazon", Some(10.0), 60.0),
            record(1, "2", "Walmart 100%", None, 30.0),
            record(3, "3", "Target", Some(5.0), 30.0),
            record(5, "42", "Kroger", Some(8.0), 8.0),
            record(4, "77", "ÉPICERIE Müller", Some(3.0), 9.0),
        ]
    }

    async fn seeded_store() -> SqliteRecordStore {
        let pool = connect_in_memory().await.unwrap();
        RecordWriter::new(pool.clone())
            .insert_records(Collection::RetailerDailySpend, &fixture())
            .await
            .unwrap();
        SqliteRecordStore::new(pool)
    }

    fn query<'a>(predicate: &'a Predicate, limit: Option<usize>) -> AggregateQuery<'a> {
        AggregateQuery {
            collection: Collection::RetailerDailySpend,
            predicate,
            group_by: Dimension::RetailerId,
            metrics: Collection::RetailerDailySpend.metrics(),
            sort_by: Metric::AdSales,
            limit,
        }
    }

    #[tokio::test]
    async fn sums_and_orders_groups() {
        let store = seeded_store().await;
        let predicate = Predicate::default();
        let rows = store.aggregate(&query(&predicate, None)).await.unwrap();

        let keys: Vec<_> = rows.iter().map(|r| r.key.clone().unwrap()).collect();
        // Walmart and Target tie on sales; key order breaks the tie.
        assert_eq!(keys, vec!["1", "2", "3", "77", "42"]);
        assert_eq!(rows[0].get(Metric::AdSales), Some(100.0));
        assert_eq!(rows[1].get(Metric::AdSpend), Some(0.0));
        assert_eq!(rows[0].get(Metric::AdUnits), Some(0.0));
    }

    #[tokio::test]
    async fn matches_memory_store_under_filters() {
        let store = seeded_store().await;
        let memory =
            MemoryRecordStore::new().with_records(Collection::RetailerDailySpend, fixture());
        let aliases = AliasTable::builtin().unwrap();
        let builder = FilterBuilder::new(&aliases);

        let cases = vec![
            builder.build(Some("2024-03-02"), None, &[]),
            builder.build(None, Some("2024-03-01T09:00:00"), &[]),
            builder.build(None, None, &["amazon".to_string()]),
            builder.build(None, None, &["42".to_string(), "target".to_string()]),
            builder.build(None, None, &["100%".to_string()]),
            builder.build(Some("not-a-date"), Some("2024-03-03"), &["AMAZ".to_string()]),
            builder.build(None, None, &["épicerie".to_string()]),
            builder.build(None, None, &["MÜLLER".to_string()]),
        ];
        for predicate in &cases {
            let sql = store.aggregate(&query(predicate, Some(10))).await.unwrap();
            let mem = memory.aggregate(&query(predicate, Some(10))).await.unwrap();
            assert_eq!(sql, mem, "predicate {predicate:?}");
        }
    }

    #[tokio::test]
    async fn non_ascii_names_match_case_insensitively() {
        let store = seeded_store().await;
        let aliases = AliasTable::builtin().unwrap();
        let predicate = FilterBuilder::new(&aliases).build(None, None, &["épicerie".to_string()]);
        let rows = store.aggregate(&query(&predicate, None)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key.as_deref(), Some("77"));
    }

    #[tokio::test]
    async fn like_wildcards_are_literal() {
        let store = seeded_store().await;
        let aliases = AliasTable::builtin().unwrap();
        let predicate = FilterBuilder::new(&aliases).build(None, None, &["ama_on".to_string()]);
        let rows = store.aggregate(&query(&predicate, None)).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn limit_applies_after_ordering() {
        let store = seeded_store().await;
        let predicate = Predicate::default();
        let rows = store.aggregate(&query(&predicate, Some(2))).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].key.as_deref(), Some("2"));
    }
}
