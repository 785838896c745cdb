use tracing::info;

use crate::error::Result;
use crate::types::{Collection, MetricRecord};

/// Persists daily records into a collection table. Used by the loader binary and tests.
pub struct RecordWriter {
    pool: sqlx::SqlitePool,
}

impl RecordWriter {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts all records in one transaction; returns the number of rows written.
    pub async fn insert_records(
        &self,
        collection: Collection,
        records: &[MetricRecord],
    ) -> Result<u64> {
        let sql = format!(
            r#"
            INSERT INTO {} (
                date, retailer_id, retailer_name, channel, source,
                keyword, page_type, product_id,
                retailer_name_folded, channel_folded, source_folded,
                impressions, clicks, ad_spend, ad_sales, ad_units
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            collection.as_str()
        );

        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;
        for r in records {
            let result = sqlx::query(&sql)
                .bind(r.date.format("%Y-%m-%d").to_string())
                .bind(&r.retailer_id)
                .bind(&r.retailer_name)
                .bind(&r.channel)
                .bind(&r.source)
                .bind(&r.keyword)
                .bind(&r.page_type)
                .bind(&r.product_id)
                .bind(fold(&r.retailer_name))
                .bind(fold(&r.channel))
                .bind(fold(&r.source))
                .bind(r.impressions)
                .bind(r.clicks)
                .bind(r.ad_spend)
                .bind(r.ad_sales)
                .bind(r.ad_units)
                .execute(&mut *tx)
                .await?;
            written += result.rows_affected();
        }
        tx.commit().await?;

        info!(collection = %collection, written, "Inserted records");
        Ok(written)
    }

    pub async fn count(&self, collection: Collection) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", collection.as_str());
        let n: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(n)
    }
}

/// SQLite's LOWER() only folds ASCII, so matching runs against columns folded here.
fn fold(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::to_lowercase)
}
