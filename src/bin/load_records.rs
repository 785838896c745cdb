//! Loads a JSON array of daily records into one collection table.
//!
//! Usage: load-records <collection> <records.json>
//! The database path comes from DB_PATH, as for the server.

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ad_budget_advisor::config::Config;
use ad_budget_advisor::db::{self, RecordWriter};
use ad_budget_advisor::error::{AppError, Result};
use ad_budget_advisor::types::{Collection, MetricRecord};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(&cfg, &args).await {
        error!("Load failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: &Config, args: &[String]) -> Result<()> {
    let [collection, path] = args else {
        return Err(AppError::Config(
            "usage: load-records <collection> <records.json>".to_string(),
        ));
    };
    let collection: Collection = collection.parse()?;

    let raw = std::fs::read_to_string(path)?;
    let records: Vec<MetricRecord> = serde_json::from_str(&raw)?;
    info!("Read {} records from {path}", records.len());

    let pool = db::connect(&cfg.db_path).await?;
    let writer = RecordWriter::new(pool);
    writer.insert_records(collection, &records).await?;
    info!(
        "{} now holds {} records",
        collection,
        writer.count(collection).await?
    );
    Ok(())
}
