use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ad_budget_advisor::advisor::BudgetAdvisor;
use ad_budget_advisor::api::routes::{router, ApiState};
use ad_budget_advisor::config::{Config, StoreKind};
use ad_budget_advisor::db::{self, SqliteRecordStore};
use ad_budget_advisor::error::Result;
use ad_budget_advisor::filter::AliasTable;
use ad_budget_advisor::state::{MemoryRecordStore, RecordStore};

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

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Alias table ---
    let aliases = match &cfg.aliases_path {
        Some(path) => AliasTable::load(path)?,
        None => AliasTable::builtin()?,
    };
    info!(
        "Channel alias table v{} loaded ({} aliases)",
        aliases.version,
        aliases.len()
    );

    // --- Record store ---
    let (store, db_path): (Arc<dyn RecordStore>, Option<String>) = match cfg.store_kind {
        StoreKind::Sqlite => {
            let pool = db::connect(&cfg.db_path).await?;
            info!("Database ready at {}", cfg.db_path);
            let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(pool));
            (store, Some(cfg.db_path.clone()))
        }
        StoreKind::Memory => {
            let store = match &cfg.seed_path {
                Some(path) => MemoryRecordStore::from_seed_file(path)?,
                None => MemoryRecordStore::new(),
            };
            info!("In-memory record store ready with {} records", store.len());
            let store: Arc<dyn RecordStore> = Arc::new(store);
            (store, None)
        }
    };

    // --- HTTP API ---
    let advisor = BudgetAdvisor::new(store, aliases);
    let app = router(ApiState::new(advisor, db_path));
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(store = cfg.store_kind.as_str(), "HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
