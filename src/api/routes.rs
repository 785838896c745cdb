use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::advisor::{AdviceRequest, BudgetAdvisor};
use crate::api::health::HealthState;
use crate::api::latency::{LatencySnapshot, LatencyStats};
use crate::api::response::{assemble, QueryResponse, RequestEcho};
use crate::config::DEFAULT_TOP_N;
use crate::error::AppError;
use crate::types::{Collection, Constraints};

#[derive(Clone)]
pub struct ApiState {
    pub advisor: Arc<BudgetAdvisor>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
    /// Reported by /health when the store is SQLite-backed.
    pub db_path: Option<String>,
}

impl ApiState {
    pub fn new(advisor: BudgetAdvisor, db_path: Option<String>) -> Self {
        Self {
            advisor: Arc::new(advisor),
            health: Arc::new(HealthState::new()),
            latency: Arc::new(LatencyStats::new()),
            db_path,
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/mcp/query-data", post(query_data))
        .route("/health", get(health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request body
// ---------------------------------------------------------------------------

fn default_kpi() -> Option<String> {
    Some("ROAS".to_string())
}

fn default_top_n() -> Option<u32> {
    Some(DEFAULT_TOP_N)
}

#[derive(Debug, Deserialize)]
pub struct QueryPayload {
    pub query: Option<String>,
    /// ROAS | profit | conversions. Label only.
    #[serde(default = "default_kpi")]
    pub kpi: Option<String>,
    #[serde(rename = "from")]
    pub from_date: Option<String>,
    #[serde(rename = "to")]
    pub to_date: Option<String>,
    pub channels: Option<Vec<String>>,
    pub constraints: Option<Constraints>,
    /// `null` or 0 = no cap.
    #[serde(default = "default_top_n")]
    pub top_n_campaigns: Option<u32>,
    pub collection: Option<String>,
}

impl QueryPayload {
    /// Validate the boundary fields and split into the pipeline request and the echo.
    pub fn into_parts(self) -> Result<(AdviceRequest, RequestEcho), AppError> {
        let collection = Collection::resolve(self.collection.as_deref())?;
        let request = AdviceRequest {
            from: self.from_date,
            to: self.to_date,
            channels: self.channels.unwrap_or_default(),
            constraints: self.constraints.unwrap_or_default(),
            top_n: self.top_n_campaigns.filter(|n| *n > 0).map(|n| n as usize),
            collection,
        };
        let echo = RequestEcho {
            query: self.query,
            kpi: self.kpi,
            collection,
        };
        Ok((request, echo))
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: &'static str,
    pub db: Option<String>,
    pub collections: Vec<&'static str>,
    pub alias_table_version: u32,
    pub requests_served: u64,
    pub requests_failed: u64,
    pub last_query_at_ns: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn query_data(
    State(state): State<ApiState>,
    payload: Result<Json<QueryPayload>, JsonRejection>,
) -> Result<Json<QueryResponse>, AppError> {
    let started = Instant::now();
    let result = match payload {
        Ok(Json(payload)) => run_query(&state.advisor, payload).await,
        Err(rejection) => Err(rejection.into()),
    };
    state.latency.record(started.elapsed());

    match result {
        Ok(response) => {
            state.health.record_success();
            Ok(Json(response))
        }
        Err(e) => {
            state.health.record_failure();
            error!(status = %e.status(), "query_data error: {e}");
            Err(e)
        }
    }
}

async fn run_query(advisor: &BudgetAdvisor, payload: QueryPayload) -> Result<QueryResponse, AppError> {
    let (request, echo) = payload.into_parts()?;
    let advice = advisor.advise(&request).await?;
    Ok(assemble(echo, advice))
}

async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        store: state.advisor.store_kind(),
        db: state.db_path.clone(),
        collections: Collection::ALL.iter().map(Collection::as_str).collect(),
        alias_table_version: state.advisor.aliases().version,
        requests_served: state.health.requests_served(),
        requests_failed: state.health.requests_failed(),
        last_query_at_ns: state.health.last_query_at_ns(),
    })
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencySnapshot> {
    Json(state.latency.snapshot())
}
