use crate::error::{AppError, Result};

/// Default result cap when a request does not name one.
pub const DEFAULT_TOP_N: u32 = 10;

/// Confidence attached to every reallocation response.
pub const CONFIDENCE: f64 = 0.75;

pub const EXPLAINABILITY: &str = "Heuristic proportional allocation using ROAS and conversion rate (weights: ROAS 0.7, conv 0.3). Bounds: +/-50% per channel.";

/// Reallocation heuristic constants.
pub mod heuristic {
    pub const ROAS_WEIGHT: f64 = 0.7;
    pub const CONVERSION_WEIGHT: f64 = 0.3;
    /// Multiplier applied to the score of a row below the `min_roas` constraint.
    pub const MIN_ROAS_PENALTY: f64 = 0.5;
    /// Added to every floored score so that no row ends up with a zero share.
    pub const SCORE_EPSILON: f64 = 1e-6;
    pub const LOWER_BOUND: f64 = 0.5;
    pub const UPPER_BOUND: f64 = 1.5;
}

/// Which `RecordStore` implementation backs the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    Memory,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Sqlite => "sqlite",
            StoreKind::Memory => "memory",
        }
    }
}

impl std::str::FromStr for StoreKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreKind::Sqlite),
            "memory" => Ok(StoreKind::Memory),
            other => Err(AppError::Config(format!(
                "RECORD_STORE must be 'sqlite' or 'memory', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    pub store_kind: StoreKind,
    /// JSON array of records loaded into the memory store at startup (SEED_PATH).
    pub seed_path: Option<String>,
    /// Replacement for the built-in channel alias table (CHANNEL_ALIASES_PATH).
    pub aliases_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "advisor.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            store_kind: std::env::var("RECORD_STORE")
                .unwrap_or_else(|_| "sqlite".to_string())
                .parse()?,
            seed_path: non_empty_var("SEED_PATH"),
            aliases_path: non_empty_var("CHANNEL_ALIASES_PATH"),
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_kind_parses_case_insensitively() {
        assert_eq!("SQLite".parse::<StoreKind>().unwrap(), StoreKind::Sqlite);
        assert_eq!(" memory ".parse::<StoreKind>().unwrap(), StoreKind::Memory);
        assert!("mongo".parse::<StoreKind>().is_err());
    }
}
