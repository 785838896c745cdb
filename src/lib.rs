pub mod advisor;
pub mod aggregator;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod scorer;
pub mod state;
pub mod types;
