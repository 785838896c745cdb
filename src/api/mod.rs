pub mod health;
pub mod latency;
pub mod response;
pub mod routes;
