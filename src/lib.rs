pub mod auth;
pub mod configuration;
pub mod error;
pub mod logger;
pub mod middleware;
pub mod routes;
pub mod session_store;
pub mod startup;
pub mod telemetry;
pub mod transport;
