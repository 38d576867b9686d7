//! Infrastructure Layer
//!
//! Adapters binding the domain and ports to the outside world: the
//! TradeStation HTTP endpoints, environment configuration, per-
//! instrument log files, and tracing.

pub mod auth;
pub mod config;
pub mod logsink;
pub mod stream;
pub mod telemetry;
