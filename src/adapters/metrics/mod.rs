//! Metrics and Monitoring Adapters
//!
//! Provides Prometheus metrics export and health check endpoints
//! (/live, /ready) via axum. Complements the JSON tracing spans.

pub mod prometheus;

pub use prometheus::MetricsRegistry;
