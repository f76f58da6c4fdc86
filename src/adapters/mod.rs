//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP clients, file I/O). Each sub-module
//! groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `dex`: gSwap REST API client (swaps, quotes, prices)
//! - `metrics`: Prometheus metrics export and health checks
//! - `notify`: webhook / log lifecycle event sinks
//! - `persistence`: JSONL position log

pub mod dex;
pub mod metrics;
pub mod notify;
pub mod persistence;
