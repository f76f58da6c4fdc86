//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement the
//! bot's core workflows. Each use case is a self-contained business
//! operation.
//!
//! Use cases:
//! - `BuybackExecutor`: exit swap, retry bookkeeping, terminal failure
//! - `LifecycleManager`: position opening and per-position check cycle
//! - `BatchMonitor`: one monitoring sweep over all open positions

pub mod buyback;
pub mod lifecycle;
pub mod monitor;

pub use buyback::{BuybackError, BuybackExecutor, BuybackOutcome};
pub use lifecycle::{CheckResult, EntryRequest, LifecycleManager};
pub use monitor::{BatchMonitor, MonitorSummary};
