//! Configuration Module - TOML-based Bot Configuration
//!
//! Loads and validates configuration from `config.toml`. Thresholds,
//! retry limits, and API endpoints are externalized here - nothing is
//! hardcoded in the domain layer.

pub mod loader;

use serde::Deserialize;

/// Top-level bot configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the bot begins operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Bot identity and metadata.
    pub bot: BotConfig,
    /// Trading thresholds and retry policy.
    pub trading: TradingConfig,
    /// Monitoring sweep scheduling.
    pub monitor: MonitorConfig,
    /// gSwap API endpoints.
    pub api: ApiConfig,
    /// Metrics and health endpoints.
    pub metrics: MetricsConfig,
    /// Persistence configuration.
    pub persistence: PersistenceConfig,
    /// Lifecycle event notifications.
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Human-readable bot name.
    pub name: String,
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Enable dry-run mode (swaps simulated from quotes, no real fills).
    #[serde(default)]
    pub dry_run: bool,
}

/// Trading thresholds and retry policy.
#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    /// Base asset composite key (e.g. "GALA|Unit|none|none").
    pub base_token_identifier: String,
    /// Base asset ticker for pair labels.
    pub base_symbol: String,
    /// Fractional profit trigger (0.05 = +5%).
    #[serde(default = "default_profit_threshold")]
    pub profit_threshold: f64,
    /// Fractional loss trigger, negative (-0.02 = -2%).
    #[serde(default = "default_loss_threshold")]
    pub loss_threshold: f64,
    /// Failed buyback attempts before a position goes FAILED.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fractional slippage tolerance on quoted outputs (0.01 = 1%).
    #[serde(default = "default_slippage")]
    pub slippage_tolerance: f64,
}

/// Monitoring sweep scheduling.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between sweeps. Sweeps never overlap: the scheduler waits
    /// for the previous sweep to finish.
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    /// Positions checked concurrently within one sweep.
    #[serde(default = "default_concurrency")]
    pub max_concurrency: usize,
    /// Only monitor positions opened by this strategy (all when unset).
    pub strategy_filter: Option<String>,
}

/// gSwap API endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// gSwap backend base URL.
    pub gateway_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Enable the Prometheus/health HTTP server.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Server bind address.
    #[serde(default = "default_metrics_addr")]
    pub bind_address: String,
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    /// Directory for the JSONL position log.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

/// Lifecycle event notification configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationsConfig {
    /// Webhook URL for lifecycle events; log-only when unset.
    pub webhook_url: Option<String>,
}

// Default value functions for serde

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_profit_threshold() -> f64 {
    0.05
}

fn default_loss_threshold() -> f64 {
    -0.02
}

fn default_max_retries() -> u32 {
    5
}

fn default_slippage() -> f64 {
    0.01
}

fn default_interval() -> u64 {
    60
}

fn default_concurrency() -> usize {
    4
}

fn default_timeout() -> u64 {
    30
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}
