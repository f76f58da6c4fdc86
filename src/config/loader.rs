//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters, and
//! providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
    let path = Path::new(path);

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| "Failed to parse config.toml")?;

    validate_config(&config)?;

    info!(
        base = %config.trading.base_symbol,
        profit_threshold = config.trading.profit_threshold,
        loss_threshold = config.trading.loss_threshold,
        max_retries = config.trading.max_retries,
        "Configuration loaded successfully"
    );

    Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Thresholds straddling zero (profit > 0 > loss)
/// - Sensible retry and slippage bounds
/// - Non-empty asset identifiers and endpoints
fn validate_config(config: &AppConfig) -> Result<()> {
    // Trading validation
    anyhow::ensure!(
        !config.trading.base_token_identifier.is_empty(),
        "base_token_identifier must not be empty"
    );
    anyhow::ensure!(
        !config.trading.base_symbol.is_empty(),
        "base_symbol must not be empty"
    );
    anyhow::ensure!(
        config.trading.profit_threshold > 0.0,
        "profit_threshold must be positive, got {}",
        config.trading.profit_threshold
    );
    anyhow::ensure!(
        config.trading.loss_threshold < 0.0,
        "loss_threshold must be negative, got {}",
        config.trading.loss_threshold
    );
    anyhow::ensure!(
        config.trading.max_retries >= 1,
        "max_retries must be at least 1, got {}",
        config.trading.max_retries
    );
    anyhow::ensure!(
        (0.0..1.0).contains(&config.trading.slippage_tolerance),
        "slippage_tolerance must be in [0, 1), got {}",
        config.trading.slippage_tolerance
    );

    // Monitor validation
    anyhow::ensure!(
        config.monitor.interval_seconds > 0,
        "monitor interval_seconds must be positive"
    );
    anyhow::ensure!(
        config.monitor.max_concurrency >= 1,
        "monitor max_concurrency must be at least 1"
    );

    // API validation
    anyhow::ensure!(
        !config.api.gateway_url.is_empty(),
        "gSwap gateway URL must not be empty"
    );
    anyhow::ensure!(
        config.api.timeout_seconds > 0,
        "API timeout_seconds must be positive"
    );

    Ok(())
}
