//! gSwap REST Client - Quotes, Swaps, and Spot Prices
//!
//! Thin reqwest wrapper over the gSwap backend. Token identifiers are
//! GalaChain composite keys ("GUSDC|Unit|none|none"). One client
//! implements both the SwapExecutor and PriceSource ports so the bot
//! prices positions with the same venue it trades on.
//!
//! Dry-run mode short-circuits `swap`: the quoted output becomes the
//! receipt and the trade id is a synthetic "dryrun-" UUID.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::ports::price_source::{PriceError, PriceSource};
use crate::ports::swap::{
    ensure_distinct_pair, SwapError, SwapExecutor, SwapQuote, SwapReceipt,
};

/// Configuration for the gSwap HTTP client.
#[derive(Debug, Clone)]
pub struct GSwapClientConfig {
    /// Backend base URL.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Simulate swaps instead of sending them.
    pub dry_run: bool,
}

impl Default for GSwapClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dex-backend-prod1.defi.gala.com".to_string(),
            timeout: Duration::from_secs(30),
            dry_run: false,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRequest<'a> {
    token_in: &'a str,
    token_out: &'a str,
    amount_in: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    amount_out: f64,
    #[serde(default = "default_fee_bps")]
    fee: u32,
}

fn default_fee_bps() -> u32 {
    // 0.30% pool tier when the backend omits the field.
    30
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SwapRequest<'a> {
    token_in: &'a str,
    token_out: &'a str,
    amount_in: f64,
    amount_out_minimum: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapResponse {
    transaction_id: String,
    amount_out: f64,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: f64,
}

/// Envelope all gSwap endpoints share.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// HTTP client for the gSwap backend.
pub struct GSwapClient {
    http: Client,
    config: GSwapClientConfig,
}

impl GSwapClient {
    /// Create a new gSwap client.
    pub fn new(config: GSwapClientConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(5)
            .build()?;
        if config.dry_run {
            info!("gSwap client in dry-run mode: swaps will be simulated");
        }
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Read an error body and map it onto the swap error taxonomy.
    async fn swap_error_from_response(response: reqwest::Response) -> SwapError {
        let status = response.status();
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|b| b.message)
            .unwrap_or_default();
        if message.to_ascii_lowercase().contains("insufficient") {
            SwapError::InsufficientBalance(message)
        } else {
            SwapError::SwapFailed(format!("HTTP {status}: {message}"))
        }
    }
}

#[async_trait]
impl SwapExecutor for GSwapClient {
    #[instrument(skip(self))]
    async fn quote(&self, from: &str, to: &str, amount: f64) -> Result<SwapQuote, SwapError> {
        ensure_distinct_pair(from, to)?;

        let request = QuoteRequest {
            token_in: from,
            token_out: to,
            amount_in: amount,
        };
        let response = self
            .http
            .post(self.url("/v1/trade/quote"))
            .json(&request)
            .send()
            .await
            .map_err(|e| SwapError::QuoteUnavailable {
                from: from.to_string(),
                to: to.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(SwapError::QuoteUnavailable {
                from: from.to_string(),
                to: to.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let body: Envelope<QuoteResponse> =
            response
                .json()
                .await
                .map_err(|e| SwapError::QuoteUnavailable {
                    from: from.to_string(),
                    to: to.to_string(),
                    reason: e.to_string(),
                })?;

        debug!(
            expected_output = body.data.amount_out,
            fee_bps = body.data.fee,
            "Quote received"
        );

        Ok(SwapQuote {
            from: from.to_string(),
            to: to.to_string(),
            amount_in: amount,
            expected_output: body.data.amount_out,
            fee_bps: body.data.fee,
        })
    }

    #[instrument(skip(self))]
    async fn swap(
        &self,
        from: &str,
        to: &str,
        amount: f64,
        minimum_output: f64,
    ) -> Result<SwapReceipt, SwapError> {
        ensure_distinct_pair(from, to)?;

        let timestamp_ms = chrono::Utc::now().timestamp_millis() as u64;

        if self.config.dry_run {
            // Simulate from the quote; nothing is sent on-chain.
            let quote = self.quote(from, to, amount).await?;
            if quote.expected_output < minimum_output {
                return Err(SwapError::SwapFailed(format!(
                    "simulated fill {} below minimum {minimum_output}",
                    quote.expected_output
                )));
            }
            return Ok(SwapReceipt {
                trade_id: format!("dryrun-{}", Uuid::new_v4()),
                from: from.to_string(),
                to: to.to_string(),
                amount_in: amount,
                amount_out: quote.expected_output,
                dry_run: true,
                timestamp_ms,
            });
        }

        let request = SwapRequest {
            token_in: from,
            token_out: to,
            amount_in: amount,
            amount_out_minimum: minimum_output,
        };
        let response = self
            .http
            .post(self.url("/v1/trade/swap"))
            .json(&request)
            .send()
            .await
            .map_err(|e| SwapError::SwapFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::swap_error_from_response(response).await);
        }

        let body: Envelope<SwapResponse> = response
            .json()
            .await
            .map_err(|e| SwapError::SwapFailed(format!("malformed swap response: {e}")))?;

        info!(
            trade_id = %body.data.transaction_id,
            amount_out = body.data.amount_out,
            "Swap executed"
        );

        Ok(SwapReceipt {
            trade_id: body.data.transaction_id,
            from: from.to_string(),
            to: to.to_string(),
            amount_in: amount,
            amount_out: body.data.amount_out,
            dry_run: false,
            timestamp_ms,
        })
    }

    fn is_dry_run(&self) -> bool {
        self.config.dry_run
    }
}

#[async_trait]
impl PriceSource for GSwapClient {
    async fn current_price(&self, token_identifier: &str) -> Result<f64, PriceError> {
        let response = self
            .http
            .get(self.url("/v1/trade/price"))
            .query(&[("token", token_identifier)])
            .send()
            .await
            .map_err(|e| PriceError::Unavailable {
                token: token_identifier.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(PriceError::Unavailable {
                token: token_identifier.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let body: Envelope<PriceResponse> =
            response.json().await.map_err(|e| PriceError::Unavailable {
                token: token_identifier.to_string(),
                reason: e.to_string(),
            })?;

        if body.data.price <= 0.0 || !body.data.price.is_finite() {
            return Err(PriceError::Unavailable {
                token: token_identifier.to_string(),
                reason: format!("non-positive price {}", body.data.price),
            });
        }

        Ok(body.data.price)
    }
}
