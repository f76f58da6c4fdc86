//! Webhook Notifier - HTTP Event Sink
//!
//! Posts lifecycle events as JSON to a configured webhook URL
//! (Discord/Slack-style relay or any internal collector). Timeouts are
//! short: a slow webhook must not stretch a monitoring cycle.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::domain::position::Position;
use crate::ports::notifier::{BuybackNotification, Notifier};

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    event: &'a str,
    position_id: &'a str,
    pair_symbol: &'a str,
    strategy: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<&'a BuybackNotification>,
}

/// JSON webhook sink for lifecycle events.
pub struct WebhookNotifier {
    http: Client,
    url: String,
}

impl WebhookNotifier {
    /// Create a notifier posting to `url`.
    pub fn new(url: String) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self { http, url })
    }

    async fn post(&self, payload: &WebhookPayload<'_>) -> anyhow::Result<()> {
        let response = self.http.post(&self.url).json(payload).send().await?;
        anyhow::ensure!(
            response.status().is_success(),
            "webhook returned HTTP {}",
            response.status()
        );
        debug!(event = payload.event, "Webhook delivered");
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_opened(&self, position: &Position) -> anyhow::Result<()> {
        self
            .post(&WebhookPayload {
                event: "position_opened",
                position_id: &position.id,
                pair_symbol: &position.pair_symbol,
                strategy: &position.strategy,
                outcome: None,
            })
            .await
    }

    async fn notify_buyback(
        &self,
        position: &Position,
        outcome: &BuybackNotification,
    ) -> anyhow::Result<()> {
        self
            .post(&WebhookPayload {
                event: "buyback",
                position_id: &position.id,
                pair_symbol: &position.pair_symbol,
                strategy: &position.strategy,
                outcome: Some(outcome),
            })
            .await
    }
}
