//! Notification Adapters - Lifecycle Event Sinks
//!
//! Best-effort delivery only: every failure here is logged and
//! swallowed by the caller, never propagated into the state machine.

pub mod log;
pub mod webhook;

pub use log::LogNotifier;
pub use webhook::WebhookNotifier;

use async_trait::async_trait;

use crate::domain::position::Position;
use crate::ports::notifier::{BuybackNotification, Notifier};

/// Runtime-selected notifier: webhook when configured, log-only
/// otherwise.
pub enum EventNotifier {
    Webhook(WebhookNotifier),
    Log(LogNotifier),
}

impl EventNotifier {
    /// Build from an optional webhook URL.
    pub fn from_webhook_url(url: Option<String>) -> anyhow::Result<Self> {
        match url {
            Some(url) => Ok(Self::Webhook(WebhookNotifier::new(url)?)),
            None => Ok(Self::Log(LogNotifier)),
        }
    }
}

#[async_trait]
impl Notifier for EventNotifier {
    async fn notify_opened(&self, position: &Position) -> anyhow::Result<()> {
        match self {
            Self::Webhook(n) => n.notify_opened(position).await,
            Self::Log(n) => n.notify_opened(position).await,
        }
    }

    async fn notify_buyback(
        &self,
        position: &Position,
        outcome: &BuybackNotification,
    ) -> anyhow::Result<()> {
        match self {
            Self::Webhook(n) => n.notify_buyback(position, outcome).await,
            Self::Log(n) => n.notify_buyback(position, outcome).await,
        }
    }
}
