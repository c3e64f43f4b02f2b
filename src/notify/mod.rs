//! Messaging side-channel
//!
//! Every call site treats delivery as best effort: failures are logged and
//! swallowed, never propagated into checkout or review submission.

use async_trait::async_trait;
use serde_json::json;

use crate::domain::voucher::Voucher;
use crate::events::DomainEvent;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Broadcast a domain event to whoever is listening.
    async fn publish(&self, event: &DomainEvent) -> anyhow::Result<()>;

    /// Message a single user, optionally attaching a voucher.
    async fn notify(&self, user_id: &str, text: &str, voucher: Option<&Voucher>)
        -> anyhow::Result<()>;
}

/// Publishes JSON payloads over NATS.
pub struct NatsNotifier {
    client: async_nats::Client,
}

impl NatsNotifier {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for NatsNotifier {
    async fn publish(&self, event: &DomainEvent) -> anyhow::Result<()> {
        let payload = serde_json::to_vec(event)?;
        self.client
            .publish("storefront.events".to_string(), payload.into())
            .await?;
        Ok(())
    }

    async fn notify(
        &self,
        user_id: &str,
        text: &str,
        voucher: Option<&Voucher>,
    ) -> anyhow::Result<()> {
        let payload = serde_json::to_vec(&json!({
            "userId": user_id,
            "text": text,
            "voucher": voucher,
        }))?;
        self.client
            .publish(format!("storefront.notify.{user_id}"), payload.into())
            .await?;
        Ok(())
    }
}

/// Traces instead of delivering; used when no broker is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn publish(&self, event: &DomainEvent) -> anyhow::Result<()> {
        tracing::debug!(?event, "Event (no broker configured)");
        Ok(())
    }

    async fn notify(
        &self,
        user_id: &str,
        text: &str,
        _voucher: Option<&Voucher>,
    ) -> anyhow::Result<()> {
        tracing::debug!(user_id, text, "Notification (no broker configured)");
        Ok(())
    }
}
