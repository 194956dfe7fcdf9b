use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use tracing::{error, info};

use crate::dispatcher::{DispatchResult, WebhookHandler};
use crate::normalizer::NormalizedEvent;
use crate::provider::Provider;

/// Fields the payments ledger cares about, pulled leniently from a provider payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentEvent {
    pub provider: Provider,
    pub event_type: String,
    pub order_ref: Option<String>,
    pub payment_ref: Option<String>,
    pub status: Option<String>,
    pub payload: Value,
    pub received_at: DateTime<Utc>,
}

impl PaymentEvent {
    pub fn from_event(event: &NormalizedEvent) -> Self {
        let payload = event.payload();
        let (order_ref, payment_ref, status) = match event.provider() {
            Provider::Cashfree => (
                string_at(payload, &["data", "order", "order_id"]),
                string_at(payload, &["data", "payment", "cf_payment_id"]),
                string_at(payload, &["data", "payment", "payment_status"]),
            ),
            Provider::Razorpay => (
                string_at(payload, &["payload", "payment", "entity", "order_id"]),
                string_at(payload, &["payload", "payment", "entity", "id"]),
                string_at(payload, &["payload", "payment", "entity", "status"]),
            ),
        };
        Self {
            provider: event.provider(),
            event_type: event.event_type().unwrap_or("unknown").to_string(),
            order_ref,
            payment_ref,
            status,
            payload: payload.clone(),
            received_at: Utc::now(),
        }
    }
}

/// Numbers are accepted too: Cashfree sends `cf_payment_id` as an integer.
fn string_at(value: &Value, path: &[&str]) -> Option<String> {
    let found = path.iter().try_fold(value, |cur, key| cur.get(*key))?;
    match found {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
pub trait PaymentEventStore: Send + Sync {
    async fn record(&self, event: &PaymentEvent) -> Result<()>;
}

pub struct PgPaymentEventStore {
    db: PgPool,
}

impl PgPaymentEventStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PaymentEventStore for PgPaymentEventStore {
    async fn record(&self, event: &PaymentEvent) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO payment_webhook_events (provider, event_type, order_ref, payment_ref, status, payload, received_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(event.provider.as_str())
        .bind(&event.event_type)
        .bind(event.order_ref.as_deref())
        .bind(event.payment_ref.as_deref())
        .bind(event.status.as_deref())
        .bind(&event.payload)
        .bind(event.received_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

/// Default handler: records every payment-status update. Without a store the
/// event is only logged.
#[derive(Clone, Default)]
pub struct PaymentEventHandler {
    store: Option<Arc<dyn PaymentEventStore>>,
}

impl PaymentEventHandler {
    pub fn new(store: Option<Arc<dyn PaymentEventStore>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl WebhookHandler for PaymentEventHandler {
    async fn handle(&self, provider: Provider, event: &NormalizedEvent) -> DispatchResult {
        let payment = PaymentEvent::from_event(event);
        info!(
            provider = %provider,
            event_type = %payment.event_type,
            order_ref = payment.order_ref.as_deref(),
            status = payment.status.as_deref(),
            "Payment webhook received"
        );
        let Some(store) = &self.store else {
            return DispatchResult::ok();
        };
        match store.record(&payment).await {
            Ok(()) => DispatchResult::ok(),
            Err(err) => {
                error!(provider = %provider, error = %err, "Failed to record payment webhook");
                DispatchResult::failed(format!("failed to record payment event: {err}"))
            }
        }
    }
}
