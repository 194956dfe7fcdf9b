use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::{WebhookError, WebhookResult};
use crate::normalizer::NormalizedEvent;
use crate::provider::Provider;

const DEFAULT_FAILURE_MESSAGE: &str = "webhook processing failed";

/// Outcome reported by a webhook handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchResult {
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, error: Some(message.into()) }
    }
}

/// Business logic that consumes verified, parsed webhook events.
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    async fn handle(&self, provider: Provider, event: &NormalizedEvent) -> DispatchResult;
}

/// Fixed provider -> handler table. Each event is handed to exactly one
/// handler, exactly once; failures are reported, never retried.
#[derive(Clone, Default)]
pub struct WebhookDispatcher {
    routes: HashMap<Provider, Arc<dyn WebhookHandler>>,
}

#[derive(Default)]
pub struct WebhookDispatcherBuilder {
    routes: HashMap<Provider, Arc<dyn WebhookHandler>>,
}

impl WebhookDispatcherBuilder {
    pub fn route(mut self, provider: Provider, handler: Arc<dyn WebhookHandler>) -> Self {
        self.routes.insert(provider, handler);
        self
    }

    pub fn build(self) -> WebhookDispatcher {
        WebhookDispatcher { routes: self.routes }
    }
}

impl WebhookDispatcher {
    pub fn builder() -> WebhookDispatcherBuilder {
        WebhookDispatcherBuilder::default()
    }

    pub fn routes(&self) -> Vec<Provider> {
        let mut providers: Vec<Provider> = self.routes.keys().copied().collect();
        providers.sort_by_key(|p| p.as_str());
        providers
    }

    pub async fn dispatch(&self, event: &NormalizedEvent) -> WebhookResult<()> {
        let provider = event.provider();
        let handler = self
            .routes
            .get(&provider)
            .ok_or_else(|| WebhookError::UnsupportedProvider(provider.to_string()))?;

        let result = AssertUnwindSafe(handler.handle(provider, event))
            .catch_unwind()
            .await
            .map_err(|panic| {
                let message = panic_message(panic.as_ref());
                error!(provider = %provider, panic = %message, "Webhook handler panicked");
                WebhookError::Internal(format!("webhook handler panicked: {message}"))
            })?;
        if result.success {
            debug!(provider = %provider, "Webhook handler succeeded");
            return Ok(());
        }
        let message = result
            .error
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
        warn!(provider = %provider, error = %message, "Webhook handler reported failure");
        Err(WebhookError::HandlerFailure(message))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
