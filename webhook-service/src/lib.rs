use std::sync::Arc;

use common_observability::WebhookMetrics;

pub mod app;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod normalizer;
pub mod payments;
pub mod provider;
pub mod verifier;
pub mod webhook_handlers;

pub use crate::app::build_router;
pub use crate::config::{WebhookConfig, WebhookSecret};
pub use crate::dispatcher::{DispatchResult, WebhookDispatcher, WebhookHandler};
pub use crate::error::{WebhookError, WebhookResult};
pub use crate::normalizer::NormalizedEvent;
pub use crate::provider::Provider;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<WebhookConfig>,
    pub dispatcher: Arc<WebhookDispatcher>,
    pub metrics: Arc<WebhookMetrics>,
}

impl AppState {
    pub fn new(config: WebhookConfig, dispatcher: WebhookDispatcher, metrics: WebhookMetrics) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
            metrics: Arc::new(metrics),
        }
    }
}
