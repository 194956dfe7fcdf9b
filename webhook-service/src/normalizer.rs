use serde_json::Value;

use crate::error::{WebhookError, WebhookResult};
use crate::provider::Provider;
use crate::verifier::VerifiedBody;

/// A verified delivery parsed into generic JSON. No schema is applied here;
/// handlers validate the fields they need.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    provider: Provider,
    payload: Value,
}

impl NormalizedEvent {
    #[cfg(test)]
    pub fn for_tests(provider: Provider, payload: Value) -> Self {
        Self { provider, payload }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Cashfree names the event in `type`, Razorpay in `event`.
    pub fn event_type(&self) -> Option<&str> {
        self.payload
            .get("type")
            .or_else(|| self.payload.get("event"))
            .and_then(Value::as_str)
    }
}

pub fn normalize(verified: VerifiedBody<'_>) -> WebhookResult<NormalizedEvent> {
    let payload: Value = serde_json::from_slice(verified.bytes())
        .map_err(|err| WebhookError::MalformedPayload(err.to_string()))?;
    Ok(NormalizedEvent {
        provider: verified.provider(),
        payload,
    })
}
