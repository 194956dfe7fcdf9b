use anyhow::{Context, Result};
use std::env;
use tracing::warn;
use zeroize::Zeroizing;

use crate::provider::Provider;

const DEFAULT_PORT: u16 = 8090;
const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;
const MIN_BODY_LIMIT_BYTES: usize = 1024;

/// Shared secret used to key a provider's webhook HMAC.
#[derive(Clone)]
pub struct WebhookSecret(Zeroizing<Vec<u8>>);

impl WebhookSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("WebhookSecret").field(&"***redacted***").finish()
    }
}

/// Process-wide settings, loaded once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub host: String,
    pub port: u16,
    pub body_limit_bytes: usize,
    pub database_url: Option<String>,
    cashfree_secret: Option<WebhookSecret>,
    razorpay_secret: Option<WebhookSecret>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl WebhookConfig {
    /// Config with defaults and no provider secrets.
    pub fn new() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
            database_url: None,
            cashfree_secret: None,
            razorpay_secret: None,
        }
    }

    pub fn with_secret(mut self, provider: Provider, secret: impl Into<Vec<u8>>) -> Self {
        let secret = Some(WebhookSecret::new(secret));
        match provider {
            Provider::Cashfree => self.cashfree_secret = secret,
            Provider::Razorpay => self.razorpay_secret = secret,
        }
        self
    }

    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit_bytes = bytes.max(MIN_BODY_LIMIT_BYTES);
        self
    }

    pub fn secret_for(&self, provider: Provider) -> Option<&WebhookSecret> {
        match provider {
            Provider::Cashfree => self.cashfree_secret.as_ref(),
            Provider::Razorpay => self.razorpay_secret.as_ref(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();
        if let Some(host) = lookup("HOST").filter(|v| !v.trim().is_empty()) {
            config.host = host.trim().to_string();
        }
        if let Some(port) = lookup("PORT") {
            config.port = port
                .trim()
                .parse::<u16>()
                .with_context(|| format!("PORT must be a valid port number, got '{port}'"))?;
        }
        if let Some(limit) = lookup("WEBHOOK_BODY_LIMIT_BYTES") {
            let bytes = limit
                .trim()
                .parse::<usize>()
                .context("WEBHOOK_BODY_LIMIT_BYTES must be a positive integer")?;
            config = config.with_body_limit(bytes);
        }
        config.database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());

        for provider in Provider::ALL {
            let key = secret_env_key(provider);
            match lookup(key) {
                Some(value) if !value.trim().is_empty() => {
                    config = config.with_secret(provider, value.into_bytes());
                }
                _ => {
                    warn!(provider = %provider, env = key, "Webhook secret not set; deliveries will be rejected");
                }
            }
        }
        Ok(config)
    }
}

pub fn secret_env_key(provider: Provider) -> &'static str {
    match provider {
        Provider::Cashfree => "CASHFREE_WEBHOOK_SECRET",
        Provider::Razorpay => "RAZORPAY_WEBHOOK_SECRET",
    }
}
