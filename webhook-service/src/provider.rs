use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WebhookError;

/// Payment providers whose webhooks this service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Cashfree,
    Razorpay,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Cashfree, Provider::Razorpay];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Cashfree => "cashfree",
            Provider::Razorpay => "razorpay",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = WebhookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cashfree" => Ok(Provider::Cashfree),
            "razorpay" => Ok(Provider::Razorpay),
            other => Err(WebhookError::UnsupportedProvider(other.to_string())),
        }
    }
}
