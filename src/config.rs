use crate::application::acs_client::RetryPolicy;
use crate::domain::decision::{DEFAULT_PSD2_MARKETS, Psd2Markets};
use crate::error::{PaymentError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Orchestrator configuration.
///
/// Every field has a default so a partial JSON file is enough; CLI flags
/// override individual values after loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrchestratorConfig {
    /// Base URL of the ACS (`/acs/setstatus`, `/acs/challenge`, `/acs/fingerprint`).
    #[serde(default = "default_acs_base_url")]
    pub acs_base_url: String,

    /// Base URL for browser completion callbacks.
    #[serde(default = "default_notification_url")]
    pub notification_url: String,

    #[serde(default = "default_message_version")]
    pub message_version: String,

    /// Per-attempt timeout for ACS calls.
    #[serde(default = "default_acs_timeout_secs")]
    pub acs_timeout_secs: u64,

    #[serde(default = "default_max_notify_attempts")]
    pub max_notify_attempts: u32,

    /// Fixed delay between notification attempts.
    #[serde(default)]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_psd2_markets")]
    pub psd2_markets: Vec<String>,
}

fn default_acs_base_url() -> String {
    "https://acs.localhost".to_string()
}

fn default_notification_url() -> String {
    "https://localhost/paymentSessions".to_string()
}

fn default_message_version() -> String {
    "2.1.0".to_string()
}

fn default_acs_timeout_secs() -> u64 {
    60
}

fn default_max_notify_attempts() -> u32 {
    3
}

fn default_psd2_markets() -> Vec<String> {
    DEFAULT_PSD2_MARKETS.iter().map(|c| c.to_string()).collect()
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            acs_base_url: default_acs_base_url(),
            notification_url: default_notification_url(),
            message_version: default_message_version(),
            acs_timeout_secs: default_acs_timeout_secs(),
            max_notify_attempts: default_max_notify_attempts(),
            retry_backoff_ms: 0,
            psd2_markets: default_psd2_markets(),
        }
    }
}

impl OrchestratorConfig {
    /// Loads and validates a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.acs_base_url)
            .map_err(|e| PaymentError::Validation(format!("acs_base_url: {e}")))?;
        Url::parse(&self.notification_url)
            .map_err(|e| PaymentError::Validation(format!("notification_url: {e}")))?;
        if self.max_notify_attempts == 0 {
            return Err(PaymentError::Validation(
                "max_notify_attempts must be at least 1".to_string(),
            ));
        }
        if self.psd2_markets.is_empty() {
            return Err(PaymentError::Validation(
                "psd2_markets must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn acs_timeout(&self) -> Duration {
        Duration::from_secs(self.acs_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn markets(&self) -> Psd2Markets {
        Psd2Markets::new(&self.psd2_markets)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_notify_attempts,
            backoff: self.retry_backoff(),
            timeout: self.acs_timeout(),
        }
    }
}
