use crate::domain::outcome::AcsStatusPayload;
use crate::domain::ports::{AcsTransportBox, TransportFailure};
use crate::error::{PaymentError, Result};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const SET_STATUS_PATH: &str = "acs/setstatus";

/// Attempt bound and delay for ACS notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    /// Three immediate attempts, 60 seconds each.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::ZERO,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Relays the cardholder's outcome to the ACS.
///
/// The HTTP client is injected as an `AcsTransport`; this type owns only the
/// retry loop. Attempts are strictly sequential.
pub struct AcsNotificationClient {
    transport: AcsTransportBox,
    policy: RetryPolicy,
}

impl AcsNotificationClient {
    pub fn new(transport: AcsTransportBox, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Resolves the `setstatus` endpoint under an ACS base URL.
    pub fn set_status_url(acs_base_url: &str) -> Result<String> {
        join_url(acs_base_url, SET_STATUS_PATH)
    }

    /// Posts `payload` to `acs_url`, retrying up to the policy's attempt bound.
    /// An attempt that outlives the policy timeout is abandoned and counts as
    /// a failed attempt.
    pub async fn notify(&self, acs_url: &str, payload: &AcsStatusPayload) -> Result<()> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_failure = None;

        for attempt in 1..=max_attempts {
            let outcome = tokio::time::timeout(
                self.policy.timeout,
                self.transport.post_status(acs_url, payload, self.policy.timeout),
            )
            .await
            .unwrap_or_else(|_| {
                Err(TransportFailure::Transport(format!(
                    "attempt timed out after {:?}",
                    self.policy.timeout
                )))
            });

            match outcome {
                Ok(()) => {
                    debug!(
                        three_ds_server_transaction_id = %payload.three_ds_server_transaction_id,
                        attempt,
                        "ACS status delivered"
                    );
                    return Ok(());
                }
                Err(failure) => {
                    warn!(
                        three_ds_server_transaction_id = %payload.three_ds_server_transaction_id,
                        attempt,
                        max_attempts,
                        %failure,
                        "ACS status delivery failed"
                    );
                    last_failure = Some(failure);
                }
            }

            if attempt < max_attempts && !self.policy.backoff.is_zero() {
                tokio::time::sleep(self.policy.backoff).await;
            }
        }

        Err(PaymentError::Communication {
            attempts: max_attempts,
            message: last_failure
                .map(|f| f.to_string())
                .unwrap_or_else(|| "no attempt made".to_string()),
        })
    }
}

/// Joins `path` under `base`, keeping any path prefix the base already has.
pub(crate) fn join_url(base: &str, path: &str) -> Result<String> {
    let mut base = Url::parse(base)
        .map_err(|e| PaymentError::Validation(format!("invalid base URL '{base}': {e}")))?;
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path)
        .map(String::from)
        .map_err(|e| PaymentError::Validation(format!("invalid URL path '{path}': {e}")))
}
