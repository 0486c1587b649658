use crate::domain::outcome::AcsStatusPayload;
use crate::domain::ports::{AcsTransport, TransportFailure};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// `AcsTransport` over HTTPS.
///
/// Wraps an injected `reqwest::Client` so connection pools are shared with the
/// rest of the host process. The per-attempt timeout is set on each request.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Builds a transport with its own client.
    pub fn with_default_client() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| PaymentError::Validation(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl AcsTransport for ReqwestTransport {
    async fn post_status(
        &self,
        url: &str,
        payload: &AcsStatusPayload,
        timeout: Duration,
    ) -> std::result::Result<(), TransportFailure> {
        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| TransportFailure::Transport(e.to_string()))?;

        let status = response.status();
        debug!(url, %status, "ACS setstatus responded");
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportFailure::Status(status.as_u16()))
        }
    }
}
