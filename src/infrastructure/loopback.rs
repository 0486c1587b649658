use crate::domain::outcome::AcsStatusPayload;
use crate::domain::ports::{AcsTransport, TransportFailure};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// In-process ACS that accepts every status update.
///
/// Used by the batch CLI when no ACS URL is configured, and by tests that
/// need to inspect what would have been sent. Clones share the recorded log.
#[derive(Default, Clone)]
pub struct LoopbackAcs {
    received: Arc<RwLock<Vec<(String, AcsStatusPayload)>>>,
}

impl LoopbackAcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(url, payload)` accepted so far, oldest first.
    pub async fn received(&self) -> Vec<(String, AcsStatusPayload)> {
        self.received.read().await.clone()
    }
}

#[async_trait]
impl AcsTransport for LoopbackAcs {
    async fn post_status(
        &self,
        url: &str,
        payload: &AcsStatusPayload,
        _timeout: Duration,
    ) -> Result<(), TransportFailure> {
        debug!(url, trans_status = %payload.trans_status, "loopback ACS accepted status");
        self.received
            .write()
            .await
            .push((url.to_string(), payload.clone()));
        Ok(())
    }
}
