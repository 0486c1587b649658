use super::outcome::AcsStatusPayload;
use super::session::PaymentSession;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// External store holding sessions between browser round-trips.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn store(&self, session: PaymentSession) -> Result<()>;
    async fn get(&self, session_id: &str) -> Result<Option<PaymentSession>>;
    async fn all(&self) -> Result<Vec<PaymentSession>>;
}

pub type SessionStoreBox = Box<dyn SessionStore>;

/// Failure of a single HTTP attempt against the ACS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// The ACS answered with a non-2xx status.
    Status(u16),
    /// Connection, timeout or other transport-level error.
    Transport(String),
}

impl std::fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportFailure::Status(code) => write!(f, "ACS responded with status {code}"),
            TransportFailure::Transport(msg) => write!(f, "transport error: {msg}"),
        }
    }
}

/// One JSON POST to the ACS. Implementations make exactly one attempt; the
/// notification client owns retries.
#[async_trait]
pub trait AcsTransport: Send + Sync {
    async fn post_status(
        &self,
        url: &str,
        payload: &AcsStatusPayload,
        timeout: Duration,
    ) -> std::result::Result<(), TransportFailure>;
}

pub type AcsTransportBox = Box<dyn AcsTransport>;
