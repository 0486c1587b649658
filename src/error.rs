use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payment session not found: {0}")]
    SessionNotFound(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Correlation mismatch: expected {expected}, got {actual}")]
    CorrelationMismatch { expected: String, actual: String },

    #[error("Invalid state transition: cannot {operation} while {state}")]
    InvalidStateTransition {
        operation: &'static str,
        state: String,
    },

    #[error(
        "Unrecognized outcome: transStatus={trans_status:?}, transStatusReason={reason:?}, challengeCancel={cancel:?}"
    )]
    UnrecognizedOutcome {
        trans_status: Option<String>,
        reason: Option<String>,
        cancel: Option<String>,
    },

    #[error("ACS communication failed after {attempts} attempt(s): {message}")]
    Communication { attempts: u32, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl PaymentError {
    /// Only ACS communication failures may be retried by the caller; everything
    /// else is either corrupt input or an integration bug.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::Communication { .. })
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;
