//! Mapping between business outcomes and the ACS wire codes
//! (`transStatus`, `transStatusReason`, `challengeCancel`).

use super::session::ChallengeStatus;
use crate::error::{PaymentError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `transStatusReason` codes used by this service.
pub mod reason {
    pub const CANCELLED_BY_CARDHOLDER: &str = "01";
    pub const GENERIC_FAILURE: &str = "10";
    pub const TIMED_OUT: &str = "14";
}

/// `challengeCancel` indicator for a cardholder cancellation.
pub const CANCELLED_BY_CARDHOLDER: &str = "01";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransStatus {
    /// Authenticated.
    Y,
    /// Not authenticated.
    N,
    /// Attempted / abandoned.
    A,
}

impl TransStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransStatus::Y => "Y",
            TransStatus::N => "N",
            TransStatus::A => "A",
        }
    }
}

impl fmt::Display for TransStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST {acsBaseUrl}/acs/setstatus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcsStatusPayload {
    #[serde(rename = "threeDSServerTransID")]
    pub three_ds_server_transaction_id: String,
    pub trans_status: TransStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trans_status_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_cancel: Option<String>,
}

impl AcsStatusPayload {
    /// Terminal challenge status this payload stands for.
    pub fn challenge_status(&self) -> Result<ChallengeStatus> {
        map_outcome(
            Some(self.trans_status.as_str()),
            self.trans_status_reason.as_deref(),
            self.challenge_cancel.as_deref(),
        )
    }
}

/// The cardholder's decision as observed by the browser flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeOutcome {
    Succeeded,
    Failed,
    Cancelled,
    #[serde(alias = "timed_out")]
    TimedOut,
}

impl ChallengeOutcome {
    /// Wire codes to report this outcome to the ACS.
    pub fn to_acs_status(self, three_ds_server_transaction_id: &str) -> AcsStatusPayload {
        let (trans_status, reason, cancel) = match self {
            ChallengeOutcome::Succeeded => (TransStatus::Y, None, None),
            ChallengeOutcome::Failed => (TransStatus::N, Some(reason::GENERIC_FAILURE), None),
            ChallengeOutcome::Cancelled => (
                TransStatus::N,
                Some(reason::CANCELLED_BY_CARDHOLDER),
                Some(CANCELLED_BY_CARDHOLDER),
            ),
            ChallengeOutcome::TimedOut => (TransStatus::N, Some(reason::TIMED_OUT), None),
        };

        AcsStatusPayload {
            three_ds_server_transaction_id: three_ds_server_transaction_id.to_string(),
            trans_status,
            trans_status_reason: reason.map(str::to_string),
            challenge_cancel: cancel.map(str::to_string),
        }
    }
}

/// Resolves wire codes to a terminal challenge status.
///
/// Evaluated in priority order:
/// 1. `A`, or `N` with a cancel indicator → `Cancelled`
/// 2. `N` with reason `14` → `TimedOut`
/// 3. any other `N` → `Failed`
/// 4. `Y` → `Succeeded`
///
/// Anything else is `UnrecognizedOutcome`; there is no default.
pub fn map_outcome(
    trans_status: Option<&str>,
    reason: Option<&str>,
    cancel: Option<&str>,
) -> Result<ChallengeStatus> {
    let cancel = cancel.filter(|c| !c.trim().is_empty());

    match (trans_status, reason) {
        (Some("A"), _) => Ok(ChallengeStatus::Cancelled),
        (Some("N"), _) if cancel.is_some() => Ok(ChallengeStatus::Cancelled),
        (Some("N"), Some(reason::TIMED_OUT)) => Ok(ChallengeStatus::TimedOut),
        (Some("N"), _) => Ok(ChallengeStatus::Failed),
        (Some("Y"), _) => Ok(ChallengeStatus::Succeeded),
        _ => {
            tracing::error!(
                trans_status = ?trans_status,
                reason = ?reason,
                cancel = ?cancel,
                "unrecognized ACS outcome"
            );
            Err(PaymentError::UnrecognizedOutcome {
                trans_status: trans_status.map(str::to_string),
                reason: reason.map(str::to_string),
                cancel: cancel.map(str::to_string),
            })
        }
    }
}
