//! Structured browser directives and the signed payloads they carry.

use super::codec;
use super::session::PaymentSession;
use serde::{Deserialize, Serialize};

/// Content of `threeDSSessionData`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(rename = "threeDSServerTransID")]
    pub three_ds_server_transaction_id: String,
    #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Content of `threeDSMethodData`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodData {
    #[serde(rename = "threeDSServerTransID")]
    pub three_ds_server_transaction_id: String,
    #[serde(
        rename = "threeDSMethodNotificationURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub notification_url: Option<String>,
}

/// Challenge request sent to the ACS through the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    #[serde(rename = "threeDSServerTransID")]
    pub three_ds_server_transaction_id: String,
    #[serde(rename = "acsTransID")]
    pub acs_transaction_id: String,
    pub message_type: String,
    pub message_version: String,
    pub challenge_window_size: String,
}

/// Challenge response posted back by the ACS through the browser. Only the
/// status codes are read; the rest of the message is not validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    #[serde(rename = "threeDSServerTransID", default)]
    pub three_ds_server_transaction_id: Option<String>,
    #[serde(default)]
    pub trans_status: Option<String>,
    #[serde(default)]
    pub trans_status_reason: Option<String>,
    #[serde(default)]
    pub challenge_cancel: Option<String>,
}

impl ChallengeResponse {
    /// Decodes `cres` leniently: anything that is not a JSON object with status
    /// fields yields an empty response.
    pub fn decode_lenient(cres: &str) -> Self {
        codec::decode_json(cres).unwrap_or_default()
    }
}

pub const CHALLENGE_WINDOW_FULL_PAGE: &str = "05";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintDirective {
    pub method_url: String,
    pub three_ds_method_data: String,
    pub notification_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeDirective {
    pub acs_url: String,
    pub three_ds_session_data: String,
    pub creq: String,
    pub notification_url: String,
}

/// Next thing the browser has to do, decided once at the protocol boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthenticationStep {
    Fingerprint(FingerprintDirective),
    Challenge(ChallengeDirective),
    Final(PaymentSession),
}

impl AuthenticationStep {
    pub fn is_final(&self) -> bool {
        matches!(self, AuthenticationStep::Final(_))
    }
}
