use super::amount::{Amount, normalize_code};
use super::decision::{AccountRiskProfile, Decision};
use super::outcome::AcsStatusPayload;
use crate::error::{PaymentError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChallengeStatus {
    #[default]
    Unknown,
    NotApplicable,
    ByPassed,
    Succeeded,
    Failed,
    Cancelled,
    TimedOut,
}

impl ChallengeStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChallengeStatus::Unknown)
    }

    /// Statuses that let the payment proceed.
    pub fn is_authentication_verified(&self) -> bool {
        matches!(
            self,
            ChallengeStatus::Succeeded | ChallengeStatus::ByPassed | ChallengeStatus::NotApplicable
        )
    }
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChallengeScenario {
    #[default]
    #[serde(alias = "payment")]
    PaymentTransaction,
    #[serde(alias = "recurring")]
    RecurringTransaction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Created,
    DecisionMade,
    NotApplicable,
    ByPassed,
    AwaitingFingerprint,
    AwaitingChallenge,
    Resolved,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::NotApplicable | SessionState::ByPassed | SessionState::Resolved
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Correlation data for one authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationContext {
    pub three_ds_server_transaction_id: String,
    pub sdk_transaction_id: String,
    pub message_version: String,
}

impl AuthenticationContext {
    pub fn generate(message_version: &str) -> Self {
        Self {
            three_ds_server_transaction_id: Uuid::new_v4().to_string(),
            sdk_transaction_id: Uuid::new_v4().to_string(),
            message_version: message_version.to_string(),
        }
    }
}

/// Caller input to `create_session`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAttributes {
    pub amount: Amount,
    pub currency: String,
    pub country: String,
    #[serde(default)]
    pub is_moto: bool,
    #[serde(default)]
    pub challenge_scenario: ChallengeScenario,
    pub risk_profile: AccountRiskProfile,
    /// Where to send the browser once authentication is verified.
    #[serde(default)]
    pub success_url: Option<String>,
    /// Where to send the browser on any other outcome.
    #[serde(default)]
    pub failure_url: Option<String>,
}

impl SessionAttributes {
    pub fn new(
        amount: Amount,
        currency: impl Into<String>,
        country: impl Into<String>,
        risk_profile: AccountRiskProfile,
    ) -> Self {
        Self {
            amount,
            currency: currency.into(),
            country: country.into(),
            is_moto: false,
            challenge_scenario: ChallengeScenario::PaymentTransaction,
            risk_profile,
            success_url: None,
            failure_url: None,
        }
    }

    pub fn moto(mut self, is_moto: bool) -> Self {
        self.is_moto = is_moto;
        self
    }

    pub fn scenario(mut self, scenario: ChallengeScenario) -> Self {
        self.challenge_scenario = scenario;
        self
    }

    pub fn redirects(mut self, success_url: impl Into<String>, failure_url: impl Into<String>) -> Self {
        self.success_url = Some(success_url.into());
        self.failure_url = Some(failure_url.into());
        self
    }

    /// Checks required fields and normalizes ISO codes.
    pub fn validated(mut self) -> Result<Self> {
        self.currency = normalize_code("currency", &self.currency, 3)?;
        self.country = normalize_code("country", &self.country, 2)?;
        Ok(self)
    }
}

/// What the browser should do once the session is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientAction {
    Redirect {
        url: String,
    },
    #[serde(rename_all = "camelCase")]
    ReturnContext {
        challenge_status: ChallengeStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<String>,
    },
}

pub const REJECTED_BY_PROVIDER: &str = "RejectedByProvider";

/// One authentication attempt.
///
/// Everything is fixed at creation except the progress fields, which only move
/// through the transition methods below. The challenge status is assigned
/// exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSession {
    id: String,
    amount: Amount,
    currency: String,
    country: String,
    is_moto: bool,
    challenge_scenario: ChallengeScenario,
    is_challenge_required: bool,
    decision: Decision,
    context: AuthenticationContext,
    success_url: Option<String>,
    failure_url: Option<String>,
    /// Status last relayed to the ACS on the cardholder's behalf.
    acs_status: Option<AcsStatusPayload>,
    fingerprint_pending: bool,
    fingerprint_timed_out: bool,
    challenge_status: ChallengeStatus,
    state: SessionState,
}

impl PaymentSession {
    /// Builds a session in `Created` with a fresh id and correlation context.
    pub fn new(attributes: SessionAttributes, decision: Decision, message_version: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            amount: attributes.amount,
            currency: attributes.currency,
            country: attributes.country,
            is_moto: attributes.is_moto,
            challenge_scenario: attributes.challenge_scenario,
            is_challenge_required: decision.is_challenge_required,
            decision,
            context: AuthenticationContext::generate(message_version),
            success_url: attributes.success_url,
            failure_url: attributes.failure_url,
            acs_status: None,
            fingerprint_pending: false,
            fingerprint_timed_out: false,
            challenge_status: ChallengeStatus::Unknown,
            state: SessionState::Created,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn is_moto(&self) -> bool {
        self.is_moto
    }

    pub fn challenge_scenario(&self) -> ChallengeScenario {
        self.challenge_scenario
    }

    pub fn is_challenge_required(&self) -> bool {
        self.is_challenge_required
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn context(&self) -> &AuthenticationContext {
        &self.context
    }

    pub fn acs_status(&self) -> Option<&AcsStatusPayload> {
        self.acs_status.as_ref()
    }

    pub fn fingerprint_pending(&self) -> bool {
        self.fingerprint_pending
    }

    pub fn fingerprint_timed_out(&self) -> bool {
        self.fingerprint_timed_out
    }

    pub fn challenge_status(&self) -> ChallengeStatus {
        self.challenge_status
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn three_ds_server_transaction_id(&self) -> &str {
        &self.context.three_ds_server_transaction_id
    }

    fn invalid(&self, operation: &'static str) -> PaymentError {
        PaymentError::InvalidStateTransition {
            operation,
            state: self.state.to_string(),
        }
    }

    fn transition(&mut self, to: SessionState) {
        tracing::info!(session_id = %self.id, from = %self.state, to = %to, "session transition");
        self.state = to;
    }

    /// Applies the decision: terminal `NotApplicable`/`ByPassed` or `DecisionMade`.
    pub fn apply_decision(&mut self) -> Result<()> {
        if self.state != SessionState::Created {
            return Err(self.invalid("apply decision"));
        }
        self.transition(SessionState::DecisionMade);

        if !self.decision.is_challenge_required {
            self.challenge_status = ChallengeStatus::NotApplicable;
            self.transition(SessionState::NotApplicable);
        } else if self.decision.is_by_passed {
            self.challenge_status = ChallengeStatus::ByPassed;
            self.transition(SessionState::ByPassed);
        }
        Ok(())
    }

    pub fn begin_fingerprint(&mut self) -> Result<()> {
        if self.state != SessionState::DecisionMade {
            return Err(self.invalid("request fingerprint"));
        }
        self.fingerprint_pending = true;
        self.transition(SessionState::AwaitingFingerprint);
        Ok(())
    }

    /// Clears the pending flag; the state stays `AwaitingFingerprint`.
    pub fn finish_fingerprint(&mut self, timed_out: bool) -> Result<()> {
        if self.state != SessionState::AwaitingFingerprint {
            return Err(self.invalid("complete fingerprint"));
        }
        self.fingerprint_pending = false;
        self.fingerprint_timed_out = timed_out;
        Ok(())
    }

    /// Fingerprinting is optional, so a challenge may follow either state.
    pub fn begin_challenge(&mut self) -> Result<()> {
        match self.state {
            SessionState::DecisionMade | SessionState::AwaitingFingerprint => {
                self.fingerprint_pending = false;
                self.transition(SessionState::AwaitingChallenge);
                Ok(())
            }
            _ => Err(self.invalid("issue challenge")),
        }
    }

    pub fn record_acs_status(&mut self, payload: AcsStatusPayload) -> Result<()> {
        if self.state != SessionState::AwaitingChallenge {
            return Err(self.invalid("relay outcome"));
        }
        self.acs_status = Some(payload);
        Ok(())
    }

    /// Frictionless resolution, reached without a challenge directive.
    pub fn resolve_frictionless(&mut self, status: ChallengeStatus) -> Result<()> {
        match self.state {
            SessionState::DecisionMade | SessionState::AwaitingFingerprint => {
                self.fingerprint_pending = false;
                self.set_terminal(status)
            }
            _ => Err(self.invalid("resolve frictionlessly")),
        }
    }

    /// Resolves an outstanding challenge.
    pub fn resolve(&mut self, status: ChallengeStatus) -> Result<()> {
        if self.state != SessionState::AwaitingChallenge {
            return Err(self.invalid("complete challenge"));
        }
        self.set_terminal(status)
    }

    fn set_terminal(&mut self, status: ChallengeStatus) -> Result<()> {
        if self.challenge_status.is_terminal() || !status.is_terminal() {
            return Err(self.invalid("resolve"));
        }
        self.challenge_status = status;
        self.transition(SessionState::Resolved);
        Ok(())
    }

    /// Browser action for a terminal session; `None` while authentication is in flight.
    pub fn client_action(&self) -> Option<ClientAction> {
        if !self.state.is_terminal() {
            return None;
        }

        let verified = self.challenge_status.is_authentication_verified();
        let redirect = if verified {
            self.success_url.as_ref()
        } else {
            self.failure_url.as_ref()
        };

        Some(match redirect {
            Some(url) => ClientAction::Redirect { url: url.clone() },
            None => ClientAction::ReturnContext {
                challenge_status: self.challenge_status,
                error_code: (!verified).then(|| REJECTED_BY_PROVIDER.to_string()),
            },
        })
    }
}
