use super::acs_client::{AcsNotificationClient, join_url};
use crate::config::OrchestratorConfig;
use crate::domain::callback::{ChallengeCallback, FingerprintCallback, RequestHeaders};
use crate::domain::codec;
use crate::domain::decision::{DecisionInput, Psd2Markets, decide};
use crate::domain::directive::{
    AuthenticationStep, CHALLENGE_WINDOW_FULL_PAGE, ChallengeDirective, ChallengeRequest,
    ChallengeResponse, FingerprintDirective, MethodData, SessionData,
};
use crate::domain::outcome::{ChallengeOutcome, map_outcome, reason};
use crate::domain::ports::SessionStoreBox;
use crate::domain::session::{PaymentSession, SessionAttributes, SessionState};
use crate::error::{PaymentError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

const ACS_CHALLENGE_PATH: &str = "acs/challenge";
const ACS_FINGERPRINT_PATH: &str = "acs/fingerprint";

/// Drives a payment session through decision, optional fingerprinting,
/// challenge and completion.
///
/// Sessions live in the injected `SessionStore`. Each operation loads the
/// session, applies one transition and writes it back while holding that
/// session's lock, so two calls never race on the same id while unrelated
/// sessions proceed independently. The lock table holds weak references; an
/// entry lives only while some call holds or waits on it.
pub struct AuthenticationOrchestrator {
    store: SessionStoreBox,
    acs_client: AcsNotificationClient,
    markets: Psd2Markets,
    acs_base_url: String,
    notification_url: String,
    message_version: String,
    locks: Mutex<HashMap<String, Weak<Mutex<()>>>>,
}

impl AuthenticationOrchestrator {
    pub fn new(
        config: &OrchestratorConfig,
        store: SessionStoreBox,
        acs_client: AcsNotificationClient,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            acs_client,
            markets: config.markets(),
            acs_base_url: config.acs_base_url.clone(),
            notification_url: config.notification_url.clone(),
            message_version: config.message_version.clone(),
            locks: Mutex::new(HashMap::new()),
        })
    }

    async fn lock(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let entry = {
            let mut table = self.locks.lock().await;
            table.retain(|_, lock| lock.strong_count() > 0);
            match table.get(session_id).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(Mutex::new(()));
                    table.insert(session_id.to_string(), Arc::downgrade(&lock));
                    lock
                }
            }
        };
        entry.lock_owned().await
    }

    /// Number of sessions with a call in flight.
    #[cfg(test)]
    async fn locked_sessions(&self) -> usize {
        let mut table = self.locks.lock().await;
        table.retain(|_, lock| lock.strong_count() > 0);
        table.len()
    }

    async fn load(&self, session_id: &str) -> Result<PaymentSession> {
        self.store
            .get(session_id)
            .await?
            .ok_or_else(|| PaymentError::SessionNotFound(session_id.to_string()))
    }

    async fn save(&self, session: &PaymentSession) -> Result<()> {
        self.store.store(session.clone()).await
    }

    fn callback_url(&self, session_id: &str, step: &str) -> Result<String> {
        join_url(&self.notification_url, &format!("{session_id}/{step}"))
    }

    pub async fn get_session(&self, session_id: &str) -> Result<PaymentSession> {
        self.load(session_id).await
    }

    pub async fn sessions(&self) -> Result<Vec<PaymentSession>> {
        self.store.all().await
    }

    /// Validates the attributes, runs the decision and stores the session.
    ///
    /// Sessions that need no challenge, or that are MOTO, come back terminal.
    pub async fn create_session(
        &self,
        attributes: SessionAttributes,
        headers: &RequestHeaders,
    ) -> Result<PaymentSession> {
        let mut attributes = attributes.validated()?;
        if headers.is_moto() {
            attributes.is_moto = true;
        }

        let decision = decide(
            &DecisionInput {
                amount: attributes.amount,
                currency: &attributes.currency,
                country: &attributes.country,
                is_moto: attributes.is_moto,
                scenario: attributes.challenge_scenario,
                risk_profile: attributes.risk_profile,
            },
            &self.markets,
        );

        let mut session = PaymentSession::new(attributes, decision, &self.message_version);
        info!(
            session_id = %session.id(),
            amount = %session.amount(),
            currency = %session.currency(),
            country = %session.country(),
            is_moto = session.is_moto(),
            ?decision,
            "payment session created"
        );

        session.apply_decision()?;
        self.store.store(session.clone()).await?;
        Ok(session)
    }

    /// Returns the fingerprint directive, or `None` when fingerprinting does not
    /// apply to this session.
    pub async fn request_fingerprint(&self, session_id: &str) -> Result<Option<FingerprintDirective>> {
        let _guard = self.lock(session_id).await;
        let mut session = self.load(session_id).await?;

        if !session.decision().is_fingerprint_applicable {
            debug!(session_id, "fingerprint not applicable");
            return Ok(None);
        }

        session.begin_fingerprint()?;

        let notification_url = self.callback_url(session.id(), "fingerprintCompleted")?;
        let directive = FingerprintDirective {
            method_url: join_url(&self.acs_base_url, ACS_FINGERPRINT_PATH)?,
            three_ds_method_data: codec::encode_json(&MethodData {
                three_ds_server_transaction_id: session.three_ds_server_transaction_id().to_string(),
                notification_url: Some(notification_url.clone()),
            })?,
            notification_url,
        };

        self.save(&session).await?;
        debug!(session_id, method_url = %directive.method_url, "fingerprint directive issued");
        Ok(Some(directive))
    }

    /// Clears the pending-fingerprint flag. A timed-out fingerprint is logged
    /// and recorded but never fails the session.
    pub async fn complete_fingerprint(
        &self,
        session_id: &str,
        callback: FingerprintCallback,
    ) -> Result<PaymentSession> {
        let _guard = self.lock(session_id).await;
        let mut session = self.load(session_id).await?;

        if session.state() != SessionState::AwaitingFingerprint {
            return Err(PaymentError::InvalidStateTransition {
                operation: "complete fingerprint",
                state: session.state().to_string(),
            });
        }

        if let Some(method_data) = &callback.three_ds_method_data {
            let data: MethodData = codec::decode_json(method_data)?;
            verify_correlation(&session, &data.three_ds_server_transaction_id)?;
        }

        if callback.timed_out {
            warn!(session_id, "device fingerprint timed out");
        }

        session.finish_fingerprint(callback.timed_out)?;
        self.save(&session).await?;
        Ok(session)
    }

    /// Issues the challenge directive, or resolves a frictionless session
    /// directly without one.
    pub async fn issue_challenge(&self, session_id: &str) -> Result<AuthenticationStep> {
        let _guard = self.lock(session_id).await;
        let mut session = self.load(session_id).await?;

        if session.decision().is_frictionless {
            let status = map_outcome(Some("Y"), None, None)?;
            session.resolve_frictionless(status)?;
            self.save(&session).await?;
            info!(session_id, %status, "session resolved frictionlessly");
            return Ok(AuthenticationStep::Final(session));
        }

        session.begin_challenge()?;

        let transaction_id = session.three_ds_server_transaction_id().to_string();
        let directive = ChallengeDirective {
            acs_url: join_url(&self.acs_base_url, ACS_CHALLENGE_PATH)?,
            three_ds_session_data: codec::encode_json(&SessionData {
                three_ds_server_transaction_id: transaction_id.clone(),
                session_id: Some(session.id().to_string()),
            })?,
            creq: codec::encode_json(&ChallengeRequest {
                three_ds_server_transaction_id: transaction_id.clone(),
                acs_transaction_id: transaction_id,
                message_type: "CReq".to_string(),
                message_version: session.context().message_version.clone(),
                challenge_window_size: CHALLENGE_WINDOW_FULL_PAGE.to_string(),
            })?,
            notification_url: self.callback_url(session.id(), "challengeCompleted")?,
        };

        self.save(&session).await?;
        debug!(session_id, acs_url = %directive.acs_url, "challenge directive issued");
        Ok(AuthenticationStep::Challenge(directive))
    }

    /// Next step for the browser: fingerprint first when it applies and has not
    /// been requested, otherwise the challenge; terminal sessions come back as
    /// `Final`.
    pub async fn authenticate(&self, session_id: &str) -> Result<AuthenticationStep> {
        let session = self.load(session_id).await?;

        if session.state().is_terminal() {
            return Ok(AuthenticationStep::Final(session));
        }

        if session.state() == SessionState::DecisionMade
            && let Some(directive) = self.request_fingerprint(session_id).await?
        {
            return Ok(AuthenticationStep::Fingerprint(directive));
        }

        self.issue_challenge(session_id).await
    }

    /// Reports the cardholder's decision to the ACS and records what the ACS
    /// now holds. On communication failure the session is left untouched.
    pub async fn relay_outcome(
        &self,
        session_id: &str,
        outcome: ChallengeOutcome,
    ) -> Result<PaymentSession> {
        let _guard = self.lock(session_id).await;
        let mut session = self.load(session_id).await?;

        if session.state() != SessionState::AwaitingChallenge {
            return Err(PaymentError::InvalidStateTransition {
                operation: "relay outcome",
                state: session.state().to_string(),
            });
        }

        let payload = outcome.to_acs_status(session.three_ds_server_transaction_id());
        let url = AcsNotificationClient::set_status_url(&self.acs_base_url)?;
        self.acs_client.notify(&url, &payload).await?;

        session.record_acs_status(payload)?;
        self.save(&session).await?;
        info!(session_id, ?outcome, "outcome relayed to ACS");
        Ok(session)
    }

    /// Resolves the challenge from the completion callback.
    ///
    /// The status comes from what was relayed to the ACS; without a relay the
    /// codes inside `cres` are used.
    pub async fn complete_challenge(
        &self,
        session_id: &str,
        callback: ChallengeCallback,
    ) -> Result<PaymentSession> {
        let _guard = self.lock(session_id).await;
        let mut session = self.load(session_id).await?;

        if session.state() != SessionState::AwaitingChallenge {
            return Err(PaymentError::InvalidStateTransition {
                operation: "complete challenge",
                state: session.state().to_string(),
            });
        }

        let data: SessionData = codec::decode_json(&callback.three_ds_session_data)?;
        verify_correlation(&session, &data.three_ds_server_transaction_id)?;

        let status = match session.acs_status() {
            Some(payload) => payload.challenge_status()?,
            None => {
                let cres = ChallengeResponse::decode_lenient(&callback.cres);
                map_outcome(
                    cres.trans_status.as_deref(),
                    cres.trans_status_reason.as_deref(),
                    cres.challenge_cancel.as_deref(),
                )?
            }
        };

        session.resolve(status)?;
        self.save(&session).await?;
        info!(session_id, %status, "challenge completed");
        Ok(session)
    }

    /// Caller-signalled deadline: resolves an outstanding challenge as timed out.
    pub async fn expire_challenge(&self, session_id: &str) -> Result<PaymentSession> {
        let _guard = self.lock(session_id).await;
        let mut session = self.load(session_id).await?;

        if session.state() != SessionState::AwaitingChallenge {
            return Err(PaymentError::InvalidStateTransition {
                operation: "expire challenge",
                state: session.state().to_string(),
            });
        }

        let status = map_outcome(Some("N"), Some(reason::TIMED_OUT), None)?;
        session.resolve(status)?;
        self.save(&session).await?;
        info!(session_id, %status, "challenge expired by caller deadline");
        Ok(session)
    }
}

fn verify_correlation(session: &PaymentSession, actual: &str) -> Result<()> {
    let expected = session.three_ds_server_transaction_id();
    if expected != actual {
        error!(
            session_id = %session.id(),
            expected,
            actual,
            "threeDSServerTransID does not match session"
        );
        return Err(PaymentError::CorrelationMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::acs_client::RetryPolicy;
    use crate::domain::amount::Amount;
    use crate::domain::decision::{AccountRiskProfile, RiskSignal};
    use crate::domain::session::ChallengeStatus;
    use crate::infrastructure::in_memory::InMemorySessionStore;
    use crate::infrastructure::loopback::LoopbackAcs;
    use rust_decimal_macros::dec;

    fn orchestrator() -> (AuthenticationOrchestrator, LoopbackAcs) {
        let acs = LoopbackAcs::new();
        let client = AcsNotificationClient::new(Box::new(acs.clone()), RetryPolicy::default());
        let orchestrator = AuthenticationOrchestrator::new(
            &OrchestratorConfig::default(),
            Box::new(InMemorySessionStore::new()),
            client,
        )
        .unwrap();
        (orchestrator, acs)
    }

    fn interactive() -> SessionAttributes {
        SessionAttributes::new(
            Amount::new(dec!(101.00)).unwrap(),
            "EUR",
            "DE",
            AccountRiskProfile::psd2(RiskSignal::Challenge),
        )
    }

    #[tokio::test]
    async fn test_create_session_assigns_ids() {
        let (orchestrator, _) = orchestrator();
        let a = orchestrator
            .create_session(interactive(), &RequestHeaders::new())
            .await
            .unwrap();
        let b = orchestrator
            .create_session(interactive(), &RequestHeaders::new())
            .await
            .unwrap();

        assert_ne!(a.id(), b.id());
        assert_ne!(
            a.three_ds_server_transaction_id(),
            b.three_ds_server_transaction_id()
        );
        assert_eq!(a.context().message_version, "2.1.0");
        assert_eq!(a.state(), SessionState::DecisionMade);
        assert_eq!(orchestrator.sessions().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_session_rejects_missing_country() {
        let (orchestrator, _) = orchestrator();
        let mut attributes = interactive();
        attributes.country = String::new();
        let err = orchestrator
            .create_session(attributes, &RequestHeaders::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
        assert!(orchestrator.sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_moto_header_bypasses() {
        let (orchestrator, acs) = orchestrator();
        let headers = RequestHeaders::new().with("x-ms-ismoto", "true");
        let session = orchestrator
            .create_session(interactive(), &headers)
            .await
            .unwrap();
        assert!(session.is_moto());
        assert_eq!(session.challenge_status(), ChallengeStatus::ByPassed);
        assert!(acs.received().await.is_empty());
    }

    #[tokio::test]
    async fn test_fingerprint_directive_carries_correlation_id() {
        let (orchestrator, _) = orchestrator();
        let session = orchestrator
            .create_session(interactive(), &RequestHeaders::new())
            .await
            .unwrap();

        let directive = orchestrator
            .request_fingerprint(session.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(directive.method_url, "https://acs.localhost/acs/fingerprint");
        assert!(directive.notification_url.ends_with("/fingerprintCompleted"));

        let data: MethodData = codec::decode_json(&directive.three_ds_method_data).unwrap();
        assert_eq!(
            data.three_ds_server_transaction_id,
            session.three_ds_server_transaction_id()
        );

        let stored = orchestrator.get_session(session.id()).await.unwrap();
        assert!(stored.fingerprint_pending());
    }

    #[tokio::test]
    async fn test_fingerprint_correlation_mismatch() {
        let (orchestrator, _) = orchestrator();
        let session = orchestrator
            .create_session(interactive(), &RequestHeaders::new())
            .await
            .unwrap();
        orchestrator.request_fingerprint(session.id()).await.unwrap();

        let forged = codec::encode_json(&MethodData {
            three_ds_server_transaction_id: "someone-else".into(),
            notification_url: None,
        })
        .unwrap();
        let err = orchestrator
            .complete_fingerprint(session.id(), FingerprintCallback::completed(forged))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::CorrelationMismatch { .. }));
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let (orchestrator, _) = orchestrator();
        assert!(matches!(
            orchestrator.issue_challenge("missing").await,
            Err(PaymentError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_complete_with_cres_when_nothing_relayed() {
        let (orchestrator, _) = orchestrator();
        let session = orchestrator
            .create_session(interactive(), &RequestHeaders::new())
            .await
            .unwrap();
        let AuthenticationStep::Challenge(directive) =
            orchestrator.issue_challenge(session.id()).await.unwrap()
        else {
            panic!("expected a challenge directive");
        };

        let cres = codec::encode(br#"{"transStatus":"A"}"#);
        let resolved = orchestrator
            .complete_challenge(
                session.id(),
                ChallengeCallback::new(directive.three_ds_session_data, cres),
            )
            .await
            .unwrap();
        assert_eq!(resolved.challenge_status(), ChallengeStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_complete_without_any_outcome_is_unrecognized() {
        let (orchestrator, _) = orchestrator();
        let session = orchestrator
            .create_session(interactive(), &RequestHeaders::new())
            .await
            .unwrap();
        let AuthenticationStep::Challenge(directive) =
            orchestrator.issue_challenge(session.id()).await.unwrap()
        else {
            panic!("expected a challenge directive");
        };

        let err = orchestrator
            .complete_challenge(
                session.id(),
                ChallengeCallback::new(directive.three_ds_session_data, "opaque"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::UnrecognizedOutcome { .. }));

        // still waiting; a later completion can succeed
        let stored = orchestrator.get_session(session.id()).await.unwrap();
        assert_eq!(stored.state(), SessionState::AwaitingChallenge);
        assert_eq!(stored.challenge_status(), ChallengeStatus::Unknown);
    }

    #[tokio::test]
    async fn test_expire_challenge() {
        let (orchestrator, _) = orchestrator();
        let session = orchestrator
            .create_session(interactive(), &RequestHeaders::new())
            .await
            .unwrap();
        orchestrator.issue_challenge(session.id()).await.unwrap();

        let expired = orchestrator.expire_challenge(session.id()).await.unwrap();
        assert_eq!(expired.challenge_status(), ChallengeStatus::TimedOut);
        assert_eq!(expired.state(), SessionState::Resolved);

        assert!(matches!(
            orchestrator.expire_challenge(session.id()).await,
            Err(PaymentError::InvalidStateTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_authenticate_walks_the_steps() {
        let (orchestrator, _) = orchestrator();
        let session = orchestrator
            .create_session(interactive(), &RequestHeaders::new())
            .await
            .unwrap();

        let step = orchestrator.authenticate(session.id()).await.unwrap();
        assert!(matches!(step, AuthenticationStep::Fingerprint(_)));

        let step = orchestrator.authenticate(session.id()).await.unwrap();
        assert!(matches!(step, AuthenticationStep::Challenge(_)));

        orchestrator.expire_challenge(session.id()).await.unwrap();
        let step = orchestrator.authenticate(session.id()).await.unwrap();
        assert!(step.is_final());
    }

    #[tokio::test]
    async fn test_lock_table_does_not_grow() {
        let (orchestrator, _) = orchestrator();
        for i in 0..1000 {
            assert!(matches!(
                orchestrator.issue_challenge(&format!("unknown-{i}")).await,
                Err(PaymentError::SessionNotFound(_))
            ));
        }
        assert_eq!(orchestrator.locked_sessions().await, 0);

        // abandoned mid-challenge
        let session = orchestrator
            .create_session(interactive(), &RequestHeaders::new())
            .await
            .unwrap();
        orchestrator.issue_challenge(session.id()).await.unwrap();
        assert_eq!(orchestrator.locked_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_lock_is_shared_while_held() {
        let (orchestrator, _) = orchestrator();
        let guard = orchestrator.lock("s1").await;
        assert_eq!(orchestrator.locked_sessions().await, 1);

        let waiter = orchestrator.lock("s1");
        tokio::pin!(waiter);
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(20), &mut waiter)
                .await
                .is_err()
        );

        drop(guard);
        let _second = waiter.await;
        assert_eq!(orchestrator.locked_sessions().await, 1);
    }
}
