mod common;

use common::{ScriptedTransport, orchestrator, psd2_attributes};
use psd2_orchestrator::application::acs_client::{AcsNotificationClient, RetryPolicy};
use psd2_orchestrator::domain::callback::RequestHeaders;
use psd2_orchestrator::domain::directive::AuthenticationStep;
use psd2_orchestrator::domain::outcome::ChallengeOutcome;
use psd2_orchestrator::domain::session::{ChallengeStatus, SessionState};
use psd2_orchestrator::error::PaymentError;
use rust_decimal_macros::dec;
use std::time::Duration;

#[tokio::test]
async fn test_two_failures_then_success() {
    let transport = ScriptedTransport::failing(2);
    let client = AcsNotificationClient::new(Box::new(transport.clone()), RetryPolicy::default());
    let payload = ChallengeOutcome::Failed.to_acs_status("tx-1");

    client
        .notify("https://acs.example.test/acs/setstatus", &payload)
        .await
        .unwrap();

    assert_eq!(transport.attempts(), 3);
    assert_eq!(transport.accepted(), vec![payload]);
}

#[tokio::test]
async fn test_three_failures_no_fourth_attempt() {
    let transport = ScriptedTransport::failing(3);
    let client = AcsNotificationClient::new(Box::new(transport.clone()), RetryPolicy::default());
    let payload = ChallengeOutcome::Cancelled.to_acs_status("tx-1");

    let err = client
        .notify("https://acs.example.test/acs/setstatus", &payload)
        .await
        .unwrap_err();

    assert!(matches!(err, PaymentError::Communication { attempts: 3, .. }));
    assert!(err.is_retryable());
    assert_eq!(transport.attempts(), 3);
    assert!(transport.accepted().is_empty());
}

#[tokio::test]
async fn test_slow_attempts_use_up_the_budget() {
    let transport = ScriptedTransport::stalling(3, Duration::from_secs(5));
    let policy = RetryPolicy {
        timeout: Duration::from_millis(50),
        ..RetryPolicy::default()
    };
    let client = AcsNotificationClient::new(Box::new(transport.clone()), policy);
    let payload = ChallengeOutcome::Succeeded.to_acs_status("tx-1");

    let started = tokio::time::Instant::now();
    let err = client
        .notify("https://acs.example.test/acs/setstatus", &payload)
        .await
        .unwrap_err();

    assert!(matches!(err, PaymentError::Communication { attempts: 3, .. }));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(transport.attempts(), 3);
    assert!(transport.accepted().is_empty());
}

#[tokio::test]
async fn test_slow_first_attempt_then_success() {
    let transport = ScriptedTransport::stalling(1, Duration::from_secs(5));
    let policy = RetryPolicy {
        timeout: Duration::from_millis(50),
        ..RetryPolicy::default()
    };
    let client = AcsNotificationClient::new(Box::new(transport.clone()), policy);
    let payload = ChallengeOutcome::Failed.to_acs_status("tx-1");

    client
        .notify("https://acs.example.test/acs/setstatus", &payload)
        .await
        .unwrap();

    assert_eq!(transport.attempts(), 2);
    assert_eq!(transport.accepted(), vec![payload]);
}

#[tokio::test]
async fn test_backoff_policy_is_honoured() {
    let transport = ScriptedTransport::failing(1);
    let policy = RetryPolicy {
        max_attempts: 2,
        backoff: Duration::from_millis(20),
        timeout: Duration::from_secs(1),
    };
    let client = AcsNotificationClient::new(Box::new(transport.clone()), policy);
    let payload = ChallengeOutcome::Succeeded.to_acs_status("tx-1");

    let started = tokio::time::Instant::now();
    client
        .notify("https://acs.example.test/acs/setstatus", &payload)
        .await
        .unwrap();
    assert!(started.elapsed() >= Duration::from_millis(20));
    assert_eq!(transport.attempts(), 2);
}

#[tokio::test]
async fn test_communication_failure_leaves_session_untouched() {
    let transport = ScriptedTransport::failing(u32::MAX);
    let orchestrator = orchestrator(&transport);
    let session = orchestrator
        .create_session(psd2_attributes(dec!(101.00), "EUR", "DE"), &RequestHeaders::new())
        .await
        .unwrap();
    let step = orchestrator.issue_challenge(session.id()).await.unwrap();
    assert!(matches!(step, AuthenticationStep::Challenge(_)));

    let err = orchestrator
        .relay_outcome(session.id(), ChallengeOutcome::Succeeded)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Communication { .. }));
    assert_eq!(transport.attempts(), 3);

    let stored = orchestrator.get_session(session.id()).await.unwrap();
    assert_eq!(stored.state(), SessionState::AwaitingChallenge);
    assert_eq!(stored.challenge_status(), ChallengeStatus::Unknown);
    assert!(stored.acs_status().is_none());
}
