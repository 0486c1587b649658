use super::csv::outcome_writer::OutcomeRecord;
use super::csv::scenario_reader::ScenarioRow;
use crate::application::orchestrator::AuthenticationOrchestrator;
use crate::domain::amount::Amount;
use crate::domain::callback::{ChallengeCallback, FingerprintCallback, RequestHeaders};
use crate::domain::decision::AccountRiskProfile;
use crate::domain::directive::AuthenticationStep;
use crate::domain::outcome::ChallengeOutcome;
use crate::domain::session::{PaymentSession, SessionAttributes};
use crate::error::Result;
use tracing::debug;

/// Walks one scenario through the full browser flow and reports where it ended.
///
/// Fingerprints always complete in time. A challenged cardholder's outcome is
/// relayed to the ACS before completion; rows without an outcome expire.
pub async fn run_scenario(
    orchestrator: &AuthenticationOrchestrator,
    row: ScenarioRow,
) -> Result<OutcomeRecord> {
    let attributes = SessionAttributes::new(
        Amount::new(row.amount)?,
        row.currency,
        row.country,
        AccountRiskProfile {
            psd2_account: row.psd2_account,
            risk: row.risk,
            skip_fingerprint: false,
        },
    )
    .moto(row.moto)
    .scenario(row.scenario);

    let session = orchestrator
        .create_session(attributes, &RequestHeaders::new())
        .await?;
    let session = drive(orchestrator, session.id(), row.outcome).await?;

    debug!(reference = %row.reference, session_id = %session.id(), "scenario finished");
    Ok(OutcomeRecord::from_session(row.reference, &session))
}

async fn drive(
    orchestrator: &AuthenticationOrchestrator,
    session_id: &str,
    outcome: Option<ChallengeOutcome>,
) -> Result<PaymentSession> {
    loop {
        match orchestrator.authenticate(session_id).await? {
            AuthenticationStep::Fingerprint(directive) => {
                orchestrator
                    .complete_fingerprint(
                        session_id,
                        FingerprintCallback::completed(directive.three_ds_method_data),
                    )
                    .await?;
            }
            AuthenticationStep::Challenge(directive) => {
                let Some(outcome) = outcome else {
                    return orchestrator.expire_challenge(session_id).await;
                };
                orchestrator.relay_outcome(session_id, outcome).await?;
                return orchestrator
                    .complete_challenge(
                        session_id,
                        ChallengeCallback::new(directive.three_ds_session_data, ""),
                    )
                    .await;
            }
            AuthenticationStep::Final(session) => return Ok(session),
        }
    }
}
