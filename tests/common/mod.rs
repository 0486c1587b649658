#![allow(dead_code)]

use async_trait::async_trait;
use psd2_orchestrator::application::acs_client::{AcsNotificationClient, RetryPolicy};
use psd2_orchestrator::application::orchestrator::AuthenticationOrchestrator;
use psd2_orchestrator::config::OrchestratorConfig;
use psd2_orchestrator::domain::amount::Amount;
use psd2_orchestrator::domain::decision::{AccountRiskProfile, RiskSignal};
use psd2_orchestrator::domain::outcome::AcsStatusPayload;
use psd2_orchestrator::domain::ports::{AcsTransport, TransportFailure};
use psd2_orchestrator::domain::session::SessionAttributes;
use psd2_orchestrator::infrastructure::in_memory::InMemorySessionStore;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// ACS transport that fails its first `failures` attempts and then accepts.
/// The first `stalls` attempts sleep for `stall` before answering.
/// Clones share the attempt counter and the accepted payloads.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    failures: u32,
    stalls: u32,
    stall: Duration,
    attempts: Arc<AtomicU32>,
    accepted: Arc<Mutex<Vec<AcsStatusPayload>>>,
}

impl ScriptedTransport {
    pub fn healthy() -> Self {
        Self::default()
    }

    pub fn failing(failures: u32) -> Self {
        Self {
            failures,
            ..Self::default()
        }
    }

    pub fn stalling(stalls: u32, stall: Duration) -> Self {
        Self {
            stalls,
            stall,
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn accepted(&self) -> Vec<AcsStatusPayload> {
        self.accepted.lock().unwrap().clone()
    }
}

#[async_trait]
impl AcsTransport for ScriptedTransport {
    async fn post_status(
        &self,
        _url: &str,
        payload: &AcsStatusPayload,
        _timeout: Duration,
    ) -> Result<(), TransportFailure> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.stalls {
            tokio::time::sleep(self.stall).await;
        }
        if attempt <= self.failures {
            return Err(TransportFailure::Transport(format!(
                "scripted failure {attempt}"
            )));
        }
        self.accepted.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

pub fn orchestrator(transport: &ScriptedTransport) -> AuthenticationOrchestrator {
    let client = AcsNotificationClient::new(Box::new(transport.clone()), RetryPolicy::default());
    AuthenticationOrchestrator::new(
        &OrchestratorConfig::default(),
        Box::new(InMemorySessionStore::new()),
        client,
    )
    .unwrap()
}

pub fn psd2_attributes(amount: Decimal, currency: &str, country: &str) -> SessionAttributes {
    SessionAttributes::new(
        Amount::new(amount).unwrap(),
        currency,
        country,
        AccountRiskProfile::psd2(RiskSignal::Challenge),
    )
}

pub const SCENARIO_HEADER: [&str; 9] = [
    "reference",
    "amount",
    "currency",
    "country",
    "moto",
    "scenario",
    "psd2_account",
    "risk",
    "outcome",
];

pub fn write_scenarios(path: &Path, rows: &[[&str; 9]]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(SCENARIO_HEADER)?;
    for row in rows {
        wtr.write_record(row)?;
    }

    wtr.flush()?;
    Ok(())
}
