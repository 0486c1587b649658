use crate::domain::session::{ChallengeStatus, PaymentSession};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// Result line for one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeRecord {
    pub reference: String,
    pub challenge_required: bool,
    pub challenge_status: ChallengeStatus,
}

impl OutcomeRecord {
    pub fn from_session(reference: impl Into<String>, session: &PaymentSession) -> Self {
        Self {
            reference: reference.into(),
            challenge_required: session.is_challenge_required(),
            challenge_status: session.challenge_status(),
        }
    }
}

pub struct OutcomeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OutcomeWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write(&mut self, record: &OutcomeRecord) -> Result<()> {
        self.writer.serialize(record)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
