use crate::domain::decision::RiskSignal;
use crate::domain::outcome::ChallengeOutcome;
use crate::domain::session::ChallengeScenario;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One scripted authentication: the transaction, the account's risk profile and
/// what the cardholder does if challenged. An empty `outcome` means the
/// cardholder never answers and the challenge expires.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScenarioRow {
    pub reference: String,
    pub amount: Decimal,
    pub currency: String,
    pub country: String,
    pub moto: bool,
    pub scenario: ChallengeScenario,
    pub psd2_account: bool,
    pub risk: RiskSignal,
    pub outcome: Option<ChallengeOutcome>,
}

/// Reads scenario rows from a CSV source.
///
/// Whitespace around fields is trimmed and short rows are tolerated; each row
/// is deserialized lazily so one bad line does not stop the batch.
pub struct ScenarioReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ScenarioReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn scenarios(self) -> impl Iterator<Item = Result<ScenarioRow>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}
