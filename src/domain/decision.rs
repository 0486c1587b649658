//! Strong-customer-authentication decision.
//!
//! `decide` is pure and total: every combination of inputs yields a `Decision`,
//! and nothing outside the arguments is consulted.

use super::amount::Amount;
use super::session::ChallengeScenario;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Frictionless vs. interactive comes from the issuer's risk assessment; it is
/// an input here, never re-derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskSignal {
    Frictionless,
    #[default]
    Challenge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountRiskProfile {
    /// The payment instrument is enrolled for PSD2 authentication.
    pub psd2_account: bool,
    #[serde(default)]
    pub risk: RiskSignal,
    /// Skip the device-fingerprinting step even when it would apply.
    #[serde(default)]
    pub skip_fingerprint: bool,
}

impl AccountRiskProfile {
    pub fn psd2(risk: RiskSignal) -> Self {
        Self {
            psd2_account: true,
            risk,
            skip_fingerprint: false,
        }
    }

    pub fn unregulated() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Decision {
    pub is_challenge_required: bool,
    pub is_frictionless: bool,
    pub is_by_passed: bool,
    pub is_fingerprint_applicable: bool,
}

/// Transaction attributes the decision depends on.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInput<'a> {
    pub amount: Amount,
    pub currency: &'a str,
    pub country: &'a str,
    pub is_moto: bool,
    pub scenario: ChallengeScenario,
    pub risk_profile: AccountRiskProfile,
}

/// Countries where PSD2 strong customer authentication applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Psd2Markets(HashSet<String>);

/// EU-27, the rest of the EEA, and the UK.
pub const DEFAULT_PSD2_MARKETS: &[&str] = &[
    "AT", "BE", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "FR", "DE", "GR", "HU", "IE", "IT", "LV",
    "LT", "LU", "MT", "NL", "PL", "PT", "RO", "SK", "SI", "ES", "SE", "IS", "LI", "NO", "GB",
];

impl Psd2Markets {
    pub fn new<I, S>(countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            countries
                .into_iter()
                .map(|c| c.as_ref().trim().to_ascii_uppercase())
                .collect(),
        )
    }

    pub fn contains(&self, country: &str) -> bool {
        self.0.contains(&country.trim().to_ascii_uppercase())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Psd2Markets {
    fn default() -> Self {
        Self::new(DEFAULT_PSD2_MARKETS)
    }
}

pub fn decide(input: &DecisionInput<'_>, markets: &Psd2Markets) -> Decision {
    let regulated = input.risk_profile.psd2_account && markets.contains(input.country);
    let is_challenge_required = regulated;

    // MOTO is reported as bypassed regardless; whether a challenge would have
    // been required stays visible in `is_challenge_required`.
    let is_by_passed = input.is_moto;

    let mandate_exemption =
        input.scenario == ChallengeScenario::RecurringTransaction && input.amount.is_zero();

    let interactive_candidate = is_challenge_required && !is_by_passed;

    let is_frictionless = interactive_candidate
        && (mandate_exemption || input.risk_profile.risk == RiskSignal::Frictionless);

    let is_fingerprint_applicable =
        interactive_candidate && !mandate_exemption && !input.risk_profile.skip_fingerprint;

    Decision {
        is_challenge_required,
        is_frictionless,
        is_by_passed,
        is_fingerprint_applicable,
    }
}
