//! Browser → orchestrator callbacks (form-encoded) and request headers.

use crate::error::{PaymentError, Result};
use std::collections::HashMap;

pub const THREE_DS_SESSION_DATA: &str = "threeDSSessionData";
pub const CRES: &str = "cres";
pub const TEST_ROUTING: &str = "x-ms-test";
pub const THREE_DS_METHOD_DATA: &str = "threeDSMethodData";
pub const FINGERPRINT_TIMED_OUT: &str = "fingerPrintTimedout";
pub const MOTO_HEADER: &str = "x-ms-ismoto";

fn parse_form(body: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(body.trim().as_bytes())
        .into_owned()
        .collect()
}

/// Challenge-completion post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeCallback {
    pub three_ds_session_data: String,
    pub cres: String,
    /// Opaque test-routing value, passed through unchanged.
    pub test_routing: Option<String>,
}

impl ChallengeCallback {
    pub fn new(three_ds_session_data: impl Into<String>, cres: impl Into<String>) -> Self {
        Self {
            three_ds_session_data: three_ds_session_data.into(),
            cres: cres.into(),
            test_routing: None,
        }
    }

    pub fn from_form(body: &str) -> Result<Self> {
        let mut fields = parse_form(body);
        let three_ds_session_data = fields
            .remove(THREE_DS_SESSION_DATA)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| missing(THREE_DS_SESSION_DATA))?;
        let cres = fields.remove(CRES).ok_or_else(|| missing(CRES))?;

        Ok(Self {
            three_ds_session_data,
            cres,
            test_routing: fields.remove(TEST_ROUTING),
        })
    }
}

/// Fingerprint-completion post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintCallback {
    pub three_ds_method_data: Option<String>,
    pub timed_out: bool,
}

impl FingerprintCallback {
    pub fn completed(three_ds_method_data: impl Into<String>) -> Self {
        Self {
            three_ds_method_data: Some(three_ds_method_data.into()),
            timed_out: false,
        }
    }

    pub fn timed_out(three_ds_method_data: Option<String>) -> Self {
        Self {
            three_ds_method_data,
            timed_out: true,
        }
    }

    /// Any non-blank `fingerPrintTimedout` value marks the fingerprint as timed out.
    pub fn from_form(body: &str) -> Result<Self> {
        let mut fields = parse_form(body);
        let three_ds_method_data = fields
            .remove(THREE_DS_METHOD_DATA)
            .filter(|v| !v.is_empty());
        let timed_out = fields
            .remove(FINGERPRINT_TIMED_OUT)
            .is_some_and(|v| !v.trim().is_empty());

        if three_ds_method_data.is_none() && !timed_out {
            return Err(missing(THREE_DS_METHOD_DATA));
        }

        Ok(Self {
            three_ds_method_data,
            timed_out,
        })
    }
}

fn missing(field: &str) -> PaymentError {
    PaymentError::Validation(format!("form field '{field}' is required"))
}

/// Case-insensitive request headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders(HashMap<String, String>);

impl RequestHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.0.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// `x-ms-ismoto: true` marks the session as mail/telephone order.
    pub fn is_moto(&self) -> bool {
        self.get(MOTO_HEADER)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for RequestHeaders {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::new(), |headers, (k, v)| headers.with(k.as_ref(), v))
    }
}
