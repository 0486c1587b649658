//! Domain types and pure rules of PSD2 authentication.

pub mod amount;
pub mod callback;
pub mod codec;
pub mod decision;
pub mod directive;
pub mod outcome;
pub mod ports;
pub mod session;
