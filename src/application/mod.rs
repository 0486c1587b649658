//! Application layer: the authentication orchestrator and the ACS notification
//! client it relays outcomes through.
//!
//! Both depend only on the ports in `domain::ports`; storage and HTTP are
//! injected by the caller.

pub mod acs_client;
pub mod orchestrator;
