//! Outer surfaces: CSV scenario input and output, and the batch driver that
//! walks each scenario through the orchestrator.

pub mod batch;
pub mod csv;
