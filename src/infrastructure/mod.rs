//! Adapters for the domain ports: session stores and ACS transports.

pub mod http;
pub mod in_memory;
pub mod loopback;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
