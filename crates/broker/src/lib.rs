//! Dhan REST API adapter.
//!
//! One authenticated HTTP round trip per call: no retries, no caching of
//! API responses, no order-lifecycle tracking. The instrument master CSV is
//! the only thing held in memory, as a read-only lookup table.

pub mod client;
pub mod config;
pub mod instruments;

pub use client::{DhanApi, DhanClient, DhanError};
pub use config::{ConfigError, DhanConfig};
pub use instruments::{
    parse_instrument_csv, search_records, well_known_security_id, InstrumentRecord,
    InstrumentStore, INSTRUMENT_MASTER_COMPACT_URL, INSTRUMENT_MASTER_DETAILED_URL,
};
