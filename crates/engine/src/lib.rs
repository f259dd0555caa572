//! `ledgermatch-engine` — processor-export / exchange-ledger reconciliation.
//!
//! Pure engine crate: loads and normalizes the two record streams, resolves
//! processor-side identities to internal user ids, runs the synchronized
//! two-cursor scan, and writes the audit reports. No CLI concerns.

pub mod config;
pub mod error;
pub mod extract;
pub mod identity;
pub mod matcher;
pub mod model;
pub mod progress;
pub mod report;
pub mod store;

pub use config::RunConfig;
pub use error::MatchError;
pub use matcher::Matcher;
pub use model::{ExchangeRecord, MatchedPair, Transaction, Unmatchable};
