//! In-memory double-entry ledger engine
//!
//! Account registry plus a transaction pipeline that applies debits and
//! credits atomically across one or two accounts.
//!
//! # Architecture
//!
//! - **Per-account locking**: each account guards its balance and history with its own mutex
//! - **Fixed lock order**: accounts are always locked in ascending number order, so
//!   opposite-direction transfers cannot deadlock
//! - **Prepare/commit**: every leg of a transfer is checked before any leg is applied
//! - **Append-only history**: account histories and the global log only grow
//!
//! # Invariants
//!
//! - balance == opening balance + Σ(signed amounts in history), per account
//! - a transaction is in the global log iff it is in every registered party's history
//! - no balance goes negative through a debit

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod journal;
pub mod account;
pub mod transaction;
pub mod ledger;
pub mod error;
pub mod config;
pub mod metrics;
pub mod telemetry;

// Re-exports
pub use error::{Error, Result};
pub use types::{AccountNumber, Perspective, TransactionKind};
pub use journal::Journal;
pub use account::{Account, AccountParams, AccountSnapshot};
pub use transaction::{Transaction, TransactionRecord};
pub use ledger::{BatchLoadError, Ledger, LedgerSnapshot};
pub use config::Config;
pub use metrics::Metrics;
