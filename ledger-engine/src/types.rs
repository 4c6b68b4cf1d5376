//! Core types for the ledger
//!
//! Small value types shared by accounts, transactions and the ledger itself.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Account number (IBAN, internal account number, etc.)
///
/// Ordering is lexicographic on the underlying string and is the canonical
/// lock-acquisition order used by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Create new account number
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the number is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountNumber {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AccountNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Transaction kind
///
/// Informational only; settlement is driven by the presence of a
/// counterpart account, not by the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Pure debit against the source account
    Withdrawal,
    /// Movement of value between two accounts
    Transfer,
}

impl TransactionKind {
    /// Wire tag
    pub fn code(&self) -> &'static str {
        match self {
            TransactionKind::Withdrawal => "WITHDRAWAL",
            TransactionKind::Transfer => "TRANSFER",
        }
    }

    /// Parse from wire tag
    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "WITHDRAWAL" => Some(TransactionKind::Withdrawal),
            "TRANSFER" => Some(TransactionKind::Transfer),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Role an account plays in a given transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Perspective {
    /// Source of funds (debited)
    From,
    /// Destination of funds (credited)
    To,
}
