//! Error types for the ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed account parameters
    #[error("Account creation failed: {0}")]
    AccountCreation(String),

    /// Account number not present in the registry
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Transaction applied against a deactivated account
    #[error("Account is inactive: {0}")]
    InactiveAccount(String),

    /// Debit would drive the balance negative
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Transaction references an account not registered with this ledger
    #[error("Ledger validation failed: {0}")]
    LedgerValidation(String),

    /// Transaction record has missing or invalid fields
    #[error("Cannot construct transaction: {0}")]
    LedgerConstruction(String),

    /// Decimal overflow while settling a balance
    #[error("Balance overflow: {0}")]
    BalanceOverflow(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short label used for the `reason` metrics dimension
    pub fn reason(&self) -> &'static str {
        match self {
            Error::InsufficientFunds(_) => "insufficient_funds",
            Error::InactiveAccount(_) => "inactive_account",
            Error::AccountNotFound(_) | Error::LedgerValidation(_) => "unknown_account",
            Error::BalanceOverflow(_) => "overflow",
            Error::AccountCreation(_)
            | Error::LedgerConstruction(_)
            | Error::Config(_)
            | Error::Io(_) => "invalid",
        }
    }

    /// True for business rejections of well-formed input
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::InsufficientFunds(_)
                | Error::InactiveAccount(_)
                | Error::AccountNotFound(_)
                | Error::LedgerValidation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_reason_labels() {
        assert_eq!(Error::InsufficientFunds("1".into()).reason(), "insufficient_funds");
        assert_eq!(Error::LedgerValidation("1".into()).reason(), "unknown_account");
        assert_eq!(Error::LedgerConstruction("x".into()).reason(), "invalid");
    }

    #[test]
    fn test_rejection_classification() {
        assert!(Error::InactiveAccount("1".into()).is_rejection());
        assert!(!Error::LedgerConstruction("x".into()).is_rejection());
        assert!(!Error::BalanceOverflow("1".into()).is_rejection());
    }

    #[test]
    fn test_error_display_carries_context() {
        let err = Error::InsufficientFunds("account 12345 has 5, needs 10".into());
        assert!(err.to_string().contains("12345"));
    }
}
