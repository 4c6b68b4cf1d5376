//! Transaction value object
//!
//! A `Transaction` is immutable once built: fields are private and only
//! readable. It names its parties by account number; the ledger resolves
//! those numbers against its registry when the transaction is processed.

use crate::{
    account::AccountParams,
    types::{AccountNumber, Perspective, TransactionKind},
    Error, Result,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Immutable movement of value between one or two accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    from_account: AccountNumber,
    to_account: Option<AccountNumber>,
    amount: Decimal,
    timestamp: DateTime<Utc>,
    kind: TransactionKind,
}

impl Transaction {
    /// Build a transaction, validating its shape
    ///
    /// `amount` must be non-negative and every account number non-blank.
    pub fn new(
        kind: TransactionKind,
        from_account: impl Into<AccountNumber>,
        to_account: Option<AccountNumber>,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        let from_account = from_account.into();

        if from_account.is_blank() {
            return Err(Error::LedgerConstruction(
                "from_account number is empty".to_string(),
            ));
        }
        if let Some(to) = &to_account {
            if to.is_blank() {
                return Err(Error::LedgerConstruction(
                    "to_account number is empty".to_string(),
                ));
            }
        }
        if amount < Decimal::ZERO {
            return Err(Error::LedgerConstruction(format!(
                "amount must be non-negative, got {}",
                amount
            )));
        }

        Ok(Self {
            from_account,
            to_account,
            amount,
            timestamp,
            kind,
        })
    }

    /// Pure debit against `from`
    pub fn withdrawal(
        from: impl Into<AccountNumber>,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        Self::new(TransactionKind::Withdrawal, from, None, amount, timestamp)
    }

    /// Move `amount` from `from` to `to`
    pub fn transfer(
        from: impl Into<AccountNumber>,
        to: impl Into<AccountNumber>,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        Self::new(
            TransactionKind::Transfer,
            from,
            Some(to.into()),
            amount,
            timestamp,
        )
    }

    /// Build from a loaded record
    pub fn from_record(record: &TransactionRecord) -> Result<Self> {
        Self::new(
            record.kind,
            record.from_account.number.clone(),
            record.to_account.as_ref().map(|a| a.number.clone()),
            record.amount,
            record.timestamp,
        )
    }

    /// Source account
    pub fn from_account(&self) -> &AccountNumber {
        &self.from_account
    }

    /// Destination account, if any
    pub fn to_account(&self) -> Option<&AccountNumber> {
        self.to_account.as_ref()
    }

    /// Unsigned magnitude
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Caller-supplied creation time
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Informational kind tag
    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Signed amount as seen from `account`
    ///
    /// `-amount` for the source account, `+amount` for anyone else.
    pub fn effective_amount(&self, account: &AccountNumber) -> Decimal {
        if *account == self.from_account {
            -self.amount
        } else {
            self.amount
        }
    }

    /// Role `account` plays in this transaction, if any
    pub fn perspective_of(&self, account: &AccountNumber) -> Option<Perspective> {
        if *account == self.from_account {
            Some(Perspective::From)
        } else if self.to_account.as_ref() == Some(account) {
            Some(Perspective::To)
        } else {
            None
        }
    }

    /// True if `account` is a party to this transaction
    pub fn involves(&self, account: &AccountNumber) -> bool {
        self.perspective_of(account).is_some()
    }
}

/// Record-shaped transaction input, as handed over by loaders
///
/// Keys: `from_account`, `to_account` (optional), `type`, `amount`, `timestamp`.
/// Parties are account records so a batch can register them on the fly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Source account
    pub from_account: AccountParams,

    /// Destination account
    #[serde(default)]
    pub to_account: Option<AccountParams>,

    /// Kind tag
    #[serde(rename = "type")]
    pub kind: TransactionKind,

    /// Unsigned magnitude
    pub amount: Decimal,

    /// Creation time
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    /// Parse a loosely-typed record
    ///
    /// Malformed nested accounts report [`Error::AccountCreation`]; any other
    /// shape problem reports [`Error::LedgerConstruction`].
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        if let Some(fields) = value.as_object() {
            for key in ["from_account", "to_account"] {
                match fields.get(key) {
                    None | Some(serde_json::Value::Null) => {}
                    Some(params) => {
                        AccountParams::from_json(params.clone())?;
                    }
                }
            }
        }

        serde_json::from_value(value).map_err(|e| {
            Error::LedgerConstruction(format!("invalid transaction record: {}", e))
        })
    }
}
