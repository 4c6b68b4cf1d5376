//! Accounts
//!
//! An `Account` owns its balance, activity flag and history behind a single
//! mutex, so a balance change and the matching history append are only ever
//! observed together. Read queries take the lock briefly and copy out.
//!
//! Mutation of balance and history goes through `AccountGuard`, which only
//! the ledger can obtain. Settlement is split into `prepare` (all checks, no
//! side effects) and `commit` (infallible), which lets the ledger validate
//! both legs of a transfer before touching either account.

use crate::{
    config::AccountDefaults,
    journal::Journal,
    transaction::Transaction,
    types::AccountNumber,
    Error, Result,
};
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Balance-holding account with its own lock and history
#[derive(Debug)]
pub struct Account {
    number: AccountNumber,
    opening_balance: Decimal,
    state: Mutex<AccountState>,
}

#[derive(Debug)]
struct AccountState {
    balance: Decimal,
    active: bool,
    history: Journal<Arc<Transaction>>,
}

impl Account {
    /// Create a new account with an empty history
    pub fn create(
        number: impl Into<AccountNumber>,
        initial_balance: Decimal,
        active: bool,
    ) -> Result<Self> {
        let number = number.into();
        if number.is_blank() {
            return Err(Error::AccountCreation(
                "account number must not be empty".to_string(),
            ));
        }

        Ok(Self {
            number,
            opening_balance: initial_balance,
            state: Mutex::new(AccountState {
                balance: initial_balance,
                active,
                history: Journal::new(),
            }),
        })
    }

    /// Create from a record, filling omitted fields from `defaults`
    pub fn from_params(params: &AccountParams, defaults: &AccountDefaults) -> Result<Self> {
        Self::create(
            params.number.clone(),
            params.balance.unwrap_or(defaults.opening_balance),
            params.active.unwrap_or(defaults.active),
        )
    }

    /// Account number
    pub fn number(&self) -> &AccountNumber {
        &self.number
    }

    /// Balance at creation
    pub fn opening_balance(&self) -> Decimal {
        self.opening_balance
    }

    /// Current balance
    pub fn balance(&self) -> Decimal {
        self.state.lock().balance
    }

    /// Whether new transactions are accepted
    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// Number of applied transactions
    pub fn history_len(&self) -> usize {
        self.state.lock().history.len()
    }

    /// Applied transactions in application order
    pub fn history(&self) -> Vec<Arc<Transaction>> {
        self.state.lock().history.to_vec()
    }

    /// Point-in-time copy of balance, flag and history length
    pub fn snapshot(&self) -> AccountSnapshot {
        self.lock().snapshot()
    }

    /// Flip the activity flag, returning the new value
    ///
    /// Past history is unaffected; the next settlement sees the new flag.
    pub fn toggle_active(&self) -> bool {
        self.lock().toggle_active()
    }

    /// Check `balance == opening_balance + Σ effective amounts of history`
    pub fn verify(&self) -> Result<()> {
        self.lock().verify()
    }

    /// Acquire this account's lock
    pub(crate) fn lock(&self) -> AccountGuard<'_> {
        AccountGuard {
            account: self,
            state: self.state.lock(),
        }
    }
}

/// Exclusive access to one account
pub(crate) struct AccountGuard<'a> {
    account: &'a Account,
    state: MutexGuard<'a, AccountState>,
}

/// Outcome of a successful `prepare`, consumed by `commit`
#[derive(Debug, Clone, Copy)]
pub(crate) struct Posting {
    pub(crate) delta: Decimal,
    new_balance: Decimal,
}

impl<'a> AccountGuard<'a> {
    pub(crate) fn number(&self) -> &'a AccountNumber {
        &self.account.number
    }

    /// Run every settlement check for `transaction` without mutating anything
    pub(crate) fn prepare(&self, transaction: &Transaction) -> Result<Posting> {
        let number = self.number();

        if !transaction.involves(number) {
            return Err(Error::LedgerValidation(format!(
                "account {} is not a party to this transaction",
                number
            )));
        }

        if !self.state.active {
            return Err(Error::InactiveAccount(format!(
                "account {} rejects new transactions",
                number
            )));
        }

        let delta = transaction.effective_amount(number);
        let new_balance = self.state.balance.checked_add(delta).ok_or_else(|| {
            Error::BalanceOverflow(format!(
                "account {}: {} + {} overflows",
                number, self.state.balance, delta
            ))
        })?;

        if delta < Decimal::ZERO && new_balance < Decimal::ZERO {
            return Err(Error::InsufficientFunds(format!(
                "account {} has {}, needs {}",
                number,
                self.state.balance,
                transaction.amount()
            )));
        }

        Ok(Posting { delta, new_balance })
    }

    /// Apply a prepared posting: set the balance and append to history
    pub(crate) fn commit(&mut self, transaction: Arc<Transaction>, posting: Posting) {
        self.state.balance = posting.new_balance;
        self.state.history.append(transaction);
    }

    /// `prepare` followed by `commit`
    pub(crate) fn apply_transaction(&mut self, transaction: &Arc<Transaction>) -> Result<Decimal> {
        let posting = self.prepare(transaction)?;
        self.commit(Arc::clone(transaction), posting);
        Ok(posting.delta)
    }

    pub(crate) fn toggle_active(&mut self) -> bool {
        self.state.active = !self.state.active;
        self.state.active
    }

    pub(crate) fn opening_balance(&self) -> Decimal {
        self.account.opening_balance
    }

    pub(crate) fn balance(&self) -> Decimal {
        self.state.balance
    }

    pub(crate) fn history(&self) -> &Journal<Arc<Transaction>> {
        &self.state.history
    }

    pub(crate) fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            number: self.number().clone(),
            balance: self.state.balance,
            opening_balance: self.account.opening_balance,
            active: self.state.active,
            history_len: self.state.history.len(),
        }
    }

    pub(crate) fn verify(&self) -> Result<()> {
        let number = self.number();
        let expected = self
            .state
            .history
            .iter()
            .try_fold(self.account.opening_balance, |acc, t| {
                acc.checked_add(t.effective_amount(number))
            })
            .ok_or_else(|| {
                Error::BalanceOverflow(format!("account {}: history sum overflows", number))
            })?;

        if expected != self.state.balance {
            return Err(Error::LedgerValidation(format!(
                "account {} balance {} does not match history total {}",
                number, self.state.balance, expected
            )));
        }
        Ok(())
    }
}

/// Record-shaped account input
///
/// `balance` and `active` fall back to the configured [`AccountDefaults`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountParams {
    /// Account number
    pub number: AccountNumber,

    /// Opening balance
    #[serde(default)]
    pub balance: Option<Decimal>,

    /// Activity flag
    #[serde(default)]
    pub active: Option<bool>,
}

impl AccountParams {
    /// Params with just a number
    pub fn new(number: impl Into<AccountNumber>) -> Self {
        Self {
            number: number.into(),
            balance: None,
            active: None,
        }
    }

    /// Set the opening balance
    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance = Some(balance);
        self
    }

    /// Set the activity flag
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Parse a loosely-typed record, reporting shape problems as creation errors
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| Error::AccountCreation(format!("invalid account record: {}", e)))
    }
}

/// Point-in-time view of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Account number
    pub number: AccountNumber,
    /// Balance at the time of the snapshot
    pub balance: Decimal,
    /// Balance at creation
    pub opening_balance: Decimal,
    /// Activity flag
    pub active: bool,
    /// Number of applied transactions
    pub history_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn withdrawal(from: &str, amount: Decimal) -> Arc<Transaction> {
        Arc::new(Transaction::withdrawal(from, amount, Utc::now()).unwrap())
    }

    #[test]
    fn test_create_rejects_empty_number() {
        let err = Account::create("", dec!(10), true).unwrap_err();
        assert!(matches!(err, Error::AccountCreation(_)));
    }

    #[test]
    fn test_new_account_state() {
        let account = Account::create("12345", dec!(155), true).unwrap();
        assert_eq!(account.balance(), dec!(155));
        assert_eq!(account.opening_balance(), dec!(155));
        assert!(account.is_active());
        assert_eq!(account.history_len(), 0);
    }

    #[test]
    fn test_apply_debit() {
        let account = Account::create("1", dec!(1500), true).unwrap();
        let t = withdrawal("1", dec!(500));

        let delta = account.lock().apply_transaction(&t).unwrap();

        assert_eq!(delta, dec!(-500));
        assert_eq!(account.balance(), dec!(1000));
        assert_eq!(account.history_len(), 1);
        assert!(Arc::ptr_eq(&account.history()[0], &t));
        account.verify().unwrap();
    }

    #[test]
    fn test_debit_to_exactly_zero_allowed() {
        let account = Account::create("1", dec!(50), true).unwrap();
        account.lock().apply_transaction(&withdrawal("1", dec!(50))).unwrap();
        assert_eq!(account.balance(), Decimal::ZERO);
    }

    #[test]
    fn test_insufficient_funds_leaves_state() {
        let account = Account::create("1", dec!(10), true).unwrap();

        let err = account
            .lock()
            .apply_transaction(&withdrawal("1", dec!(10.01)))
            .unwrap_err();

        assert!(matches!(err, Error::InsufficientFunds(_)));
        assert_eq!(account.balance(), dec!(10));
        assert_eq!(account.history_len(), 0);
    }

    #[test]
    fn test_inactive_account_rejects() {
        let account = Account::create("1", dec!(10), true).unwrap();
        assert!(!account.toggle_active());

        let err = account
            .lock()
            .apply_transaction(&withdrawal("1", dec!(1)))
            .unwrap_err();
        assert!(matches!(err, Error::InactiveAccount(_)));

        assert!(account.toggle_active());
        account.lock().apply_transaction(&withdrawal("1", dec!(1))).unwrap();
        assert_eq!(account.balance(), dec!(9));
    }

    #[test]
    fn test_credit_side_of_transfer() {
        let account = Account::create("2", dec!(0), true).unwrap();
        let t = Arc::new(Transaction::transfer("1", "2", dec!(75), Utc::now()).unwrap());

        let delta = account.lock().apply_transaction(&t).unwrap();
        assert_eq!(delta, dec!(75));
        assert_eq!(account.balance(), dec!(75));
    }

    #[test]
    fn test_prepare_rejects_stranger() {
        let account = Account::create("3", dec!(10), true).unwrap();
        let err = account.lock().prepare(&withdrawal("1", dec!(1))).unwrap_err();
        assert!(matches!(err, Error::LedgerValidation(_)));
    }

    #[test]
    fn test_prepare_has_no_side_effects() {
        let account = Account::create("1", dec!(10), true).unwrap();
        let posting = account.lock().prepare(&withdrawal("1", dec!(4))).unwrap();
        assert_eq!(posting.delta, dec!(-4));
        assert_eq!(account.balance(), dec!(10));
        assert_eq!(account.history_len(), 0);
    }

    #[test]
    fn test_snapshot() {
        let account = Account::create("9", dec!(3), false).unwrap();
        let snapshot = account.snapshot();
        assert_eq!(snapshot.number.as_str(), "9");
        assert_eq!(snapshot.balance, dec!(3));
        assert!(!snapshot.active);
        assert_eq!(snapshot.history_len, 0);
    }

    #[test]
    fn test_from_params_uses_defaults() {
        let defaults = AccountDefaults {
            opening_balance: dec!(42),
            active: false,
        };
        let account = Account::from_params(&AccountParams::new("7"), &defaults).unwrap();
        assert_eq!(account.balance(), dec!(42));
        assert!(!account.is_active());

        let params = AccountParams::new("8").with_balance(dec!(1)).with_active(true);
        let account = Account::from_params(&params, &defaults).unwrap();
        assert_eq!(account.balance(), dec!(1));
        assert!(account.is_active());
    }

    #[test]
    fn test_params_from_json() {
        let params = AccountParams::from_json(json!({ "number": "12345", "balance": "155.0" })).unwrap();
        assert_eq!(params.balance, Some(dec!(155.0)));

        let err = AccountParams::from_json(json!({ "number": "1", "balance": "abc" })).unwrap_err();
        assert!(matches!(err, Error::AccountCreation(_)));

        let err = AccountParams::from_json(json!({ "balance": "1" })).unwrap_err();
        assert!(matches!(err, Error::AccountCreation(_)));
    }
}
