//! Main ledger orchestration layer
//!
//! The `Ledger` owns the account registry and the global transaction log and
//! applies transactions atomically across one or two accounts.
//!
//! # Locking
//!
//! - Registry: `RwLock`. Settlement holds a read guard from validation to
//!   completion, so an account cannot be unregistered mid-transaction.
//! - Accounts: one mutex each, always acquired in ascending account-number
//!   order regardless of which side is debited.
//! - Global log: mutex, acquired last and only while the account locks are
//!   held, so a history append and the matching log append are visible
//!   together.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use ledger_engine::{Account, Ledger, Transaction};
//! use rust_decimal::Decimal;
//!
//! # fn main() -> ledger_engine::Result<()> {
//! let ledger = Ledger::new();
//! ledger.register_account(Account::create("1", Decimal::from(1500), true)?);
//! ledger.register_account(Account::create("2", Decimal::from(1000), true)?);
//!
//! ledger.process_transaction(Transaction::transfer("1", "2", Decimal::from(500), Utc::now())?)?;
//!
//! assert_eq!(ledger.balance_of(&"2".into())?, Decimal::from(1500));
//! # Ok(())
//! # }
//! ```

use crate::{
    account::{Account, AccountGuard, AccountSnapshot},
    journal::Journal,
    metrics::Metrics,
    transaction::{Transaction, TransactionRecord},
    types::AccountNumber,
    Config, Error, Result,
};
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

type Registry = HashMap<AccountNumber, Registration>;

/// Registry entry
#[derive(Debug)]
struct Registration {
    account: Arc<Account>,
    /// Global log length when the account was registered
    since: usize,
}

/// Account registry plus global append-only transaction log
pub struct Ledger {
    /// Configuration
    config: Config,

    /// Registered accounts by number
    accounts: RwLock<Registry>,

    /// Every applied transaction, in completion order
    transactions: Mutex<Journal<Arc<Transaction>>>,

    /// Pipeline metrics
    metrics: Metrics,
}

impl Ledger {
    /// Empty ledger with default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Empty ledger with explicit configuration
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            accounts: RwLock::new(HashMap::new()),
            transactions: Mutex::new(Journal::new()),
            metrics: Metrics::default(),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Pipeline metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Register an account
    ///
    /// Returns `false` and keeps the existing entry if the number is taken.
    pub fn register_account(&self, account: impl Into<Arc<Account>>) -> bool {
        let account = account.into();
        let mut accounts = self.accounts.write();

        if accounts.contains_key(account.number()) {
            return false;
        }

        let since = self.transactions.lock().len();
        tracing::debug!("Registered account {} at log position {}", account.number(), since);
        accounts.insert(account.number().clone(), Registration { account, since });
        self.metrics.set_registered_accounts(accounts.len());
        true
    }

    /// Remove the account registered under `account`'s number
    ///
    /// Past transactions in the global log and in other histories stay put.
    pub fn unregister_account(&self, account: &Account) -> bool {
        let mut accounts = self.accounts.write();

        if accounts.remove(account.number()).is_none() {
            return false;
        }

        tracing::debug!("Unregistered account {}", account.number());
        self.metrics.set_registered_accounts(accounts.len());
        true
    }

    /// Flip an account's activity flag, returning the new value
    pub fn toggle_account_status(&self, number: &AccountNumber) -> Result<bool> {
        let accounts = self.accounts.read();
        let registration = accounts
            .get(number)
            .ok_or_else(|| Error::AccountNotFound(number.to_string()))?;

        let active = registration.account.toggle_active();
        tracing::debug!("Account {} active={}", number, active);
        Ok(active)
    }

    /// Apply a transaction atomically
    ///
    /// Either every affected account and the global log record the
    /// transaction, or nothing changes.
    pub fn process_transaction(&self, transaction: Transaction) -> Result<Arc<Transaction>> {
        let started = Instant::now();
        let result = self.settle(Arc::new(transaction));

        match &result {
            Ok(t) => {
                self.metrics.record_applied(started.elapsed().as_secs_f64());
                tracing::debug!(
                    "Applied {} of {} from {} to {:?}",
                    t.kind(),
                    t.amount(),
                    t.from_account(),
                    t.to_account().map(AccountNumber::as_str)
                );
            }
            Err(e) => {
                self.metrics.record_rejected(e.reason());
                tracing::warn!("Transaction rejected: {}", e);
            }
        }

        result
    }

    /// Build a transaction from `record` and process it
    ///
    /// Shape problems surface as [`Error::LedgerConstruction`] before any
    /// account is touched.
    pub fn add_transaction(&self, record: &TransactionRecord) -> Result<Arc<Transaction>> {
        let transaction = Transaction::from_record(record).map_err(|e| {
            self.metrics.record_rejected(e.reason());
            e
        })?;
        self.process_transaction(transaction)
    }

    /// Build a ledger from an ordered batch of records
    ///
    /// Accounts referenced by each record are registered first (already
    /// registered numbers are skipped). Stops at the first failing record;
    /// records before it stay applied.
    pub fn load_transactions<I>(records: I) -> std::result::Result<Self, BatchLoadError>
    where
        I: IntoIterator<Item = TransactionRecord>,
    {
        Self::with_config(Config::default()).load(records.into_iter().map(Ok))
    }

    /// `load_transactions` on loosely-typed JSON records
    pub fn load_json_records<I>(records: I) -> std::result::Result<Self, BatchLoadError>
    where
        I: IntoIterator<Item = serde_json::Value>,
    {
        Self::with_config(Config::default())
            .load(records.into_iter().map(TransactionRecord::from_json))
    }

    /// Feed a batch into this ledger, consuming it
    pub fn load<I>(self, records: I) -> std::result::Result<Self, BatchLoadError>
    where
        I: IntoIterator<Item = Result<TransactionRecord>>,
    {
        tracing::info!("Loading transaction batch");

        let mut loaded = 0usize;
        for (index, record) in records.into_iter().enumerate() {
            let outcome = record.and_then(|r| self.ingest(&r));
            if let Err(source) = outcome {
                tracing::warn!("Batch load aborted at record {}: {}", index, source);
                return Err(BatchLoadError {
                    ledger: self,
                    index,
                    source,
                });
            }
            loaded += 1;
        }

        tracing::info!("Loaded {} transactions", loaded);
        Ok(self)
    }

    fn ingest(&self, record: &TransactionRecord) -> Result<Arc<Transaction>> {
        self.register_account(Account::from_params(
            &record.from_account,
            &self.config.accounts,
        )?);
        if let Some(to) = &record.to_account {
            self.register_account(Account::from_params(to, &self.config.accounts)?);
        }

        self.add_transaction(record)
    }

    fn settle(&self, transaction: Arc<Transaction>) -> Result<Arc<Transaction>> {
        let accounts = self.accounts.read();
        let from = lookup(&accounts, transaction.from_account())?;

        match transaction.to_account() {
            None => {
                let mut guard = from.lock();
                guard.apply_transaction(&transaction)?;
                self.transactions.lock().append(Arc::clone(&transaction));
            }
            Some(to_number) => {
                if to_number == from.number() {
                    return Err(Error::LedgerValidation(format!(
                        "account {} cannot transfer to itself",
                        to_number
                    )));
                }
                let to = lookup(&accounts, to_number)?;

                let (mut debit, mut credit) = lock_pair(from, to);
                let debit_posting = debit.prepare(&transaction)?;
                let credit_posting = credit.prepare(&transaction)?;

                debit.commit(Arc::clone(&transaction), debit_posting);
                credit.commit(Arc::clone(&transaction), credit_posting);
                self.transactions.lock().append(Arc::clone(&transaction));
            }
        }

        Ok(transaction)
    }

    /// Registered account by number
    pub fn get_account(&self, number: &AccountNumber) -> Option<Arc<Account>> {
        self.accounts.read().get(number).map(|r| Arc::clone(&r.account))
    }

    /// Number of registered accounts
    pub fn account_count(&self) -> usize {
        self.accounts.read().len()
    }

    /// Current balance of a registered account
    pub fn balance_of(&self, number: &AccountNumber) -> Result<Decimal> {
        self.get_account(number)
            .map(|a| a.balance())
            .ok_or_else(|| Error::AccountNotFound(number.to_string()))
    }

    /// History length of a registered account
    pub fn history_len_of(&self, number: &AccountNumber) -> Result<usize> {
        self.get_account(number)
            .map(|a| a.history_len())
            .ok_or_else(|| Error::AccountNotFound(number.to_string()))
    }

    /// Number of applied transactions
    pub fn transaction_count(&self) -> usize {
        self.transactions.lock().len()
    }

    /// Applied transactions in completion order
    pub fn transactions(&self) -> Vec<Arc<Transaction>> {
        self.transactions.lock().to_vec()
    }

    /// Point-in-time view of every registered account and the log size
    ///
    /// Takes every account lock, so no transaction is half-visible.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let accounts = self.accounts.read();
        let guards = lock_all(&accounts);
        let transaction_count = self.transactions.lock().len();

        LedgerSnapshot {
            accounts: guards.iter().map(AccountGuard::snapshot).collect(),
            transaction_count,
        }
    }

    /// Audit the ledger
    ///
    /// Checks, under a consistent view:
    /// - each account's balance equals its opening balance plus its history
    /// - each history is in global-log order and only holds logged transactions
    /// - each logged transaction sits in the history of every registered party,
    ///   unless it was settled before that party's current registration
    /// - net flow recorded in the log matches Σ(balance − opening)
    ///
    /// Running totals that exceed the decimal range yield [`Error::BalanceOverflow`].
    pub fn verify_integrity(&self) -> Result<()> {
        let accounts = self.accounts.read();
        let guards = lock_all(&accounts);
        let log = self.transactions.lock();

        let positions: HashMap<*const Transaction, usize> = log
            .iter()
            .enumerate()
            .map(|(i, t)| (Arc::as_ptr(t), i))
            .collect();

        let mut net_change = Decimal::ZERO;
        for guard in &guards {
            guard.verify()?;

            let mut previous: Option<usize> = None;
            for t in guard.history() {
                let position = *positions.get(&Arc::as_ptr(t)).ok_or_else(|| {
                    Error::LedgerValidation(format!(
                        "account {} holds a transaction missing from the global log",
                        guard.number()
                    ))
                })?;
                if previous.map_or(false, |p| p >= position) {
                    return Err(Error::LedgerValidation(format!(
                        "account {} history is out of global-log order",
                        guard.number()
                    )));
                }
                previous = Some(position);
            }

            let change = guard.balance().checked_sub(guard.opening_balance()).ok_or_else(|| {
                Error::BalanceOverflow(format!("account {}: net change overflows", guard.number()))
            })?;
            net_change = add_checked(net_change, change, "net balance change")?;
        }

        let since: HashMap<&AccountNumber, usize> =
            accounts.iter().map(|(number, r)| (number, r.since)).collect();

        let by_number: HashMap<&AccountNumber, HashSet<*const Transaction>> = guards
            .iter()
            .map(|g| (g.number(), g.history().iter().map(Arc::as_ptr).collect()))
            .collect();

        let mut logged_flow = Decimal::ZERO;
        for (position, t) in log.iter().enumerate() {
            let parties = std::iter::once(t.from_account()).chain(t.to_account());
            for party in parties {
                let Some(history) = by_number.get(party) else {
                    continue;
                };
                if !history.contains(&Arc::as_ptr(t)) {
                    // settled against an account since unregistered under this number
                    if since.get(party).map_or(false, |&from| position < from) {
                        continue;
                    }
                    return Err(Error::LedgerValidation(format!(
                        "logged transaction missing from history of account {}",
                        party
                    )));
                }
                logged_flow = add_checked(logged_flow, t.effective_amount(party), "logged flow")?;
            }
        }

        if logged_flow != net_change {
            return Err(Error::LedgerValidation(format!(
                "net balance change {} does not match logged flow {}",
                net_change, logged_flow
            )));
        }

        Ok(())
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("service_name", &self.config.service_name)
            .field("accounts", &self.account_count())
            .field("transactions", &self.transaction_count())
            .finish_non_exhaustive()
    }
}

fn lookup<'r>(accounts: &'r Registry, number: &AccountNumber) -> Result<&'r Arc<Account>> {
    accounts.get(number).map(|r| &r.account).ok_or_else(|| {
        Error::LedgerValidation(format!("account {} is not registered on this ledger", number))
    })
}

fn add_checked(total: Decimal, amount: Decimal, what: &str) -> Result<Decimal> {
    total.checked_add(amount).ok_or_else(|| {
        Error::BalanceOverflow(format!("{}: {} + {} overflows", what, total, amount))
    })
}

/// Lock two distinct accounts, lower number first; returns (from, to)
fn lock_pair<'a>(from: &'a Account, to: &'a Account) -> (AccountGuard<'a>, AccountGuard<'a>) {
    if from.number() < to.number() {
        let from_guard = from.lock();
        let to_guard = to.lock();
        (from_guard, to_guard)
    } else {
        let to_guard = to.lock();
        let from_guard = from.lock();
        (from_guard, to_guard)
    }
}

/// Lock every registered account in ascending number order
fn lock_all(accounts: &Registry) -> Vec<AccountGuard<'_>> {
    let mut ordered: Vec<&Arc<Account>> = accounts.values().map(|r| &r.account).collect();
    ordered.sort_by(|a, b| a.number().cmp(b.number()));
    ordered.into_iter().map(|a| a.lock()).collect()
}

/// Point-in-time view of a ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Registered accounts, ascending by number
    pub accounts: Vec<AccountSnapshot>,
    /// Number of applied transactions
    pub transaction_count: usize,
}

impl LedgerSnapshot {
    /// Snapshot of one account
    pub fn account(&self, number: &str) -> Option<&AccountSnapshot> {
        self.accounts.iter().find(|a| a.number.as_str() == number)
    }
}

/// Batch load stopped at a failing record
///
/// Carries the ledger as built so far; records before `index` remain applied.
#[derive(Debug, thiserror::Error)]
#[error("batch load failed at record {index}: {source}")]
pub struct BatchLoadError {
    /// Ledger with every record before `index` applied
    pub ledger: Ledger,
    /// 0-based position of the failing record
    pub index: usize,
    /// Why the record failed
    #[source]
    pub source: Error,
}
