// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded ledger database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `accounts`: account_id → serialized StoredAccount
//! - `account_emails`: email → account_id (uniqueness + by-email lookup)
//! - `transactions`: tx_id → serialized StoredTransaction
//! - `account_tx_index`: composite key (account_id|!timestamp|tx_id) → direction
//!
//! ## Atomicity
//!
//! Every balance mutation flows through [`LedgerDatabase::run_atomic`], which
//! wraps one redb write transaction around a closure over [`LedgerTxn`]. redb
//! write transactions are single-writer, so overlapping atomic blocks
//! serialize: a reader never observes a sender debited without the recipient
//! credited, or a transaction record without its balance change.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, Table, TableDefinition};

use super::accounts::StoredAccount;
use super::transactions::{StoredTransaction, TxKind};
use crate::error::{LedgerError, LedgerResult};
use crate::models::TransactionView;

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary account table: account_id → serialized StoredAccount (JSON bytes).
const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

/// Email index: email (case-sensitive) → account_id.
const ACCOUNT_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("account_emails");

/// Primary transaction table: tx_id → serialized StoredTransaction (JSON bytes).
const TRANSACTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("transactions");

/// Index: composite key → direction ("sent"|"received").
/// Key format: `account_id|!timestamp_be|tx_id` for descending-time range scans.
const ACCOUNT_TX_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("account_tx_index");

const DIRECTION_SENT: &str = "sent";
const DIRECTION_RECEIVED: &str = "received";

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a composite key for the account_tx_index table.
///
/// Format: `account_id | inverted_timestamp_be_bytes | tx_id`
///
/// The inverted timestamp ensures newest-first ordering when scanning forward.
/// Account ids are UUIDs and never contain the `|` separator.
fn make_index_key(account_id: &str, timestamp: i64, tx_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(account_id.len() + 1 + 8 + 1 + tx_id.len());
    key.extend_from_slice(account_id.as_bytes());
    key.push(b'|');
    // Invert timestamp for descending order (newest first)
    key.extend_from_slice(&(!timestamp as u64).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(tx_id.as_bytes());
    key
}

/// Build a prefix key for range scanning all index entries of an account.
fn make_prefix(account_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(account_id.len() + 1);
    prefix.extend_from_slice(account_id.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Build the upper bound for a range scan (prefix with all 0xFF bytes appended).
fn make_prefix_end(account_id: &str) -> Vec<u8> {
    let mut end = Vec::with_capacity(account_id.len() + 1 + 20);
    end.extend_from_slice(account_id.as_bytes());
    end.push(b'|');
    end.extend_from_slice(&[0xFF; 20]);
    end
}

/// Recover the (non-inverted) timestamp from a composite index key.
fn extract_timestamp_from_key(key: &[u8]) -> Option<i64> {
    let sep = key.iter().position(|&b| b == b'|')?;
    let bytes: [u8; 8] = key.get(sep + 1..sep + 9)?.try_into().ok()?;
    Some(!(u64::from_be_bytes(bytes)) as i64)
}

/// Extract the tx_id portion from a composite index key.
fn extract_tx_id_from_key(key: &[u8]) -> Option<String> {
    let mut pipe_count = 0;
    for (i, &b) in key.iter().enumerate() {
        if b == b'|' {
            pipe_count += 1;
            if pipe_count == 2 {
                return String::from_utf8(key[i + 1..].to_vec()).ok();
            }
        }
    }
    None
}

// =============================================================================
// LedgerDatabase
// =============================================================================

/// Embedded ACID ledger database.
pub struct LedgerDatabase {
    db: Database,
}

impl LedgerDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(ACCOUNT_EMAILS)?;
            let _ = write_txn.open_table(TRANSACTIONS)?;
            let _ = write_txn.open_table(ACCOUNT_TX_INDEX)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Atomic blocks
    // =========================================================================

    /// Run a closure inside one write transaction.
    ///
    /// All reads and writes performed through the [`LedgerTxn`] are applied
    /// together on `Ok` or not at all on `Err`. Commit failures surface as
    /// [`LedgerError::Aborted`], which callers may retry once.
    pub fn run_atomic<T>(
        &self,
        f: impl FnOnce(&mut LedgerTxn<'_>) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut txn = LedgerTxn {
                accounts: write_txn.open_table(ACCOUNTS)?,
                emails: write_txn.open_table(ACCOUNT_EMAILS)?,
                transactions: write_txn.open_table(TRANSACTIONS)?,
                tx_index: write_txn.open_table(ACCOUNT_TX_INDEX)?,
            };
            f(&mut txn)
        };
        match outcome {
            Ok(value) => {
                write_txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                write_txn.abort()?;
                Err(err)
            }
        }
    }

    // =========================================================================
    // Read-only lookups
    // =========================================================================

    /// Look up an account by id.
    pub fn get_account(&self, account_id: &str) -> LedgerResult<StoredAccount> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;
        match table.get(account_id)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Err(LedgerError::NotFound(format!("Account {account_id}"))),
        }
    }

    /// Look up an account by its (case-sensitive) email.
    pub fn get_account_by_email(&self, email: &str) -> LedgerResult<StoredAccount> {
        let read_txn = self.db.begin_read()?;
        let emails = read_txn.open_table(ACCOUNT_EMAILS)?;
        let account_id = match emails.get(email)? {
            Some(value) => value.value().to_string(),
            None => return Err(LedgerError::NotFound(format!("Account for {email}"))),
        };
        let accounts = read_txn.open_table(ACCOUNTS)?;
        match accounts.get(account_id.as_str())? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Err(LedgerError::NotFound(format!("Account {account_id}"))),
        }
    }

    /// List every account, optionally restricted to non-deleted ones.
    pub fn list_all_accounts(&self, not_deleted: bool) -> LedgerResult<Vec<StoredAccount>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;

        let mut accounts = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let account: StoredAccount = serde_json::from_slice(value.value())?;
            if !not_deleted || !account.is_deleted {
                accounts.push(account);
            }
        }
        Ok(accounts)
    }

    /// Transaction history projection for one account: non-deleted records
    /// only, newest first, with counterparty emails resolved where the
    /// referenced account still exists.
    pub fn list_for_account(&self, account_id: &str) -> LedgerResult<Vec<TransactionView>> {
        let read_txn = self.db.begin_read()?;
        let idx_table = read_txn.open_table(ACCOUNT_TX_INDEX)?;
        let tx_table = read_txn.open_table(TRANSACTIONS)?;
        let accounts = read_txn.open_table(ACCOUNTS)?;

        let prefix = make_prefix(account_id);
        let prefix_end = make_prefix_end(account_id);

        let mut email_cache: HashMap<String, Option<String>> = HashMap::new();
        let mut resolve_email = |id: &str| -> LedgerResult<Option<String>> {
            if let Some(cached) = email_cache.get(id) {
                return Ok(cached.clone());
            }
            let email = match accounts.get(id)? {
                Some(value) => {
                    let account: StoredAccount = serde_json::from_slice(value.value())?;
                    Some(account.email)
                }
                None => None,
            };
            email_cache.insert(id.to_string(), email.clone());
            Ok(email)
        };

        let mut views = Vec::new();
        for entry in idx_table.range(prefix.as_slice()..prefix_end.as_slice())? {
            let entry = entry?;
            let Some(tx_id) = extract_tx_id_from_key(entry.0.value()) else {
                continue;
            };
            let Some(value) = tx_table.get(tx_id.as_str())? else {
                continue;
            };
            let tx: StoredTransaction = serde_json::from_slice(value.value())?;
            if tx.is_deleted {
                continue;
            }
            let from_email = match tx.from.as_deref() {
                Some(id) => resolve_email(id)?,
                None => None,
            };
            let to_email = match tx.to.as_deref() {
                Some(id) => resolve_email(id)?,
                None => None,
            };
            views.push(TransactionView {
                tx_id: tx.tx_id,
                kind: tx.kind,
                amount: tx.amount,
                currency: tx.currency,
                from_email,
                to_email,
                date: tx.date,
            });
        }
        Ok(views)
    }

    /// Soft-delete a transaction record. Balances and account refs are
    /// untouched; history projections stop returning the record.
    pub fn soft_delete_transaction(&self, tx_id: &str) -> LedgerResult<()> {
        self.run_atomic(|txn| txn.soft_delete_transaction(tx_id))
    }
}

// =============================================================================
// LedgerTxn
// =============================================================================

/// Handle to one open atomic block.
///
/// Created by [`LedgerDatabase::run_atomic`]; every read observes the block's
/// own writes, and nothing is visible outside until the block commits.
pub struct LedgerTxn<'txn> {
    accounts: Table<'txn, &'static str, &'static [u8]>,
    emails: Table<'txn, &'static str, &'static str>,
    transactions: Table<'txn, &'static str, &'static [u8]>,
    tx_index: Table<'txn, &'static [u8], &'static str>,
}

impl LedgerTxn<'_> {
    /// Look up an account by id.
    pub fn get_account(&self, account_id: &str) -> LedgerResult<StoredAccount> {
        match self.accounts.get(account_id)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Err(LedgerError::NotFound(format!("Account {account_id}"))),
        }
    }

    /// Look up an account by its (case-sensitive) email.
    pub fn get_account_by_email(&self, email: &str) -> LedgerResult<StoredAccount> {
        let account_id = match self.emails.get(email)? {
            Some(value) => value.value().to_string(),
            None => return Err(LedgerError::NotFound(format!("Account for {email}"))),
        };
        self.get_account(&account_id)
    }

    /// Insert a new account and its email-index entry.
    ///
    /// Fails with `DuplicateEmail` when the email key is already taken.
    pub fn create_account(&mut self, account: &StoredAccount) -> LedgerResult<()> {
        if self.emails.get(account.email.as_str())?.is_some() {
            return Err(LedgerError::DuplicateEmail);
        }
        let json = serde_json::to_vec(account)?;
        self.accounts
            .insert(account.account_id.as_str(), json.as_slice())?;
        self.emails
            .insert(account.email.as_str(), account.account_id.as_str())?;
        Ok(())
    }

    /// Write back a (mutated) account record.
    pub fn put_account(&mut self, account: &StoredAccount) -> LedgerResult<()> {
        let json = serde_json::to_vec(account)?;
        self.accounts
            .insert(account.account_id.as_str(), json.as_slice())?;
        Ok(())
    }

    /// Look up a transaction by id.
    pub fn get_transaction(&self, tx_id: &str) -> LedgerResult<StoredTransaction> {
        match self.transactions.get(tx_id)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Err(LedgerError::NotFound(format!("Transaction {tx_id}"))),
        }
    }

    /// Persist a new transaction and its per-account index entries.
    pub fn create_transaction(&mut self, tx: &StoredTransaction) -> LedgerResult<()> {
        let json = serde_json::to_vec(tx)?;
        self.transactions
            .insert(tx.tx_id.as_str(), json.as_slice())?;

        let timestamp = tx.date.timestamp();
        for party in tx.parties() {
            let direction = if tx.from.as_deref() == Some(party) {
                DIRECTION_SENT
            } else {
                DIRECTION_RECEIVED
            };
            let key = make_index_key(party, timestamp, &tx.tx_id);
            self.tx_index.insert(key.as_slice(), direction)?;
        }
        Ok(())
    }

    /// Mark a transaction soft-deleted.
    ///
    /// Fails with `NotFound` when the record is absent or already deleted.
    pub fn soft_delete_transaction(&mut self, tx_id: &str) -> LedgerResult<()> {
        // Read and deserialize before mutating; the guard borrows the table.
        let existing_bytes = {
            let existing = self
                .transactions
                .get(tx_id)?
                .ok_or_else(|| LedgerError::NotFound(format!("Transaction {tx_id}")))?;
            existing.value().to_vec()
        };

        let mut tx: StoredTransaction = serde_json::from_slice(&existing_bytes)?;
        if tx.is_deleted {
            return Err(LedgerError::NotFound(format!("Transaction {tx_id}")));
        }
        tx.is_deleted = true;

        let json = serde_json::to_vec(&tx)?;
        self.transactions.insert(tx_id, json.as_slice())?;
        Ok(())
    }

    /// Hard-delete every transaction matching the predicate, along with its
    /// index entries. Returns the number of records removed.
    pub fn delete_transactions_matching(
        &mut self,
        predicate: impl Fn(&StoredTransaction) -> bool,
    ) -> LedgerResult<usize> {
        // Collect first: the table cannot be mutated while iterating it.
        let mut matched = Vec::new();
        for entry in self.transactions.iter()? {
            let (_, value) = entry?;
            let tx: StoredTransaction = serde_json::from_slice(value.value())?;
            if predicate(&tx) {
                matched.push(tx);
            }
        }

        for tx in &matched {
            self.transactions.remove(tx.tx_id.as_str())?;
            let timestamp = tx.date.timestamp();
            for party in tx.parties() {
                let key = make_index_key(party, timestamp, &tx.tx_id);
                self.tx_index.remove(key.as_slice())?;
            }
        }
        Ok(matched.len())
    }

    /// Hard-delete an account: its record, its email-index entry, and every
    /// entry under its transaction-index prefix.
    pub fn delete_account(&mut self, account: &StoredAccount) -> LedgerResult<()> {
        self.accounts.remove(account.account_id.as_str())?;
        self.emails.remove(account.email.as_str())?;

        let prefix = make_prefix(&account.account_id);
        let prefix_end = make_prefix_end(&account.account_id);
        let keys: Vec<Vec<u8>> = self
            .tx_index
            .range(prefix.as_slice()..prefix_end.as_slice())?
            .map(|entry| entry.map(|(key, _)| key.value().to_vec()))
            .collect::<Result<_, _>>()?;
        for key in keys {
            self.tx_index.remove(key.as_slice())?;
        }
        Ok(())
    }

    /// Count transfers sent by the account with `date >= window_start`.
    ///
    /// Scans the account's index prefix newest-first and stops at the first
    /// entry whose key timestamp falls before the window. Soft-deleted
    /// transfers still count.
    pub fn recent_sent_transfers(
        &self,
        account_id: &str,
        window_start: DateTime<Utc>,
    ) -> LedgerResult<usize> {
        let prefix = make_prefix(account_id);
        let prefix_end = make_prefix_end(account_id);
        let cutoff = window_start.timestamp();

        let mut count = 0;
        for entry in self.tx_index.range(prefix.as_slice()..prefix_end.as_slice())? {
            let entry = entry?;
            let key = entry.0.value();
            // Key timestamps have second resolution; anything strictly before
            // the cutoff second ends the scan.
            match extract_timestamp_from_key(key) {
                Some(ts) if ts < cutoff => break,
                Some(_) => {}
                None => continue,
            }
            if entry.1.value() != DIRECTION_SENT {
                continue;
            }
            let Some(tx_id) = extract_tx_id_from_key(key) else {
                continue;
            };
            let tx = self.get_transaction(&tx_id)?;
            if tx.kind == TxKind::Transfer && tx.date >= window_start {
                count += 1;
            }
        }
        Ok(count)
    }
}

// =============================================================================
// Tests
// =============================================================================
