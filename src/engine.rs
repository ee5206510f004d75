// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Balance operations: deposit, withdraw, transfer.
//!
//! Each operation is one atomic transition over the ledger store. Every
//! precondition that gates a mutation (existence, frozen state, balance,
//! fraud verdict) is evaluated inside the same atomic block as the mutation,
//! so concurrent operations can never both pass a stale check.
//!
//! A blocked operation is the one case where a *failing* call commits: the
//! fraud flag is persisted atomically with the decision to block, then the
//! call fails with `FlaggedAndBlocked`. Validation failures never reach the
//! store.
//!
//! `Aborted` results are retried once, transparently; an aborted attempt
//! committed nothing, so the retry cannot duplicate a transaction.

use rust_decimal::Decimal;

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::fraud::{FraudPolicy, FraudVerdict};
use crate::models::{Balances, Currency, TransactionView};
use crate::storage::accounts::StoredAccount;
use crate::storage::ledger_db::{LedgerDatabase, LedgerTxn};
use crate::storage::transactions::{StoredTransaction, TxKind};

/// Result of a successful balance operation.
#[derive(Debug, Clone)]
pub struct OperationReceipt {
    /// The initiating account's balances after the operation.
    pub balances: Balances,
    /// Id of the transaction recording the operation.
    pub tx_id: String,
    /// Velocity advisory, when the operation drew one (transfers only).
    pub advisory: Option<String>,
}

/// Internal outcome of one atomic attempt. A `Blocked` attempt commits (the
/// flag must persist) but surfaces as an error to the caller.
enum Attempt<T> {
    Completed(T),
    Blocked { reason: String },
}

/// Executes validated, atomic balance transitions over the ledger store.
pub struct BalanceEngine<'a> {
    db: &'a LedgerDatabase,
    policy: FraudPolicy,
}

impl<'a> BalanceEngine<'a> {
    pub fn new(db: &'a LedgerDatabase, config: &LedgerConfig) -> Self {
        Self {
            db,
            policy: FraudPolicy::new(config),
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Credit an account. No fraud check applies to deposits.
    pub fn deposit(
        &self,
        account_id: &str,
        amount: Decimal,
        currency: Currency,
    ) -> LedgerResult<OperationReceipt> {
        ensure_positive(amount)?;

        self.with_retry(|txn| {
            let mut account = load_active(txn, account_id)?;
            *account.balances.amount_mut(currency) += amount;

            let tx = StoredTransaction::deposit(amount, currency, account.account_id.clone());
            txn.create_transaction(&tx)?;
            account.transaction_refs.push(tx.tx_id.clone());
            txn.put_account(&account)?;

            Ok(OperationReceipt {
                balances: account.balances.clone(),
                tx_id: tx.tx_id,
                advisory: None,
            })
        })
    }

    /// Debit an account, subject to the overdraft rule and the withdrawal
    /// threshold.
    pub fn withdraw(
        &self,
        account_id: &str,
        amount: Decimal,
        currency: Currency,
    ) -> LedgerResult<OperationReceipt> {
        ensure_positive(amount)?;

        let attempt = self.with_retry(|txn| {
            let mut account = load_active(txn, account_id)?;

            let available = account.balances.amount(currency);
            if available < amount {
                return Err(LedgerError::InsufficientBalance {
                    currency,
                    requested: amount,
                    available,
                });
            }

            if let FraudVerdict::Block { reason } =
                self.policy.evaluate(TxKind::Withdraw, amount, currency, 0)
            {
                account.append_flag(reason.clone(), currency, amount);
                txn.put_account(&account)?;
                return Ok(Attempt::Blocked { reason });
            }

            *account.balances.amount_mut(currency) -= amount;
            let tx = StoredTransaction::withdraw(amount, currency, account.account_id.clone());
            txn.create_transaction(&tx)?;
            account.transaction_refs.push(tx.tx_id.clone());
            txn.put_account(&account)?;

            Ok(Attempt::Completed(OperationReceipt {
                balances: account.balances.clone(),
                tx_id: tx.tx_id,
                advisory: None,
            }))
        })?;

        match attempt {
            Attempt::Completed(receipt) => Ok(receipt),
            Attempt::Blocked { reason } => {
                tracing::warn!(
                    account = %account_id,
                    amount = %amount,
                    currency = %currency,
                    "Large withdrawal flagged and blocked"
                );
                Err(LedgerError::FlaggedAndBlocked { reason })
            }
        }
    }

    /// Move funds between two accounts, the recipient resolved by email.
    ///
    /// Debit, credit, and the single transaction record commit together or
    /// not at all. A transfer to oneself is permitted and moves nothing.
    pub fn transfer(
        &self,
        sender_id: &str,
        recipient_email: &str,
        amount: Decimal,
        currency: Currency,
    ) -> LedgerResult<OperationReceipt> {
        ensure_positive(amount)?;

        let attempt = self.with_retry(|txn| {
            let mut sender = load_active(txn, sender_id)?;
            let mut recipient = txn.get_account_by_email(recipient_email)?;
            if recipient.is_deleted {
                return Err(LedgerError::AccountFrozen(format!(
                    "Recipient account {}",
                    recipient.account_id
                )));
            }

            let available = sender.balances.amount(currency);
            if available < amount {
                return Err(LedgerError::InsufficientBalance {
                    currency,
                    requested: amount,
                    available,
                });
            }

            let now = chrono::Utc::now();
            let prior = txn.recent_sent_transfers(sender_id, self.policy.window_start(now))?;
            let advisory = match self.policy.evaluate(TxKind::Transfer, amount, currency, prior) {
                FraudVerdict::Block { reason } => {
                    sender.append_flag(reason.clone(), currency, amount);
                    txn.put_account(&sender)?;
                    return Ok(Attempt::Blocked { reason });
                }
                FraudVerdict::AllowWithAdvisory { reason } => Some(reason),
                FraudVerdict::Allow => None,
            };

            let tx = StoredTransaction::transfer(
                amount,
                currency,
                sender.account_id.clone(),
                recipient.account_id.clone(),
            );
            txn.create_transaction(&tx)?;

            if recipient.account_id == sender.account_id {
                // Self-transfer: net-zero, one record, one ref.
                sender.transaction_refs.push(tx.tx_id.clone());
                txn.put_account(&sender)?;
            } else {
                *sender.balances.amount_mut(currency) -= amount;
                *recipient.balances.amount_mut(currency) += amount;
                sender.transaction_refs.push(tx.tx_id.clone());
                recipient.transaction_refs.push(tx.tx_id.clone());
                txn.put_account(&sender)?;
                txn.put_account(&recipient)?;
            }

            Ok(Attempt::Completed(OperationReceipt {
                balances: sender.balances.clone(),
                tx_id: tx.tx_id,
                advisory,
            }))
        })?;

        match attempt {
            Attempt::Completed(receipt) => {
                if let Some(reason) = receipt.advisory.as_deref() {
                    tracing::warn!(account = %sender_id, %reason, "Transfer velocity advisory");
                }
                Ok(receipt)
            }
            Attempt::Blocked { reason } => {
                tracing::warn!(
                    account = %sender_id,
                    amount = %amount,
                    currency = %currency,
                    "Large transfer flagged and blocked"
                );
                Err(LedgerError::FlaggedAndBlocked { reason })
            }
        }
    }

    // =========================================================================
    // Read paths
    // =========================================================================

    /// Current balances of a live account.
    pub fn balances(&self, account_id: &str) -> LedgerResult<Balances> {
        let account = self.db.get_account(account_id)?;
        if account.is_deleted {
            return Err(LedgerError::AccountFrozen(format!("Account {account_id}")));
        }
        Ok(account.balances)
    }

    /// Transaction history of a live account, newest first, soft-deleted
    /// records excluded.
    pub fn transaction_history(&self, account_id: &str) -> LedgerResult<Vec<TransactionView>> {
        let account = self.db.get_account(account_id)?;
        if account.is_deleted {
            return Err(LedgerError::AccountFrozen(format!("Account {account_id}")));
        }
        self.db.list_for_account(account_id)
    }

    // =========================================================================
    // Retry
    // =========================================================================

    /// Run an atomic block, retrying exactly once on `Aborted`. An aborted
    /// attempt committed nothing, so at most one transaction is ever created
    /// per logical request.
    fn with_retry<T>(
        &self,
        op: impl Fn(&mut LedgerTxn<'_>) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        match self.db.run_atomic(&op) {
            Err(err) if err.is_retryable() => {
                tracing::warn!(error = %err, "Atomic block aborted, retrying once");
                self.db.run_atomic(&op)
            }
            other => other,
        }
    }
}

fn ensure_positive(amount: Decimal) -> LedgerResult<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount);
    }
    Ok(())
}

fn load_active(txn: &LedgerTxn<'_>, account_id: &str) -> LedgerResult<StoredAccount> {
    let account = txn.get_account(account_id)?;
    if account.is_deleted {
        return Err(LedgerError::AccountFrozen(format!("Account {account_id}")));
    }
    Ok(account)
}
