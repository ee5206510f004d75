// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account lifecycle: registration, soft delete, and the lazy retention
//! purge.
//!
//! Accounts are never hard-deleted by a background sweep. The purge runs only
//! when a login attempt reaches a soft-deleted account whose retention window
//! has elapsed; at that point the account and every deposit/withdraw
//! transaction referencing it are erased in one atomic block. Transfers are
//! kept — the counterparty still references them.

use chrono::{Duration, Utc};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::storage::accounts::StoredAccount;
use crate::storage::ledger_db::LedgerDatabase;
use crate::storage::transactions::TxKind;

/// Outcome of a login-time eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginEligibility {
    /// Account is live; login may proceed.
    Active,
    /// The retention window had elapsed; the account and its
    /// deposit/withdraw history were just permanently erased. Terminal —
    /// the account no longer exists.
    PurgedNow,
    /// Account is soft-deleted but still inside the retention window.
    /// Login is refused; all data remains intact.
    DeletedBlocked,
}

/// Manages account creation and the soft-delete / purge lifecycle.
pub struct AccountLifecycle<'a> {
    db: &'a LedgerDatabase,
    config: &'a LedgerConfig,
}

impl<'a> AccountLifecycle<'a> {
    pub fn new(db: &'a LedgerDatabase, config: &'a LedgerConfig) -> Self {
        Self { db, config }
    }

    /// Register a new account with zero balances.
    ///
    /// The credential is an opaque string prepared by the credential
    /// collaborator; this crate only stores it. Fails with `DuplicateEmail`
    /// on a case-sensitive exact email collision.
    pub fn register(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
        credential: impl Into<String>,
    ) -> LedgerResult<StoredAccount> {
        let account = StoredAccount::new(name.into(), email.into(), credential.into());
        self.db.run_atomic(|txn| txn.create_account(&account))?;
        tracing::info!(account = %account.account_id, "Account registered");
        Ok(account)
    }

    /// Soft-delete an account, freezing its balances.
    ///
    /// Fails with `NotFound` when the account is absent or already deleted.
    pub fn soft_delete(&self, account_id: &str) -> LedgerResult<()> {
        self.db.run_atomic(|txn| {
            let mut account = txn.get_account(account_id)?;
            if account.is_deleted {
                return Err(LedgerError::NotFound(format!("Account {account_id}")));
            }
            account.mark_deleted();
            txn.put_account(&account)
        })?;
        tracing::info!(account = %account_id, "Account soft-deleted");
        Ok(())
    }

    /// Decide whether a login attempt against this account may proceed.
    ///
    /// Deleted accounts past the retention window are purged here, lazily:
    /// every deposit/withdraw transaction referencing the account is
    /// hard-deleted, then the account itself, all in one atomic block. A
    /// `PurgedNow` result is terminal.
    pub fn evaluate_login_eligibility(&self, account_id: &str) -> LedgerResult<LoginEligibility> {
        let retention = Duration::days(self.config.retention_days);

        self.db.run_atomic(|txn| {
            let account = txn.get_account(account_id)?;
            if !account.is_deleted {
                return Ok(LoginEligibility::Active);
            }
            let Some(deleted_at) = account.deleted_at else {
                // Deleted without a timestamp: keep blocking rather than
                // guessing at a retention start.
                return Ok(LoginEligibility::DeletedBlocked);
            };
            if Utc::now() - deleted_at < retention {
                return Ok(LoginEligibility::DeletedBlocked);
            }

            let purged = txn.delete_transactions_matching(|tx| {
                matches!(tx.kind, TxKind::Deposit | TxKind::Withdraw) && tx.references(account_id)
            })?;
            txn.delete_account(&account)?;
            tracing::info!(
                account = %account_id,
                transactions = purged,
                "Account permanently deleted after retention window"
            );
            Ok(LoginEligibility::PurgedNow)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Currency;
    use crate::storage::transactions::StoredTransaction;
    use rust_decimal_macros::dec;

    fn setup() -> (LedgerDatabase, LedgerConfig, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = LedgerDatabase::open(&dir.path().join("test.redb")).unwrap();
        (db, LedgerConfig::default(), dir)
    }

    #[test]
    fn register_and_duplicate_email() {
        let (db, config, _dir) = setup();
        let lifecycle = AccountLifecycle::new(&db, &config);

        let account = lifecycle
            .register("Ada", "ada@example.com", "credential")
            .unwrap();
        assert_eq!(db.get_account(&account.account_id).unwrap().name, "Ada");

        let err = lifecycle
            .register("Imposter", "ada@example.com", "credential")
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateEmail));

        // Different case is a different key.
        assert!(lifecycle
            .register("Other", "Ada@example.com", "credential")
            .is_ok());
    }

    #[test]
    fn soft_delete_marks_and_rejects_repeat() {
        let (db, config, _dir) = setup();
        let lifecycle = AccountLifecycle::new(&db, &config);
        let account = lifecycle
            .register("Ada", "ada@example.com", "credential")
            .unwrap();

        lifecycle.soft_delete(&account.account_id).unwrap();
        let stored = db.get_account(&account.account_id).unwrap();
        assert!(stored.is_deleted);
        assert!(stored.deleted_at.is_some());

        assert!(matches!(
            lifecycle.soft_delete(&account.account_id),
            Err(LedgerError::NotFound(_))
        ));
        assert!(matches!(
            lifecycle.soft_delete("missing"),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn active_account_is_eligible() {
        let (db, config, _dir) = setup();
        let lifecycle = AccountLifecycle::new(&db, &config);
        let account = lifecycle
            .register("Ada", "ada@example.com", "credential")
            .unwrap();

        assert_eq!(
            lifecycle
                .evaluate_login_eligibility(&account.account_id)
                .unwrap(),
            LoginEligibility::Active
        );
    }

    #[test]
    fn recently_deleted_account_blocks_and_keeps_data() {
        let (db, config, _dir) = setup();
        let lifecycle = AccountLifecycle::new(&db, &config);
        let account = lifecycle
            .register("Ada", "ada@example.com", "credential")
            .unwrap();
        lifecycle.soft_delete(&account.account_id).unwrap();

        assert_eq!(
            lifecycle
                .evaluate_login_eligibility(&account.account_id)
                .unwrap(),
            LoginEligibility::DeletedBlocked
        );
        // Still present, still deleted.
        assert!(db.get_account(&account.account_id).unwrap().is_deleted);
    }

    /// Rewrite an account's deleted_at so the retention window has elapsed.
    fn backdate_deletion(db: &LedgerDatabase, account_id: &str, days: i64) {
        db.run_atomic(|txn| {
            let mut account = txn.get_account(account_id)?;
            account.deleted_at = Some(Utc::now() - Duration::days(days));
            txn.put_account(&account)
        })
        .unwrap();
    }

    #[test]
    fn expired_deletion_purges_account_and_cash_history() {
        let (db, config, _dir) = setup();
        let lifecycle = AccountLifecycle::new(&db, &config);
        let account = lifecycle
            .register("Ada", "ada@example.com", "credential")
            .unwrap();
        let peer = lifecycle
            .register("Grace", "grace@example.com", "credential")
            .unwrap();

        // One deposit, one withdrawal, one transfer to a peer.
        let deposit =
            StoredTransaction::deposit(dec!(100), Currency::Usd, account.account_id.clone());
        let withdraw =
            StoredTransaction::withdraw(dec!(10), Currency::Usd, account.account_id.clone());
        let transfer = StoredTransaction::transfer(
            dec!(20),
            Currency::Usd,
            account.account_id.clone(),
            peer.account_id.clone(),
        );
        db.run_atomic(|txn| {
            txn.create_transaction(&deposit)?;
            txn.create_transaction(&withdraw)?;
            txn.create_transaction(&transfer)
        })
        .unwrap();

        lifecycle.soft_delete(&account.account_id).unwrap();
        backdate_deletion(&db, &account.account_id, 91);

        assert_eq!(
            lifecycle
                .evaluate_login_eligibility(&account.account_id)
                .unwrap(),
            LoginEligibility::PurgedNow
        );

        // Account is gone, along with its email key.
        assert!(matches!(
            db.get_account(&account.account_id),
            Err(LedgerError::NotFound(_))
        ));
        assert!(matches!(
            db.get_account_by_email("ada@example.com"),
            Err(LedgerError::NotFound(_))
        ));
        // A later check cannot find the account either.
        assert!(matches!(
            lifecycle.evaluate_login_eligibility(&account.account_id),
            Err(LedgerError::NotFound(_))
        ));

        // The transfer survives on the peer's side; the cash legs are gone.
        let peer_history = db.list_for_account(&peer.account_id).unwrap();
        assert_eq!(peer_history.len(), 1);
        assert_eq!(peer_history[0].tx_id, transfer.tx_id);
        // The purged side of the surviving transfer no longer resolves.
        assert_eq!(peer_history[0].from_email, None);
        assert_eq!(peer_history[0].to_email.as_deref(), Some("grace@example.com"));

        let gone = db
            .run_atomic(|txn| txn.get_transaction(&deposit.tx_id))
            .unwrap_err();
        assert!(matches!(gone, LedgerError::NotFound(_)));
    }

    #[test]
    fn purge_only_touches_the_expired_account() {
        let (db, config, _dir) = setup();
        let lifecycle = AccountLifecycle::new(&db, &config);
        let expired = lifecycle
            .register("Ada", "ada@example.com", "credential")
            .unwrap();
        let bystander = lifecycle
            .register("Grace", "grace@example.com", "credential")
            .unwrap();

        let own_deposit =
            StoredTransaction::deposit(dec!(5), Currency::Inr, expired.account_id.clone());
        let bystander_deposit =
            StoredTransaction::deposit(dec!(7), Currency::Inr, bystander.account_id.clone());
        db.run_atomic(|txn| {
            txn.create_transaction(&own_deposit)?;
            txn.create_transaction(&bystander_deposit)
        })
        .unwrap();

        lifecycle.soft_delete(&expired.account_id).unwrap();
        backdate_deletion(&db, &expired.account_id, 365);
        assert_eq!(
            lifecycle
                .evaluate_login_eligibility(&expired.account_id)
                .unwrap(),
            LoginEligibility::PurgedNow
        );

        let history = db.list_for_account(&bystander.account_id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].tx_id, bystander_deposit.tx_id);
    }

    #[test]
    fn shorter_retention_window_is_honored() {
        let (db, mut config, _dir) = setup();
        config.retention_days = 1;
        let lifecycle = AccountLifecycle::new(&db, &config);
        let account = lifecycle
            .register("Ada", "ada@example.com", "credential")
            .unwrap();
        lifecycle.soft_delete(&account.account_id).unwrap();
        backdate_deletion(&db, &account.account_id, 2);

        assert_eq!(
            lifecycle
                .evaluate_login_eligibility(&account.account_id)
                .unwrap(),
            LoginEligibility::PurgedNow
        );
    }
}
