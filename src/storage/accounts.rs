// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted account records.
//!
//! An account owns its wallet state: per-currency balances, an append-only
//! sequence of transaction references, and an append-only sequence of fraud
//! flags. Soft deletion freezes the account (no further balance mutation);
//! hard deletion happens only through the lifecycle purge.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Balances, Currency};

/// Kind of a fraud flag. Only one kind exists today; the enum keeps the
/// stored shape open for future heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    SuspiciousActivity,
}

/// A suspicious-activity marker attached to an account.
///
/// Immutable once appended; not independently addressable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flag {
    pub kind: FlagKind,
    /// Human-readable reason, e.g. "Large withdrawal threshold exceeded".
    pub reason: String,
    pub currency: Currency,
    pub amount: Decimal,
    pub flagged_at: DateTime<Utc>,
}

/// Stored account record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAccount {
    /// Unique account identifier (UUID).
    pub account_id: String,
    /// Display name from registration.
    pub name: String,
    /// Unique email, matched case-sensitively.
    pub email: String,
    /// Opaque credential supplied by the credential collaborator.
    /// Never interpreted or verified by this crate.
    pub credential: String,
    /// Per-currency balances. Non-negative at all times while the account
    /// is not deleted.
    pub balances: Balances,
    /// Transaction ids this account is involved in, in chronological order
    /// of involvement. Append-only.
    pub transaction_refs: Vec<String>,
    /// Fraud flags. Append-only.
    pub flags: Vec<Flag>,
    /// Soft-delete marker. A deleted account is frozen.
    pub is_deleted: bool,
    /// Set exactly once, when `is_deleted` transitions to true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// When the account was registered.
    pub created_at: DateTime<Utc>,
}

impl StoredAccount {
    /// Create a fresh account with zero balances.
    pub fn new(name: String, email: String, credential: String) -> Self {
        Self {
            account_id: uuid::Uuid::new_v4().to_string(),
            name,
            email,
            credential,
            balances: Balances::zero(),
            transaction_refs: Vec::new(),
            flags: Vec::new(),
            is_deleted: false,
            deleted_at: None,
            created_at: Utc::now(),
        }
    }

    /// Append a suspicious-activity flag.
    pub fn append_flag(&mut self, reason: impl Into<String>, currency: Currency, amount: Decimal) {
        self.flags.push(Flag {
            kind: FlagKind::SuspiciousActivity,
            reason: reason.into(),
            currency,
            amount,
            flagged_at: Utc::now(),
        });
    }

    /// Mark the account soft-deleted. `deleted_at` is set once and never
    /// overwritten.
    pub fn mark_deleted(&mut self) {
        self.is_deleted = true;
        if self.deleted_at.is_none() {
            self.deleted_at = Some(Utc::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_account_starts_empty() {
        let account = StoredAccount::new(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            "credential".to_string(),
        );

        assert_eq!(account.balances, Balances::zero());
        assert!(account.transaction_refs.is_empty());
        assert!(account.flags.is_empty());
        assert!(!account.is_deleted);
        assert!(account.deleted_at.is_none());
    }

    #[test]
    fn append_flag_preserves_order() {
        let mut account =
            StoredAccount::new("Ada".into(), "ada@example.com".into(), "credential".into());
        account.append_flag(
            "Large withdrawal threshold exceeded",
            Currency::Usd,
            dec!(300),
        );
        account.append_flag(
            "Large transfer threshold exceeded",
            Currency::Inr,
            dec!(30000),
        );

        assert_eq!(account.flags.len(), 2);
        assert_eq!(account.flags[0].currency, Currency::Usd);
        assert_eq!(account.flags[1].currency, Currency::Inr);
        assert_eq!(account.flags[0].kind, FlagKind::SuspiciousActivity);
    }

    #[test]
    fn mark_deleted_sets_timestamp_once() {
        let mut account =
            StoredAccount::new("Ada".into(), "ada@example.com".into(), "credential".into());
        account.mark_deleted();
        let first = account.deleted_at.unwrap();

        account.mark_deleted();
        assert_eq!(account.deleted_at.unwrap(), first);
        assert!(account.is_deleted);
    }

    #[test]
    fn round_trips_through_json() {
        let mut account =
            StoredAccount::new("Ada".into(), "ada@example.com".into(), "credential".into());
        *account.balances.amount_mut(Currency::Usd) += dec!(42.75);
        account.transaction_refs.push("tx-1".into());

        let json = serde_json::to_vec(&account).unwrap();
        let back: StoredAccount = serde_json::from_slice(&json).unwrap();
        assert_eq!(back.account_id, account.account_id);
        assert_eq!(back.balances.usd, dec!(42.75));
        assert_eq!(back.transaction_refs, vec!["tx-1".to_string()]);
    }
}
