// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted transaction records.
//!
//! A transaction is created atomically with the balance mutation it
//! represents and is never mutated afterwards, except for the independent
//! `is_deleted` soft-delete marker. Accounts reference transactions; they
//! never own them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Currency;

/// Operation kind of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Deposit,
    Withdraw,
    Transfer,
}

/// Stored transaction record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTransaction {
    /// Unique transaction identifier (UUID).
    pub tx_id: String,
    pub kind: TxKind,
    /// Positive amount moved.
    pub amount: Decimal,
    pub currency: Currency,
    /// Sender account id. Deposits have none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Recipient account id. Withdrawals have none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Creation timestamp, immutable.
    pub date: DateTime<Utc>,
    /// Soft-delete marker. Does not touch the owning accounts.
    pub is_deleted: bool,
}

impl StoredTransaction {
    fn new(
        kind: TxKind,
        amount: Decimal,
        currency: Currency,
        from: Option<String>,
        to: Option<String>,
    ) -> Self {
        Self {
            tx_id: uuid::Uuid::new_v4().to_string(),
            kind,
            amount,
            currency,
            from,
            to,
            date: Utc::now(),
            is_deleted: false,
        }
    }

    pub fn deposit(amount: Decimal, currency: Currency, to: String) -> Self {
        Self::new(TxKind::Deposit, amount, currency, None, Some(to))
    }

    pub fn withdraw(amount: Decimal, currency: Currency, from: String) -> Self {
        Self::new(TxKind::Withdraw, amount, currency, Some(from), None)
    }

    pub fn transfer(amount: Decimal, currency: Currency, from: String, to: String) -> Self {
        Self::new(TxKind::Transfer, amount, currency, Some(from), Some(to))
    }

    /// Whether this transaction references the given account on either side.
    pub fn references(&self, account_id: &str) -> bool {
        self.from.as_deref() == Some(account_id) || self.to.as_deref() == Some(account_id)
    }

    /// Account ids involved in this transaction, deduplicated for
    /// self-transfers.
    pub fn parties(&self) -> Vec<&str> {
        let mut parties = Vec::with_capacity(2);
        if let Some(from) = self.from.as_deref() {
            parties.push(from);
        }
        if let Some(to) = self.to.as_deref() {
            if Some(to) != self.from.as_deref() {
                parties.push(to);
            }
        }
        parties
    }
}
