// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger error types.
//!
//! Every fallible operation in this crate returns [`LedgerResult`]. Domain
//! failures (validation, existence/state, business rule) and storage-layer
//! failures share one enum so callers match on a single type.
//!
//! Only [`LedgerError::Aborted`] is transient: the whole atomic operation may
//! be retried because no partial state was committed. Everything else is
//! terminal for the request.

use rust_decimal::Decimal;

use crate::models::Currency;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    // -------------------------------------------------------------------------
    // Validation (rejected before any store access)
    // -------------------------------------------------------------------------
    #[error("unsupported currency: {0}")]
    InvalidCurrency(String),

    #[error("amount must be a positive number")]
    InvalidAmount,

    // -------------------------------------------------------------------------
    // Existence / state
    // -------------------------------------------------------------------------
    #[error("not found: {0}")]
    NotFound(String),

    #[error("account is deleted, action not allowed: {0}")]
    AccountFrozen(String),

    #[error("an account with this email already exists")]
    DuplicateEmail,

    // -------------------------------------------------------------------------
    // Business rule
    // -------------------------------------------------------------------------
    #[error("insufficient {currency} balance: requested {requested}, available {available}")]
    InsufficientBalance {
        currency: Currency,
        requested: Decimal,
        available: Decimal,
    },

    /// The operation was blocked by a fraud heuristic. The flag recording the
    /// attempt has already been committed to the initiating account.
    #[error("operation flagged and blocked: {reason}")]
    FlaggedAndBlocked { reason: String },

    // -------------------------------------------------------------------------
    // Concurrency (transient, safe to retry the whole operation)
    // -------------------------------------------------------------------------
    #[error("atomic block aborted: {0}")]
    Aborted(#[from] redb::CommitError),

    // -------------------------------------------------------------------------
    // Storage
    // -------------------------------------------------------------------------
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl LedgerError {
    /// Whether the whole operation may be retried (no partial state was
    /// committed).
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Aborted(_))
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
