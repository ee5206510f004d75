// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Storage Module
//!
//! Persistent storage for accounts and transactions, backed by redb
//! (embedded, pure Rust, ACID).
//!
//! ## Storage Layout
//!
//! One database file holding four tables:
//!
//! ```text
//! accounts          account_id → StoredAccount (JSON)
//! account_emails    email → account_id
//! transactions      tx_id → StoredTransaction (JSON)
//! account_tx_index  account_id|!timestamp|tx_id → "sent" | "received"
//! ```
//!
//! All multi-record writes go through [`LedgerDatabase::run_atomic`]; there
//! is no other write path.

pub mod accounts;
pub mod ledger_db;
pub mod transactions;

pub use accounts::{Flag, FlagKind, StoredAccount};
pub use ledger_db::{LedgerDatabase, LedgerTxn};
pub use transactions::{StoredTransaction, TxKind};
