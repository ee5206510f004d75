// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custodia Ledger - Custodial Wallet Ledger & Transaction Integrity Engine
//!
//! This crate keeps per-account balances, an immutable transaction log, and
//! fraud flags consistent under concurrent access. Transport, token
//! issuance, and credential hashing are external collaborators: callers
//! arrive with a verified `(account_id, email)` identity and receive typed
//! results.
//!
//! ## Modules
//!
//! - `engine` - Deposit/withdraw/transfer as atomic transitions
//! - `lifecycle` - Registration, soft delete, lazy retention purge
//! - `fraud` - Threshold and velocity heuristics
//! - `reports` - Read-only admin aggregations
//! - `storage` - Embedded ledger database (redb)

pub mod config;
pub mod engine;
pub mod error;
pub mod fraud;
pub mod lifecycle;
pub mod models;
pub mod reports;
pub mod storage;
