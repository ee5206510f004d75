// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read-only reporting projections.
//!
//! Administrative aggregations over the account set. These consume only the
//! store's read contract and carry no mutation capability; soft-deleted
//! accounts are excluded everywhere. The balance ranking converts INR at a
//! fixed display rate — it is a presentation aid, not an FX engine.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::LedgerConfig;
use crate::error::LedgerResult;
use crate::models::{Balances, Currency};
use crate::storage::accounts::Flag;
use crate::storage::ledger_db::LedgerDatabase;

/// A non-deleted account carrying at least one fraud flag.
#[derive(Debug, Clone, Serialize)]
pub struct FlaggedAccount {
    pub email: String,
    pub flags: Vec<Flag>,
}

/// One row of the balance ranking.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceRanking {
    pub email: String,
    /// USD balance plus INR converted at the configured display rate.
    pub total_in_usd: Decimal,
}

/// One row of the transaction-volume ranking.
#[derive(Debug, Clone, Serialize)]
pub struct VolumeRanking {
    pub email: String,
    /// Number of transactions the account has been involved in, counting
    /// references to since-soft-deleted records.
    pub transaction_count: usize,
}

/// Accounts with a non-empty flag sequence.
pub fn flagged_accounts(db: &LedgerDatabase) -> LedgerResult<Vec<FlaggedAccount>> {
    let accounts = db.list_all_accounts(true)?;
    Ok(accounts
        .into_iter()
        .filter(|account| !account.flags.is_empty())
        .map(|account| FlaggedAccount {
            email: account.email,
            flags: account.flags,
        })
        .collect())
}

/// Per-currency balance totals across all live accounts.
pub fn total_balances(db: &LedgerDatabase) -> LedgerResult<Balances> {
    let accounts = db.list_all_accounts(true)?;
    let mut totals = Balances::zero();
    for account in &accounts {
        for currency in Currency::ALL {
            *totals.amount_mut(currency) += account.balances.amount(currency);
        }
    }
    Ok(totals)
}

/// Top `n` live accounts by combined balance, INR converted to USD at the
/// configured display rate.
pub fn top_by_balance(
    db: &LedgerDatabase,
    config: &LedgerConfig,
    n: usize,
) -> LedgerResult<Vec<BalanceRanking>> {
    let accounts = db.list_all_accounts(true)?;
    let mut rankings: Vec<BalanceRanking> = accounts
        .into_iter()
        .map(|account| BalanceRanking {
            total_in_usd: account.balances.usd + account.balances.inr / config.inr_per_usd,
            email: account.email,
        })
        .collect();
    rankings.sort_by(|a, b| b.total_in_usd.cmp(&a.total_in_usd));
    rankings.truncate(n);
    Ok(rankings)
}

/// Top `n` live accounts by number of transaction involvements.
pub fn top_by_volume(db: &LedgerDatabase, n: usize) -> LedgerResult<Vec<VolumeRanking>> {
    let accounts = db.list_all_accounts(true)?;
    let mut rankings: Vec<VolumeRanking> = accounts
        .into_iter()
        .map(|account| VolumeRanking {
            transaction_count: account.transaction_refs.len(),
            email: account.email,
        })
        .collect();
    rankings.sort_by(|a, b| b.transaction_count.cmp(&a.transaction_count));
    rankings.truncate(n);
    Ok(rankings)
}
