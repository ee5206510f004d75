// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Thresholds and windows used by the fraud evaluator and the account
//! lifecycle manager. Everything is injected at construction so tests can
//! vary the limits; [`LedgerConfig::default`] carries the production values.
//!
//! ## Defaults
//!
//! | Setting | Description | Default |
//! |---------|-------------|---------|
//! | `fraud.usd` | Withdrawal/transfer block threshold in USD | `250` |
//! | `fraud.inr` | Withdrawal/transfer block threshold in INR | `25000` |
//! | `velocity_window_secs` | Sliding window for the transfer-velocity advisory | `60` |
//! | `velocity_advisory_count` | In-window transfer count that draws an advisory | `3` |
//! | `retention_days` | Soft-delete retention before a login purges the account | `90` |
//! | `inr_per_usd` | Fixed INR→USD display conversion rate for rankings | `85` |

use rust_decimal::Decimal;

use crate::models::Currency;

/// Environment variable name for the ledger data directory path.
///
/// Deployments derive the database file location from this directory.
///
/// # Default
/// `/data`
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Per-currency amount thresholds above which a withdrawal or transfer is
/// blocked and flagged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FraudThresholds {
    pub usd: Decimal,
    pub inr: Decimal,
}

impl FraudThresholds {
    pub fn limit(&self, currency: Currency) -> Decimal {
        match currency {
            Currency::Usd => self.usd,
            Currency::Inr => self.inr,
        }
    }
}

impl Default for FraudThresholds {
    fn default() -> Self {
        Self {
            usd: Decimal::from(250),
            inr: Decimal::from(25_000),
        }
    }
}

/// Ledger-wide configuration, injected into the engine, fraud policy, and
/// lifecycle manager.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Block thresholds for withdrawals and transfers.
    pub fraud: FraudThresholds,
    /// Sliding-window length for the transfer-velocity advisory, in seconds.
    pub velocity_window_secs: i64,
    /// Number of in-window transfers (including the pending one) that draws
    /// an advisory.
    pub velocity_advisory_count: usize,
    /// Days a soft-deleted account is retained before a login attempt
    /// permanently purges it.
    pub retention_days: i64,
    /// Fixed INR→USD rate used only for display-side balance rankings.
    pub inr_per_usd: Decimal,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            fraud: FraudThresholds::default(),
            velocity_window_secs: 60,
            velocity_advisory_count: 3,
            retention_days: 90,
            inr_per_usd: Decimal::from(85),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_match_production_constants() {
        let config = LedgerConfig::default();
        assert_eq!(config.fraud.limit(Currency::Usd), Decimal::from(250));
        assert_eq!(config.fraud.limit(Currency::Inr), Decimal::from(25_000));
        assert_eq!(config.velocity_window_secs, 60);
        assert_eq!(config.velocity_advisory_count, 3);
        assert_eq!(config.retention_days, 90);
        assert_eq!(config.inr_per_usd, Decimal::from(85));
    }
}
