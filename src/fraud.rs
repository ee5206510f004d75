// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fraud heuristics for balance operations.
//!
//! The policy is a pure function over (operation kind, amount, currency,
//! recent-history count); it performs no I/O of its own. Callers gather the
//! recent-history count inside the same atomic block as the mutation the
//! verdict gates, so the decision can never race a concurrent commit.
//!
//! Thresholds are illustrative limits, not a scoring engine: amounts strictly
//! above the per-currency limit block the operation, and a burst of transfers
//! inside the sliding window draws an advisory that is logged but does not
//! block.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::config::{FraudThresholds, LedgerConfig};
use crate::models::Currency;
use crate::storage::transactions::TxKind;

/// Outcome of evaluating one attempted operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FraudVerdict {
    Allow,
    /// The operation must be rejected and a flag recorded on the initiator.
    Block { reason: String },
    /// The operation proceeds; the reason is surfaced as an advisory signal.
    AllowWithAdvisory { reason: String },
}

/// Configured fraud policy. Cheap to construct and copy around; all limits
/// come from the injected [`LedgerConfig`].
#[derive(Debug, Clone)]
pub struct FraudPolicy {
    thresholds: FraudThresholds,
    velocity_window_secs: i64,
    velocity_advisory_count: usize,
}

impl FraudPolicy {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            thresholds: config.fraud.clone(),
            velocity_window_secs: config.velocity_window_secs,
            velocity_advisory_count: config.velocity_advisory_count,
        }
    }

    /// Start of the velocity window ending at `now`.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::seconds(self.velocity_window_secs)
    }

    /// Evaluate one attempted operation.
    ///
    /// `prior_sent_in_window` is the number of transfers the initiator has
    /// already sent inside the velocity window; it is ignored for every kind
    /// but `Transfer`. The pending operation itself counts toward the
    /// advisory, so the third in-window transfer draws the advisory.
    pub fn evaluate(
        &self,
        kind: TxKind,
        amount: Decimal,
        currency: Currency,
        prior_sent_in_window: usize,
    ) -> FraudVerdict {
        match kind {
            // Deposits are never checked.
            TxKind::Deposit => FraudVerdict::Allow,
            TxKind::Withdraw => {
                if amount > self.thresholds.limit(currency) {
                    FraudVerdict::Block {
                        reason: "Large withdrawal threshold exceeded".to_string(),
                    }
                } else {
                    FraudVerdict::Allow
                }
            }
            TxKind::Transfer => {
                if amount > self.thresholds.limit(currency) {
                    return FraudVerdict::Block {
                        reason: "Large transfer threshold exceeded".to_string(),
                    };
                }
                let including_pending = prior_sent_in_window + 1;
                if including_pending >= self.velocity_advisory_count {
                    FraudVerdict::AllowWithAdvisory {
                        reason: format!(
                            "{including_pending} transfers in the past {} seconds",
                            self.velocity_window_secs
                        ),
                    }
                } else {
                    FraudVerdict::Allow
                }
            }
        }
    }
}
