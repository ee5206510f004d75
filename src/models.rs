// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Domain Value Types
//!
//! Value types shared across the ledger: the closed [`Currency`] set, the
//! per-account [`Balances`] pair, and the caller-facing [`TransactionView`]
//! projection returned by history queries.
//!
//! Stored records (accounts, transactions) live in [`crate::storage`]; the
//! types here are the shapes that cross the crate boundary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::storage::transactions::TxKind;

// =============================================================================
// Currency
// =============================================================================

/// The closed set of supported currencies.
///
/// Parsing an arbitrary code goes through [`std::str::FromStr`], which is
/// where `InvalidCurrency` originates — engine APIs only ever see a valid
/// member of this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Inr,
}

impl Currency {
    /// All supported currencies, for iteration in aggregate queries.
    pub const ALL: [Currency; 2] = [Currency::Usd, Currency::Inr];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Inr => "INR",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Currency::Usd),
            "INR" => Ok(Currency::Inr),
            other => Err(LedgerError::InvalidCurrency(other.to_string())),
        }
    }
}

// =============================================================================
// Balances
// =============================================================================

/// Per-currency balances of one account. Starts at zero in every currency.
///
/// Serialized field names match the currency codes, so a balances object
/// reads `{"USD": "12.50", "INR": "0"}` on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    #[serde(rename = "USD")]
    pub usd: Decimal,
    #[serde(rename = "INR")]
    pub inr: Decimal,
}

impl Balances {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn amount(&self, currency: Currency) -> Decimal {
        match currency {
            Currency::Usd => self.usd,
            Currency::Inr => self.inr,
        }
    }

    pub fn amount_mut(&mut self, currency: Currency) -> &mut Decimal {
        match currency {
            Currency::Usd => &mut self.usd,
            Currency::Inr => &mut self.inr,
        }
    }
}

// =============================================================================
// Transaction View
// =============================================================================

/// One row of an account's transaction history.
///
/// Counterparty account ids are resolved to emails at query time; a side is
/// `None` when the transaction has no account on that side (deposits have no
/// sender, withdrawals no recipient) or when the referenced account has since
/// been purged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionView {
    /// Transaction id.
    pub tx_id: String,
    /// Operation kind.
    pub kind: TxKind,
    pub amount: Decimal,
    pub currency: Currency,
    /// Sender email, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_email: Option<String>,
    /// Recipient email, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_email: Option<String>,
    /// When the transaction was created.
    pub date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn currency_parses_exact_codes_only() {
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::Usd);
        assert_eq!("INR".parse::<Currency>().unwrap(), Currency::Inr);

        for bad in ["usd", "EUR", "", "US D"] {
            let err = bad.parse::<Currency>().unwrap_err();
            assert!(matches!(err, LedgerError::InvalidCurrency(_)));
        }
    }

    #[test]
    fn balances_start_at_zero_and_index_by_currency() {
        let mut balances = Balances::zero();
        assert_eq!(balances.amount(Currency::Usd), Decimal::ZERO);
        assert_eq!(balances.amount(Currency::Inr), Decimal::ZERO);

        *balances.amount_mut(Currency::Usd) += dec!(12.50);
        assert_eq!(balances.usd, dec!(12.50));
        assert_eq!(balances.inr, Decimal::ZERO);
    }

    #[test]
    fn balances_serialize_under_currency_codes() {
        let mut balances = Balances::zero();
        balances.usd = dec!(100);
        let json = serde_json::to_value(&balances).unwrap();
        assert!(json.get("USD").is_some());
        assert!(json.get("INR").is_some());
    }
}
