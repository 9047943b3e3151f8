use super::ids::{AccountId, BoostId, TransactionId};
use super::money::Currency;
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WalletTransactionType {
    Topup,
    BoostCharge,
    Refund,
}

impl WalletTransactionType {
    /// Credits add to the balance; everything else is a debit.
    pub fn is_credit(&self) -> bool {
        matches!(self, Self::Topup | Self::Refund)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Topup => "topup",
            Self::BoostCharge => "boost_charge",
            Self::Refund => "refund",
        }
    }
}

impl fmt::Display for WalletTransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WalletTransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "topup" => Ok(Self::Topup),
            "boost_charge" => Ok(Self::BoostCharge),
            "refund" => Ok(Self::Refund),
            other => Err(LedgerError::validation(format!(
                "unknown wallet transaction type {other}"
            ))),
        }
    }
}

/// An immutable wallet ledger entry.
///
/// `amount` is signed: positive for top-ups and refunds, negative for boost charges.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct WalletTransaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub r#type: WalletTransactionType,
    pub amount: Decimal,
    pub currency: Currency,
    pub description: String,
    pub boost_id: Option<BoostId>,
    pub created_at: DateTime<Utc>,
    /// Position of the entry in the account's log, equal to the account version it produced.
    pub sequence: u64,
}
