use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// Number of fractional digits carried by every monetary value.
pub const MONEY_SCALE: u32 = 2;

/// Brings `value` to exactly [`MONEY_SCALE`] fractional digits.
///
/// Values that would lose precision (e.g. `1.005`) are rejected rather than rounded,
/// as are values too large to carry [`MONEY_SCALE`] digits at all.
pub fn to_money_scale(value: Decimal) -> Result<Decimal> {
    let mut scaled = value.normalize();
    if scaled.scale() > MONEY_SCALE {
        return Err(LedgerError::validation(format!(
            "{value} has more than {MONEY_SCALE} fractional digits"
        )));
    }
    scaled.rescale(MONEY_SCALE);
    if scaled.scale() != MONEY_SCALE {
        return Err(LedgerError::validation(format!(
            "{value} is too large to be held as money"
        )));
    }
    Ok(scaled)
}

/// Currencies accepted by the marketplace. No conversion is ever performed between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Xof,
    Xaf,
    Ngn,
    Ghs,
    Kes,
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xof => "XOF",
            Self::Xaf => "XAF",
            Self::Ngn => "NGN",
            Self::Ghs => "GHS",
            Self::Kes => "KES",
            Self::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "XOF" => Ok(Self::Xof),
            "XAF" => Ok(Self::Xaf),
            "NGN" => Ok(Self::Ngn),
            "GHS" => Ok(Self::Ghs),
            "KES" => Ok(Self::Kes),
            "USD" => Ok(Self::Usd),
            other => Err(LedgerError::validation(format!(
                "unsupported currency {other}"
            ))),
        }
    }
}

/// An amount tagged with its currency, as handed to the wallet ledger by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl Money {
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

/// A wallet balance in the account's currency.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

/// A strictly positive monetary amount at [`MONEY_SCALE`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(LedgerError::validation("Amount must be positive"));
        }
        Ok(Self(to_money_scale(value)?))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Adds `amount`, failing when the sum no longer fits at [`MONEY_SCALE`].
    pub fn checked_add(self, amount: Amount) -> Result<Self> {
        self.0
            .checked_add(amount.value())
            .filter(|sum| sum.scale() >= MONEY_SCALE)
            .map(Self)
            .ok_or_else(|| {
                LedgerError::validation(format!(
                    "balance {self} cannot grow by {}",
                    amount.value()
                ))
            })
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Balance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Balance {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Balance {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}
