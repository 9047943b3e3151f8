use super::ids::AccountId;
use super::money::{Amount, Balance, Currency};
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a party as asserted by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    ShopOwner,
    Supplier,
    /// Administrative override; may act on any order.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShopOwner => "shop_owner",
            Self::Supplier => "supplier",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "shop_owner" => Ok(Self::ShopOwner),
            "supplier" => Ok(Self::Supplier),
            "admin" => Ok(Self::Admin),
            other => Err(LedgerError::validation(format!("unknown role {other}"))),
        }
    }
}

/// The caller of a ledger operation, as vouched for by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub account_id: AccountId,
    pub role: Role,
}

impl Actor {
    pub fn new(account_id: impl Into<AccountId>, role: Role) -> Self {
        Self {
            account_id: account_id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A wallet-holding party.
///
/// The balance is only ever changed through [`Account::credit`] and
/// [`Account::debit`], which the wallet ledger pairs with a log entry.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    pub id: AccountId,
    pub role: Role,
    pub wallet_balance: Balance,
    pub currency: Currency,
    /// Bumped on every committed balance change; used for compare-and-swap.
    pub version: u64,
}

impl Account {
    pub fn new(id: AccountId, role: Role, currency: Currency) -> Self {
        Self {
            id,
            role,
            wallet_balance: Balance::ZERO,
            currency,
            version: 0,
        }
    }

    /// Adds funds to the wallet.
    pub fn credit(&mut self, amount: Amount) -> Result<()> {
        self.wallet_balance = self.wallet_balance.checked_add(amount)?;
        self.version += 1;
        Ok(())
    }

    /// Removes funds from the wallet if the balance covers them.
    pub fn debit(&mut self, amount: Amount) -> Result<()> {
        let amount = Balance::from(amount);
        if self.wallet_balance < amount {
            return Err(LedgerError::InsufficientFunds {
                balance: self.wallet_balance.value(),
                requested: amount.value(),
            });
        }
        self.wallet_balance -= amount;
        self.version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn supplier() -> Account {
        Account::new(AccountId::from("s-1"), Role::Supplier, Currency::Xof)
    }

    #[test]
    fn test_account_credit() {
        let mut account = supplier();
        account.credit(Amount::new(dec!(10.0)).unwrap()).unwrap();
        assert_eq!(account.wallet_balance, Balance::new(dec!(10.00)));
        assert_eq!(account.version, 1);
    }

    #[test]
    fn test_account_credit_overflow_leaves_state() {
        let mut account = supplier();
        let huge = Amount::new(rust_decimal::Decimal::MAX / dec!(100)).unwrap();
        account.credit(huge).unwrap();

        let result = account.credit(huge);
        assert!(matches!(result, Err(LedgerError::ValidationError(_))));
        assert_eq!(account.wallet_balance, Balance::from(huge));
        assert_eq!(account.version, 1);
    }

    #[test]
    fn test_account_debit_success() {
        let mut account = supplier();
        account.wallet_balance = Balance::new(dec!(10.00));

        account.debit(Amount::new(dec!(4.0)).unwrap()).unwrap();
        assert_eq!(account.wallet_balance, Balance::new(dec!(6.00)));
        assert_eq!(account.version, 1);
    }

    #[test]
    fn test_account_debit_insufficient() {
        let mut account = supplier();
        account.wallet_balance = Balance::new(dec!(10.00));

        let result = account.debit(Amount::new(dec!(20.0)).unwrap());
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert_eq!(account.wallet_balance, Balance::new(dec!(10.00)));
        assert_eq!(account.version, 0);
    }

    #[test]
    fn test_debit_of_exact_balance_leaves_zero() {
        let mut account = supplier();
        account.wallet_balance = Balance::new(dec!(30.00));
        account.debit(Amount::new(dec!(30)).unwrap()).unwrap();
        assert_eq!(account.wallet_balance, Balance::ZERO);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(
            serde_json::to_string(&Role::ShopOwner).unwrap(),
            "\"shop_owner\""
        );
        assert_eq!("supplier".parse::<Role>().unwrap(), Role::Supplier);
        assert!("buyer".parse::<Role>().is_err());
    }
}
