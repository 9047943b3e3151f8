use crate::domain::account::{Account, Role};
use crate::domain::ids::AccountId;
use crate::domain::money::{Currency, MONEY_SCALE};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// Final state of one account as printed by the CLI.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct AccountSummary {
    pub account: AccountId,
    pub role: Role,
    pub balance: Decimal,
    pub currency: Currency,
    pub transactions: usize,
}

impl AccountSummary {
    pub fn new(account: &Account, transactions: usize) -> Self {
        let mut balance = account.wallet_balance.value();
        balance.rescale(MONEY_SCALE);
        Self {
            account: account.id.clone(),
            role: account.role,
            balance,
            currency: account.currency,
            transactions,
        }
    }
}

/// Writes account summaries as CSV with a header row.
pub struct BalanceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BalanceWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_summaries(
        &mut self,
        summaries: impl IntoIterator<Item = AccountSummary>,
    ) -> Result<()> {
        for summary in summaries {
            self.writer.serialize(summary)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Balance;
    use rust_decimal_macros::dec;

    #[test]
    fn test_writes_header_and_rows() {
        let mut account =
            Account::new(AccountId::from("supplier-1"), Role::Supplier, Currency::Xof);
        account.wallet_balance = Balance::new(dec!(7000.00));

        let mut out = Vec::new();
        BalanceWriter::new(&mut out)
            .write_summaries([AccountSummary::new(&account, 2)])
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "account,role,balance,currency,transactions\nsupplier-1,supplier,7000.00,XOF,2\n"
        );
    }

    #[test]
    fn test_untouched_wallet_prints_two_places() {
        let account = Account::new(AccountId::from("shop-1"), Role::ShopOwner, Currency::Ghs);
        assert_eq!(AccountSummary::new(&account, 0).balance.to_string(), "0.00");
    }
}
