use crate::domain::ids::{AccountId, BoostId};
use crate::domain::transaction::WalletTransactionType;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One wallet operation from a batch file.
///
/// Columns: `type, account, amount, reference`. `reference` is the boost a
/// charge or refund belongs to and may be left empty.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct WalletCommand {
    pub r#type: WalletTransactionType,
    pub account: AccountId,
    pub amount: Decimal,
    pub reference: Option<BoostId>,
}

/// Reads wallet commands from a CSV source.
///
/// Wraps `csv::Reader` and yields `Result<WalletCommand>` lazily, trimming
/// whitespace and tolerating a missing trailing `reference` column.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn commands(self) -> impl Iterator<Item = Result<WalletCommand>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(LedgerError::from))
    }
}
