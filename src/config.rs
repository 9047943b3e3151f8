//! Ledger configuration.

use crate::domain::account::Role;
use crate::domain::money::Currency;
use crate::error::Result;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Tunables shared by the order and wallet ledgers.
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// How many times a commit is re-attempted after a compare-and-swap conflict.
    pub max_commit_retries: u32,
    /// Currency given to accounts the CLI opens on first use.
    pub default_currency: Currency,
    /// Role given to accounts the CLI opens on first use.
    pub default_role: Role,
    /// Capacity of the broadcast channel carrying ledger events.
    pub event_buffer: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_commit_retries: 8,
            default_currency: Currency::Xof,
            default_role: Role::Supplier,
            event_buffer: 256,
        }
    }
}

impl LedgerConfig {
    /// Reads a JSON config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Reads `path` when given, otherwise falls back to the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}
