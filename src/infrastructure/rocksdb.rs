use crate::domain::account::Account;
use crate::domain::ids::{AccountId, OrderId};
use crate::domain::order::Order;
use crate::domain::ports::{OrderStore, WalletStore};
use crate::domain::transaction::WalletTransaction;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing account states.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family for the wallet log, keyed by account id and sequence.
pub const CF_WALLET_ENTRIES: &str = "wallet_entries";
/// Column Family for orders and their items.
pub const CF_ORDERS: &str = "orders";

/// A persistent store implementation using RocksDB.
///
/// Accounts, wallet entries and orders live in separate Column Families.
/// Compare-and-swap commits are serialized by an in-process lock and written
/// with a single `WriteBatch`, so an account update and its log entry land
/// together or not at all.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    commit_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_ACCOUNTS, CF_WALLET_ENTRIES, CF_ORDERS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, families)?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            LedgerError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn read<T: DeserializeOwned>(&self, family: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(family)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, family: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(family)?;
        self.db.put_cf(cf, key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    /// Decodes every value whose key starts with `prefix`, in key order.
    fn scan<T: DeserializeOwned>(&self, family: &str, prefix: &[u8]) -> Result<Vec<T>> {
        let cf = self.cf(family)?;
        let mut values = Vec::new();
        for item in self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }
}

fn account_key(account_id: &AccountId) -> Vec<u8> {
    account_id.as_str().as_bytes().to_vec()
}

/// `<id length as u32 BE> <account id> <zero-padded sequence>` keeps one account's log
/// contiguous and ordered. The length prefix stops one id from being a key prefix of another.
fn entry_prefix(account_id: &AccountId) -> Vec<u8> {
    let id = account_id.as_str().as_bytes();
    let mut key = Vec::with_capacity(4 + id.len() + 20);
    key.extend_from_slice(&(id.len() as u32).to_be_bytes());
    key.extend_from_slice(id);
    key
}

fn entry_key(entry: &WalletTransaction) -> Vec<u8> {
    let mut key = entry_prefix(&entry.account_id);
    key.extend_from_slice(format!("{:020}", entry.sequence).as_bytes());
    key
}

#[async_trait]
impl WalletStore for RocksDBStore {
    async fn create(&self, account: Account) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        let key = account_key(&account.id);
        if self.read::<Account>(CF_ACCOUNTS, &key)?.is_some() {
            return Err(LedgerError::validation(format!(
                "account {} already exists",
                account.id
            )));
        }
        self.write(CF_ACCOUNTS, &key, &account)
    }

    async fn get(&self, account_id: &AccountId) -> Result<Option<Account>> {
        self.read(CF_ACCOUNTS, &account_key(account_id))
    }

    async fn get_all(&self) -> Result<Vec<Account>> {
        self.scan(CF_ACCOUNTS, &[])
    }

    async fn commit_entry(
        &self,
        account: Account,
        expected_version: u64,
        entry: WalletTransaction,
    ) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        let key = account_key(&account.id);
        let current: Account = self
            .read(CF_ACCOUNTS, &key)?
            .ok_or_else(|| LedgerError::not_found("account", &account.id))?;
        if current.version != expected_version {
            return Err(LedgerError::ConcurrencyConflict(account.id.to_string()));
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_ACCOUNTS)?, key, serde_json::to_vec(&account)?);
        batch.put_cf(
            self.cf(CF_WALLET_ENTRIES)?,
            entry_key(&entry),
            serde_json::to_vec(&entry)?,
        );
        self.db.write(batch)?;
        Ok(())
    }

    async fn entries(&self, account_id: &AccountId) -> Result<Vec<WalletTransaction>> {
        self.scan(CF_WALLET_ENTRIES, &entry_prefix(account_id))
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn insert(&self, order: Order) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        if self
            .read::<Order>(CF_ORDERS, order.id.as_bytes())?
            .is_some()
        {
            return Err(LedgerError::validation(format!(
                "order {} already exists",
                order.id
            )));
        }
        self.write(CF_ORDERS, order.id.as_bytes(), &order)
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        self.read(CF_ORDERS, order_id.as_bytes())
    }

    async fn update(&self, order: Order, expected_version: u64) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        let current: Order = self
            .read(CF_ORDERS, order.id.as_bytes())?
            .ok_or_else(|| LedgerError::not_found("order", order.id))?;
        if current.version != expected_version {
            return Err(LedgerError::ConcurrencyConflict(order.id.to_string()));
        }
        self.write(CF_ORDERS, order.id.as_bytes(), &order)
    }

    async fn by_buyer(&self, buyer_id: &AccountId) -> Result<Vec<Order>> {
        let orders: Vec<Order> = self.scan(CF_ORDERS, &[])?;
        Ok(orders
            .into_iter()
            .filter(|o| &o.buyer_id == buyer_id)
            .collect())
    }

    async fn by_supplier(&self, supplier_id: &AccountId) -> Result<Vec<Order>> {
        let orders: Vec<Order> = self.scan(CF_ORDERS, &[])?;
        Ok(orders
            .into_iter()
            .filter(|o| &o.supplier_id == supplier_id)
            .collect())
    }

    async fn all(&self) -> Result<Vec<Order>> {
        self.scan(CF_ORDERS, &[])
    }
}
