use super::account::Account;
use super::events::LedgerEvent;
use super::ids::{AccountId, OrderId, ProductId};
use super::money::Currency;
use super::order::Order;
use super::transaction::WalletTransaction;
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Persistence for accounts and their wallet log.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Inserts a new account. Fails with a validation error if the id is taken.
    async fn create(&self, account: Account) -> Result<()>;
    async fn get(&self, account_id: &AccountId) -> Result<Option<Account>>;
    async fn get_all(&self) -> Result<Vec<Account>>;
    /// Writes `account` and appends `entry` as one unit.
    ///
    /// Nothing is written unless the stored account is still at
    /// `expected_version`; a mismatch yields `ConcurrencyConflict`.
    async fn commit_entry(
        &self,
        account: Account,
        expected_version: u64,
        entry: WalletTransaction,
    ) -> Result<()>;
    /// Entries of one account in commit order (oldest first).
    async fn entries(&self, account_id: &AccountId) -> Result<Vec<WalletTransaction>>;
}

/// Persistence for orders and their items.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order) -> Result<()>;
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>>;
    /// Replaces the order if the stored copy is still at `expected_version`.
    async fn update(&self, order: Order, expected_version: u64) -> Result<()>;
    async fn by_buyer(&self, buyer_id: &AccountId) -> Result<Vec<Order>>;
    async fn by_supplier(&self, supplier_id: &AccountId) -> Result<Vec<Order>>;
    async fn all(&self) -> Result<Vec<Order>>;
}

/// What the catalog reports about a product that is currently on sale.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogProduct {
    pub name: String,
    pub price: Decimal,
    pub currency: Currency,
    pub supplier_id: AccountId,
    pub min_order: u32,
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Returns `None` for unknown and for deactivated products alike.
    async fn get_active_product(&self, product_id: &ProductId) -> Result<Option<CatalogProduct>>;
}

#[async_trait]
pub trait CartService: Send + Sync {
    async fn clear_cart_items(
        &self,
        buyer_id: &AccountId,
        product_ids: &[ProductId],
    ) -> Result<()>;
}

/// Fire-and-forget delivery of ledger events.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: LedgerEvent);
}

pub type WalletStoreRef = Arc<dyn WalletStore>;
pub type OrderStoreRef = Arc<dyn OrderStore>;
pub type ProductCatalogRef = Arc<dyn ProductCatalog>;
pub type CartServiceRef = Arc<dyn CartService>;
pub type EventSinkRef = Arc<dyn EventSink>;
