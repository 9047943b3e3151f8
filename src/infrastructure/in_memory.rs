use crate::domain::account::Account;
use crate::domain::ids::{AccountId, OrderId, ProductId};
use crate::domain::order::Order;
use crate::domain::ports::{CartService, CatalogProduct, OrderStore, ProductCatalog, WalletStore};
use crate::domain::transaction::WalletTransaction;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct WalletState {
    accounts: HashMap<AccountId, Account>,
    entries: HashMap<AccountId, Vec<WalletTransaction>>,
}

/// A thread-safe in-memory store for accounts and their wallet log.
///
/// Accounts and entries live behind one lock so a commit is all-or-nothing.
#[derive(Default, Clone)]
pub struct InMemoryWalletStore {
    state: Arc<RwLock<WalletState>>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn create(&self, account: Account) -> Result<()> {
        let mut state = self.state.write().await;
        if state.accounts.contains_key(&account.id) {
            return Err(LedgerError::validation(format!(
                "account {} already exists",
                account.id
            )));
        }
        state.accounts.insert(account.id.clone(), account);
        Ok(())
    }

    async fn get(&self, account_id: &AccountId) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.get(account_id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Account>> {
        let state = self.state.read().await;
        let mut accounts: Vec<Account> = state.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(accounts)
    }

    async fn commit_entry(
        &self,
        account: Account,
        expected_version: u64,
        entry: WalletTransaction,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let current = state
            .accounts
            .get(&account.id)
            .ok_or_else(|| LedgerError::not_found("account", &account.id))?;
        if current.version != expected_version {
            return Err(LedgerError::ConcurrencyConflict(account.id.to_string()));
        }
        state
            .entries
            .entry(account.id.clone())
            .or_default()
            .push(entry);
        state.accounts.insert(account.id.clone(), account);
        Ok(())
    }

    async fn entries(&self, account_id: &AccountId) -> Result<Vec<WalletTransaction>> {
        let state = self.state.read().await;
        Ok(state.entries.get(account_id).cloned().unwrap_or_default())
    }
}

/// A thread-safe in-memory store for orders.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn filtered(&self, keep: impl Fn(&Order) -> bool) -> Vec<Order> {
        let orders = self.orders.read().await;
        orders.values().filter(|o| keep(*o)).cloned().collect()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(LedgerError::validation(format!(
                "order {} already exists",
                order.id
            )));
        }
        orders.insert(order.id, order);
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&order_id).cloned())
    }

    async fn update(&self, order: Order, expected_version: u64) -> Result<()> {
        let mut orders = self.orders.write().await;
        let current = orders
            .get(&order.id)
            .ok_or_else(|| LedgerError::not_found("order", order.id))?;
        if current.version != expected_version {
            return Err(LedgerError::ConcurrencyConflict(order.id.to_string()));
        }
        orders.insert(order.id, order);
        Ok(())
    }

    async fn by_buyer(&self, buyer_id: &AccountId) -> Result<Vec<Order>> {
        Ok(self.filtered(|o| &o.buyer_id == buyer_id).await)
    }

    async fn by_supplier(&self, supplier_id: &AccountId) -> Result<Vec<Order>> {
        Ok(self.filtered(|o| &o.supplier_id == supplier_id).await)
    }

    async fn all(&self) -> Result<Vec<Order>> {
        Ok(self.filtered(|_| true).await)
    }
}

/// An in-memory product catalog for tests and local runs.
#[derive(Default, Clone)]
pub struct InMemoryCatalog {
    products: Arc<RwLock<HashMap<ProductId, (CatalogProduct, bool)>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an active product.
    pub async fn put(&self, product_id: impl Into<ProductId>, product: CatalogProduct) {
        let mut products = self.products.write().await;
        products.insert(product_id.into(), (product, true));
    }

    pub async fn deactivate(&self, product_id: impl Into<ProductId>) {
        let mut products = self.products.write().await;
        if let Some((_, active)) = products.get_mut(&product_id.into()) {
            *active = false;
        }
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn get_active_product(&self, product_id: &ProductId) -> Result<Option<CatalogProduct>> {
        let products = self.products.read().await;
        Ok(products
            .get(product_id)
            .filter(|(_, active)| *active)
            .map(|(product, _)| product.clone()))
    }
}

/// An in-memory cart keyed by buyer.
#[derive(Default, Clone)]
pub struct InMemoryCart {
    carts: Arc<RwLock<HashMap<AccountId, HashSet<ProductId>>>>,
}

impl InMemoryCart {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, buyer_id: &AccountId, product_id: ProductId) {
        let mut carts = self.carts.write().await;
        carts.entry(buyer_id.clone()).or_default().insert(product_id);
    }

    pub async fn items(&self, buyer_id: &AccountId) -> Vec<ProductId> {
        let carts = self.carts.read().await;
        let mut items: Vec<ProductId> = carts
            .get(buyer_id)
            .map(|cart| cart.iter().cloned().collect())
            .unwrap_or_default();
        items.sort();
        items
    }
}

#[async_trait]
impl CartService for InMemoryCart {
    async fn clear_cart_items(
        &self,
        buyer_id: &AccountId,
        product_ids: &[ProductId],
    ) -> Result<()> {
        let mut carts = self.carts.write().await;
        if let Some(cart) = carts.get_mut(buyer_id) {
            for product_id in product_ids {
                cart.remove(product_id);
            }
        }
        Ok(())
    }
}
