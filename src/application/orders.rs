use super::locks::KeyedLocks;
use super::wallet::{WalletLedger, WalletReceipt};
use crate::config::LedgerConfig;
use crate::domain::account::{Actor, Role};
use crate::domain::events::LedgerEvent;
use crate::domain::ids::{AccountId, BoostId, OrderId, ProductId};
use crate::domain::money::{Currency, Money};
use crate::domain::order::{CartLine, NewOrder, Order, OrderItem, OrderStatus};
use crate::domain::ports::{CartServiceRef, EventSinkRef, OrderStoreRef, ProductCatalogRef};
use crate::domain::transaction::WalletTransactionType;
use crate::error::{LedgerError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Figures shown on a supplier's dashboard.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SupplierOrderStats {
    pub orders_by_status: BTreeMap<OrderStatus, usize>,
    /// Sum of `total_amount` over delivered orders.
    pub delivered_revenue: Decimal,
}

/// External collaborators of the order ledger.
pub struct OrderLedgerPorts {
    pub orders: OrderStoreRef,
    pub catalog: ProductCatalogRef,
    pub cart: CartServiceRef,
    pub events: EventSinkRef,
}

/// Creates orders from cart snapshots and drives them through their lifecycle.
pub struct OrderLedger {
    orders: OrderStoreRef,
    catalog: ProductCatalogRef,
    cart: CartServiceRef,
    events: EventSinkRef,
    wallet: Arc<WalletLedger>,
    locks: KeyedLocks<OrderId>,
    max_retries: u32,
}

impl OrderLedger {
    pub fn new(ports: OrderLedgerPorts, wallet: Arc<WalletLedger>, config: &LedgerConfig) -> Self {
        Self {
            orders: ports.orders,
            catalog: ports.catalog,
            cart: ports.cart,
            events: ports.events,
            wallet,
            locks: KeyedLocks::new(),
            max_retries: config.max_commit_retries,
        }
    }

    /// Checks out the buyer's cart lines for one supplier.
    ///
    /// Product names and prices are copied into the order so later catalog
    /// edits never rewrite it. The ordered products are then cleared from the
    /// buyer's cart.
    pub async fn create_order(&self, request: NewOrder) -> Result<Order> {
        if request.items.is_empty() {
            return Err(LedgerError::validation(
                "cannot place an order from an empty cart",
            ));
        }
        request.delivery.validate()?;

        let lines = merge_lines(&request.items)?;
        let mut items = Vec::with_capacity(lines.len());
        let mut currency: Option<Currency> = None;
        for line in &lines {
            let product = self
                .catalog
                .get_active_product(&line.product_id)
                .await?
                .ok_or_else(|| {
                    LedgerError::validation(format!(
                        "product {} is not available",
                        line.product_id
                    ))
                })?;

            if product.supplier_id != request.supplier_id {
                return Err(LedgerError::validation(format!(
                    "product {} is not sold by supplier {}",
                    line.product_id, request.supplier_id
                )));
            }
            let minimum = product.min_order.max(1);
            if line.quantity < minimum {
                return Err(LedgerError::validation(format!(
                    "quantity {} of product {} is below the minimum order of {minimum}",
                    line.quantity, line.product_id
                )));
            }
            match currency {
                None => currency = Some(product.currency),
                Some(c) if c != product.currency => {
                    return Err(LedgerError::validation(format!(
                        "product {} is priced in {}, the order is in {c}",
                        line.product_id, product.currency
                    )));
                }
                Some(_) => {}
            }

            items.push(OrderItem::new(
                line.product_id.clone(),
                product.name,
                line.quantity,
                product.price,
            )?);
        }
        let Some(currency) = currency else {
            return Err(LedgerError::validation("order has no priced items"));
        };

        let product_ids: Vec<ProductId> =
            lines.into_iter().map(|line| line.product_id).collect();
        let order = Order::place(request, items, currency, Utc::now())?;
        self.orders.insert(order.clone()).await?;
        debug!(
            order_id = %order.id,
            buyer_id = %order.buyer_id,
            supplier_id = %order.supplier_id,
            total = %order.total_amount,
            "order placed"
        );

        self.events.publish(LedgerEvent::OrderPlaced {
            order_id: order.id,
            buyer_id: order.buyer_id.clone(),
            supplier_id: order.supplier_id.clone(),
            total_amount: order.total_amount,
            currency: order.currency,
        });

        // The order is committed at this point; a stale cart is not worth failing it for.
        if let Err(e) = self.cart.clear_cart_items(&order.buyer_id, &product_ids).await {
            warn!(order_id = %order.id, error = %e, "failed to clear ordered items from cart");
        }

        Ok(order)
    }

    /// Moves an order to `new_status` on behalf of its supplier or an admin.
    pub async fn transition_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
        actor: &Actor,
    ) -> Result<Order> {
        let _guard = self.locks.lock(&order_id).await;

        let mut attempt = 0;
        loop {
            let mut order = self.load(order_id).await?;
            if !order.can_be_managed_by(actor) {
                return Err(LedgerError::Forbidden {
                    account_id: actor.account_id.clone(),
                });
            }

            let expected_version = order.version;
            let from = order.transition(new_status, Utc::now())?;

            match self.orders.update(order.clone(), expected_version).await {
                Ok(()) => {
                    debug!(
                        %order_id,
                        %from,
                        to = %new_status,
                        actor = %actor.account_id,
                        "order status changed"
                    );
                    self.events.publish(LedgerEvent::OrderStatusChanged {
                        order_id,
                        from,
                        to: new_status,
                        changed_by: actor.account_id.clone(),
                        changed_at: order.updated_at,
                    });
                    return Ok(order);
                }
                Err(LedgerError::ConcurrencyConflict(_)) if attempt < self.max_retries => {
                    attempt += 1;
                    debug!(%order_id, attempt, "order commit conflicted, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Orders the account takes part in, newest first.
    ///
    /// Shop owners see what they bought, suppliers what they sell, admins everything.
    pub async fn list_orders(&self, account_id: &AccountId, role: Role) -> Result<Vec<Order>> {
        let mut orders = match role {
            Role::ShopOwner => self.orders.by_buyer(account_id).await?,
            Role::Supplier => self.orders.by_supplier(account_id).await?,
            Role::Admin => self.orders.all().await?,
        };
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(orders)
    }

    pub async fn get_order(&self, order_id: OrderId, actor: &Actor) -> Result<Order> {
        let order = self.load(order_id).await?;
        if !order.is_visible_to(actor) {
            return Err(LedgerError::Forbidden {
                account_id: actor.account_id.clone(),
            });
        }
        Ok(order)
    }

    pub async fn supplier_stats(&self, supplier_id: &AccountId) -> Result<SupplierOrderStats> {
        let orders = self.orders.by_supplier(supplier_id).await?;
        let mut stats = SupplierOrderStats::default();
        for order in &orders {
            *stats.orders_by_status.entry(order.status).or_default() += 1;
            if order.status == OrderStatus::Delivered {
                stats.delivered_revenue = stats
                    .delivered_revenue
                    .checked_add(order.total_amount)
                    .ok_or_else(|| {
                        LedgerError::validation(format!(
                            "delivered revenue of supplier {supplier_id} overflows"
                        ))
                    })?;
            }
        }
        Ok(stats)
    }

    /// Pays for a boost placement out of the supplier's wallet.
    pub async fn charge_boost(
        &self,
        supplier_id: &AccountId,
        amount: Money,
        boost_id: BoostId,
        description: impl Into<String>,
    ) -> Result<WalletReceipt> {
        self.wallet
            .debit(supplier_id, amount, description, Some(boost_id))
            .await
    }

    /// Returns money to an account. Never triggered implicitly by cancellation.
    pub async fn refund(
        &self,
        account_id: &AccountId,
        amount: Money,
        boost_id: Option<BoostId>,
        description: impl Into<String>,
    ) -> Result<WalletReceipt> {
        self.wallet
            .credit(
                account_id,
                amount,
                WalletTransactionType::Refund,
                description,
                boost_id,
            )
            .await
    }

    async fn load(&self, order_id: OrderId) -> Result<Order> {
        self.orders
            .get(order_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("order", order_id))
    }
}

/// Folds repeated products into one line, keeping first-seen order.
fn merge_lines(lines: &[CartLine]) -> Result<Vec<CartLine>> {
    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(line.quantity)
                    .ok_or_else(|| {
                        LedgerError::validation(format!(
                            "quantity of product {} overflows",
                            line.product_id
                        ))
                    })?;
            }
            None => merged.push(line.clone()),
        }
    }
    Ok(merged)
}
