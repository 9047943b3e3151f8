//! Orders, their line items and the order status state machine.
//!
//! The status transitions are:
//! - Pending → Confirmed → Processing → Shipped → Delivered
//! - Pending | Confirmed | Processing → Cancelled
//!
//! Delivered and Cancelled are terminal. All legality checks go through
//! [`OrderStatus::can_transition_to`].

use super::account::{Actor, Role};
use super::ids::{AccountId, OrderId, ProductId};
use super::money::{Currency, to_money_scale};
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// The single transition table of the order lifecycle.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending | Confirmed | Processing, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| LedgerError::validation(format!("unknown order status {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    MobileMoney,
    CashOnDelivery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryInfo {
    pub address: String,
    pub city: String,
    pub phone: String,
    pub contact_name: Option<String>,
}

impl DeliveryInfo {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("address", &self.address),
            ("city", &self.city),
            ("phone", &self.phone),
        ] {
            if value.trim().is_empty() {
                return Err(LedgerError::validation(format!(
                    "delivery {field} is required"
                )));
            }
        }
        Ok(())
    }
}

/// A product and quantity taken from the buyer's cart at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartLine {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Checkout request for a single supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub buyer_id: AccountId,
    pub supplier_id: AccountId,
    pub items: Vec<CartLine>,
    pub delivery: DeliveryInfo,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

/// An order line with the product name and price frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

impl OrderItem {
    pub fn new(
        product_id: ProductId,
        product_name: String,
        quantity: u32,
        unit_price: Decimal,
    ) -> Result<Self> {
        if quantity == 0 {
            return Err(LedgerError::validation(format!(
                "quantity for product {product_id} must be at least 1"
            )));
        }
        if unit_price < Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "price of product {product_id} is negative"
            )));
        }
        let unit_price = to_money_scale(unit_price)?;
        let total_price = unit_price
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(|| {
                LedgerError::validation(format!(
                    "{quantity} x {unit_price} for product {product_id} overflows"
                ))
            })
            .and_then(to_money_scale)?;
        Ok(Self {
            total_price,
            product_id,
            product_name,
            quantity,
            unit_price,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: AccountId,
    pub supplier_id: AccountId,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub currency: Currency,
    pub delivery: DeliveryInfo,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Order {
    /// Builds a pending order from already snapshotted items.
    ///
    /// The cart lines of `request` are not consulted; `items` must have been
    /// resolved from them by the caller.
    pub fn place(
        request: NewOrder,
        items: Vec<OrderItem>,
        currency: Currency,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if items.is_empty() {
            return Err(LedgerError::validation("an order needs at least one item"));
        }
        let NewOrder {
            buyer_id,
            supplier_id,
            delivery,
            payment_method,
            notes,
            ..
        } = request;

        let mut order = Self {
            id: OrderId::new(),
            buyer_id,
            supplier_id,
            status: OrderStatus::Pending,
            total_amount: Decimal::ZERO,
            currency,
            delivery,
            payment_method,
            notes: notes.filter(|n| !n.trim().is_empty()),
            items,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        order.total_amount = order.items_total()?;
        Ok(order)
    }

    pub fn items_total(&self) -> Result<Decimal> {
        self.items.iter().try_fold(Decimal::ZERO, |total, item| {
            total
                .checked_add(item.total_price)
                .ok_or_else(|| LedgerError::validation("order total overflows"))
                .and_then(to_money_scale)
        })
    }

    /// Moves the order to `next`, returning the status it left.
    pub fn transition(&mut self, next: OrderStatus, now: DateTime<Utc>) -> Result<OrderStatus> {
        let from = self.status;
        if !from.can_transition_to(next) {
            return Err(LedgerError::InvalidTransition { from, to: next });
        }
        self.status = next;
        self.updated_at = now;
        self.version += 1;
        Ok(from)
    }

    /// Only the supplier fulfilling the order, or an admin, may move it along.
    pub fn can_be_managed_by(&self, actor: &Actor) -> bool {
        actor.is_admin()
            || (actor.role == Role::Supplier && actor.account_id == self.supplier_id)
    }

    pub fn is_visible_to(&self, actor: &Actor) -> bool {
        actor.is_admin()
            || actor.account_id == self.buyer_id
            || actor.account_id == self.supplier_id
    }
}
