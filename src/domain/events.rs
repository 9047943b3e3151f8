use super::ids::{AccountId, OrderId};
use super::money::{Balance, Currency};
use super::order::OrderStatus;
use super::transaction::WalletTransaction;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Facts published after a ledger change has been committed.
///
/// Consumers (cache layers, notification feeds) subscribe through an
/// [`EventSink`](super::ports::EventSink); the ledgers never wait on them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    OrderPlaced {
        order_id: OrderId,
        buyer_id: AccountId,
        supplier_id: AccountId,
        total_amount: Decimal,
        currency: Currency,
    },
    OrderStatusChanged {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        changed_by: AccountId,
        changed_at: DateTime<Utc>,
    },
    WalletTransactionRecorded {
        transaction: WalletTransaction,
        new_balance: Balance,
    },
}
