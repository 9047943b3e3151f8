#![allow(dead_code)]

use rust_decimal::Decimal;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;
use supplyledger::application::orders::{OrderLedger, OrderLedgerPorts};
use supplyledger::application::wallet::WalletLedger;
use supplyledger::config::LedgerConfig;
use supplyledger::domain::ids::AccountId;
use supplyledger::domain::money::Currency;
use supplyledger::domain::order::{CartLine, DeliveryInfo, NewOrder, PaymentMethod};
use supplyledger::domain::ports::CatalogProduct;
use supplyledger::infrastructure::events::BroadcastEventSink;
use supplyledger::infrastructure::in_memory::{
    InMemoryCart, InMemoryCatalog, InMemoryOrderStore, InMemoryWalletStore,
};

pub const BUYER: &str = "shop-owner-1";
pub const SUPPLIER: &str = "supplier-1";

/// Both ledgers wired to in-memory collaborators.
pub struct Marketplace {
    pub wallet: Arc<WalletLedger>,
    pub orders: Arc<OrderLedger>,
    pub catalog: InMemoryCatalog,
    pub cart: InMemoryCart,
    pub events: Arc<BroadcastEventSink>,
}

pub fn marketplace() -> Marketplace {
    let config = LedgerConfig::default();
    let events = Arc::new(BroadcastEventSink::new(config.event_buffer));
    let catalog = InMemoryCatalog::new();
    let cart = InMemoryCart::new();

    let wallet = Arc::new(WalletLedger::new(
        Arc::new(InMemoryWalletStore::new()),
        events.clone(),
        &config,
    ));
    let orders = Arc::new(OrderLedger::new(
        OrderLedgerPorts {
            orders: Arc::new(InMemoryOrderStore::new()),
            catalog: Arc::new(catalog.clone()),
            cart: Arc::new(cart.clone()),
            events: events.clone(),
        },
        wallet.clone(),
        &config,
    ));

    Marketplace {
        wallet,
        orders,
        catalog,
        cart,
        events,
    }
}

pub fn product(name: &str, price: Decimal, min_order: u32) -> CatalogProduct {
    CatalogProduct {
        name: name.to_string(),
        price,
        currency: Currency::Xof,
        supplier_id: AccountId::from(SUPPLIER),
        min_order,
    }
}

pub fn checkout(items: Vec<CartLine>) -> NewOrder {
    NewOrder {
        buyer_id: AccountId::from(BUYER),
        supplier_id: AccountId::from(SUPPLIER),
        items,
        delivery: DeliveryInfo {
            address: "Rue 10, Médina".to_string(),
            city: "Dakar".to_string(),
            phone: "+221770001122".to_string(),
            contact_name: Some("Moussa".to_string()),
        },
        payment_method: PaymentMethod::CashOnDelivery,
        notes: Some("Deliver before noon".to_string()),
    }
}

/// Writes `rows` top-ups spread over `accounts` accounts, 1.00 each.
pub fn generate_commands_csv(path: &Path, rows: usize, accounts: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["type", "account", "amount", "reference"])?;

    for i in 0..rows {
        let account = format!("supplier-{}", i % accounts.max(1));
        wtr.write_record(["topup", account.as_str(), "1.00", ""])?;
    }

    wtr.flush()?;
    Ok(())
}
