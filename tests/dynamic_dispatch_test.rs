use chrono::Utc;
use rust_decimal_macros::dec;
use supplyledger::domain::account::{Account, Role};
use supplyledger::domain::ids::{AccountId, TransactionId};
use supplyledger::domain::money::{Balance, Currency};
use supplyledger::domain::order::{DeliveryInfo, NewOrder, Order, OrderItem, PaymentMethod};
use supplyledger::domain::ports::{OrderStoreRef, WalletStoreRef};
use supplyledger::domain::transaction::{WalletTransaction, WalletTransactionType};
use supplyledger::infrastructure::in_memory::{InMemoryOrderStore, InMemoryWalletStore};

#[tokio::test]
async fn test_stores_as_trait_objects() {
    let wallet_store: WalletStoreRef = std::sync::Arc::new(InMemoryWalletStore::new());
    let order_store: OrderStoreRef = std::sync::Arc::new(InMemoryOrderStore::new());

    let account = Account::new(AccountId::from("supplier-1"), Role::Supplier, Currency::Ngn);
    let mut funded = account.clone();
    funded.wallet_balance = Balance::new(dec!(100.00));
    funded.version = 1;
    let entry = WalletTransaction {
        id: TransactionId::new(),
        account_id: account.id.clone(),
        r#type: WalletTransactionType::Topup,
        amount: dec!(100.00),
        currency: Currency::Ngn,
        description: "top-up".to_string(),
        boost_id: None,
        created_at: Utc::now(),
        sequence: 1,
    };

    let item = OrderItem::new("yam".into(), "Yam tubers".to_string(), 4, dec!(350)).unwrap();
    let order = Order::place(
        NewOrder {
            buyer_id: AccountId::from("shop-1"),
            supplier_id: AccountId::from("supplier-1"),
            items: vec![],
            delivery: DeliveryInfo {
                address: "12 Broad Street".to_string(),
                city: "Lagos".to_string(),
                phone: "+2348010000000".to_string(),
                contact_name: None,
            },
            payment_method: PaymentMethod::MobileMoney,
            notes: None,
        },
        vec![item],
        Currency::Ngn,
        Utc::now(),
    )
    .unwrap();
    let order_id = order.id;

    // Verify Send + Sync by spawning tasks
    let wallet_handle = tokio::spawn(async move {
        wallet_store.create(account).await.unwrap();
        wallet_store.commit_entry(funded, 0, entry).await.unwrap();
        let stored = wallet_store.get(&AccountId::from("supplier-1")).await.unwrap().unwrap();
        let entries = wallet_store.entries(&stored.id).await.unwrap();
        (stored, entries)
    });

    let order_handle = tokio::spawn(async move {
        order_store.insert(order).await.unwrap();
        order_store.get(order_id).await.unwrap().unwrap()
    });

    let (stored, entries) = wallet_handle.await.unwrap();
    assert_eq!(stored.wallet_balance, Balance::new(dec!(100.00)));
    assert_eq!(entries.len(), 1);

    let retrieved = order_handle.await.unwrap();
    assert_eq!(retrieved.total_amount, dec!(1400));
}
