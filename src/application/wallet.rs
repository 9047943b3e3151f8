use super::locks::KeyedLocks;
use crate::config::LedgerConfig;
use crate::domain::account::{Account, Role};
use crate::domain::events::LedgerEvent;
use crate::domain::ids::{AccountId, BoostId, TransactionId};
use crate::domain::money::{Amount, Balance, Currency, Money};
use crate::domain::ports::{EventSinkRef, WalletStoreRef};
use crate::domain::transaction::{WalletTransaction, WalletTransactionType};
use crate::error::{LedgerError, Result};
use chrono::Utc;
use tracing::debug;

/// Outcome of a committed balance change.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletReceipt {
    pub new_balance: Balance,
    pub transaction: WalletTransaction,
}

/// Owns account balances and their append-only transaction log.
///
/// Every balance change is committed together with exactly one
/// [`WalletTransaction`]. Changes to the same account are serialized in-process
/// and guarded by a compare-and-swap on the account version at the store.
pub struct WalletLedger {
    store: WalletStoreRef,
    events: EventSinkRef,
    locks: KeyedLocks<AccountId>,
    max_retries: u32,
}

impl WalletLedger {
    pub fn new(store: WalletStoreRef, events: EventSinkRef, config: &LedgerConfig) -> Self {
        Self {
            store,
            events,
            locks: KeyedLocks::new(),
            max_retries: config.max_commit_retries,
        }
    }

    /// Registers a party with an empty wallet.
    pub async fn open_account(
        &self,
        account_id: impl Into<AccountId>,
        role: Role,
        currency: Currency,
    ) -> Result<Account> {
        let account = Account::new(account_id.into(), role, currency);
        self.store.create(account.clone()).await?;
        debug!(account_id = %account.id, %role, %currency, "account opened");
        Ok(account)
    }

    /// Adds funds. Only `topup` and `refund` are credits.
    pub async fn credit(
        &self,
        account_id: &AccountId,
        amount: Money,
        kind: WalletTransactionType,
        description: impl Into<String>,
        boost_id: Option<BoostId>,
    ) -> Result<WalletReceipt> {
        if !kind.is_credit() {
            return Err(LedgerError::validation(format!("{kind} is not a credit")));
        }
        self.apply(account_id, amount, kind, description.into(), boost_id)
            .await
    }

    /// Charges a boost placement against the wallet.
    pub async fn debit(
        &self,
        account_id: &AccountId,
        amount: Money,
        description: impl Into<String>,
        boost_id: Option<BoostId>,
    ) -> Result<WalletReceipt> {
        self.apply(
            account_id,
            amount,
            WalletTransactionType::BoostCharge,
            description.into(),
            boost_id,
        )
        .await
    }

    pub async fn get_balance(&self, account_id: &AccountId) -> Result<Balance> {
        Ok(self.get_account(account_id).await?.wallet_balance)
    }

    pub async fn get_account(&self, account_id: &AccountId) -> Result<Account> {
        self.store
            .get(account_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("account", account_id))
    }

    pub async fn accounts(&self) -> Result<Vec<Account>> {
        self.store.get_all().await
    }

    /// The account's log, newest entry first.
    pub async fn list_transactions(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<WalletTransaction>> {
        self.get_account(account_id).await?;
        let mut entries = self.store.entries(account_id).await?;
        entries.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        Ok(entries)
    }

    async fn apply(
        &self,
        account_id: &AccountId,
        amount: Money,
        kind: WalletTransactionType,
        description: String,
        boost_id: Option<BoostId>,
    ) -> Result<WalletReceipt> {
        let value = Amount::new(amount.amount)?;
        let _guard = self.locks.lock(account_id).await;

        let mut attempt = 0;
        loop {
            let mut account = self.get_account(account_id).await?;
            if account.currency != amount.currency {
                return Err(LedgerError::validation(format!(
                    "account {account_id} holds {}, got {}",
                    account.currency, amount.currency
                )));
            }

            let expected_version = account.version;
            let signed = if kind.is_credit() {
                account.credit(value)?;
                value.value()
            } else {
                account.debit(value)?;
                -value.value()
            };

            let entry = WalletTransaction {
                id: TransactionId::new(),
                account_id: account.id.clone(),
                r#type: kind,
                amount: signed,
                currency: account.currency,
                description: description.clone(),
                boost_id: boost_id.clone(),
                created_at: Utc::now(),
                sequence: account.version,
            };
            let new_balance = account.wallet_balance;

            match self
                .store
                .commit_entry(account, expected_version, entry.clone())
                .await
            {
                Ok(()) => {
                    debug!(
                        %account_id,
                        %kind,
                        amount = %signed,
                        balance = %new_balance,
                        "wallet entry committed"
                    );
                    self.events.publish(LedgerEvent::WalletTransactionRecorded {
                        transaction: entry.clone(),
                        new_balance,
                    });
                    return Ok(WalletReceipt {
                        new_balance,
                        transaction: entry,
                    });
                }
                Err(LedgerError::ConcurrencyConflict(_)) if attempt < self.max_retries => {
                    attempt += 1;
                    debug!(%account_id, attempt, "wallet commit conflicted, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::WalletStore;
    use crate::infrastructure::events::NoopEventSink;
    use crate::infrastructure::in_memory::InMemoryWalletStore;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ledger() -> WalletLedger {
        WalletLedger::new(
            Arc::new(InMemoryWalletStore::new()),
            Arc::new(NoopEventSink),
            &LedgerConfig::default(),
        )
    }

    fn xof(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, Currency::Xof)
    }

    #[tokio::test]
    async fn test_credit_appends_one_entry() {
        let ledger = ledger();
        let id = AccountId::from("supplier-1");
        ledger.open_account(id.clone(), Role::Supplier, Currency::Xof).await.unwrap();

        let receipt = ledger
            .credit(&id, xof(dec!(5000)), WalletTransactionType::Topup, "Mobile money top-up", None)
            .await
            .unwrap();

        assert_eq!(receipt.new_balance, Balance::new(dec!(5000)));
        assert_eq!(receipt.transaction.amount, dec!(5000));
        assert_eq!(ledger.get_balance(&id).await.unwrap(), Balance::new(dec!(5000)));
        assert_eq!(ledger.list_transactions(&id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_credit_rejects_boost_charge_type() {
        let ledger = ledger();
        let id = AccountId::from("supplier-1");
        ledger.open_account(id.clone(), Role::Supplier, Currency::Xof).await.unwrap();

        let result = ledger
            .credit(&id, xof(dec!(10)), WalletTransactionType::BoostCharge, "", None)
            .await;
        assert!(matches!(result, Err(LedgerError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_currency_mismatch_is_rejected() {
        let ledger = ledger();
        let id = AccountId::from("supplier-1");
        ledger.open_account(id.clone(), Role::Supplier, Currency::Xof).await.unwrap();

        let result = ledger
            .credit(
                &id,
                Money::new(dec!(10), Currency::Usd),
                WalletTransactionType::Topup,
                "",
                None,
            )
            .await;
        assert!(matches!(result, Err(LedgerError::ValidationError(_))));
        assert!(ledger.list_transactions(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let ledger = ledger();
        let id = AccountId::from("ghost");
        assert!(matches!(
            ledger.get_balance(&id).await,
            Err(LedgerError::NotFound { entity: "account", .. })
        ));
        assert!(matches!(
            ledger.debit(&id, xof(dec!(1)), "", None).await,
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_rejected() {
        let ledger = ledger();
        let id = AccountId::from("supplier-1");
        ledger.open_account(id.clone(), Role::Supplier, Currency::Xof).await.unwrap();

        let result = ledger.debit(&id, xof(dec!(0)), "", None).await;
        assert!(matches!(result, Err(LedgerError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_credit_overflow_is_rejected_without_effect() {
        let ledger = ledger();
        let id = AccountId::from("supplier-1");
        ledger.open_account(id.clone(), Role::Supplier, Currency::Xof).await.unwrap();
        let largest = xof(rust_decimal::Decimal::MAX / dec!(100));

        ledger
            .credit(&id, largest, WalletTransactionType::Topup, "", None)
            .await
            .unwrap();
        let result = ledger
            .credit(&id, largest, WalletTransactionType::Topup, "", None)
            .await;
        assert!(matches!(result, Err(LedgerError::ValidationError(_))));

        let beyond_money_range = ledger
            .credit(&id, xof(rust_decimal::Decimal::MAX), WalletTransactionType::Topup, "", None)
            .await;
        assert!(matches!(beyond_money_range, Err(LedgerError::ValidationError(_))));

        assert_eq!(ledger.get_balance(&id).await.unwrap().value(), largest.amount);
        assert_eq!(ledger.list_transactions(&id).await.unwrap().len(), 1);
    }

    /// Reports a conflict for the first `remaining` commits, then delegates.
    struct FlakyStore {
        inner: InMemoryWalletStore,
        remaining: AtomicU32,
    }

    #[async_trait]
    impl WalletStore for FlakyStore {
        async fn create(&self, account: Account) -> Result<()> {
            self.inner.create(account).await
        }

        async fn get(&self, account_id: &AccountId) -> Result<Option<Account>> {
            self.inner.get(account_id).await
        }

        async fn get_all(&self) -> Result<Vec<Account>> {
            self.inner.get_all().await
        }

        async fn commit_entry(
            &self,
            account: Account,
            expected_version: u64,
            entry: WalletTransaction,
        ) -> Result<()> {
            if self
                .remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(LedgerError::ConcurrencyConflict(account.id.to_string()));
            }
            self.inner.commit_entry(account, expected_version, entry).await
        }

        async fn entries(&self, account_id: &AccountId) -> Result<Vec<WalletTransaction>> {
            self.inner.entries(account_id).await
        }
    }

    fn flaky_ledger(conflicts: u32, max_retries: u32) -> WalletLedger {
        let config = LedgerConfig {
            max_commit_retries: max_retries,
            ..LedgerConfig::default()
        };
        WalletLedger::new(
            Arc::new(FlakyStore {
                inner: InMemoryWalletStore::new(),
                remaining: AtomicU32::new(conflicts),
            }),
            Arc::new(NoopEventSink),
            &config,
        )
    }

    #[tokio::test]
    async fn test_conflicts_are_retried() {
        let ledger = flaky_ledger(2, 3);
        let id = AccountId::from("supplier-1");
        ledger.open_account(id.clone(), Role::Supplier, Currency::Xof).await.unwrap();

        ledger
            .credit(&id, xof(dec!(100)), WalletTransactionType::Topup, "", None)
            .await
            .unwrap();
        assert_eq!(ledger.get_balance(&id).await.unwrap(), Balance::new(dec!(100)));
        assert_eq!(ledger.list_transactions(&id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_conflict_without_effect() {
        let ledger = flaky_ledger(5, 1);
        let id = AccountId::from("supplier-1");
        ledger.open_account(id.clone(), Role::Supplier, Currency::Xof).await.unwrap();

        let result = ledger
            .credit(&id, xof(dec!(100)), WalletTransactionType::Topup, "", None)
            .await;
        assert!(matches!(result, Err(LedgerError::ConcurrencyConflict(_))));
        assert_eq!(ledger.get_balance(&id).await.unwrap(), Balance::ZERO);
        assert!(ledger.list_transactions(&id).await.unwrap().is_empty());
    }
}
