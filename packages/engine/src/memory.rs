//! In-Memory Store
//!
//! Reference implementation of the [`Store`] contract. Each collection lives
//! behind its own `parking_lot::RwLock`; holding the collection write lock
//! for the duration of one mutation is what provides per-document atomicity.
//! Insert order within a collection doubles as the monotonic sequence that
//! orders history listings.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use crate::model::{Account, AssetType, LedgerEntry, Transaction, TransactionStatus};
use crate::store::{
    AccountFilter, NewAccount, NewAssetType, NewLedgerEntry, NewTransaction, Page, Store,
    StoreError, TransactionFilter,
};
use crate::types::{AccountId, AssetTypeId, LedgerEntryId, TransactionId};

#[derive(Default)]
struct AssetState {
    rows: HashMap<AssetTypeId, AssetType>,
    by_code: HashMap<String, AssetTypeId>,
}

#[derive(Default)]
struct AccountState {
    rows: HashMap<AccountId, Account>,
    by_owner: HashMap<(String, AssetTypeId), AccountId>,
}

#[derive(Default)]
struct TransactionState {
    rows: HashMap<TransactionId, Transaction>,
    by_key: HashMap<(String, AssetTypeId), TransactionId>,
    /// Insert order, oldest first.
    order: Vec<TransactionId>,
}

/// In-memory store backing the engine in tests and single-node deployments.
#[derive(Default)]
pub struct MemoryStore {
    assets: RwLock<AssetState>,
    accounts: RwLock<AccountState>,
    transactions: RwLock<TransactionState>,
    /// Append-only, insert order is the per-account history sequence.
    entries: RwLock<Vec<LedgerEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T>(rows: Vec<T>, page: Page) -> Vec<T> {
    rows.into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_asset_type(&self, new: NewAssetType) -> Result<AssetType, StoreError> {
        let mut state = self.assets.write();
        if state.by_code.contains_key(&new.code) {
            return Err(StoreError::DuplicateKey { constraint: "asset_types.code" });
        }
        let asset = AssetType {
            id: Uuid::new_v4(),
            code: new.code.clone(),
            name: new.name,
            description: new.description,
            decimal_places: new.decimal_places,
            is_active: true,
            created_at: Utc::now(),
        };
        state.by_code.insert(new.code, asset.id);
        state.rows.insert(asset.id, asset.clone());
        Ok(asset)
    }

    async fn find_asset_type(&self, id: AssetTypeId) -> Result<Option<AssetType>, StoreError> {
        Ok(self.assets.read().rows.get(&id).cloned())
    }

    async fn find_asset_type_by_code(&self, code: &str) -> Result<Option<AssetType>, StoreError> {
        let state = self.assets.read();
        Ok(state.by_code.get(code).and_then(|id| state.rows.get(id)).cloned())
    }

    async fn list_asset_types(&self) -> Result<Vec<AssetType>, StoreError> {
        let mut assets: Vec<AssetType> = self.assets.read().rows.values().cloned().collect();
        assets.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(assets)
    }

    async fn set_asset_type_active(
        &self,
        id: AssetTypeId,
        active: bool,
    ) -> Result<AssetType, StoreError> {
        let mut state = self.assets.write();
        let asset = state.rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        asset.is_active = active;
        Ok(asset.clone())
    }

    async fn insert_account(&self, new: NewAccount) -> Result<Account, StoreError> {
        let mut state = self.accounts.write();
        let owner_key = (new.user_id.clone(), new.asset_type);
        if state.by_owner.contains_key(&owner_key) {
            return Err(StoreError::DuplicateKey { constraint: "accounts.user_id_asset_type" });
        }
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            kind: new.kind,
            asset_type: new.asset_type,
            balance: new.opening_balance,
            opening_balance: new.opening_balance,
            display_name: new.display_name,
            metadata: new.metadata,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.by_owner.insert(owner_key, account.id);
        state.rows.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.read().rows.get(&id).cloned())
    }

    async fn find_account_by_owner(
        &self,
        user_id: &str,
        asset_type: AssetTypeId,
    ) -> Result<Option<Account>, StoreError> {
        let state = self.accounts.read();
        let id = state.by_owner.get(&(user_id.to_string(), asset_type));
        Ok(id.and_then(|id| state.rows.get(id)).cloned())
    }

    async fn list_accounts(&self, filter: AccountFilter) -> Result<Vec<Account>, StoreError> {
        let state = self.accounts.read();
        let mut accounts: Vec<Account> = state
            .rows
            .values()
            .filter(|a| filter.user_id.as_deref().map_or(true, |u| a.user_id == u))
            .filter(|a| filter.kind.map_or(true, |k| a.kind == k))
            .filter(|a| filter.asset_type.map_or(true, |t| a.asset_type == t))
            .cloned()
            .collect();
        accounts.sort_by(|a, b| (&a.user_id, a.asset_type).cmp(&(&b.user_id, b.asset_type)));
        Ok(accounts)
    }

    async fn set_account_active(
        &self,
        id: AccountId,
        active: bool,
    ) -> Result<Account, StoreError> {
        let mut state = self.accounts.write();
        let account = state.rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        account.is_active = active;
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn debit_account(
        &self,
        id: AccountId,
        amount: Decimal,
    ) -> Result<Option<Account>, StoreError> {
        let mut state = self.accounts.write();
        let Some(account) = state.rows.get_mut(&id) else {
            return Ok(None);
        };
        if !account.is_active || account.balance < amount {
            return Ok(None);
        }
        account.balance -= amount;
        account.updated_at = Utc::now();
        Ok(Some(account.clone()))
    }

    async fn credit_account(
        &self,
        id: AccountId,
        amount: Decimal,
    ) -> Result<Option<Account>, StoreError> {
        let mut state = self.accounts.write();
        let Some(account) = state.rows.get_mut(&id) else {
            return Ok(None);
        };
        if !account.is_active {
            return Ok(None);
        }
        account.balance += amount;
        account.updated_at = Utc::now();
        Ok(Some(account.clone()))
    }

    async fn insert_transaction(&self, new: NewTransaction) -> Result<Transaction, StoreError> {
        let mut state = self.transactions.write();
        let key = (new.idempotency_key.clone(), new.asset_type);
        if state.by_key.contains_key(&key) {
            return Err(StoreError::DuplicateKey {
                constraint: "transactions.idempotency_key_asset_type",
            });
        }
        let now = Utc::now();
        let tx = Transaction {
            id: Uuid::new_v4(),
            idempotency_key: new.idempotency_key,
            asset_type: new.asset_type,
            from_account: new.from_account,
            to_account: new.to_account,
            amount: new.amount,
            kind: new.kind,
            status: TransactionStatus::Pending,
            description: new.description,
            metadata: new.metadata,
            failure_reason: None,
            ledger_entries: vec![],
            created_at: now,
            updated_at: now,
        };
        state.by_key.insert(key, tx.id);
        state.order.push(tx.id);
        state.rows.insert(tx.id, tx.clone());
        Ok(tx)
    }

    async fn find_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, StoreError> {
        Ok(self.transactions.read().rows.get(&id).cloned())
    }

    async fn find_transaction_by_key(
        &self,
        idempotency_key: &str,
        asset_type: AssetTypeId,
    ) -> Result<Option<Transaction>, StoreError> {
        let state = self.transactions.read();
        let id = state.by_key.get(&(idempotency_key.to_string(), asset_type));
        Ok(id.and_then(|id| state.rows.get(id)).cloned())
    }

    async fn mark_transaction_completed(
        &self,
        id: TransactionId,
        ledger_entries: [LedgerEntryId; 2],
    ) -> Result<Transaction, StoreError> {
        let mut state = self.transactions.write();
        let tx = state.rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        // Completed and failed are terminal.
        if tx.status == TransactionStatus::Pending {
            tx.status = TransactionStatus::Completed;
            tx.ledger_entries = ledger_entries.to_vec();
            tx.updated_at = Utc::now();
        }
        Ok(tx.clone())
    }

    async fn mark_transaction_failed(
        &self,
        id: TransactionId,
        reason: &str,
    ) -> Result<Transaction, StoreError> {
        let mut state = self.transactions.write();
        let tx = state.rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        if tx.status == TransactionStatus::Pending {
            tx.status = TransactionStatus::Failed;
            tx.failure_reason = Some(reason.to_string());
            tx.updated_at = Utc::now();
        }
        Ok(tx.clone())
    }

    async fn list_transactions(
        &self,
        filter: TransactionFilter,
        page: Page,
    ) -> Result<Vec<Transaction>, StoreError> {
        let state = self.transactions.read();
        let rows: Vec<Transaction> = state
            .order
            .iter()
            .rev()
            .filter_map(|id| state.rows.get(id))
            .filter(|t| filter.status.map_or(true, |s| t.status == s))
            .filter(|t| filter.kind.map_or(true, |k| t.kind == k))
            .filter(|t| filter.asset_type.map_or(true, |a| t.asset_type == a))
            .filter(|t| {
                filter
                    .account
                    .map_or(true, |acc| t.from_account == acc || t.to_account == acc)
            })
            .cloned()
            .collect();
        Ok(paginate(rows, page))
    }

    async fn insert_ledger_entry(&self, new: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            transaction_id: new.transaction_id,
            account: new.account,
            asset_type: new.asset_type,
            entry_type: new.entry_type,
            amount: new.amount,
            balance_after: new.balance_after,
            created_at: Utc::now(),
        };
        self.entries.write().push(entry.clone());
        Ok(entry)
    }

    async fn list_account_entries(
        &self,
        account: AccountId,
        page: Page,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let entries = self.entries.read();
        let rows: Vec<LedgerEntry> = entries
            .iter()
            .rev()
            .filter(|e| e.account == account)
            .cloned()
            .collect();
        Ok(paginate(rows, page))
    }

    async fn all_account_entries(
        &self,
        account: AccountId,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let entries = self.entries.read();
        Ok(entries.iter().filter(|e| e.account == account).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AccountKind, TransactionKind};
    use crate::types::Metadata;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn new_asset(code: &str) -> NewAssetType {
        NewAssetType {
            code: code.into(),
            name: code.into(),
            description: String::new(),
            decimal_places: 2,
        }
    }

    fn new_account(user_id: &str, asset: AssetTypeId, opening: Decimal) -> NewAccount {
        NewAccount {
            user_id: user_id.into(),
            kind: AccountKind::User,
            asset_type: asset,
            opening_balance: opening,
            display_name: user_id.into(),
            metadata: Metadata::new(),
        }
    }

    fn new_tx(key: &str, asset: AssetTypeId, from: AccountId, to: AccountId) -> NewTransaction {
        NewTransaction {
            idempotency_key: key.into(),
            asset_type: asset,
            from_account: from,
            to_account: to,
            amount: dec!(10),
            kind: TransactionKind::Spend,
            description: String::new(),
            metadata: Metadata::new(),
        }
    }

    #[tokio::test]
    async fn test_asset_code_unique() {
        let store = MemoryStore::new();
        store.insert_asset_type(new_asset("GOLD")).await.unwrap();
        let err = store.insert_asset_type(new_asset("GOLD")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
    }

    #[tokio::test]
    async fn test_account_owner_unique() {
        let store = MemoryStore::new();
        let asset = store.insert_asset_type(new_asset("GOLD")).await.unwrap();
        store.insert_account(new_account("u1", asset.id, dec!(0))).await.unwrap();
        let err = store
            .insert_account(new_account("u1", asset.id, dec!(0)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
    }

    #[tokio::test]
    async fn test_conditional_debit() {
        let store = MemoryStore::new();
        let asset = store.insert_asset_type(new_asset("GOLD")).await.unwrap();
        let account = store
            .insert_account(new_account("u1", asset.id, dec!(100)))
            .await
            .unwrap();

        // Full balance succeeds and leaves zero
        let updated = store.debit_account(account.id, dec!(100)).await.unwrap().unwrap();
        assert_eq!(updated.balance, dec!(0));

        // Predicate no longer matches
        assert!(store.debit_account(account.id, dec!(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_credit_missing_account() {
        let store = MemoryStore::new();
        assert!(store.credit_account(Uuid::new_v4(), dec!(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transaction_key_unique_per_asset() {
        let store = MemoryStore::new();
        let gold = store.insert_asset_type(new_asset("GOLD")).await.unwrap();
        let points = store.insert_asset_type(new_asset("POINTS")).await.unwrap();
        let from = Uuid::new_v4();
        let to = Uuid::new_v4();

        store.insert_transaction(new_tx("key-0001", gold.id, from, to)).await.unwrap();
        let err = store
            .insert_transaction(new_tx("key-0001", gold.id, from, to))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));

        // Same key under a different asset type is a distinct lock
        store.insert_transaction(new_tx("key-0001", points.id, from, to)).await.unwrap();
    }

    #[tokio::test]
    async fn test_terminal_status_sticks() {
        let store = MemoryStore::new();
        let asset = store.insert_asset_type(new_asset("GOLD")).await.unwrap();
        let tx = store
            .insert_transaction(new_tx("key-0001", asset.id, Uuid::new_v4(), Uuid::new_v4()))
            .await
            .unwrap();

        let completed = store
            .mark_transaction_completed(tx.id, [Uuid::new_v4(), Uuid::new_v4()])
            .await
            .unwrap();
        assert_eq!(completed.status, TransactionStatus::Completed);

        // A late failure mark must not un-complete it
        let after = store.mark_transaction_failed(tx.id, "late").await.unwrap();
        assert_eq!(after.status, TransactionStatus::Completed);
        assert!(after.failure_reason.is_none());
    }

    #[tokio::test]
    async fn test_history_newest_first_paginated() {
        let store = MemoryStore::new();
        let account = Uuid::new_v4();
        for i in 0..5 {
            store
                .insert_ledger_entry(NewLedgerEntry {
                    transaction_id: Uuid::new_v4(),
                    account,
                    asset_type: Uuid::new_v4(),
                    entry_type: crate::model::EntryType::Credit,
                    amount: Decimal::from(i + 1),
                    balance_after: Decimal::from(i + 1),
                })
                .await
                .unwrap();
        }

        let first = store.list_account_entries(account, Page::new(1, 2)).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].amount, dec!(5));

        let last = store.list_account_entries(account, Page::new(3, 2)).await.unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].amount, dec!(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_debits_never_overdraw() {
        let store = Arc::new(MemoryStore::new());
        let asset = store.insert_asset_type(new_asset("GOLD")).await.unwrap();
        let account = store
            .insert_account(new_account("u1", asset.id, dec!(100)))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            let id = account.id;
            handles.push(tokio::spawn(async move {
                store.debit_account(id, dec!(10)).await.unwrap().is_some()
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 10);
        let account = store.find_account(account.id).await.unwrap().unwrap();
        assert_eq!(account.balance, dec!(0));
    }
}
