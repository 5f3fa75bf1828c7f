//! Store Contract
//!
//! Persistence abstraction the transfer engine relies on. Correctness
//! depends only on per-document atomicity and the unique-key constraints;
//! no cross-document transaction is ever assumed. Any backend that can do a
//! per-row conditional atomic update plus a unique index can implement this.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::model::{
    Account, AccountKind, AssetType, LedgerEntry, Transaction, TransactionKind, TransactionStatus,
};
use crate::types::{AccountId, AssetTypeId, LedgerEntryId, Metadata, TransactionId};

/// Store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An insert violated a unique-key constraint.
    #[error("duplicate key on {constraint}")]
    DuplicateKey { constraint: &'static str },

    /// The referenced document does not exist.
    #[error("document not found")]
    NotFound,

    /// Backend failure outside the contract.
    #[error("store backend error: {message}")]
    Backend { message: String },
}

/// Insert payload for an asset type.
#[derive(Debug, Clone)]
pub struct NewAssetType {
    pub code: String,
    pub name: String,
    pub description: String,
    pub decimal_places: u32,
}

/// Insert payload for an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub user_id: String,
    pub kind: AccountKind,
    pub asset_type: AssetTypeId,
    pub opening_balance: Decimal,
    pub display_name: String,
    pub metadata: Metadata,
}

/// Insert payload for a transaction. Always created `pending`.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub idempotency_key: String,
    pub asset_type: AssetTypeId,
    pub from_account: AccountId,
    pub to_account: AccountId,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub description: String,
    pub metadata: Metadata,
}

/// Insert payload for a ledger entry.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub transaction_id: TransactionId,
    pub account: AccountId,
    pub asset_type: AssetTypeId,
    pub entry_type: crate::model::EntryType,
    pub amount: Decimal,
    pub balance_after: Decimal,
}

/// Listing filter for accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    pub user_id: Option<String>,
    pub kind: Option<AccountKind>,
    pub asset_type: Option<AssetTypeId>,
}

/// Listing filter for transactions.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub status: Option<TransactionStatus>,
    pub kind: Option<TransactionKind>,
    pub asset_type: Option<AssetTypeId>,
    pub account: Option<AccountId>,
}

/// Pagination window. `page` is 1-based.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: u64,
    pub limit: u64,
}

impl Page {
    pub fn new(page: u64, limit: u64) -> Self {
        Self { page: page.max(1), limit }
    }

    /// Offset of the first row in this window.
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

/// Persistence contract over the four entity collections.
///
/// Listings are ordered by each collection's monotonic insert sequence,
/// newest first, so history pages are stable under concurrent writers.
#[async_trait]
pub trait Store: Send + Sync {
    // Asset types
    async fn insert_asset_type(&self, new: NewAssetType) -> Result<AssetType, StoreError>;
    async fn find_asset_type(&self, id: AssetTypeId) -> Result<Option<AssetType>, StoreError>;
    /// Lookup by code; callers pass the normalized uppercase form.
    async fn find_asset_type_by_code(&self, code: &str) -> Result<Option<AssetType>, StoreError>;
    async fn list_asset_types(&self) -> Result<Vec<AssetType>, StoreError>;
    /// Flip the active flag. Asset types are never deleted, only deactivated.
    async fn set_asset_type_active(
        &self,
        id: AssetTypeId,
        active: bool,
    ) -> Result<AssetType, StoreError>;

    // Accounts
    async fn insert_account(&self, new: NewAccount) -> Result<Account, StoreError>;
    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;
    /// Lookup on the unique `(user_id, asset_type)` index.
    async fn find_account_by_owner(
        &self,
        user_id: &str,
        asset_type: AssetTypeId,
    ) -> Result<Option<Account>, StoreError>;
    async fn list_accounts(&self, filter: AccountFilter) -> Result<Vec<Account>, StoreError>;
    /// Flip the active flag. Accounts are never deleted, only deactivated.
    async fn set_account_active(&self, id: AccountId, active: bool)
        -> Result<Account, StoreError>;

    /// Conditional atomic debit: `balance -= amount` only where
    /// `balance >= amount AND is_active`. Returns the updated account, or
    /// `None` when the predicate did not match at commit time.
    async fn debit_account(
        &self,
        id: AccountId,
        amount: Decimal,
    ) -> Result<Option<Account>, StoreError>;

    /// Atomic credit: `balance += amount` where `is_active`. Returns the
    /// updated account, or `None` when the account is missing or inactive.
    async fn credit_account(
        &self,
        id: AccountId,
        amount: Decimal,
    ) -> Result<Option<Account>, StoreError>;

    // Transactions
    /// Insert a new `pending` transaction. Fails with
    /// [`StoreError::DuplicateKey`] when `(idempotency_key, asset_type)` is
    /// already present; that unique index is the engine's at-most-once lock.
    async fn insert_transaction(&self, new: NewTransaction) -> Result<Transaction, StoreError>;
    async fn find_transaction(&self, id: TransactionId)
        -> Result<Option<Transaction>, StoreError>;
    async fn find_transaction_by_key(
        &self,
        idempotency_key: &str,
        asset_type: AssetTypeId,
    ) -> Result<Option<Transaction>, StoreError>;
    async fn mark_transaction_completed(
        &self,
        id: TransactionId,
        ledger_entries: [LedgerEntryId; 2],
    ) -> Result<Transaction, StoreError>;
    async fn mark_transaction_failed(
        &self,
        id: TransactionId,
        reason: &str,
    ) -> Result<Transaction, StoreError>;
    async fn list_transactions(
        &self,
        filter: TransactionFilter,
        page: Page,
    ) -> Result<Vec<Transaction>, StoreError>;

    // Ledger entries (append-only)
    async fn insert_ledger_entry(&self, new: NewLedgerEntry) -> Result<LedgerEntry, StoreError>;
    /// Entries for one account, newest first.
    async fn list_account_entries(
        &self,
        account: AccountId,
        page: Page,
    ) -> Result<Vec<LedgerEntry>, StoreError>;
    /// Every entry for one account, oldest first. Used by verification.
    async fn all_account_entries(&self, account: AccountId)
        -> Result<Vec<LedgerEntry>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offset() {
        assert_eq!(Page::new(1, 20).offset(), 0);
        assert_eq!(Page::new(3, 20).offset(), 40);
    }

    #[test]
    fn test_page_clamps_to_first() {
        assert_eq!(Page::new(0, 20).page, 1);
    }

    #[test]
    fn test_duplicate_key_display() {
        let err = StoreError::DuplicateKey { constraint: "transactions.idempotency_key" };
        assert_eq!(err.to_string(), "duplicate key on transactions.idempotency_key");
    }
}
