//! Wallet Data Model
//!
//! Four entities: asset types, accounts, transactions, ledger entries.
//! Accounts cache a balance; the ledger is the append-only double-entry
//! record the cache must reconcile against.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{AccountId, AssetTypeId, LedgerEntryId, Metadata, TransactionId};

/// A currency definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetType {
    /// Unique handle
    pub id: AssetTypeId,
    /// Short uppercase symbol, globally unique (e.g. `GOLD`)
    pub code: String,
    /// Human-readable name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Precision in [0, 8]; all amounts for this asset are representable at it
    pub decimal_places: u32,
    /// Inactive asset types may not be used in new transactions
    pub is_active: bool,
    /// Created at
    pub created_at: DateTime<Utc>,
}

/// Account ownership class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Owned by an end user
    User,
    /// One of the well-known system wallets
    System,
}

/// A wallet: per-user per-asset balance record, or a named system account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Unique handle, also the lock-ordering key
    pub id: AccountId,
    /// Owning user, or a well-known system name like `SYSTEM_TREASURY`
    pub user_id: String,
    /// Ownership class
    #[serde(rename = "accountType")]
    pub kind: AccountKind,
    /// Asset this wallet holds
    pub asset_type: AssetTypeId,
    /// Cached balance, never negative
    pub balance: Decimal,
    /// Balance the account was created with; zero except for seeded floats.
    /// Ledger verification uses it as the baseline.
    pub opening_balance: Decimal,
    /// Display name
    pub display_name: String,
    /// Opaque metadata bag
    pub metadata: Metadata,
    /// Inactive accounts may not participate in new transactions
    pub is_active: bool,
    /// Created at
    pub created_at: DateTime<Utc>,
    /// Last balance update
    pub updated_at: DateTime<Utc>,
}

/// Money-movement flow class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Topup,
    Bonus,
    Spend,
    Adjustment,
}

/// Transaction lifecycle state. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Created, not yet settled; doubles as the at-most-once lock
    Pending,
    /// Both ledger entries persisted
    Completed,
    /// A step after creation errored out
    Failed,
}

/// A record of one money-movement event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Unique handle
    pub id: TransactionId,
    /// Client-supplied retry key, unique per asset type
    pub idempotency_key: String,
    /// Asset being moved
    pub asset_type: AssetTypeId,
    /// Source account
    pub from_account: AccountId,
    /// Destination account
    pub to_account: AccountId,
    /// Amount moved, strictly positive
    pub amount: Decimal,
    /// Flow class
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Lifecycle state
    pub status: TransactionStatus,
    /// Human-readable description
    pub description: String,
    /// Opaque metadata bag
    pub metadata: Metadata,
    /// Why the transaction failed, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Exactly two entries after completion, empty otherwise
    pub ledger_entries: Vec<LedgerEntryId>,
    /// Created at
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

/// Direction of one half of a double-entry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Balance increases
    Credit,
    /// Balance decreases
    Debit,
}

/// One immutable half of a double-entry record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Unique handle
    pub id: LedgerEntryId,
    /// Owning transaction
    pub transaction_id: TransactionId,
    /// Affected account
    pub account: AccountId,
    /// Asset moved
    pub asset_type: AssetTypeId,
    /// Direction
    pub entry_type: EntryType,
    /// Amount moved, strictly positive
    pub amount: Decimal,
    /// Snapshot of the account balance after this entry applied
    pub balance_after: Decimal,
    /// Created at
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Signed contribution of this entry to the account balance.
    pub fn signed_amount(&self) -> Decimal {
        match self.entry_type {
            EntryType::Credit => self.amount,
            EntryType::Debit => -self.amount,
        }
    }
}
