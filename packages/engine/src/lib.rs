//! CoinVault Engine: Transactional Wallet Core
//!
//! Holds balances of several in-app currencies for users and system accounts
//! and processes money-movement operations (top-up, bonus, spend) with strong
//! correctness guarantees under concurrency: no negative balances, no
//! double-spending, no duplicated effects on retry, and an immutable
//! double-entry audit trail.
//!
//! # Example
//!
//! ```rust,ignore
//! use coinvault_engine::{WalletService, MemoryStore, TopUpRequest};
//!
//! let wallet = WalletService::new(Arc::new(MemoryStore::new()));
//!
//! let outcome = wallet.top_up(TopUpRequest {
//!     user_id: "user_alice".into(),
//!     asset_code: "GOLD".into(),
//!     amount: dec!(100),
//!     idempotency_key: "topup-2024-001".into(),
//!     metadata: None,
//! }).await?;
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CoinVault Engine                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │            Operation Facade (WalletService)         │   │
//! │  │     top-up / bonus / spend / balance / verify       │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! │                          │                                  │
//! │        ┌─────────────────┴─────────────────┐               │
//! │        │          Transfer Engine          │               │
//! │        │  pending → completed / failed     │               │
//! │        └───────────────────────────────────┘               │
//! │                          │                                  │
//! │  ┌───────────────┬───────────────┬───────────────┐        │
//! │  │ Idempotency   │ Asset/Account │ Double-Entry  │        │
//! │  │ Guard         │ Resolver      │ Ledger        │        │
//! │  └───────────────┴───────────────┴───────────────┘        │
//! │                          │                                  │
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │   Store contract (unique insert + atomic updates)   │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod idempotency;
pub mod memory;
pub mod model;
pub mod ops;
pub mod resolver;
pub mod store;
pub mod transfer;
pub mod types;

// Re-exports
pub use config::EngineConfig;
pub use error::{EngineError, ErrorKind};
pub use idempotency::IdempotencyGuard;
pub use memory::MemoryStore;
pub use model::{
    Account, AccountKind, AssetType, EntryType, LedgerEntry, Transaction, TransactionKind,
    TransactionStatus,
};
pub use ops::{
    BalanceView, BonusRequest, CreateAccountRequest, CreateAssetTypeRequest, HistoryItem,
    HistoryView, LedgerVerification, SpendRequest, SystemBalance, TopUpRequest, WalletService,
};
pub use resolver::{Resolver, SystemAccount};
pub use store::{AccountFilter, Page, Store, StoreError, TransactionFilter};
pub use transfer::{TransferEngine, TransferOutcome, TransferParams};
pub use types::{AccountId, AssetTypeId, LedgerEntryId, Metadata, TransactionId};
