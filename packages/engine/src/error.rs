//! Engine Error Taxonomy

use rust_decimal::Decimal;
use thiserror::Error;

use crate::store::StoreError;
use crate::types::AccountId;

/// Errors surfaced by the wallet engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {message}")]
    Validation { message: String },

    #[error("asset type not found: {code}")]
    AssetNotFound { code: String },

    #[error("wallet not found for user {user_id}")]
    WalletNotFound { user_id: String },

    #[error("wallet inactive for user {user_id}")]
    WalletInactive { user_id: String },

    #[error("account not found: {account_id}")]
    AccountNotFound { account_id: AccountId },

    #[error("account inactive: {account_id}")]
    AccountInactive { account_id: AccountId },

    #[error("account asset does not match requested asset type")]
    AssetMismatch,

    #[error("invalid transfer: {reason}")]
    InvalidTransfer { reason: String },

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("amount exceeds per-transaction limit of {limit}")]
    AmountExceedsLimit { limit: Decimal },

    #[error("transaction conflict: concurrent request with the same idempotency key")]
    TransactionConflict,

    #[error("asset type code already exists: {code}")]
    DuplicateAssetCode { code: String },

    #[error("account already exists for user {user_id} and asset")]
    DuplicateAccount { user_id: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Coarse classification the transport layer maps to user-visible codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input malformed or out of range
    Validation,
    /// A lookup failed
    NotFound,
    /// Uniqueness or concurrent-writer conflict
    Conflict,
    /// Conditional debit predicate failed
    InsufficientBalance,
    /// Unexpected store failure
    Internal,
}

impl EngineError {
    /// Classify this error for status-code mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation { .. }
            | EngineError::WalletInactive { .. }
            | EngineError::AccountInactive { .. }
            | EngineError::AssetMismatch
            | EngineError::InvalidTransfer { .. }
            | EngineError::AmountExceedsLimit { .. } => ErrorKind::Validation,
            EngineError::AssetNotFound { .. }
            | EngineError::WalletNotFound { .. }
            | EngineError::AccountNotFound { .. } => ErrorKind::NotFound,
            EngineError::TransactionConflict
            | EngineError::DuplicateAssetCode { .. }
            | EngineError::DuplicateAccount { .. } => ErrorKind::Conflict,
            EngineError::InsufficientBalance => ErrorKind::InsufficientBalance,
            EngineError::Store(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation { message: message.into() }
    }

    pub(crate) fn invalid_transfer(reason: impl Into<String>) -> Self {
        EngineError::InvalidTransfer { reason: reason.into() }
    }
}
