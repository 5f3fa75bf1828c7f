//! Idempotency Guard
//!
//! Guarantees at-most-once execution per `(idempotency_key, asset_type)`.
//! The unique index on that pair is the authoritative lock, not an
//! in-process mutex, so any number of replicas across any number of
//! processes is safe.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::model::Transaction;
use crate::store::Store;
use crate::types::AssetTypeId;

/// Replay lookup and race-loss recovery for the transfer engine.
#[derive(Clone)]
pub struct IdempotencyGuard {
    store: Arc<dyn Store>,
    read_attempts: u32,
    backoff: std::time::Duration,
}

impl IdempotencyGuard {
    pub fn new(store: Arc<dyn Store>, config: &EngineConfig) -> Self {
        Self {
            store,
            read_attempts: config.replay_read_attempts.max(1),
            backoff: config.replay_backoff,
        }
    }

    /// Return the previously persisted transaction for this key, if any.
    ///
    /// The result is returned verbatim whatever its status; a `pending`
    /// replay is surfaced as such and never retried here.
    pub async fn lookup(
        &self,
        idempotency_key: &str,
        asset_type: AssetTypeId,
    ) -> Result<Option<Transaction>, EngineError> {
        Ok(self.store.find_transaction_by_key(idempotency_key, asset_type).await?)
    }

    /// After losing the pending-insert race, wait for the winner's row to
    /// become visible: bounded re-read loop with exponential backoff.
    /// Surfaces [`EngineError::TransactionConflict`] when the winner never
    /// shows up within the window.
    pub async fn await_winner(
        &self,
        idempotency_key: &str,
        asset_type: AssetTypeId,
    ) -> Result<Transaction, EngineError> {
        let mut delay = self.backoff;
        for attempt in 0..self.read_attempts {
            if let Some(tx) = self.lookup(idempotency_key, asset_type).await? {
                return Ok(tx);
            }
            // No sleep after the final read
            if attempt + 1 < self.read_attempts {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
        tracing::warn!(
            idempotency_key = %idempotency_key,
            "duplicate-key winner not visible after backoff"
        );
        Err(EngineError::TransactionConflict)
    }
}
