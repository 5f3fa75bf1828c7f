//! Atomic Transfer Engine
//!
//! Drives the pending → completed/failed state machine for one transaction:
//! conditional atomic debit, atomic credit, paired ledger entries,
//! finalization. Balance updates are applied in sorted-account-id order so
//! reversed transfers between the same pair of accounts cannot deadlock on
//! storage layers that take row-level locks.

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::idempotency::IdempotencyGuard;
use crate::model::{Account, EntryType, LedgerEntry, Transaction, TransactionKind};
use crate::store::{NewLedgerEntry, NewTransaction, Store, StoreError};
use crate::types::{round_to_precision, AccountId, AssetTypeId, Metadata};

/// Inputs for one transfer.
#[derive(Debug, Clone)]
pub struct TransferParams {
    /// Client-supplied retry key; at least 8 characters after trimming
    pub idempotency_key: String,
    pub from_account: AccountId,
    pub to_account: AccountId,
    pub asset_type: AssetTypeId,
    /// Strictly positive; rounded half-even to the asset precision
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub description: String,
    pub metadata: Metadata,
}

/// Result of [`TransferEngine::execute`].
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub transaction: Transaction,
    /// True when a previously persisted outcome was returned verbatim
    pub is_replay: bool,
}

/// A settlement failure: the error to propagate plus the reason recorded on
/// the failed transaction (which may carry double-fault detail the error
/// itself does not).
struct SettleFailure {
    error: EngineError,
    reason: String,
}

impl SettleFailure {
    fn new(error: EngineError, reason: impl Into<String>) -> Self {
        Self { error, reason: reason.into() }
    }
}

/// Stateless transfer executor over an injected store.
#[derive(Clone)]
pub struct TransferEngine {
    store: Arc<dyn Store>,
    guard: IdempotencyGuard,
    config: EngineConfig,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn Store>, config: EngineConfig) -> Self {
        let guard = IdempotencyGuard::new(store.clone(), &config);
        Self { store, guard, config }
    }

    /// Execute one transfer with at-most-once semantics.
    ///
    /// On first execution the returned transaction is `completed` or the
    /// call fails and the transaction (if created) is `failed`. On replay
    /// the original outcome is returned verbatim with `is_replay = true`.
    pub async fn execute(&self, params: TransferParams) -> Result<TransferOutcome, EngineError> {
        let key = params.idempotency_key.trim().to_string();
        if key.len() < 8 {
            return Err(EngineError::validation(
                "idempotency key must be at least 8 characters",
            ));
        }

        if let Some(transaction) = self.guard.lookup(&key, params.asset_type).await? {
            return Ok(TransferOutcome { transaction, is_replay: true });
        }

        let asset = self
            .store
            .find_asset_type(params.asset_type)
            .await?
            .filter(|a| a.is_active)
            .ok_or_else(|| EngineError::AssetNotFound { code: params.asset_type.to_string() })?;

        if params.amount <= Decimal::ZERO {
            return Err(EngineError::validation("amount must be positive"));
        }
        let amount = round_to_precision(params.amount, asset.decimal_places);
        if amount <= Decimal::ZERO {
            return Err(EngineError::invalid_transfer("amount rounds to zero at asset precision"));
        }
        if let Some(limit) = self.config.max_transaction_amount {
            if amount > limit {
                return Err(EngineError::AmountExceedsLimit { limit });
            }
        }
        if params.from_account == params.to_account {
            return Err(EngineError::invalid_transfer(
                "source and destination are the same account",
            ));
        }

        let from = self.load_account(params.from_account).await?;
        let to = self.load_account(params.to_account).await?;
        if from.asset_type != asset.id || to.asset_type != asset.id {
            return Err(EngineError::AssetMismatch);
        }

        // The unique (idempotency_key, asset_type) index is the at-most-once
        // lock; losing the insert race means a concurrent worker owns this key.
        let pending = match self
            .store
            .insert_transaction(NewTransaction {
                idempotency_key: key.clone(),
                asset_type: asset.id,
                from_account: from.id,
                to_account: to.id,
                amount,
                kind: params.kind,
                description: params.description,
                metadata: params.metadata,
            })
            .await
        {
            Ok(tx) => tx,
            Err(StoreError::DuplicateKey { .. }) => {
                let transaction = self.guard.await_winner(&key, asset.id).await?;
                return Ok(TransferOutcome { transaction, is_replay: true });
            }
            Err(err) => return Err(err.into()),
        };

        match self.settle(&pending, &from, &to, amount).await {
            Ok(transaction) => {
                tracing::info!(
                    transaction_id = %transaction.id,
                    from = %from.id,
                    to = %to.id,
                    amount = %amount,
                    "transfer completed"
                );
                Ok(TransferOutcome { transaction, is_replay: false })
            }
            Err(failure) => {
                tracing::warn!(
                    transaction_id = %pending.id,
                    reason = %failure.reason,
                    "transfer failed"
                );
                if let Err(mark_err) =
                    self.store.mark_transaction_failed(pending.id, &failure.reason).await
                {
                    tracing::error!(
                        transaction_id = %pending.id,
                        error = %mark_err,
                        "could not record transaction failure"
                    );
                }
                Err(failure.error)
            }
        }
    }

    async fn load_account(&self, id: AccountId) -> Result<Account, EngineError> {
        let account = self
            .store
            .find_account(id)
            .await?
            .ok_or(EngineError::AccountNotFound { account_id: id })?;
        if !account.is_active {
            return Err(EngineError::AccountInactive { account_id: id });
        }
        Ok(account)
    }

    /// Apply both balance legs and the paired ledger entries, then finalize.
    /// Any error is returned as a [`SettleFailure`] for the caller to record.
    async fn settle(
        &self,
        pending: &Transaction,
        from: &Account,
        to: &Account,
        amount: Decimal,
    ) -> Result<Transaction, SettleFailure> {
        let (debited, credited) = if from.id <= to.id {
            self.debit_then_credit(from.id, to.id, amount).await?
        } else {
            self.credit_then_debit(from.id, to.id, amount).await?
        };

        let debit_entry = self
            .write_entry_with_retry(NewLedgerEntry {
                transaction_id: pending.id,
                account: from.id,
                asset_type: pending.asset_type,
                entry_type: EntryType::Debit,
                amount,
                balance_after: debited.balance,
            })
            .await?;
        let credit_entry = self
            .write_entry_with_retry(NewLedgerEntry {
                transaction_id: pending.id,
                account: to.id,
                asset_type: pending.asset_type,
                entry_type: EntryType::Credit,
                amount,
                balance_after: credited.balance,
            })
            .await?;

        self.store
            .mark_transaction_completed(pending.id, [debit_entry.id, credit_entry.id])
            .await
            .map_err(|err| {
                SettleFailure::new(err.into(), "completion update failed after ledger writes")
            })
    }

    /// Source sorts first: conditional debit, then credit. A failed credit
    /// re-adds the deducted amount to the source, best effort.
    async fn debit_then_credit(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<(Account, Account), SettleFailure> {
        let debited = match self.store.debit_account(from, amount).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                return Err(SettleFailure::new(
                    EngineError::InsufficientBalance,
                    "insufficient balance",
                ))
            }
            Err(err) => return Err(SettleFailure::new(err.into(), "debit update failed")),
        };

        match self.store.credit_account(to, amount).await {
            Ok(Some(credited)) => Ok((debited, credited)),
            Ok(None) => {
                let reason = self
                    .compensate(from, amount, CompensateLeg::RefundSource, "credit did not apply")
                    .await;
                Err(SettleFailure::new(internal("destination unavailable for credit"), reason))
            }
            Err(err) => {
                let reason = self
                    .compensate(from, amount, CompensateLeg::RefundSource, "credit update failed")
                    .await;
                Err(SettleFailure::new(err.into(), reason))
            }
        }
    }

    /// Destination sorts first: credit, then conditional debit. A failed
    /// debit reclaims the landed credit from the destination, best effort.
    async fn credit_then_debit(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<(Account, Account), SettleFailure> {
        let credited = match self.store.credit_account(to, amount).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                return Err(SettleFailure::new(
                    internal("destination unavailable for credit"),
                    "credit did not apply",
                ))
            }
            Err(err) => return Err(SettleFailure::new(err.into(), "credit update failed")),
        };

        match self.store.debit_account(from, amount).await {
            Ok(Some(debited)) => Ok((debited, credited)),
            Ok(None) => {
                let reason = self
                    .compensate(to, amount, CompensateLeg::ReclaimDestination, "insufficient balance")
                    .await;
                Err(SettleFailure::new(EngineError::InsufficientBalance, reason))
            }
            Err(err) => {
                let reason = self
                    .compensate(to, amount, CompensateLeg::ReclaimDestination, "debit update failed")
                    .await;
                Err(SettleFailure::new(err.into(), reason))
            }
        }
    }

    /// Reverse the leg that already landed. A compensation failure leaves a
    /// double fault: the transaction is failed either way and the reason
    /// records what needs out-of-band reconciliation.
    async fn compensate(
        &self,
        account: AccountId,
        amount: Decimal,
        leg: CompensateLeg,
        base_reason: &str,
    ) -> String {
        let result = match leg {
            CompensateLeg::RefundSource => self.store.credit_account(account, amount).await,
            CompensateLeg::ReclaimDestination => self.store.debit_account(account, amount).await,
        };
        match result {
            Ok(Some(_)) => base_reason.to_string(),
            Ok(None) => {
                tracing::error!(account = %account, amount = %amount, "compensation did not apply");
                format!("{base_reason}; unreconciled: compensation did not apply on {account}")
            }
            Err(err) => {
                tracing::error!(account = %account, amount = %amount, error = %err, "compensation failed");
                format!("{base_reason}; unreconciled: compensation failed on {account}: {err}")
            }
        }
    }

    /// Ledger writes are retried a bounded number of times; if a side never
    /// lands the transaction is failed while the balance updates stay in
    /// place, and verification surfaces the divergence.
    async fn write_entry_with_retry(
        &self,
        new: NewLedgerEntry,
    ) -> Result<LedgerEntry, SettleFailure> {
        let attempts = self.config.ledger_write_retries.max(1);
        let mut result = self.store.insert_ledger_entry(new.clone()).await;
        for _ in 1..attempts {
            if result.is_ok() {
                break;
            }
            result = self.store.insert_ledger_entry(new.clone()).await;
        }
        result.map_err(|err| {
            SettleFailure::new(
                internal("ledger write failed"),
                format!("ledger write failed after {attempts} attempts: {err}"),
            )
        })
    }
}

enum CompensateLeg {
    RefundSource,
    ReclaimDestination,
}

fn internal(message: &str) -> EngineError {
    EngineError::Store(StoreError::Backend { message: message.to_string() })
}
