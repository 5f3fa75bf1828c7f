//! Operation Facade
//!
//! Named money-movement flows (top-up, bonus, spend) that pick the correct
//! source and destination for the transfer engine, the read operations
//! (balance, history, ledger verification), and the admin surface
//! (asset types, accounts, transaction listing, system balances).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::model::{
    Account, AccountKind, AssetType, EntryType, Transaction, TransactionKind, TransactionStatus,
};
use crate::resolver::{Resolver, SystemAccount};
use crate::store::{
    AccountFilter, NewAccount, NewAssetType, Page, Store, StoreError, TransactionFilter,
};
use crate::transfer::{TransferEngine, TransferOutcome, TransferParams};
use crate::types::{normalize_asset_code, round_to_precision, LedgerEntryId, Metadata, TransactionId};

/// Largest history/listing page the facade will serve.
pub const MAX_PAGE_LIMIT: u64 = 100;
/// Page size used when the caller does not specify one.
pub const DEFAULT_PAGE_LIMIT: u64 = 20;

/// Top-up: treasury funds a user wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopUpRequest {
    pub user_id: String,
    pub asset_code: String,
    pub amount: Decimal,
    pub idempotency_key: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Bonus: the bonus pool grants a user wallet; `reason` is kept in metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusRequest {
    pub user_id: String,
    pub asset_code: String,
    pub amount: Decimal,
    pub idempotency_key: String,
    pub reason: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Spend: a user wallet pays the revenue account for an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendRequest {
    pub user_id: String,
    pub asset_code: String,
    pub amount: Decimal,
    pub idempotency_key: String,
    pub item_id: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Wallet balance read.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceView {
    pub balance: Decimal,
    pub asset_code: String,
    pub asset_name: String,
}

/// The owning transaction's face shown on each history item.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub description: String,
    pub status: TransactionStatus,
    pub metadata: Metadata,
}

/// One ledger entry joined with its owning transaction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: LedgerEntryId,
    pub transaction_id: TransactionId,
    pub entry_type: EntryType,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub created_at: DateTime<Utc>,
    pub transaction: TransactionInfo,
}

/// Paginated wallet history, most recent first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryView {
    pub items: Vec<HistoryItem>,
    pub page: u64,
    pub limit: u64,
}

/// Out-of-band audit result: cached balance against the recomputed ledger.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerVerification {
    pub cached_balance: Decimal,
    pub computed_balance: Decimal,
    pub is_consistent: bool,
}

/// Snapshot row for one system wallet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemBalance {
    pub name: String,
    pub asset_code: String,
    pub balance: Decimal,
    pub is_active: bool,
}

/// Admin: define a new currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssetTypeRequest {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub decimal_places: u32,
}

/// Admin: open a wallet, optionally with a seeded float.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub user_id: String,
    #[serde(rename = "accountType", default = "default_account_kind")]
    pub kind: AccountKind,
    pub asset_code: String,
    #[serde(default)]
    pub opening_balance: Option<Decimal>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

fn default_account_kind() -> AccountKind {
    AccountKind::User
}

/// Stateless facade over the store, resolver and transfer engine. All state
/// lives in the store; cloning or sharing the service across request
/// handlers is free.
#[derive(Clone)]
pub struct WalletService {
    store: Arc<dyn Store>,
    resolver: Resolver,
    engine: TransferEngine,
}

impl WalletService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: Arc<dyn Store>, config: EngineConfig) -> Self {
        let resolver = Resolver::new(store.clone());
        let engine = TransferEngine::new(store.clone(), config);
        Self { store, resolver, engine }
    }

    // ---- Write flows ----

    /// Treasury → user wallet.
    pub async fn top_up(&self, req: TopUpRequest) -> Result<TransferOutcome, EngineError> {
        let asset = self.resolver.resolve_asset_type(&req.asset_code).await?;
        let treasury =
            self.resolver.resolve_system_account(SystemAccount::Treasury, asset.id).await?;
        let user = self.resolver.resolve_user_account(&req.user_id, asset.id).await?;

        self.engine
            .execute(TransferParams {
                idempotency_key: req.idempotency_key,
                from_account: treasury.id,
                to_account: user.id,
                asset_type: asset.id,
                amount: req.amount,
                kind: TransactionKind::Topup,
                description: format!("Top-up for {}", req.user_id),
                metadata: req.metadata.unwrap_or_default(),
            })
            .await
    }

    /// Bonus pool → user wallet.
    pub async fn bonus(&self, req: BonusRequest) -> Result<TransferOutcome, EngineError> {
        let asset = self.resolver.resolve_asset_type(&req.asset_code).await?;
        let pool =
            self.resolver.resolve_system_account(SystemAccount::BonusPool, asset.id).await?;
        let user = self.resolver.resolve_user_account(&req.user_id, asset.id).await?;

        let mut metadata = req.metadata.unwrap_or_default();
        metadata.insert("reason".into(), serde_json::Value::String(req.reason.clone()));

        self.engine
            .execute(TransferParams {
                idempotency_key: req.idempotency_key,
                from_account: pool.id,
                to_account: user.id,
                asset_type: asset.id,
                amount: req.amount,
                kind: TransactionKind::Bonus,
                description: format!("Bonus: {}", req.reason),
                metadata,
            })
            .await
    }

    /// User wallet → revenue.
    pub async fn spend(&self, req: SpendRequest) -> Result<TransferOutcome, EngineError> {
        let item_id = req.item_id.trim();
        if item_id.is_empty() {
            return Err(EngineError::validation("itemId is required"));
        }

        let asset = self.resolver.resolve_asset_type(&req.asset_code).await?;
        let user = self.resolver.resolve_user_account(&req.user_id, asset.id).await?;
        let revenue =
            self.resolver.resolve_system_account(SystemAccount::Revenue, asset.id).await?;

        let mut metadata = req.metadata.unwrap_or_default();
        metadata.insert("itemId".into(), serde_json::Value::String(item_id.to_string()));

        self.engine
            .execute(TransferParams {
                idempotency_key: req.idempotency_key,
                from_account: user.id,
                to_account: revenue.id,
                asset_type: asset.id,
                amount: req.amount,
                kind: TransactionKind::Spend,
                description: format!("Purchase of {item_id}"),
                metadata,
            })
            .await
    }

    // ---- Reads ----

    pub async fn balance(
        &self,
        user_id: &str,
        asset_code: &str,
    ) -> Result<BalanceView, EngineError> {
        let asset = self.resolver.resolve_asset_type(asset_code).await?;
        let account = self.resolver.resolve_user_account(user_id, asset.id).await?;
        Ok(BalanceView {
            balance: account.balance,
            asset_code: asset.code,
            asset_name: asset.name,
        })
    }

    /// Ledger entries for a wallet, most recent first, joined with the
    /// owning transaction. `limit` is clamped to [`MAX_PAGE_LIMIT`].
    pub async fn history(
        &self,
        user_id: &str,
        asset_code: &str,
        page: u64,
        limit: u64,
    ) -> Result<HistoryView, EngineError> {
        let asset = self.resolver.resolve_asset_type(asset_code).await?;
        let account = self.resolver.resolve_user_account(user_id, asset.id).await?;
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);

        let entries = self.store.list_account_entries(account.id, Page::new(page, limit)).await?;
        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            let tx = self
                .store
                .find_transaction(entry.transaction_id)
                .await?
                .ok_or(EngineError::Store(StoreError::NotFound))?;
            items.push(HistoryItem {
                id: entry.id,
                transaction_id: entry.transaction_id,
                entry_type: entry.entry_type,
                amount: entry.amount,
                balance_after: entry.balance_after,
                created_at: entry.created_at,
                transaction: TransactionInfo {
                    kind: tx.kind,
                    description: tx.description,
                    status: tx.status,
                    metadata: tx.metadata,
                },
            });
        }
        Ok(HistoryView { items, page, limit })
    }

    /// Recompute the wallet balance from its ledger entries (completed
    /// transactions only, on top of the opening balance) and compare with
    /// the cached value.
    pub async fn verify_ledger(
        &self,
        user_id: &str,
        asset_code: &str,
    ) -> Result<LedgerVerification, EngineError> {
        let asset = self.resolver.resolve_asset_type(asset_code).await?;
        let account = self.resolver.resolve_user_account(user_id, asset.id).await?;

        let entries = self.store.all_account_entries(account.id).await?;
        let mut computed = account.opening_balance;
        for entry in entries {
            let completed = self
                .store
                .find_transaction(entry.transaction_id)
                .await?
                .map(|tx| tx.status == TransactionStatus::Completed)
                .unwrap_or(false);
            if completed {
                computed += entry.signed_amount();
            }
        }

        let tolerance = Decimal::new(1, 6);
        Ok(LedgerVerification {
            cached_balance: account.balance,
            computed_balance: computed,
            is_consistent: (computed - account.balance).abs() < tolerance,
        })
    }

    // ---- Admin ----

    pub async fn create_asset_type(
        &self,
        req: CreateAssetTypeRequest,
    ) -> Result<AssetType, EngineError> {
        let code = normalize_asset_code(&req.code);
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(EngineError::validation("asset code must be alphanumeric"));
        }
        if req.decimal_places > 8 {
            return Err(EngineError::validation("decimalPlaces must be between 0 and 8"));
        }

        match self
            .store
            .insert_asset_type(NewAssetType {
                code: code.clone(),
                name: req.name,
                description: req.description,
                decimal_places: req.decimal_places,
            })
            .await
        {
            Ok(asset) => Ok(asset),
            Err(StoreError::DuplicateKey { .. }) => Err(EngineError::DuplicateAssetCode { code }),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn create_account(
        &self,
        req: CreateAccountRequest,
    ) -> Result<Account, EngineError> {
        let user_id = req.user_id.trim().to_string();
        if user_id.is_empty() {
            return Err(EngineError::validation("userId is required"));
        }
        let asset = self.resolver.resolve_asset_type(&req.asset_code).await?;

        let opening = round_to_precision(
            req.opening_balance.unwrap_or(Decimal::ZERO),
            asset.decimal_places,
        );
        if opening < Decimal::ZERO {
            return Err(EngineError::validation("openingBalance must not be negative"));
        }

        match self
            .store
            .insert_account(NewAccount {
                user_id: user_id.clone(),
                kind: req.kind,
                asset_type: asset.id,
                opening_balance: opening,
                display_name: req.display_name.unwrap_or_else(|| user_id.clone()),
                metadata: req.metadata.unwrap_or_default(),
            })
            .await
        {
            Ok(account) => Ok(account),
            Err(StoreError::DuplicateKey { .. }) => {
                Err(EngineError::DuplicateAccount { user_id })
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn list_asset_types(&self) -> Result<Vec<AssetType>, EngineError> {
        Ok(self.store.list_asset_types().await?)
    }

    pub async fn list_accounts(&self, filter: AccountFilter) -> Result<Vec<Account>, EngineError> {
        Ok(self.store.list_accounts(filter).await?)
    }

    pub async fn list_transactions(
        &self,
        filter: TransactionFilter,
        page: u64,
        limit: u64,
    ) -> Result<Vec<Transaction>, EngineError> {
        let page = Page::new(page.max(1), limit.clamp(1, MAX_PAGE_LIMIT));
        Ok(self.store.list_transactions(filter, page).await?)
    }

    /// Current balances of every system wallet, across all assets.
    pub async fn system_balances(&self) -> Result<Vec<SystemBalance>, EngineError> {
        let accounts = self
            .store
            .list_accounts(AccountFilter { kind: Some(AccountKind::System), ..Default::default() })
            .await?;
        let mut rows = Vec::with_capacity(accounts.len());
        for account in accounts {
            let asset = self
                .store
                .find_asset_type(account.asset_type)
                .await?
                .ok_or(EngineError::Store(StoreError::NotFound))?;
            rows.push(SystemBalance {
                name: account.user_id,
                asset_code: asset.code,
                balance: account.balance,
                is_active: account.is_active,
            });
        }
        Ok(rows)
    }
}
