//! Asset and Account Resolution
//!
//! Turns symbolic inputs (user id, asset code, named system account) into
//! concrete records, validating activity and asset-type match on the way.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::EngineError;
use crate::model::{Account, AccountKind, AssetType};
use crate::store::Store;
use crate::types::{normalize_asset_code, AssetTypeId};

/// The fixed set of system wallets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemAccount {
    /// Source of top-ups
    Treasury,
    /// Source of bonus grants
    BonusPool,
    /// Destination of spends
    Revenue,
}

impl SystemAccount {
    /// The well-known `user_id` under which this wallet is stored.
    pub fn name(&self) -> &'static str {
        match self {
            SystemAccount::Treasury => "SYSTEM_TREASURY",
            SystemAccount::BonusPool => "SYSTEM_BONUS_POOL",
            SystemAccount::Revenue => "SYSTEM_REVENUE",
        }
    }
}

/// Resolves symbolic identifiers against the store.
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn Store>,
}

impl Resolver {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Resolve an asset code (case-insensitive) to an active asset type.
    pub async fn resolve_asset_type(&self, code: &str) -> Result<AssetType, EngineError> {
        let normalized = normalize_asset_code(code);
        let asset = self.store.find_asset_type_by_code(&normalized).await?;
        match asset {
            Some(asset) if asset.is_active => Ok(asset),
            _ => Err(EngineError::AssetNotFound { code: normalized }),
        }
    }

    /// Resolve a user's wallet for one asset.
    pub async fn resolve_user_account(
        &self,
        user_id: &str,
        asset_type: AssetTypeId,
    ) -> Result<Account, EngineError> {
        let account = self.store.find_account_by_owner(user_id, asset_type).await?;
        let Some(account) = account else {
            return Err(EngineError::WalletNotFound { user_id: user_id.to_string() });
        };
        if !account.is_active {
            return Err(EngineError::WalletInactive { user_id: user_id.to_string() });
        }
        Ok(account)
    }

    /// Resolve one of the well-known system wallets for one asset.
    pub async fn resolve_system_account(
        &self,
        system: SystemAccount,
        asset_type: AssetTypeId,
    ) -> Result<Account, EngineError> {
        let account = self.resolve_user_account(system.name(), asset_type).await?;
        if account.kind != AccountKind::System {
            return Err(EngineError::WalletNotFound { user_id: system.name().to_string() });
        }
        Ok(account)
    }
}
