//! Demo Dataset
//!
//! Seeds two currencies, the three system wallets per currency, and a pair
//! of user wallets. Skipped when the dataset is already present, so restarts
//! are harmless.

use rust_decimal::Decimal;

use coinvault_engine::{
    AccountKind, CreateAccountRequest, CreateAssetTypeRequest, EngineError, WalletService,
};

const GOLD_TREASURY_FLOAT: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 0);
const POINTS_BONUS_FLOAT: Decimal = Decimal::from_parts(5_000_000, 0, 0, false, 0);

pub async fn seed_demo_data(service: &WalletService) -> Result<(), EngineError> {
    if service.list_asset_types().await?.iter().any(|a| a.code == "GOLD") {
        tracing::info!("demo data already present, skipping seed");
        return Ok(());
    }

    service
        .create_asset_type(CreateAssetTypeRequest {
            code: "GOLD".into(),
            name: "Gold".into(),
            description: "Premium in-app currency".into(),
            decimal_places: 2,
        })
        .await?;
    service
        .create_asset_type(CreateAssetTypeRequest {
            code: "POINTS".into(),
            name: "Loyalty Points".into(),
            description: "Earned loyalty currency".into(),
            decimal_places: 0,
        })
        .await?;

    let system_wallets = [
        ("SYSTEM_TREASURY", "GOLD", GOLD_TREASURY_FLOAT),
        ("SYSTEM_BONUS_POOL", "GOLD", Decimal::ZERO),
        ("SYSTEM_REVENUE", "GOLD", Decimal::ZERO),
        ("SYSTEM_TREASURY", "POINTS", Decimal::ZERO),
        ("SYSTEM_BONUS_POOL", "POINTS", POINTS_BONUS_FLOAT),
        ("SYSTEM_REVENUE", "POINTS", Decimal::ZERO),
    ];
    for (name, code, opening) in system_wallets {
        service
            .create_account(CreateAccountRequest {
                user_id: name.into(),
                kind: AccountKind::System,
                asset_code: code.into(),
                opening_balance: Some(opening),
                display_name: Some(name.into()),
                metadata: None,
            })
            .await?;
    }

    let user_wallets = [
        ("user_alice", "GOLD", Decimal::from(500)),
        ("user_bob", "GOLD", Decimal::from(150)),
        ("user_bob", "POINTS", Decimal::from(300)),
    ];
    for (user_id, code, opening) in user_wallets {
        service
            .create_account(CreateAccountRequest {
                user_id: user_id.into(),
                kind: AccountKind::User,
                asset_code: code.into(),
                opening_balance: Some(opening),
                display_name: None,
                metadata: None,
            })
            .await?;
    }

    tracing::info!("demo data seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinvault_engine::MemoryStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_seed_creates_expected_balances() {
        let service = WalletService::new(Arc::new(MemoryStore::new()));
        seed_demo_data(&service).await.unwrap();

        assert_eq!(service.balance("user_alice", "GOLD").await.unwrap().balance, dec!(500));
        assert_eq!(service.balance("user_bob", "POINTS").await.unwrap().balance, dec!(300));

        let system = service.system_balances().await.unwrap();
        let treasury = system
            .iter()
            .find(|s| s.name == "SYSTEM_TREASURY" && s.asset_code == "GOLD")
            .unwrap();
        assert_eq!(treasury.balance, dec!(10000000));
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let service = WalletService::new(Arc::new(MemoryStore::new()));
        seed_demo_data(&service).await.unwrap();
        seed_demo_data(&service).await.unwrap();

        assert_eq!(service.list_asset_types().await.unwrap().len(), 2);
    }
}
