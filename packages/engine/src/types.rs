//! Engine Types

use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Asset type identifier.
pub type AssetTypeId = Uuid;

/// Account identifier. Also the deterministic lock-ordering handle.
pub type AccountId = Uuid;

/// Transaction identifier.
pub type TransactionId = Uuid;

/// Ledger entry identifier.
pub type LedgerEntryId = Uuid;

/// Opaque key-value bag carried verbatim on accounts and transactions.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Round an amount to an asset's precision using banker's rounding
/// (half-even).
pub fn round_to_precision(amount: Decimal, decimal_places: u32) -> Decimal {
    amount.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointNearestEven)
}

/// Normalize an asset code for lookup and storage: trimmed, uppercase.
pub fn normalize_asset_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_to_precision(dec!(1.005), 2), dec!(1.00));
        assert_eq!(round_to_precision(dec!(1.015), 2), dec!(1.02));
        assert_eq!(round_to_precision(dec!(1.025), 2), dec!(1.02));
    }

    #[test]
    fn test_round_zero_places() {
        assert_eq!(round_to_precision(dec!(2.5), 0), dec!(2));
        assert_eq!(round_to_precision(dec!(3.5), 0), dec!(4));
    }

    #[test]
    fn test_round_is_noop_within_precision() {
        assert_eq!(round_to_precision(dec!(10.25), 2), dec!(10.25));
    }

    #[test]
    fn test_normalize_asset_code() {
        assert_eq!(normalize_asset_code("  gold "), "GOLD");
        assert_eq!(normalize_asset_code("Points"), "POINTS");
    }
}
