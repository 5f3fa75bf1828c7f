//! Engine Configuration

use rust_decimal::Decimal;
use std::time::Duration;

/// Tuning knobs for the transfer engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-transaction amount ceiling. `None` means unbounded.
    pub max_transaction_amount: Option<Decimal>,
    /// Re-read attempts after losing an idempotency-key insert race.
    pub replay_read_attempts: u32,
    /// Initial backoff between re-reads; doubles each attempt.
    pub replay_backoff: Duration,
    /// Insert attempts per ledger entry before the transaction is failed.
    pub ledger_write_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_transaction_amount: None,
            replay_read_attempts: 5,
            replay_backoff: Duration::from_millis(25),
            ledger_write_retries: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff_stays_bounded() {
        let config = EngineConfig::default();
        // 25 + 50 + 100 + 200 ms of sleeping across 5 read attempts
        let total: u128 = (0..config.replay_read_attempts.saturating_sub(1))
            .map(|i| config.replay_backoff.as_millis() << i)
            .sum();
        assert!(total <= 500);
    }
}
