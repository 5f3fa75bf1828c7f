//! Server Configuration
//!
//! Universal parameters only, overridable from the environment.

use rust_decimal::Decimal;
use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use coinvault_engine::EngineConfig;

/// HTTP-layer configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub bind_address: IpAddr,
    /// HTTP port
    pub port: u16,
    /// Store connection string, reserved for non-memory backends
    pub database_url: Option<String>,
    /// Requests allowed per client per window
    pub rate_limit_max: u32,
    /// Rate-limit window
    pub rate_limit_window: Duration,
    /// Create the demo dataset on startup
    pub seed_demo_data: bool,
    /// Per-transaction amount ceiling handed to the engine
    pub max_transaction_amount: Option<Decimal>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 3000,
            database_url: None,
            rate_limit_max: 500,
            rate_limit_window: Duration::from_secs(15 * 60),
            seed_demo_data: false,
            max_transaction_amount: None,
        }
    }
}

impl ServerConfig {
    /// Build from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(port) = env::var("PORT") {
            if let Ok(p) = port.parse() {
                config.port = p;
            }
        }
        if let Ok(addr) = env::var("BIND_ADDRESS") {
            if let Ok(a) = addr.parse() {
                config.bind_address = a;
            }
        }
        if let Ok(max) = env::var("RATE_LIMIT_MAX") {
            if let Ok(m) = max.parse() {
                config.rate_limit_max = m;
            }
        }
        if let Ok(secs) = env::var("RATE_LIMIT_WINDOW_SECS") {
            if let Ok(s) = secs.parse() {
                config.rate_limit_window = Duration::from_secs(s);
            }
        }
        if let Ok(limit) = env::var("MAX_TRANSACTION_AMOUNT") {
            if let Ok(l) = limit.parse() {
                config.max_transaction_amount = Some(l);
            }
        }
        config.seed_demo_data = env::var("SEED_DEMO_DATA")
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        // Common connection-string names, most specific first
        config.database_url = env::var("DATABASE_URL")
            .or_else(|_| env::var("MONGODB_URI"))
            .or_else(|_| env::var("DB_URL"))
            .ok();

        config
    }

    /// Engine tuning derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_transaction_amount: self.max_transaction_amount,
            ..EngineConfig::default()
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.rate_limit_max, 500);
        assert_eq!(config.rate_limit_window, Duration::from_secs(900));
        assert!(!config.seed_demo_data);
        assert!(config.max_transaction_amount.is_none());
    }

    #[test]
    fn test_engine_config_carries_ceiling() {
        let config = ServerConfig {
            max_transaction_amount: Some(dec!(1000)),
            ..ServerConfig::default()
        };
        assert_eq!(config.engine_config().max_transaction_amount, Some(dec!(1000)));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("1"));
        assert!(parse_bool(" YES "));
        assert!(!parse_bool("false"));
        assert!(!parse_bool(""));
    }
}
