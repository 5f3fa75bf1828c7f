//! Shared Request State

use std::sync::Arc;

use coinvault_engine::WalletService;

use crate::rate_limit::RateLimiter;

/// State handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub wallet: Arc<WalletService>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(wallet: Arc<WalletService>, limiter: Arc<RateLimiter>) -> Self {
        Self { wallet, limiter }
    }
}
