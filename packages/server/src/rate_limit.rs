//! Per-Client Rate Limiting
//!
//! Fixed window per client IP. The window resets when it expires; requests
//! beyond the allowance inside one window get 429.

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::error::ApiError;
use crate::state::AppState;

struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter keyed by client.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: RwLock<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self { max_requests, window, windows: RwLock::new(HashMap::new()) }
    }

    /// Record one request for `client`; false when the allowance is spent.
    pub fn check(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.write();
        let window = windows
            .entry(client.to_string())
            .or_insert(Window { started: now, count: 0 });

        if now.duration_since(window.started) >= self.window {
            window.started = now;
            window.count = 0;
        }
        if window.count >= self.max_requests {
            return false;
        }
        window.count += 1;
        true
    }
}

/// Axum middleware enforcing the limiter for every request it wraps.
pub async fn enforce(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if !state.limiter.check(&client) {
        tracing::warn!(client = %client, "rate limit exceeded");
        return ApiError::RateLimited.into_response();
    }
    next.run(req).await
}
