//! CoinVault Server: HTTP Surface
//!
//! Routes, response envelope, status-code mapping, rate limiting, and demo
//! seeding on top of the wallet engine. The engine stays transport-agnostic;
//! everything HTTP-shaped lives here.

pub mod config;
pub mod envelope;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod seed;
pub mod state;

// Re-exports
pub use config::ServerConfig;
pub use envelope::Envelope;
pub use error::ApiError;
pub use rate_limit::RateLimiter;
pub use state::AppState;

use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the full application router. Health stays outside the rate limit;
/// everything under `/api` is counted.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/api/wallets/{user_id}/balance/{asset_code}",
            get(routes::get_balance),
        )
        .route(
            "/api/wallets/{user_id}/history/{asset_code}",
            get(routes::get_history),
        )
        .route(
            "/api/wallets/{user_id}/verify/{asset_code}",
            get(routes::get_verification),
        )
        .route("/api/wallets/topup", post(routes::post_topup))
        .route("/api/wallets/bonus", post(routes::post_bonus))
        .route("/api/wallets/spend", post(routes::post_spend))
        .route(
            "/api/admin/asset-types",
            get(routes::list_asset_types).post(routes::create_asset_type),
        )
        .route(
            "/api/admin/accounts",
            get(routes::list_accounts).post(routes::create_account),
        )
        .route("/api/admin/transactions", get(routes::list_transactions))
        .route("/api/admin/system-balances", get(routes::system_balances))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit::enforce));

    Router::new()
        .route("/health", get(routes::health))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use coinvault_engine::{MemoryStore, WalletService};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn app_with_limit(max_requests: u32) -> Router {
        let service = Arc::new(WalletService::new(Arc::new(MemoryStore::new())));
        seed::seed_demo_data(&service).await.unwrap();
        let limiter = Arc::new(RateLimiter::new(max_requests, Duration::from_secs(60)));
        router(AppState::new(service, limiter))
    }

    async fn app() -> Router {
        app_with_limit(10_000).await
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn decimal(value: &serde_json::Value) -> Decimal {
        value.as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app().await.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "coinvault");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_balance_ok() {
        let response = app()
            .await
            .oneshot(get_request("/api/wallets/user_alice/balance/GOLD"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(decimal(&json["data"]["balance"]), dec!(500));
        assert_eq!(json["data"]["assetCode"], "GOLD");
    }

    #[tokio::test]
    async fn test_balance_unknown_wallet_404() {
        let response = app()
            .await
            .oneshot(get_request("/api/wallets/user_carol/balance/GOLD"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_topup_fresh_then_replay() {
        let app = app().await;
        let body = serde_json::json!({
            "userId": "user_alice",
            "assetCode": "GOLD",
            "amount": 100,
            "idempotencyKey": "topup-t1-0001",
        });

        let first = app.clone().oneshot(post_json("/api/wallets/topup", body.clone())).await.unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);
        let first_json = body_json(first).await;
        assert_eq!(first_json["isIdempotentReplay"], false);
        assert_eq!(first_json["data"]["status"], "completed");
        assert_eq!(first_json["data"]["type"], "topup");

        let second = app.clone().oneshot(post_json("/api/wallets/topup", body)).await.unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        let second_json = body_json(second).await;
        assert_eq!(second_json["isIdempotentReplay"], true);
        assert_eq!(second_json["data"]["id"], first_json["data"]["id"]);

        let balance = app
            .oneshot(get_request("/api/wallets/user_alice/balance/GOLD"))
            .await
            .unwrap();
        let json = body_json(balance).await;
        assert_eq!(decimal(&json["data"]["balance"]), dec!(600));
    }

    #[tokio::test]
    async fn test_idempotency_key_via_header() {
        let app = app().await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/wallets/topup")
            .header("content-type", "application/json")
            .header("idempotency-key", "header-key-0001")
            .body(Body::from(
                serde_json::json!({
                    "userId": "user_alice",
                    "assetCode": "GOLD",
                    "amount": 50,
                })
                .to_string(),
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["data"]["idempotencyKey"], "header-key-0001");
    }

    #[tokio::test]
    async fn test_missing_idempotency_key_400() {
        let response = app()
            .await
            .oneshot(post_json(
                "/api/wallets/topup",
                serde_json::json!({
                    "userId": "user_alice",
                    "assetCode": "GOLD",
                    "amount": 100,
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_short_idempotency_key_400() {
        let response = app()
            .await
            .oneshot(post_json(
                "/api/wallets/topup",
                serde_json::json!({
                    "userId": "user_alice",
                    "assetCode": "GOLD",
                    "amount": 100,
                    "idempotencyKey": "  k1  ",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_body_400() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/wallets/topup")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"userId": "user_alice", "amount": "not-a-number"#))
            .unwrap();
        let response = app().await.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_spend_insufficient_422() {
        let response = app()
            .await
            .oneshot(post_json(
                "/api/wallets/spend",
                serde_json::json!({
                    "userId": "user_bob",
                    "assetCode": "GOLD",
                    "amount": 200,
                    "idempotencyKey": "spend-s2-0001",
                    "itemId": "x",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_bonus_endpoint() {
        let app = app().await;
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/wallets/bonus",
                serde_json::json!({
                    "userId": "user_bob",
                    "assetCode": "POINTS",
                    "amount": 200,
                    "idempotencyKey": "bonus-b1-0001",
                    "reason": "level_complete",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["data"]["metadata"]["reason"], "level_complete");

        let balance = app
            .oneshot(get_request("/api/wallets/user_bob/balance/POINTS"))
            .await
            .unwrap();
        let json = body_json(balance).await;
        assert_eq!(decimal(&json["data"]["balance"]), dec!(500));
    }

    #[tokio::test]
    async fn test_verify_endpoint() {
        let app = app().await;
        app.clone()
            .oneshot(post_json(
                "/api/wallets/topup",
                serde_json::json!({
                    "userId": "user_alice",
                    "assetCode": "GOLD",
                    "amount": 100,
                    "idempotencyKey": "topup-t1-0001",
                }),
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(get_request("/api/wallets/user_alice/verify/GOLD"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["isConsistent"], true);
        assert_eq!(decimal(&json["data"]["cachedBalance"]), dec!(600));
        assert_eq!(decimal(&json["data"]["computedBalance"]), dec!(600));
    }

    #[tokio::test]
    async fn test_history_endpoint() {
        let app = app().await;
        app.clone()
            .oneshot(post_json(
                "/api/wallets/topup",
                serde_json::json!({
                    "userId": "user_alice",
                    "assetCode": "GOLD",
                    "amount": 100,
                    "idempotencyKey": "topup-t1-0001",
                }),
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(get_request("/api/wallets/user_alice/history/GOLD?page=1&limit=10"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let items = json["data"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["entryType"], "credit");
        assert_eq!(items[0]["transaction"]["type"], "topup");
    }

    #[tokio::test]
    async fn test_admin_create_asset_type_conflict_409() {
        let app = app().await;
        let body = serde_json::json!({
            "code": "GEMS",
            "name": "Gems",
            "decimalPlaces": 2,
        });

        let first = app.clone().oneshot(post_json("/api/admin/asset-types", body.clone())).await.unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app.oneshot(post_json("/api/admin/asset-types", body)).await.unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_admin_system_balances() {
        let response = app()
            .await
            .oneshot(get_request("/api/admin/system-balances"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let rows = json["data"].as_array().unwrap();
        assert_eq!(rows.len(), 6);
    }

    #[tokio::test]
    async fn test_admin_transactions_filter() {
        let app = app().await;
        app.clone()
            .oneshot(post_json(
                "/api/wallets/spend",
                serde_json::json!({
                    "userId": "user_bob",
                    "assetCode": "GOLD",
                    "amount": 200,
                    "idempotencyKey": "spend-s2-0001",
                    "itemId": "x",
                }),
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(get_request("/api/admin/transactions?status=failed"))
            .await
            .unwrap();
        let json = body_json(response).await;
        let rows = json["data"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["status"], "failed");
    }

    #[tokio::test]
    async fn test_rate_limit_429() {
        let app = app_with_limit(2).await;
        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(get_request("/api/wallets/user_alice/balance/GOLD"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        let response = app
            .clone()
            .oneshot(get_request("/api/wallets/user_alice/balance/GOLD"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        // Health is not counted
        let response = app.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
