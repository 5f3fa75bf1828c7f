//! Route Handlers
//!
//! Maps the engine's typed operations to the public HTTP contract. Write
//! endpoints require an idempotency key, taken from the `idempotency-key`
//! header or the `idempotencyKey` body field, and answer 201 on fresh
//! execution versus 200 on replay.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;

use coinvault_engine::store::{AccountFilter, TransactionFilter};
use coinvault_engine::{
    AccountKind, BonusRequest, CreateAccountRequest, CreateAssetTypeRequest, Metadata,
    SpendRequest, TopUpRequest, TransactionKind, TransactionStatus, TransferOutcome,
};

use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::state::AppState;

/// Shortest accepted idempotency key after trimming.
const MIN_IDEMPOTENCY_KEY_LEN: usize = 8;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "coinvault",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

// ---- Wallet reads ----

pub async fn get_balance(
    State(state): State<AppState>,
    Path((user_id, asset_code)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let view = state.wallet.balance(&user_id, &asset_code).await?;
    Ok(Json(Envelope::ok(view)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    coinvault_engine::ops::DEFAULT_PAGE_LIMIT
}

pub async fn get_history(
    State(state): State<AppState>,
    Path((user_id, asset_code)): Path<(String, String)>,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, ApiError> {
    let view = state
        .wallet
        .history(&user_id, &asset_code, query.page, query.limit)
        .await?;
    Ok(Json(Envelope::ok(view)).into_response())
}

pub async fn get_verification(
    State(state): State<AppState>,
    Path((user_id, asset_code)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let view = state.wallet.verify_ledger(&user_id, &asset_code).await?;
    Ok(Json(Envelope::ok(view)).into_response())
}

// ---- Wallet writes ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopUpBody {
    pub user_id: String,
    pub asset_code: String,
    pub amount: Decimal,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusBody {
    pub user_id: String,
    pub asset_code: String,
    pub amount: Decimal,
    pub reason: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendBody {
    pub user_id: String,
    pub asset_code: String,
    pub amount: Decimal,
    pub item_id: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Malformed JSON bodies are a caller problem, not a 422/415.
fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
    }
}

/// Header takes precedence over the body field.
fn idempotency_key(headers: &HeaderMap, body_key: Option<String>) -> Result<String, ApiError> {
    let raw = headers
        .get("idempotency-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or(body_key)
        .unwrap_or_default();
    let key = raw.trim().to_string();
    if key.len() < MIN_IDEMPOTENCY_KEY_LEN {
        return Err(ApiError::IdempotencyKey);
    }
    Ok(key)
}

fn write_response(outcome: TransferOutcome) -> Response {
    let status = if outcome.is_replay { StatusCode::OK } else { StatusCode::CREATED };
    (status, Json(Envelope::write(outcome.transaction, outcome.is_replay))).into_response()
}

pub async fn post_topup(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<TopUpBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let body = parse_body(body)?;
    let key = idempotency_key(&headers, body.idempotency_key)?;
    let outcome = state
        .wallet
        .top_up(TopUpRequest {
            user_id: body.user_id,
            asset_code: body.asset_code,
            amount: body.amount,
            idempotency_key: key,
            metadata: body.metadata,
        })
        .await?;
    Ok(write_response(outcome))
}

pub async fn post_bonus(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<BonusBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let body = parse_body(body)?;
    let key = idempotency_key(&headers, body.idempotency_key)?;
    let outcome = state
        .wallet
        .bonus(BonusRequest {
            user_id: body.user_id,
            asset_code: body.asset_code,
            amount: body.amount,
            idempotency_key: key,
            reason: body.reason,
            metadata: body.metadata,
        })
        .await?;
    Ok(write_response(outcome))
}

pub async fn post_spend(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<SpendBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let body = parse_body(body)?;
    let key = idempotency_key(&headers, body.idempotency_key)?;
    let outcome = state
        .wallet
        .spend(SpendRequest {
            user_id: body.user_id,
            asset_code: body.asset_code,
            amount: body.amount,
            idempotency_key: key,
            item_id: body.item_id,
            metadata: body.metadata,
        })
        .await?;
    Ok(write_response(outcome))
}

// ---- Admin ----

pub async fn list_asset_types(State(state): State<AppState>) -> Result<Response, ApiError> {
    let assets = state.wallet.list_asset_types().await?;
    Ok(Json(Envelope::ok(assets)).into_response())
}

pub async fn create_asset_type(
    State(state): State<AppState>,
    body: Result<Json<CreateAssetTypeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let asset = state.wallet.create_asset_type(parse_body(body)?).await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(asset))).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountQuery {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(rename = "accountType", default)]
    pub kind: Option<AccountKind>,
}

pub async fn list_accounts(
    State(state): State<AppState>,
    Query(query): Query<AccountQuery>,
) -> Result<Response, ApiError> {
    let accounts = state
        .wallet
        .list_accounts(AccountFilter {
            user_id: query.user_id,
            kind: query.kind,
            asset_type: None,
        })
        .await?;
    Ok(Json(Envelope::ok(accounts)).into_response())
}

pub async fn create_account(
    State(state): State<AppState>,
    body: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let account = state.wallet.create_account(parse_body(body)?).await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(account))).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    #[serde(default)]
    pub status: Option<TransactionStatus>,
    #[serde(rename = "type", default)]
    pub kind: Option<TransactionKind>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Response, ApiError> {
    let transactions = state
        .wallet
        .list_transactions(
            TransactionFilter {
                status: query.status,
                kind: query.kind,
                ..Default::default()
            },
            query.page,
            query.limit,
        )
        .await?;
    Ok(Json(Envelope::ok(transactions)).into_response())
}

pub async fn system_balances(State(state): State<AppState>) -> Result<Response, ApiError> {
    let balances = state.wallet.system_balances().await?;
    Ok(Json(Envelope::ok(balances)).into_response())
}
