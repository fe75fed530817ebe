//! # REST API for the Account
//!
//! Current balance, daily allowance and the backfill watermark.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, put},
    Router,
};
use log::info;

use super::mappers::account_mapper::AccountMapper;
use super::ApiError;
use crate::backend::AppState;
use shared::{SetBalanceRequest, UpdateAllowanceRequest};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_account))
        .route("/balance", put(set_balance))
        .route("/allowance", put(update_allowance))
}

/// Account fields together with today's day key
pub async fn get_account(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/account");

    match state.summary_service.account_view().await {
        Ok(view) => (StatusCode::OK, Json(AccountMapper::to_account_response(view))).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Override the current balance without touching history
pub async fn set_balance(
    State(state): State<AppState>,
    Json(request): Json<SetBalanceRequest>,
) -> impl IntoResponse {
    info!("PUT /api/account/balance - request: {:?}", request);

    let value = match state.money_management_service.parse_balance(&request.value) {
        Ok(value) => value,
        Err(e) => return ApiError::from(e).into_response(),
    };
    if let Err(e) = state.ledger_service.set_current_balance(value).await {
        return ApiError::from(e).into_response();
    }
    get_account(State(state)).await.into_response()
}

pub async fn update_allowance(
    State(state): State<AppState>,
    Json(request): Json<UpdateAllowanceRequest>,
) -> impl IntoResponse {
    info!("PUT /api/account/allowance - request: {:?}", request);

    let value = match state.money_management_service.parse_amount(&request.value) {
        Ok(value) => value,
        Err(e) => return ApiError::from(e).into_response(),
    };
    if let Err(e) = state.ledger_service.update_daily_allowance(value).await {
        return ApiError::from(e).into_response();
    }
    get_account(State(state)).await.into_response()
}
