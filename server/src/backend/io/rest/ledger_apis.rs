//! # REST API for Ledger Maintenance
//!
//! Backfill, recalculation and consistency checks of the closing-balance
//! index, plus crediting today's allowance.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use log::info;

use super::mappers::account_mapper::AccountMapper;
use super::mappers::entry_mapper::EntryMapper;
use super::ApiError;
use crate::backend::domain::day_key::DayKey;
use crate::backend::AppState;
use shared::RecalculateRequest;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/backfill", post(run_backfill))
        .route("/recalculate", post(recalculate))
        .route("/validate", get(validate))
        .route("/allowance/today", post(issue_today_allowance))
}

/// Credit allowances for every elapsed day since the last run
pub async fn run_backfill(State(state): State<AppState>) -> impl IntoResponse {
    info!("POST /api/ledger/backfill");

    match state.allowance_service.run_backfill().await {
        Ok(report) => (StatusCode::OK, Json(AccountMapper::to_backfill_response(report))).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Rebuild closing balances from `from_day`, or from the first known day
pub async fn recalculate(
    State(state): State<AppState>,
    Json(request): Json<RecalculateRequest>,
) -> impl IntoResponse {
    info!("POST /api/ledger/recalculate - request: {:?}", request);

    let result = match request.from_day.as_deref().map(DayKey::parse).transpose() {
        Ok(Some(day)) => state.balance_service.recalculate_from(&day).await,
        Ok(None) => state.balance_service.recalculate_all().await,
        Err(e) => return ApiError::from(e).into_response(),
    };
    match result {
        Ok(report) => (StatusCode::OK, Json(AccountMapper::to_recalculate_response(report))).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn validate(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/ledger/validate");

    match state.balance_service.validate_closing_balances().await {
        Ok(errors) => (StatusCode::OK, Json(AccountMapper::to_validation_response(errors))).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn issue_today_allowance(State(state): State<AppState>) -> impl IntoResponse {
    info!("POST /api/ledger/allowance/today");

    let issued = match state.allowance_service.issue_today_allowance().await {
        Ok(issued) => issued,
        Err(e) => return ApiError::from(e).into_response(),
    };
    let balance = match &issued {
        Some(result) => result.current_balance,
        None => match state.account_service.account().await {
            Ok(account) => account.current_balance,
            Err(e) => return ApiError::from(e).into_response(),
        },
    };
    (StatusCode::OK, Json(EntryMapper::to_issue_response(issued, balance))).into_response()
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{send, test_app};
    use axum::http::StatusCode;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use shared::{
        AccountResponse, BackfillResponse, IssueAllowanceResponse, RecalculateResponse, ValidationResponse,
    };

    #[tokio::test]
    async fn test_backfill_after_days_pass() {
        let (app, _store, clock) = test_app("2024-01-01T08:00:00+00:00");
        let (_, account): (_, AccountResponse) = send(&app, "GET", "/api/account", None).await;
        assert_eq!(account.last_processed_date, "2024-01-01");

        clock.advance_days(3);
        let (status, report): (_, BackfillResponse) = send(&app, "POST", "/api/ledger/backfill", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report.entries_appended, 2);
        assert_eq!(report.current_balance, dec!(200));
        assert_eq!(report.last_processed_date, "2024-01-04");

        let (_, report): (_, BackfillResponse) = send(&app, "POST", "/api/ledger/backfill", None).await;
        assert_eq!(report.entries_appended, 0);
        assert_eq!(report.current_balance, dec!(200));
    }

    #[tokio::test]
    async fn test_issue_today_allowance_once() {
        let (app, _store, _clock) = test_app("2024-01-01T08:00:00+00:00");
        let (status, first): (_, IssueAllowanceResponse) =
            send(&app, "POST", "/api/ledger/allowance/today", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(first.issued);
        assert!(first.entry_id.is_some());
        assert_eq!(first.current_balance, dec!(100));

        let (_, second): (_, IssueAllowanceResponse) =
            send(&app, "POST", "/api/ledger/allowance/today", None).await;
        assert!(!second.issued);
        assert_eq!(second.entry_id, None);
        assert_eq!(second.current_balance, dec!(100));
    }

    #[tokio::test]
    async fn test_balance_override_is_reported_and_repaired() {
        let (app, _store, _clock) = test_app("2024-01-04T08:00:00+00:00");
        let _: (_, serde_json::Value) =
            send(&app, "POST", "/api/entries/bonus", Some(json!({"amount": "10"}))).await;
        let _: (_, AccountResponse) =
            send(&app, "PUT", "/api/account/balance", Some(json!({"value": "99"}))).await;

        let (_, validation): (_, ValidationResponse) = send(&app, "GET", "/api/ledger/validate", None).await;
        assert!(validation.is_consistent);

        let (status, report): (_, RecalculateResponse) =
            send(&app, "POST", "/api/ledger/recalculate", Some(json!({"from_day": null}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report.from_day, "2024-01-04");
        assert_eq!(report.current_balance, dec!(10));
    }

    #[tokio::test]
    async fn test_recalculate_rejects_bad_day() {
        let (app, _store, _clock) = test_app("2024-01-04T08:00:00+00:00");
        let (status, _): (_, shared::ErrorResponse) = send(
            &app,
            "POST",
            "/api/ledger/recalculate",
            Some(json!({"from_day": "04/01/2024"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
