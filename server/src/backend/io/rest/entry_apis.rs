//! # REST API for Ledger Entries
//!
//! Recording spends and bonuses, undoing entries and listing days.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use log::info;
use serde::Deserialize;

use super::mappers::entry_mapper::EntryMapper;
use super::ApiError;
use crate::backend::domain::commands::ledger::RecordEntryCommand;
use crate::backend::domain::day_key::DayKey;
use crate::backend::domain::error::LedgerResult;
use crate::backend::domain::models::{EntryId, EntryType};
use crate::backend::domain::summary_service::DEFAULT_RECENT_DAYS;
use crate::backend::AppState;
use shared::{RecentEntriesResponse, RecordEntryRequest};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/spend", post(record_spend))
        .route("/bonus", post(record_bonus))
        .route("/recent", get(recent_entries))
        .route("/:day", get(entries_for_day))
        .route("/:day/:entry_id", delete(undo_entry))
}

// Query parameters for the recent entries API
#[derive(Debug, Deserialize)]
pub struct RecentEntriesQuery {
    pub days: Option<u32>,
}

fn to_command(state: &AppState, request: RecordEntryRequest) -> LedgerResult<RecordEntryCommand> {
    Ok(RecordEntryCommand {
        amount: state.money_management_service.parse_amount(&request.amount)?,
        day: request.day.as_deref().map(DayKey::parse).transpose()?,
        note: request.note,
    })
}

async fn record(state: AppState, entry_type: EntryType, request: RecordEntryRequest) -> Response {
    let command = match to_command(&state, request) {
        Ok(command) => command,
        Err(e) => return ApiError::from(e).into_response(),
    };
    let result = match entry_type {
        EntryType::Bonus => state.ledger_service.record_bonus(command).await,
        _ => state.ledger_service.record_spend(command).await,
    };
    match result {
        Ok(result) => (StatusCode::CREATED, Json(EntryMapper::to_record_response(result))).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn record_spend(
    State(state): State<AppState>,
    Json(request): Json<RecordEntryRequest>,
) -> impl IntoResponse {
    info!("POST /api/entries/spend - request: {:?}", request);
    record(state, EntryType::Spend, request).await
}

pub async fn record_bonus(
    State(state): State<AppState>,
    Json(request): Json<RecordEntryRequest>,
) -> impl IntoResponse {
    info!("POST /api/entries/bonus - request: {:?}", request);
    record(state, EntryType::Bonus, request).await
}

/// Remove an entry; removing a missing entry reports `removed: false`
pub async fn undo_entry(
    State(state): State<AppState>,
    Path((day, entry_id)): Path<(String, String)>,
) -> impl IntoResponse {
    info!("DELETE /api/entries/{}/{}", day, entry_id);

    let day = match DayKey::parse(&day) {
        Ok(day) => day,
        Err(e) => return ApiError::from(e).into_response(),
    };
    match state.ledger_service.undo_entry(&day, &EntryId::new(entry_id)).await {
        Ok(result) => (StatusCode::OK, Json(EntryMapper::to_undo_response(result))).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn entries_for_day(State(state): State<AppState>, Path(day): Path<String>) -> impl IntoResponse {
    info!("GET /api/entries/{}", day);

    let day = match DayKey::parse(&day) {
        Ok(day) => day,
        Err(e) => return ApiError::from(e).into_response(),
    };
    match state.summary_service.entries_for_day(&day).await {
        Ok(view) => (StatusCode::OK, Json(EntryMapper::to_day_entries(view))).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn recent_entries(
    State(state): State<AppState>,
    Query(query): Query<RecentEntriesQuery>,
) -> impl IntoResponse {
    info!("GET /api/entries/recent - query: {:?}", query);

    let days = query.days.unwrap_or(DEFAULT_RECENT_DAYS);
    match state.summary_service.recent_entries(days).await {
        Ok(views) => {
            let response = RecentEntriesResponse {
                days: views.into_iter().map(EntryMapper::to_day_entries).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{send, test_app};
    use axum::http::StatusCode;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use shared::{DayEntries, EntryType, ErrorResponse, RecentEntriesResponse, RecordEntryResponse, UndoEntryResponse};

    const NOW: &str = "2024-01-04T09:00:00+00:00";

    #[tokio::test]
    async fn test_record_spend_and_list_day() {
        let (app, _store, _clock) = test_app(NOW);
        let (status, recorded): (_, RecordEntryResponse) = send(
            &app,
            "POST",
            "/api/entries/spend",
            Some(json!({"amount": "$12.50", "note": "Comic book"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(recorded.day, "2024-01-04");
        assert_eq!(recorded.current_balance, dec!(-12.50));

        let (status, day): (_, DayEntries) = send(&app, "GET", "/api/entries/2024-01-04", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(day.closing_balance, dec!(-12.50));
        assert_eq!(day.entries.len(), 1);
        assert_eq!(day.entries[0].entry_type, EntryType::Spend);
        assert_eq!(day.entries[0].note.as_deref(), Some("Comic book"));
    }

    #[tokio::test]
    async fn test_record_bonus_on_past_day() {
        let (app, _store, _clock) = test_app(NOW);
        let (status, recorded): (_, RecordEntryResponse) = send(
            &app,
            "POST",
            "/api/entries/bonus",
            Some(json!({"amount": "5", "day": "2024-01-02"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(recorded.day, "2024-01-02");
        assert_eq!(recorded.current_balance, dec!(5));
    }

    #[tokio::test]
    async fn test_invalid_input_is_bad_request() {
        let (app, _store, _clock) = test_app(NOW);
        let (status, _): (_, ErrorResponse) =
            send(&app, "POST", "/api/entries/spend", Some(json!({"amount": "-3"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body): (_, ErrorResponse) = send(
            &app,
            "POST",
            "/api/entries/spend",
            Some(json!({"amount": "3", "day": "2024-02-30"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("2024-02-30"));
    }

    #[tokio::test]
    async fn test_undo_entry_twice() {
        let (app, _store, _clock) = test_app(NOW);
        let (_, recorded): (_, RecordEntryResponse) =
            send(&app, "POST", "/api/entries/bonus", Some(json!({"amount": "7"}))).await;
        let uri = format!("/api/entries/{}/{}", recorded.day, recorded.entry_id);

        let (status, undone): (_, UndoEntryResponse) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(undone.removed);
        assert_eq!(undone.current_balance, dec!(0));

        let (status, undone): (_, UndoEntryResponse) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!undone.removed);
    }

    #[tokio::test]
    async fn test_recent_entries_are_newest_first() {
        let (app, _store, _clock) = test_app(NOW);
        let (status, recent): (_, RecentEntriesResponse) =
            send(&app, "GET", "/api/entries/recent?days=3", None).await;
        assert_eq!(status, StatusCode::OK);
        let days: Vec<&str> = recent.days.iter().map(|d| d.day.as_str()).collect();
        assert_eq!(days, vec!["2024-01-04", "2024-01-03", "2024-01-02"]);

        let (_, recent): (_, RecentEntriesResponse) = send(&app, "GET", "/api/entries/recent", None).await;
        assert_eq!(recent.days.len(), 7);
    }
}
