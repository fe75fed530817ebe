//! # REST API for Summaries
//!
//! Week and month overviews built from the closing-balance index.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use log::info;
use serde::Deserialize;

use super::mappers::summary_mapper::SummaryMapper;
use super::ApiError;
use crate::backend::domain::day_key::DayKey;
use crate::backend::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/week", get(weekly_summary))
        .route("/month", get(monthly_summary))
}

// Query parameters for the weekly summary API
#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    /// Any day of the week; today when omitted
    pub day: Option<String>,
}

// Query parameters for the monthly summary API
#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: i32,
    pub month: u32,
}

pub async fn weekly_summary(State(state): State<AppState>, Query(query): Query<WeekQuery>) -> impl IntoResponse {
    info!("GET /api/summary/week - query: {:?}", query);

    let day = match query.day.as_deref().map(DayKey::parse).transpose() {
        Ok(Some(day)) => day,
        Ok(None) => state.clock.today(),
        Err(e) => return ApiError::from(e).into_response(),
    };
    match state.summary_service.weekly_summary(&day).await {
        Ok(summary) => (StatusCode::OK, Json(SummaryMapper::to_dto(summary))).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn monthly_summary(State(state): State<AppState>, Query(query): Query<MonthQuery>) -> impl IntoResponse {
    info!("GET /api/summary/month - query: {:?}", query);

    match state.summary_service.monthly_summary(query.year, query.month).await {
        Ok(summary) => (StatusCode::OK, Json(SummaryMapper::to_dto(summary))).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{send, test_app};
    use axum::http::StatusCode;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use shared::{ErrorResponse, PeriodSummary};

    #[tokio::test]
    async fn test_weekly_summary_defaults_to_current_week() {
        // 2024-01-04 is a Thursday
        let (app, _store, _clock) = test_app("2024-01-04T08:00:00+00:00");
        let _: (_, serde_json::Value) = send(
            &app,
            "POST",
            "/api/entries/spend",
            Some(json!({"amount": "4", "day": "2024-01-02"})),
        )
        .await;

        let (status, summary): (_, PeriodSummary) = send(&app, "GET", "/api/summary/week", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary.start, "2024-01-01");
        assert_eq!(summary.end, "2024-01-07");
        assert_eq!(summary.opening_balance, dec!(0));
        assert_eq!(summary.total_spent, dec!(4));
        assert_eq!(summary.closing_balance, dec!(-4));
        assert_eq!(summary.days.len(), 7);
        assert!(summary.days[1].has_activity);
    }

    #[tokio::test]
    async fn test_monthly_summary_validates_month() {
        let (app, _store, _clock) = test_app("2024-02-10T08:00:00+00:00");
        let (status, summary): (_, PeriodSummary) =
            send(&app, "GET", "/api/summary/month?year=2024&month=2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary.end, "2024-02-29");
        assert_eq!(summary.days.len(), 29);

        let (status, _): (_, ErrorResponse) =
            send(&app, "GET", "/api/summary/month?year=2024&month=13", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
