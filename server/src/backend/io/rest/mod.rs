//! # REST API Interface Layer
//!
//! HTTP endpoints of the allowance ledger, mounted under `/api`. Handlers
//! parse user input, call one domain service and map the result to the
//! shared DTOs. They hold no business logic.
//!
//! ## Error Translation
//!
//! | Domain error            | Status                      |
//! |-------------------------|-----------------------------|
//! | invalid amount/note/day | 400 Bad Request             |
//! | store unavailable       | 503 Service Unavailable     |
//!
//! Error bodies are `{"error": "<message>"}`.

pub mod account_apis;
pub mod entry_apis;
pub mod ledger_apis;
pub mod mappers;
pub mod summary_apis;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Router,
};
use log::{error, warn};
use shared::ErrorResponse;

use crate::backend::domain::error::LedgerError;
use crate::backend::AppState;

/// All API routes, relative to `/api`
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/account", account_apis::router())
        .nest("/entries", entry_apis::router())
        .nest("/ledger", ledger_apis::router())
        .nest("/summary", summary_apis::router())
}

/// A domain error on its way out as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(error: LedgerError) -> Self {
        ApiError(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        if self.0.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Rejected request: {}", self.0);
        }
        let body = ErrorResponse {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use rust_decimal::Decimal;
    use serde::de::DeserializeOwned;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::backend::domain::clock::FixedClock;
    use crate::backend::storage::InMemoryLedgerStore;
    use crate::backend::{create_router, AppState};

    /// Router over an in-memory store with the clock fixed at `now`
    pub fn test_app(now: &str) -> (Router, InMemoryLedgerStore, Arc<FixedClock>) {
        let store = InMemoryLedgerStore::new();
        let clock = Arc::new(FixedClock::at(now).unwrap());
        let state = AppState::new(Arc::new(store.clone()), clock.clone(), Decimal::from(100));
        (create_router(state), store, clock)
    }

    pub async fn send<T: DeserializeOwned>(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, T) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}
