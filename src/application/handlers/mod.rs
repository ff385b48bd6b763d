//! HTTP Handlers
//!
//! The request boundary: axum handlers, the shared application state, and
//! the mapping from service errors to JSON error envelopes.

pub mod account_handler;
pub mod trade_handler;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use crate::application::services::account_service::AccountService;
use crate::application::services::trade_service::TradeService;
use crate::domain::errors::ServiceError;
use crate::persistence::DbPool;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub trades: Arc<TradeService>,
    pub accounts: Arc<AccountService>,
    pub pool: DbPool,
}

impl AppState {
    pub fn new(pool: DbPool) -> Self {
        Self {
            trades: Arc::new(TradeService::new(pool.clone())),
            accounts: Arc::new(AccountService::new(pool.clone())),
            pool,
        }
    }
}

/// Error envelope returned for every failure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a service error onto its HTTP status and envelope. Unexpected
/// failures are logged and redacted to a generic message, with the detail
/// carried in the `error` field for diagnostics.
pub fn map_service_error(err: ServiceError) -> ApiError {
    match err {
        ServiceError::Validation(message) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                success: false,
                message,
                error: None,
            }),
        ),
        ServiceError::NotFound(message) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                success: false,
                message,
                error: None,
            }),
        ),
        ServiceError::Conflict(message) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                success: false,
                message,
                error: None,
            }),
        ),
        ServiceError::Database(e) => {
            error!("Unexpected persistence failure: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    success: false,
                    message: "Internal server error".to_string(),
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

/// Shorthand for a missing/invalid body field
pub fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            success: false,
            message: message.into(),
            error: None,
        }),
    )
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/trades",
            post(trade_handler::create_trade).get(trade_handler::get_trade_history),
        )
        .route("/trades/active", get(trade_handler::get_active_trades))
        .route("/trades/expired", get(trade_handler::get_expired_trades))
        .route("/trades/stats", get(trade_handler::get_trade_stats))
        .route("/trades/:id/complete", put(trade_handler::complete_trade))
        .route("/trades/:id/cancel", put(trade_handler::cancel_trade))
        .route(
            "/users",
            post(account_handler::create_account).get(account_handler::list_accounts),
        )
        .route(
            "/users/:id",
            get(account_handler::get_account).put(account_handler::update_account),
        )
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let database_ok = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();

    Json(serde_json::json!({
        "status": "running",
        "database": database_ok,
    }))
}
