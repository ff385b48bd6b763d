//! Account endpoints: creation, lookup, balance/stats updates, listing.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use super::{bad_request, map_service_error, ApiError, AppState};
use crate::application::services::account_service::NewAccount;
use crate::persistence::models::UpdateAccountStats;

/// Query parameters for the account listing
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Create a new account
pub async fn create_account(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let email = payload["email"]
        .as_str()
        .ok_or_else(|| bad_request("Missing email field"))?;
    let password = payload["password"]
        .as_str()
        .ok_or_else(|| bad_request("Missing password field"))?;
    let first_name = payload["firstName"].as_str().map(str::to_string);
    let last_name = payload["lastName"].as_str().map(str::to_string);
    let balance = payload.get("balance").and_then(|v| v.as_f64());

    let account = state
        .accounts
        .create_account(NewAccount {
            email: email.to_string(),
            password: password.to_string(),
            first_name,
            last_name,
            balance,
        })
        .await
        .map_err(map_service_error)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "user": account,
    })))
}

/// Fetch one account by id
pub async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account = state
        .accounts
        .get_account(&id)
        .await
        .map_err(map_service_error)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "user": account,
    })))
}

/// Overwrite the balance and/or patch the stats counters
pub async fn update_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let balance = payload.get("balance").and_then(|v| v.as_f64());
    let stats = match payload.get("stats") {
        None | Some(serde_json::Value::Null) => None,
        Some(value) => Some(
            serde_json::from_value::<UpdateAccountStats>(value.clone())
                .map_err(|e| bad_request(format!("Invalid stats: {}", e)))?,
        ),
    };

    let account = state
        .accounts
        .update_account(&id, balance, stats)
        .await
        .map_err(map_service_error)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "user": account,
    })))
}

/// Paginated account listing
pub async fn list_accounts(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(10);

    let accounts = state
        .accounts
        .list_accounts(page, limit)
        .await
        .map_err(map_service_error)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": accounts,
    })))
}
