//! Trade endpoints: creation, settlement, cancellation, and the query
//! layer (active, history, stats, expired).

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use super::{bad_request, map_service_error, ApiError, AppState};
use crate::application::services::trade_service::NewTrade;
use crate::persistence::models::TradeMetadata;

/// Query parameters naming the owning account
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountQuery {
    pub user_id: Option<String>,
}

/// Query parameters for paginated history
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub user_id: Option<String>,
    /// Pagination page number (default 1)
    pub page: Option<i64>,
    /// Results per page (default 10, max 100)
    pub limit: Option<i64>,
}

/// Create a new trade
pub async fn create_trade(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account_id = payload["userId"]
        .as_str()
        .ok_or_else(|| bad_request("Missing userId field"))?;
    let symbol = payload["symbol"]
        .as_str()
        .ok_or_else(|| bad_request("Missing symbol field"))?;
    let direction = payload["direction"]
        .as_str()
        .ok_or_else(|| bad_request("Missing direction field"))?;
    let entry_price = payload["entryPrice"]
        .as_f64()
        .ok_or_else(|| bad_request("Missing or invalid entryPrice field"))?;
    let amount = payload["amount"]
        .as_f64()
        .ok_or_else(|| bad_request("Missing or invalid amount field"))?;
    let profit_percentage = payload["profitPercentage"]
        .as_f64()
        .ok_or_else(|| bad_request("Missing or invalid profitPercentage field"))?;
    let expiry_seconds = payload["expirySeconds"]
        .as_i64()
        .ok_or_else(|| bad_request("Missing or invalid expirySeconds field"))?;

    let metadata = match payload.get("metadata") {
        None | Some(serde_json::Value::Null) => None,
        Some(value) => Some(
            serde_json::from_value::<TradeMetadata>(value.clone())
                .map_err(|e| bad_request(format!("Invalid metadata: {}", e)))?,
        ),
    };

    let trade = state
        .trades
        .create_trade(NewTrade {
            account_id: account_id.to_string(),
            symbol: symbol.to_string(),
            direction: direction.to_string(),
            entry_price,
            amount,
            profit_percentage,
            expiry_seconds,
            metadata,
        })
        .await
        .map_err(map_service_error)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "trade": trade,
    })))
}

/// Settle a trade with its exit price
pub async fn complete_trade(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let exit_price = payload["exitPrice"]
        .as_f64()
        .ok_or_else(|| bad_request("Missing or invalid exitPrice field"))?;

    let trade = state
        .trades
        .settle_trade(&id, exit_price)
        .await
        .map_err(map_service_error)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "trade": trade,
    })))
}

/// Cancel an active trade
pub async fn cancel_trade(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let trade = state
        .trades
        .cancel_trade(&id)
        .await
        .map_err(map_service_error)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "trade": trade,
    })))
}

/// List an account's active trades
pub async fn get_active_trades(
    State(state): State<AppState>,
    Query(params): Query<AccountQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account_id = params
        .user_id
        .ok_or_else(|| bad_request("Missing userId parameter"))?;

    let trades = state
        .trades
        .active_trades(&account_id)
        .await
        .map_err(map_service_error)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "trades": trades,
    })))
}

/// Paginated trade history for an account
pub async fn get_trade_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account_id = params
        .user_id
        .ok_or_else(|| bad_request("Missing userId parameter"))?;
    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(10);

    let history = state
        .trades
        .trade_history(&account_id, page, limit)
        .await
        .map_err(map_service_error)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": history,
    })))
}

/// Aggregate trade statistics for an account
pub async fn get_trade_stats(
    State(state): State<AppState>,
    Query(params): Query<AccountQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account_id = params
        .user_id
        .ok_or_else(|| bad_request("Missing userId parameter"))?;

    let stats = state
        .trades
        .trade_stats(&account_id)
        .await
        .map_err(map_service_error)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "stats": stats,
    })))
}

/// Active trades past their expiry, for the external settlement trigger
pub async fn get_expired_trades(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let trades = state
        .trades
        .expired_trades()
        .await
        .map_err(map_service_error)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "trades": trades,
    })))
}
