//! Database Models
//!
//! Persistent data structures for accounts and trades. Wire serialization
//! is camelCase; the password hash never leaves the process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use sqlx::FromRow;
use std::collections::HashMap;

/// Account record in database
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub balance: f64,
    pub total_profit: f64,
    pub total_loss: f64,
    pub total_trades: i64,
    pub winning_trades: i64,
    pub losing_trades: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Trade record in database
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub id: String,
    pub account_id: String,
    pub symbol: String,
    pub direction: String, // "higher" or "lower"
    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub amount: f64,
    pub profit_percentage: f64,
    pub payout: Option<f64>,
    pub expiry_seconds: i64,
    pub expiry_time: DateTime<Utc>,
    pub status: String, // "active", "completed", "cancelled"
    pub result: String, // "pending", "won", "lost"
    #[serde(serialize_with = "serialize_metadata")]
    pub metadata: Option<String>, // JSON string
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Stored metadata is a JSON string; surface it as structured JSON on the
/// wire rather than a quoted blob.
fn serialize_metadata<S: Serializer>(
    metadata: &Option<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match metadata {
        Some(raw) => match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) => value.serialize(serializer),
            Err(_) => raw.serialize(serializer),
        },
        None => serializer.serialize_none(),
    }
}

/// Optional caller-supplied context attached to a trade. Known fields are
/// typed; anything else lands in the escape-hatch map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Create account input
#[derive(Debug, Clone)]
pub struct CreateAccount {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub balance: f64,
}

/// Partial update of an account's aggregate counters. `None` fields are
/// left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountStats {
    pub total_profit: Option<f64>,
    pub total_loss: Option<f64>,
    pub total_trades: Option<i64>,
    pub winning_trades: Option<i64>,
    pub losing_trades: Option<i64>,
}

impl UpdateAccountStats {
    pub fn is_empty(&self) -> bool {
        self.total_profit.is_none()
            && self.total_loss.is_none()
            && self.total_trades.is_none()
            && self.winning_trades.is_none()
            && self.losing_trades.is_none()
    }
}

/// Create trade input
#[derive(Debug, Clone)]
pub struct CreateTrade {
    pub id: String,
    pub account_id: String,
    pub symbol: String,
    pub direction: String,
    pub entry_price: f64,
    pub amount: f64,
    pub profit_percentage: f64,
    pub expiry_seconds: i64,
    pub metadata: Option<String>,
}

/// Aggregate statistics for one account, recomputed from completed trades
/// rather than read from the account's running counters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeStats {
    pub total_trades: i64,
    pub active_trades: i64,
    pub completed_trades: i64,
    pub winning_trades: i64,
    pub losing_trades: i64,
    pub win_rate: f64,
    pub total_profit: f64,
    pub total_loss: f64,
    pub net_profit: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_extra_fields_flatten() {
        let json = r#"{"source":"web","campaign":"spring"}"#;
        let meta: TradeMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.source.as_deref(), Some("web"));
        assert_eq!(meta.extra["campaign"], "spring");

        let round = serde_json::to_value(&meta).unwrap();
        assert_eq!(round["source"], "web");
        assert_eq!(round["campaign"], "spring");
    }

    #[test]
    fn test_update_stats_is_empty() {
        assert!(UpdateAccountStats::default().is_empty());
        let update = UpdateAccountStats {
            winning_trades: Some(2),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
