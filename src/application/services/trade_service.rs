//! Trade Service
//!
//! Orchestrates trade lifecycle operations over the repositories: input
//! validation, outcome evaluation, and the query layer. All persistence
//! goes through the pool handed in at construction.

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::domain::entities::trade::{Settlement, TradeDirection, TradeStatus};
use crate::domain::errors::ServiceError;
use crate::persistence::account_repository::AccountRepository;
use crate::persistence::models::{CreateTrade, TradeMetadata, TradeRecord, TradeStats};
use crate::persistence::trade_repository::TradeRepository;
use crate::persistence::{DatabaseError, DbPool};

/// Validated input for trade creation
#[derive(Debug, Clone)]
pub struct NewTrade {
    pub account_id: String,
    pub symbol: String,
    pub direction: String,
    pub entry_price: f64,
    pub amount: f64,
    pub profit_percentage: f64,
    pub expiry_seconds: i64,
    pub metadata: Option<TradeMetadata>,
}

/// One page of trade history
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeHistoryPage {
    pub trades: Vec<TradeRecord>,
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
}

pub struct TradeService {
    accounts: AccountRepository,
    trades: TradeRepository,
}

impl TradeService {
    pub fn new(pool: DbPool) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            trades: TradeRepository::new(pool),
        }
    }

    /// Create a trade in the active/pending state and count it on the
    /// owning account.
    pub async fn create_trade(&self, input: NewTrade) -> Result<TradeRecord, ServiceError> {
        let direction =
            TradeDirection::parse(&input.direction).map_err(ServiceError::Validation)?;

        if input.symbol.trim().is_empty() {
            return Err(ServiceError::validation("Missing required field: symbol"));
        }
        if !input.entry_price.is_finite() || input.entry_price <= 0.0 {
            return Err(ServiceError::validation(
                "Entry price must be a positive number",
            ));
        }
        if !input.amount.is_finite() || input.amount <= 0.0 {
            return Err(ServiceError::validation("Amount must be a positive number"));
        }
        if !input.profit_percentage.is_finite() || input.profit_percentage <= 0.0 {
            return Err(ServiceError::validation(
                "Profit percentage must be a positive number",
            ));
        }
        if input.expiry_seconds <= 0 {
            return Err(ServiceError::validation(
                "Expiry seconds must be a positive integer",
            ));
        }

        if self.accounts.get(&input.account_id).await?.is_none() {
            return Err(ServiceError::not_found("Account not found"));
        }

        let metadata = match &input.metadata {
            Some(m) => Some(serde_json::to_string(m).map_err(|e| {
                ServiceError::Database(DatabaseError::QueryError(format!(
                    "Failed to serialize metadata: {}",
                    e
                )))
            })?),
            None => None,
        };

        let record = self
            .trades
            .create(CreateTrade {
                id: Uuid::new_v4().to_string(),
                account_id: input.account_id.clone(),
                symbol: input.symbol.clone(),
                direction: direction.as_str().to_string(),
                entry_price: input.entry_price,
                amount: input.amount,
                profit_percentage: input.profit_percentage,
                expiry_seconds: input.expiry_seconds,
                metadata,
            })
            .await?
            // The account can disappear between the existence check and the
            // insert; the transaction reports it the same way.
            .ok_or_else(|| ServiceError::not_found("Account not found"))?;

        info!(
            "Trade created: {} {} {} @ {} (stake {:.2})",
            record.id, record.symbol, record.direction, record.entry_price, record.amount
        );
        Ok(record)
    }

    /// Settle an active trade with an exit price. Single-use: a trade that
    /// has already left the active state reports not-found.
    pub async fn settle_trade(
        &self,
        trade_id: &str,
        exit_price: f64,
    ) -> Result<TradeRecord, ServiceError> {
        if !exit_price.is_finite() || exit_price <= 0.0 {
            return Err(ServiceError::validation(
                "Exit price must be a positive number",
            ));
        }

        let trade = self
            .trades
            .get(trade_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Trade not found or not active"))?;

        if trade.status != TradeStatus::Active.as_str() {
            return Err(ServiceError::not_found("Trade not found or not active"));
        }

        let direction = TradeDirection::parse(&trade.direction)
            .map_err(|e| ServiceError::Database(DatabaseError::QueryError(e)))?;
        let settlement = Settlement::evaluate(
            direction,
            trade.entry_price,
            exit_price,
            trade.amount,
            trade.profit_percentage,
        );

        let settled = self
            .trades
            .settle(&trade, exit_price, settlement)
            .await?
            // Lost the race to another settlement or a cancellation
            .ok_or_else(|| ServiceError::not_found("Trade not found or not active"))?;

        info!(
            "Trade settled: {} {} (exit {}, payout {:.2})",
            settled.id,
            settled.result,
            exit_price,
            settlement.payout
        );
        Ok(settled)
    }

    /// Cancel an active trade. Terminal, costless, result stays pending.
    pub async fn cancel_trade(&self, trade_id: &str) -> Result<TradeRecord, ServiceError> {
        let cancelled = self
            .trades
            .cancel(trade_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Trade not found or not active"))?;

        info!("Trade cancelled: {}", cancelled.id);
        Ok(cancelled)
    }

    /// All active trades for an account, newest first
    pub async fn active_trades(&self, account_id: &str) -> Result<Vec<TradeRecord>, ServiceError> {
        Ok(self.trades.get_active_for_account(account_id).await?)
    }

    /// One page of an account's trade history, newest first. Pages beyond
    /// the end yield an empty list.
    pub async fn trade_history(
        &self,
        account_id: &str,
        page: i64,
        limit: i64,
    ) -> Result<TradeHistoryPage, ServiceError> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let offset = (page - 1) * limit;

        let trades = self
            .trades
            .get_page_for_account(account_id, limit, offset)
            .await?;
        let total = self.trades.count_for_account(account_id).await?;
        let total_pages = (total + limit - 1) / limit;

        Ok(TradeHistoryPage {
            trades,
            total,
            page,
            total_pages,
        })
    }

    /// Active trades whose expiry has passed, for the external settlement
    /// trigger to act on.
    pub async fn expired_trades(&self) -> Result<Vec<TradeRecord>, ServiceError> {
        Ok(self.trades.get_expired_active(Utc::now()).await?)
    }

    /// Aggregate statistics for an account
    pub async fn trade_stats(&self, account_id: &str) -> Result<TradeStats, ServiceError> {
        Ok(self.trades.stats_for_account(account_id).await?)
    }
}
