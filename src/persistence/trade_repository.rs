//! Trade Repository
//!
//! Data access layer for trade records. Settlement and cancellation use
//! conditional updates (`WHERE status = 'active'`) with an affected-row
//! check so concurrent transition attempts cannot both succeed, and the
//! trade + ledger mutations of a settlement commit as one transaction.

use super::models::*;
use super::{DatabaseError, DbPool};
use crate::domain::entities::trade::{Settlement, TradeOutcome};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error};

/// Trade repository
pub struct TradeRepository {
    pool: DbPool,
}

impl TradeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new trade in the active/pending state and bump the owning
    /// account's trade counter in the same transaction.
    ///
    /// Returns `Ok(None)` when the account does not exist.
    pub async fn create(&self, trade: CreateTrade) -> Result<Option<TradeRecord>, DatabaseError> {
        let now = Utc::now();
        let expiry_time = now + Duration::seconds(trade.expiry_seconds);

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            DatabaseError::QueryError(format!("Failed to begin transaction: {}", e))
        })?;

        let counted = sqlx::query(
            "UPDATE accounts SET total_trades = total_trades + 1, updated_at = ?1 WHERE id = ?2",
        )
        .bind(now)
        .bind(&trade.account_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to count trade for account {}: {}", trade.account_id, e);
            DatabaseError::QueryError(format!("Failed to update account: {}", e))
        })?
        .rows_affected();

        if counted == 0 {
            return Ok(None);
        }

        let record = sqlx::query_as::<_, TradeRecord>(
            r#"
            INSERT INTO trades (
                id, account_id, symbol, direction, entry_price, exit_price,
                amount, profit_percentage, payout, expiry_seconds, expiry_time,
                status, result, metadata, created_at, updated_at, completed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7, NULL, ?8, ?9,
                    'active', 'pending', ?10, ?11, ?11, NULL)
            RETURNING *
            "#,
        )
        .bind(&trade.id)
        .bind(&trade.account_id)
        .bind(&trade.symbol)
        .bind(&trade.direction)
        .bind(trade.entry_price)
        .bind(trade.amount)
        .bind(trade.profit_percentage)
        .bind(trade.expiry_seconds)
        .bind(expiry_time)
        .bind(&trade.metadata)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to create trade: {}", e);
            DatabaseError::QueryError(format!("Failed to create trade: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit trade creation: {}", e);
            DatabaseError::QueryError(format!("Failed to commit trade creation: {}", e))
        })?;

        debug!("Created trade: {} for {}", record.id, record.symbol);
        Ok(Some(record))
    }

    /// Get trade by ID
    pub async fn get(&self, id: &str) -> Result<Option<TradeRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, TradeRecord>("SELECT * FROM trades WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to get trade {}: {}", id, e);
                DatabaseError::QueryError(format!("Failed to get trade: {}", e))
            })?;

        Ok(record)
    }

    /// Settle an active trade: record the exit price and outcome, and apply
    /// the ledger effects, all in one transaction.
    ///
    /// Returns `Ok(None)` when the trade does not exist or has already left
    /// the active state; the row-count guard lets exactly one concurrent
    /// transition through.
    pub async fn settle(
        &self,
        trade: &TradeRecord,
        exit_price: f64,
        settlement: Settlement,
    ) -> Result<Option<TradeRecord>, DatabaseError> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            DatabaseError::QueryError(format!("Failed to begin transaction: {}", e))
        })?;

        let transitioned = sqlx::query(
            r#"
            UPDATE trades
            SET exit_price = ?1, status = 'completed', result = ?2,
                payout = ?3, completed_at = ?4, updated_at = ?4
            WHERE id = ?5 AND status = 'active'
            "#,
        )
        .bind(exit_price)
        .bind(settlement.outcome.as_str())
        .bind(settlement.payout)
        .bind(now)
        .bind(&trade.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to settle trade {}: {}", trade.id, e);
            DatabaseError::QueryError(format!("Failed to settle trade: {}", e))
        })?
        .rows_affected();

        if transitioned == 0 {
            return Ok(None);
        }

        let account_update = match settlement.outcome {
            TradeOutcome::Won => sqlx::query(
                r#"
                UPDATE accounts
                SET winning_trades = winning_trades + 1,
                    total_profit = total_profit + ?1,
                    balance = balance + ?2,
                    updated_at = ?3
                WHERE id = ?4
                "#,
            )
            .bind(settlement.payout - trade.amount)
            .bind(settlement.payout)
            .bind(now)
            .bind(&trade.account_id),
            _ => sqlx::query(
                r#"
                UPDATE accounts
                SET losing_trades = losing_trades + 1,
                    total_loss = total_loss + ?1,
                    updated_at = ?2
                WHERE id = ?3
                "#,
            )
            .bind(trade.amount)
            .bind(now)
            .bind(&trade.account_id),
        };

        account_update.execute(&mut *tx).await.map_err(|e| {
            error!(
                "Failed to apply settlement to account {}: {}",
                trade.account_id, e
            );
            DatabaseError::QueryError(format!("Failed to update account: {}", e))
        })?;

        let record = sqlx::query_as::<_, TradeRecord>("SELECT * FROM trades WHERE id = ?1")
            .bind(&trade.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to reload trade {}: {}", trade.id, e);
                DatabaseError::QueryError(format!("Failed to reload trade: {}", e))
            })?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit settlement: {}", e);
            DatabaseError::QueryError(format!("Failed to commit settlement: {}", e))
        })?;

        debug!(
            "Settled trade: {} ({}, payout {:.2})",
            trade.id,
            settlement.outcome.as_str(),
            settlement.payout
        );
        Ok(Some(record))
    }

    /// Cancel an active trade. No ledger effect; the result stays pending.
    ///
    /// Returns `Ok(None)` when the trade does not exist or is not active.
    pub async fn cancel(&self, id: &str) -> Result<Option<TradeRecord>, DatabaseError> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, TradeRecord>(
            r#"
            UPDATE trades
            SET status = 'cancelled', completed_at = ?1, updated_at = ?1
            WHERE id = ?2 AND status = 'active'
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to cancel trade {}: {}", id, e);
            DatabaseError::QueryError(format!("Failed to cancel trade: {}", e))
        })?;

        if record.is_some() {
            debug!("Cancelled trade: {}", id);
        }
        Ok(record)
    }

    /// Get all active trades for an account, newest first
    pub async fn get_active_for_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<TradeRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, TradeRecord>(
            r#"
            SELECT * FROM trades
            WHERE account_id = ?1 AND status = 'active'
            ORDER BY created_at DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get active trades for {}: {}", account_id, e);
            DatabaseError::QueryError(format!("Failed to get active trades: {}", e))
        })?;

        Ok(records)
    }

    /// Get one page of an account's trade history, newest first
    pub async fn get_page_for_account(
        &self,
        account_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TradeRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, TradeRecord>(
            r#"
            SELECT * FROM trades
            WHERE account_id = ?1
            ORDER BY created_at DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get trade page for {}: {}", account_id, e);
            DatabaseError::QueryError(format!("Failed to get trades: {}", e))
        })?;

        Ok(records)
    }

    /// Total number of trades for an account
    pub async fn count_for_account(&self, account_id: &str) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trades WHERE account_id = ?1")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to count trades for {}: {}", account_id, e);
                DatabaseError::QueryError(format!("Failed to count trades: {}", e))
            })?;

        Ok(row.0)
    }

    /// Active trades whose expiry has passed, oldest expiry first. Polled
    /// by an external settlement trigger.
    pub async fn get_expired_active(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<TradeRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, TradeRecord>(
            r#"
            SELECT * FROM trades
            WHERE status = 'active' AND expiry_time <= ?1
            ORDER BY expiry_time ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get expired trades: {}", e);
            DatabaseError::QueryError(format!("Failed to get expired trades: {}", e))
        })?;

        Ok(records)
    }

    /// Aggregate statistics for one account. Profit and loss are recomputed
    /// by summing over completed trades rather than read from the account's
    /// running counters.
    pub async fn stats_for_account(&self, account_id: &str) -> Result<TradeStats, DatabaseError> {
        let row: (i64, i64, i64, i64, i64, f64, f64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN status = 'active' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN result = 'won' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN result = 'lost' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN result = 'won' THEN payout - amount ELSE 0 END), 0.0),
                COALESCE(SUM(CASE WHEN result = 'lost' THEN amount ELSE 0 END), 0.0)
            FROM trades
            WHERE account_id = ?1
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to compute stats for {}: {}", account_id, e);
            DatabaseError::QueryError(format!("Failed to compute stats: {}", e))
        })?;

        let (total, active, completed, won, lost, profit, loss) = row;
        Ok(TradeStats {
            total_trades: total,
            active_trades: active,
            completed_trades: completed,
            winning_trades: won,
            losing_trades: lost,
            win_rate: crate::domain::entities::account::win_rate(won, total),
            total_profit: profit,
            total_loss: loss,
            net_profit: profit - loss,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::trade::TradeDirection;
    use crate::persistence::account_repository::AccountRepository;
    use crate::persistence::init_database;

    async fn setup() -> (DbPool, AccountRepository, TradeRepository) {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let accounts = AccountRepository::new(pool.clone());
        let trades = TradeRepository::new(pool.clone());

        accounts
            .create(CreateAccount {
                id: "acct-1".to_string(),
                email: "trader@example.com".to_string(),
                password_hash: "$2b$12$test".to_string(),
                first_name: None,
                last_name: None,
                balance: 5000.0,
            })
            .await
            .unwrap();

        (pool, accounts, trades)
    }

    fn test_trade(id: &str) -> CreateTrade {
        CreateTrade {
            id: id.to_string(),
            account_id: "acct-1".to_string(),
            symbol: "BTC-USD".to_string(),
            direction: "higher".to_string(),
            entry_price: 100.0,
            amount: 50.0,
            profit_percentage: 80.0,
            expiry_seconds: 60,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_create_counts_trade_on_account() {
        let (_pool, accounts, trades) = setup().await;

        let created = trades.create(test_trade("t-1")).await.unwrap().unwrap();
        assert_eq!(created.status, "active");
        assert_eq!(created.result, "pending");
        assert!(created.exit_price.is_none());
        assert!(created.payout.is_none());

        let account = accounts.get("acct-1").await.unwrap().unwrap();
        assert_eq!(account.total_trades, 1);
    }

    #[tokio::test]
    async fn test_create_for_unknown_account() {
        let (_pool, _accounts, trades) = setup().await;

        let mut trade = test_trade("t-1");
        trade.account_id = "missing".to_string();
        let created = trades.create(trade).await.unwrap();
        assert!(created.is_none());
    }

    #[tokio::test]
    async fn test_winning_settlement_updates_ledger() {
        let (_pool, accounts, trades) = setup().await;
        let trade = trades.create(test_trade("t-1")).await.unwrap().unwrap();

        let settlement =
            Settlement::evaluate(TradeDirection::Higher, 100.0, 110.0, 50.0, 80.0);
        let settled = trades
            .settle(&trade, 110.0, settlement)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(settled.status, "completed");
        assert_eq!(settled.result, "won");
        assert_eq!(settled.exit_price, Some(110.0));
        assert_eq!(settled.payout, Some(90.0));
        assert!(settled.completed_at.is_some());

        let account = accounts.get("acct-1").await.unwrap().unwrap();
        assert_eq!(account.balance, 5090.0);
        assert_eq!(account.total_profit, 40.0);
        assert_eq!(account.winning_trades, 1);
        assert_eq!(account.losing_trades, 0);
    }

    #[tokio::test]
    async fn test_losing_settlement_updates_ledger() {
        let (_pool, accounts, trades) = setup().await;
        let trade = trades.create(test_trade("t-1")).await.unwrap().unwrap();

        let settlement = Settlement::evaluate(TradeDirection::Higher, 100.0, 90.0, 50.0, 80.0);
        let settled = trades
            .settle(&trade, 90.0, settlement)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(settled.result, "lost");
        assert_eq!(settled.payout, Some(0.0));

        let account = accounts.get("acct-1").await.unwrap().unwrap();
        // Balance untouched on a loss; only the loss counter moves
        assert_eq!(account.balance, 5000.0);
        assert_eq!(account.total_loss, 50.0);
        assert_eq!(account.losing_trades, 1);
    }

    #[tokio::test]
    async fn test_settlement_is_single_use() {
        let (_pool, accounts, trades) = setup().await;
        let trade = trades.create(test_trade("t-1")).await.unwrap().unwrap();

        let settlement =
            Settlement::evaluate(TradeDirection::Higher, 100.0, 110.0, 50.0, 80.0);
        trades
            .settle(&trade, 110.0, settlement)
            .await
            .unwrap()
            .unwrap();

        // Second attempt finds no active row to transition
        let again = trades.settle(&trade, 120.0, settlement).await.unwrap();
        assert!(again.is_none());

        // First settlement's state is unchanged
        let stored = trades.get("t-1").await.unwrap().unwrap();
        assert_eq!(stored.exit_price, Some(110.0));
        let account = accounts.get("acct-1").await.unwrap().unwrap();
        assert_eq!(account.balance, 5090.0);
        assert_eq!(account.winning_trades, 1);
    }

    #[tokio::test]
    async fn test_cancel_is_terminal_and_costless() {
        let (_pool, accounts, trades) = setup().await;
        let trade = trades.create(test_trade("t-1")).await.unwrap().unwrap();

        let cancelled = trades.cancel("t-1").await.unwrap().unwrap();
        assert_eq!(cancelled.status, "cancelled");
        assert_eq!(cancelled.result, "pending");
        assert!(cancelled.completed_at.is_some());

        // Cancel twice: the second finds nothing active
        assert!(trades.cancel("t-1").await.unwrap().is_none());

        // Settlement after cancellation is rejected the same way
        let settlement =
            Settlement::evaluate(TradeDirection::Higher, 100.0, 110.0, 50.0, 80.0);
        assert!(trades.settle(&trade, 110.0, settlement).await.unwrap().is_none());

        // No ledger effect beyond the creation counter
        let account = accounts.get("acct-1").await.unwrap().unwrap();
        assert_eq!(account.balance, 5000.0);
        assert_eq!(account.total_trades, 1);
        assert_eq!(account.winning_trades, 0);
        assert_eq!(account.losing_trades, 0);
    }

    #[tokio::test]
    async fn test_active_and_expired_queries() {
        let (_pool, _accounts, trades) = setup().await;

        let mut expired = test_trade("t-expired");
        expired.expiry_seconds = -10; // already past expiry
        trades.create(expired).await.unwrap().unwrap();

        let mut open = test_trade("t-open");
        open.expiry_seconds = 3600;
        trades.create(open).await.unwrap().unwrap();

        let active = trades.get_active_for_account("acct-1").await.unwrap();
        assert_eq!(active.len(), 2);

        let due = trades.get_expired_active(Utc::now()).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "t-expired");
    }

    #[tokio::test]
    async fn test_stats_recomputed_from_trades() {
        let (_pool, _accounts, trades) = setup().await;

        let won = trades.create(test_trade("t-won")).await.unwrap().unwrap();
        trades
            .settle(
                &won,
                110.0,
                Settlement::evaluate(TradeDirection::Higher, 100.0, 110.0, 50.0, 80.0),
            )
            .await
            .unwrap();

        let lost = trades.create(test_trade("t-lost")).await.unwrap().unwrap();
        trades
            .settle(
                &lost,
                90.0,
                Settlement::evaluate(TradeDirection::Higher, 100.0, 90.0, 50.0, 80.0),
            )
            .await
            .unwrap();

        trades.create(test_trade("t-open")).await.unwrap().unwrap();

        let stats = trades.stats_for_account("acct-1").await.unwrap();
        assert_eq!(stats.total_trades, 3);
        assert_eq!(stats.active_trades, 1);
        assert_eq!(stats.completed_trades, 2);
        assert_eq!(stats.winning_trades, 1);
        assert_eq!(stats.losing_trades, 1);
        assert_eq!(stats.total_profit, 40.0);
        assert_eq!(stats.total_loss, 50.0);
        assert_eq!(stats.net_profit, -10.0);
        assert!((stats.win_rate - 100.0 / 3.0).abs() < 1e-9);
    }
}
