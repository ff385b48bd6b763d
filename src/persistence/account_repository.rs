//! Account Repository
//!
//! Data access layer for the account ledger.

use super::models::*;
use super::{DatabaseError, DbPool};
use chrono::Utc;
use tracing::{debug, error};

/// Account repository
pub struct AccountRepository {
    pool: DbPool,
}

impl AccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new account
    ///
    /// # Errors
    /// Returns `DatabaseError::UniqueViolation` when the email is taken.
    pub async fn create(&self, account: CreateAccount) -> Result<AccountRecord, DatabaseError> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, AccountRecord>(
            r#"
            INSERT INTO accounts (
                id, email, password_hash, first_name, last_name, balance,
                total_profit, total_loss, total_trades, winning_trades,
                losing_trades, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0.0, 0.0, 0, 0, 0, ?7, ?7)
            RETURNING *
            "#,
        )
        .bind(&account.id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(account.balance)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .map_or(false, |d| d.is_unique_violation())
            {
                return DatabaseError::UniqueViolation(account.email.clone());
            }
            error!("Failed to create account: {}", e);
            DatabaseError::QueryError(format!("Failed to create account: {}", e))
        })?;

        debug!("Created account: {} ({})", record.id, record.email);
        Ok(record)
    }

    /// Get account by ID
    pub async fn get(&self, id: &str) -> Result<Option<AccountRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, AccountRecord>("SELECT * FROM accounts WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to get account {}: {}", id, e);
                DatabaseError::QueryError(format!("Failed to get account: {}", e))
            })?;

        Ok(record)
    }

    /// Get account by email
    pub async fn get_by_email(&self, email: &str) -> Result<Option<AccountRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, AccountRecord>("SELECT * FROM accounts WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to get account by email: {}", e);
                DatabaseError::QueryError(format!("Failed to get account: {}", e))
            })?;

        Ok(record)
    }

    /// Apply a partial update: an optional balance overwrite (absolute
    /// value, not an increment) and/or aggregate counters. Unset fields
    /// keep their current value; the whole update is a single statement.
    pub async fn update(
        &self,
        id: &str,
        balance: Option<f64>,
        stats: UpdateAccountStats,
    ) -> Result<Option<AccountRecord>, DatabaseError> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, AccountRecord>(
            r#"
            UPDATE accounts
            SET balance = COALESCE(?1, balance),
                total_profit = COALESCE(?2, total_profit),
                total_loss = COALESCE(?3, total_loss),
                total_trades = COALESCE(?4, total_trades),
                winning_trades = COALESCE(?5, winning_trades),
                losing_trades = COALESCE(?6, losing_trades),
                updated_at = ?7
            WHERE id = ?8
            RETURNING *
            "#,
        )
        .bind(balance)
        .bind(stats.total_profit)
        .bind(stats.total_loss)
        .bind(stats.total_trades)
        .bind(stats.winning_trades)
        .bind(stats.losing_trades)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to update account {}: {}", id, e);
            DatabaseError::QueryError(format!("Failed to update account: {}", e))
        })?;

        Ok(record)
    }

    /// List accounts, newest first
    pub async fn list(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AccountRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, AccountRecord>(
            "SELECT * FROM accounts ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list accounts: {}", e);
            DatabaseError::QueryError(format!("Failed to list accounts: {}", e))
        })?;

        Ok(records)
    }

    /// Total number of accounts
    pub async fn count(&self) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to count accounts: {}", e);
                DatabaseError::QueryError(format!("Failed to count accounts: {}", e))
            })?;

        Ok(row.0)
    }
}
