//! Account Service
//!
//! Account ledger management: creation with a hashed password and default
//! balance, lookups, balance/stats updates, and paginated listing. No
//! login flow lives here; credentials are hashed at rest and never
//! serialized out.

use bcrypt::{hash, DEFAULT_COST};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::domain::entities::account::DEFAULT_BALANCE;
use crate::domain::errors::ServiceError;
use crate::persistence::account_repository::AccountRepository;
use crate::persistence::models::{AccountRecord, CreateAccount, UpdateAccountStats};
use crate::persistence::{DatabaseError, DbPool};

/// Validated input for account creation
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub balance: Option<f64>,
}

/// One page of the account listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPage {
    pub users: Vec<AccountRecord>,
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
}

pub struct AccountService {
    accounts: AccountRepository,
}

impl AccountService {
    pub fn new(pool: DbPool) -> Self {
        Self {
            accounts: AccountRepository::new(pool),
        }
    }

    /// Create an account. The balance defaults to 5000 when the caller
    /// does not specify one.
    pub async fn create_account(&self, input: NewAccount) -> Result<AccountRecord, ServiceError> {
        let email = input.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(ServiceError::validation("A valid email is required"));
        }
        if input.password.len() < 8 {
            return Err(ServiceError::validation(
                "Password must be at least 8 characters",
            ));
        }
        if let Some(balance) = input.balance {
            if !balance.is_finite() || balance < 0.0 {
                return Err(ServiceError::validation(
                    "Balance must be a non-negative number",
                ));
            }
        }

        let password_hash = hash(&input.password, DEFAULT_COST).map_err(|e| {
            ServiceError::Database(DatabaseError::QueryError(format!(
                "Failed to hash password: {}",
                e
            )))
        })?;

        let record = self
            .accounts
            .create(CreateAccount {
                id: Uuid::new_v4().to_string(),
                email,
                password_hash,
                first_name: input.first_name,
                last_name: input.last_name,
                balance: input.balance.unwrap_or(DEFAULT_BALANCE),
            })
            .await
            .map_err(|e| match e {
                DatabaseError::UniqueViolation(_) => {
                    ServiceError::conflict("An account with this email already exists")
                }
                other => ServiceError::Database(other),
            })?;

        info!("Account created: {} ({})", record.id, record.email);
        Ok(record)
    }

    /// Fetch an account by id
    pub async fn get_account(&self, id: &str) -> Result<AccountRecord, ServiceError> {
        self.accounts
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Account not found"))
    }

    /// Fetch an account by email
    pub async fn get_account_by_email(&self, email: &str) -> Result<AccountRecord, ServiceError> {
        self.accounts
            .get_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(|| ServiceError::not_found("Account not found"))
    }

    /// Apply a balance overwrite and/or a partial stats update in a single
    /// statement. Rejects a request that updates nothing.
    pub async fn update_account(
        &self,
        id: &str,
        balance: Option<f64>,
        stats: Option<UpdateAccountStats>,
    ) -> Result<AccountRecord, ServiceError> {
        if let Some(balance) = balance {
            if !balance.is_finite() || balance < 0.0 {
                return Err(ServiceError::validation(
                    "Balance must be a non-negative number",
                ));
            }
        }

        let stats = stats.unwrap_or_default();
        if balance.is_none() && stats.is_empty() {
            return Err(ServiceError::validation(
                "Provide a balance or stats fields to update",
            ));
        }

        let record = self
            .accounts
            .update(id, balance, stats)
            .await?
            .ok_or_else(|| ServiceError::not_found("Account not found"))?;

        info!("Account updated: {}", record.id);
        Ok(record)
    }

    /// One page of all accounts, newest first
    pub async fn list_accounts(&self, page: i64, limit: i64) -> Result<AccountPage, ServiceError> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let offset = (page - 1) * limit;

        let users = self.accounts.list(limit, offset).await?;
        let total = self.accounts.count().await?;
        let total_pages = (total + limit - 1) / limit;

        Ok(AccountPage {
            users,
            total,
            page,
            total_pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            password: "hunter2secret".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: None,
            balance: None,
        }
    }

    #[tokio::test]
    async fn test_create_defaults_balance_to_5000() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let service = AccountService::new(pool);

        let account = service
            .create_account(new_account("trader@example.com"))
            .await
            .unwrap();
        assert_eq!(account.balance, 5000.0);
        // Stored hash, not the raw password
        assert_ne!(account.password_hash, "hunter2secret");
        assert!(account.password_hash.starts_with("$2"));
    }

    #[tokio::test]
    async fn test_create_with_explicit_balance() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let service = AccountService::new(pool);

        let mut input = new_account("rich@example.com");
        input.balance = Some(10000.0);
        let account = service.create_account(input).await.unwrap();
        assert_eq!(account.balance, 10000.0);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let service = AccountService::new(pool);

        let mut bad_email = new_account("not-an-email");
        bad_email.email = "not-an-email".to_string();
        assert!(matches!(
            service.create_account(bad_email).await,
            Err(ServiceError::Validation(_))
        ));

        let mut short_password = new_account("ok@example.com");
        short_password.password = "short".to_string();
        assert!(matches!(
            service.create_account(short_password).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflict() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let service = AccountService::new(pool);

        service
            .create_account(new_account("dup@example.com"))
            .await
            .unwrap();
        // Same email, different case: still a conflict
        assert!(matches!(
            service.create_account(new_account("DUP@example.com")).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_update_requires_some_change() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let service = AccountService::new(pool);
        let account = service
            .create_account(new_account("trader@example.com"))
            .await
            .unwrap();

        assert!(matches!(
            service.update_account(&account.id, None, None).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            service
                .update_account(&account.id, None, Some(UpdateAccountStats::default()))
                .await,
            Err(ServiceError::Validation(_))
        ));

        let updated = service
            .update_account(&account.id, Some(1234.5), None)
            .await
            .unwrap();
        assert_eq!(updated.balance, 1234.5);
    }

    #[tokio::test]
    async fn test_update_applies_balance_and_stats_together() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let service = AccountService::new(pool);
        let account = service
            .create_account(new_account("trader@example.com"))
            .await
            .unwrap();

        let stats = UpdateAccountStats {
            total_trades: Some(7),
            total_loss: Some(150.0),
            ..Default::default()
        };
        let updated = service
            .update_account(&account.id, Some(4850.0), Some(stats))
            .await
            .unwrap();
        assert_eq!(updated.balance, 4850.0);
        assert_eq!(updated.total_trades, 7);
        assert_eq!(updated.total_loss, 150.0);

        assert!(matches!(
            service
                .update_account("missing", Some(10.0), None)
                .await
                .unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_lookup_by_email_normalizes_case() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let service = AccountService::new(pool);
        service
            .create_account(new_account("Mixed@Example.com"))
            .await
            .unwrap();

        let found = service
            .get_account_by_email("mixed@example.com")
            .await
            .unwrap();
        assert_eq!(found.email, "mixed@example.com");
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let service = AccountService::new(pool);

        for i in 0..3 {
            service
                .create_account(new_account(&format!("user{}@example.com", i)))
                .await
                .unwrap();
        }

        let page = service.list_accounts(1, 2).await.unwrap();
        assert_eq!(page.users.len(), 2);
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);

        let beyond = service.list_accounts(5, 2).await.unwrap();
        assert!(beyond.users.is_empty());
    }
}
