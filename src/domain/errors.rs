//! Service-level error taxonomy.
//!
//! Expected failures (bad input, unknown ids, duplicate emails) get their
//! own variants so the HTTP boundary can map them to 400/404/409; anything
//! else surfaces as a database error and becomes a redacted 500.

use thiserror::Error;

use crate::persistence::DatabaseError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or malformed input from the caller.
    #[error("{0}")]
    Validation(String),

    /// Unknown id, or an attempted transition on a trade that is no longer
    /// active. Single-use settlement reports both the same way.
    #[error("{0}")]
    NotFound(String),

    /// Unique-key collision, currently only the account email.
    #[error("{0}")]
    Conflict(String),

    /// Unexpected persistence failure.
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ServiceError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ServiceError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ServiceError::Conflict(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_surface_verbatim() {
        let e = ServiceError::validation("Missing required field: symbol");
        assert_eq!(e.to_string(), "Missing required field: symbol");

        let e = ServiceError::not_found("Trade not found or not active");
        assert_eq!(e.to_string(), "Trade not found or not active");
    }
}
