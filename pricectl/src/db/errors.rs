use std::time::Duration;
use thiserror::Error;

/// PostgreSQL SQLSTATE raised when `statement_timeout` cancels a statement
const QUERY_CANCELED: &str = "57014";

/// Unified error type for storage operations that application code can handle
#[derive(Error, Debug)]
pub enum DbError {
    /// The write did not finish before its deadline and was abandoned
    #[error("{operation} timed out{}", describe_deadline(.after))]
    Timeout { operation: String, after: Option<Duration> },

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convert from sqlx::Error using proper sqlx error categorization
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(QUERY_CANCELED) => DbError::Timeout {
                operation: "database statement".to_string(),
                after: None,
            },
            sqlx::Error::PoolTimedOut => DbError::Timeout {
                operation: "acquiring a database connection".to_string(),
                after: None,
            },
            // All other sqlx errors are non-recoverable - convert to anyhow with context
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

fn describe_deadline(after: &Option<Duration>) -> String {
    match after {
        Some(after) => format!(" after {}", humantime::format_duration(*after)),
        None => String::new(),
    }
}

/// Type alias for storage operation results
pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_errors_are_not_timeouts() {
        assert!(matches!(DbError::from(sqlx::Error::RowNotFound), DbError::Other(_)));
    }

    #[test]
    fn test_pool_timeout_maps_to_timeout() {
        assert!(matches!(DbError::from(sqlx::Error::PoolTimedOut), DbError::Timeout { .. }));
    }

    #[test]
    fn test_timeout_message_includes_duration() {
        let err = DbError::Timeout {
            operation: "write option ModelRatio".to_string(),
            after: Some(Duration::from_secs(5)),
        };
        assert_eq!(err.to_string(), "write option ModelRatio timed out after 5s");

        let err = DbError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.to_string(), "acquiring a database connection timed out");
    }
}
