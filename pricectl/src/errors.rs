use crate::ratios::RatioError;
use crate::ratios::sync::WriteError;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use utoipa::ToSchema;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Caller is known but may not perform the operation
    #[error("Insufficient permissions to {action}")]
    InsufficientPermissions { action: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// An option write (reset or update) was declined or failed.
    ///
    /// Reported with status 200 and `success: false`.
    #[error(transparent)]
    Write(#[from] WriteError),

    /// The request body is not the JSON the endpoint expects.
    ///
    /// Reported like a declared failure, with status 200 and `success: false`.
    #[error("Invalid request body: {}", .0.body_text())]
    InvalidBody(#[from] JsonRejection),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Body of every error response, and of declared failures
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Always false
    pub success: bool,
    pub message: String,
}

impl From<RatioError> for Error {
    fn from(err: RatioError) -> Self {
        Error::Write(WriteError::Invalid(err))
    }
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Write(_) | Error::InvalidBody(_) => StatusCode::OK,
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details.
    ///
    /// Option write errors are shown in full: only administrators can trigger them and they need
    /// the cause to remediate.
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::InsufficientPermissions { action } => format!("Insufficient permissions to {action}"),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Write(err) => err.to_string(),
            Error::InvalidBody(_) => self.to_string(),
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Write(WriteError::Persist { .. } | WriteError::Timeout { .. } | WriteError::Unconfirmed { .. }) => {
                tracing::error!("Option write failed: {}", self);
            }
            Error::Unauthenticated { .. } | Error::InsufficientPermissions { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::InvalidBody(_) | Error::Write(WriteError::Invalid(_)) => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let body = ErrorBody {
            success: false,
            message: self.user_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
