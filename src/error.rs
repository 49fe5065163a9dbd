use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The main error type for masquerade operations
#[derive(Debug, thiserror::Error)]
pub enum MasqueradeError {
    /// No authenticated identity on the session.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// The actor or target is not allowed to take part in impersonation,
    /// or a guarded route was hit while impersonating.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Self-impersonation, or a target id that is not a valid impersonation
    /// target.
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// The session already carries an active impersonation record.
    #[error("Already impersonating")]
    AlreadyImpersonating,

    /// The session carries no active impersonation record.
    #[error("Not impersonating")]
    NotImpersonating,

    /// Session store I/O failure. Impersonation fails closed: the operation
    /// is aborted and surfaced, never retried.
    #[error("Session store failure: {0}")]
    Store(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl MasqueradeError {
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn invalid_target(msg: impl Into<String>) -> Self {
        Self::InvalidTarget(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// HTTP status code this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            Self::AlreadyImpersonating => StatusCode::CONFLICT,
            Self::NotImpersonating => StatusCode::CONFLICT,
            Self::Store(_) | Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to expose to clients.
    ///
    /// Store and wrapped errors may carry backend detail; clients get a
    /// generic message (CWE-209).
    fn safe_message(&self) -> String {
        match self {
            Self::Store(_) | Self::Anyhow(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Standard error response format for API errors
#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
}

impl IntoResponse for MasqueradeError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(target: "masquerade.error", error = %self, "Impersonation operation failed");
        }

        let body = ErrorResponse {
            error: self.safe_message(),
        };

        (status, Json(body)).into_response()
    }
}

/// Convenient Result type alias for masquerade operations
pub type Result<T> = std::result::Result<T, MasqueradeError>;
