//! Error types for Lesson Forge
//!
//! This module defines all error types used throughout the service,
//! using `thiserror` for ergonomic error handling, and the mapping from
//! error variants to HTTP status codes used by the web layer.

use axum::http::StatusCode;
use thiserror::Error;

/// Main error type for Lesson Forge operations
///
/// This enum encompasses all possible errors that can occur during
/// configuration loading, authentication, credit accounting, content
/// generation, document rendering, and file storage.
#[derive(Error, Debug)]
pub enum ForgeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Identity service rejected the credentials or the session
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Request carried no usable credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Auth flow received an event that is not valid in its current state
    #[error("Invalid auth transition: {event} while {state}")]
    InvalidTransition {
        /// Name of the state the flow was in
        state: String,
        /// Name of the rejected event
        event: String,
    },

    /// Request failed input validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Balance does not cover the cost of the requested generation
    #[error("Insufficient credits: required={required}, available={available}")]
    InsufficientCredits {
        /// Credits the generation costs
        required: u32,
        /// Credits the user currently holds
        available: u32,
    },

    /// Another generation for the same user is still running
    #[error("A generation is already in progress for this account")]
    GenerationInProgress,

    /// Content provider errors (API calls, empty responses, etc.)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Document rendering errors
    #[error("Document error: {0}")]
    Document(String),

    /// Object storage upload errors
    #[error("Upload error: {0}")]
    Upload(String),

    /// Credit ledger and history persistence errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Operation exceeded its deadline
    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// SQLite errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Template rendering errors
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl ForgeError {
    /// HTTP status code that best describes this error to a client
    ///
    /// # Examples
    ///
    /// ```
    /// use axum::http::StatusCode;
    /// use lesson_forge::ForgeError;
    ///
    /// let err = ForgeError::InsufficientCredits { required: 2, available: 0 };
    /// assert_eq!(err.status_code(), StatusCode::PAYMENT_REQUIRED);
    /// ```
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            Self::Authentication(_) | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
            Self::GenerationInProgress => StatusCode::CONFLICT,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Provider(_) | Self::Upload(_) | Self::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result type alias for Lesson Forge operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

/// Status code for an `anyhow` error, looking through to a [`ForgeError`]
/// anywhere in its chain
pub fn status_for(err: &anyhow::Error) -> StatusCode {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ForgeError>())
        .map(ForgeError::status_code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Message suitable for showing to the end user
///
/// Uses the innermost [`ForgeError`] when one is present so that `anyhow`
/// context layers added for logs do not leak into page copy.
pub fn user_message(err: &anyhow::Error) -> String {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ForgeError>())
        .map(|e| match e {
            ForgeError::Authentication(msg) => msg.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_config_error_display() {
        let error = ForgeError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_insufficient_credits_display() {
        let error = ForgeError::InsufficientCredits {
            required: 2,
            available: 1,
        };
        assert!(error.to_string().contains("required=2"));
        assert!(error.to_string().contains("available=1"));
    }

    #[test]
    fn test_invalid_transition_display() {
        let error = ForgeError::InvalidTransition {
            state: "authenticated".to_string(),
            event: "submit".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid auth transition: submit while authenticated"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ForgeError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ForgeError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ForgeError::GenerationInProgress.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ForgeError::Timeout(110).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ForgeError::Upload("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ForgeError::Storage("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_status_for_looks_through_context() {
        let err = anyhow::Error::from(ForgeError::GenerationInProgress);
        let err = Err::<(), _>(err).context("while handling request").unwrap_err();
        assert_eq!(status_for(&err), StatusCode::CONFLICT);
    }

    #[test]
    fn test_status_for_plain_anyhow_is_500() {
        let err = anyhow::anyhow!("boom");
        assert_eq!(status_for(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_user_message_strips_authentication_prefix() {
        let err = anyhow::Error::from(ForgeError::Authentication(
            "Invalid login credentials".to_string(),
        ));
        assert_eq!(user_message(&err), "Invalid login credentials");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: ForgeError = io_error.into();
        assert!(matches!(error, ForgeError::Io(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: : yaml").unwrap_err();
        let error: ForgeError = yaml_error.into();
        assert!(matches!(error, ForgeError::Yaml(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ForgeError>();
    }
}
