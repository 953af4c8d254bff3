use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
///
/// Per-field derivation failures are intentionally absent: they are absorbed
/// inside the derivation engine and only show up in logs, never as a request
/// failure.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Requested institution key is not in the mapping registry.
    UnknownInstitution(String),
    /// No template source could be resolved, or fetching it failed.
    TemplateUnavailable(String),
    /// The fill step failed entirely (corrupt template, serialization error).
    FillOperation(String),
    /// Bad request error (invalid input).
    BadRequest(String),
    /// Internal server error.
    Internal(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Stable machine-readable kind, included in every error response body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::UnknownInstitution(_) => "unknown_institution",
            AppError::TemplateUnavailable(_) => "template_unavailable",
            AppError::FillOperation(_) => "fill_operation_failed",
            AppError::BadRequest(_) => "bad_request",
            AppError::Internal(_) => "internal_error",
            AppError::WithContext { source, .. } => source.kind(),
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::UnknownInstitution(msg) => write!(f, "Unknown institution: {}", msg),
            AppError::TemplateUnavailable(msg) => write!(f, "Template unavailable: {}", msg),
            AppError::FillOperation(msg) => write!(f, "Fill operation failed: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Maps each error variant to an appropriate HTTP status code and JSON body.
    /// Logs errors appropriately based on their severity.
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, error_message) = match &self {
            AppError::UnknownInstitution(msg) => {
                tracing::warn!("Unknown institution requested: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::TemplateUnavailable(msg) => {
                tracing::error!("Template unavailable: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::FillOperation(msg) => {
                tracing::error!("Fill operation failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::WithContext { source, context } => {
                // Log full context chain for debugging
                tracing::error!("Error with context: {} -> {}", context, source);
                // Delegate to underlying error's response
                return source.clone().into_response();
            }
        };

        let body = Json(json!({
            "error": kind,
            "message": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    /// Converts a `reqwest::Error` into an `AppError`.
    ///
    /// The only outbound HTTP the service performs is template downloads.
    fn from(err: reqwest::Error) -> Self {
        AppError::TemplateUnavailable(format!("Template download failed: {}", err))
    }
}

impl From<lopdf::Error> for AppError {
    /// Converts a `lopdf::Error` into an `AppError`.
    fn from(err: lopdf::Error) -> Self {
        AppError::FillOperation(format!("PDF error: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    /// Converts an I/O error (output document writing) into an `AppError`.
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("I/O error: {}", err))
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Arguments
    ///
    /// * `context` - The context message to add.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    ///
    /// # Arguments
    ///
    /// * `f` - A closure that produces the context message.
    #[allow(dead_code)]
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}
