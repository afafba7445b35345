// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AuthError;
use crate::codec::CodecError;
use crate::database::StoreError;

/// Every failure the HTTP layer can return. All variants render the same
/// `{error, error_code, link}` body.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    Validation(String),
    Backend(StoreError),
    DuplicateKey(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 413 Payload Too Large
    PayloadTooLarge(String),

    // 500 Internal Server Error
    Transport(String),
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Backend(_) | ApiError::DuplicateKey(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Transport(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-safe message. Internal failures never expose their detail.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation(msg)
            | ApiError::DuplicateKey(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::Transport(msg) => msg,
            ApiError::Backend(err) => &err.message,
            ApiError::Internal(_) => "Internal server error",
        }
    }

    /// Backend failures carry the store's own code; the rest use a fixed label.
    pub fn error_code(&self) -> &str {
        match self {
            ApiError::Validation(_) => "INVALID_REQUEST",
            ApiError::Backend(err) => err.code.as_deref().unwrap_or("UnknownError"),
            ApiError::DuplicateKey(_) => "DuplicateKey",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::Transport(_) => "TRANSPORT_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Wire form of the code: numeric server codes stay numbers.
    pub fn error_code_value(&self) -> Value {
        let code = self.error_code();
        match (self, code.parse::<i64>()) {
            (ApiError::Backend(_), Ok(n)) => Value::from(n),
            _ => Value::from(code),
        }
    }

    pub fn to_json(&self, link: &str) -> Value {
        json!({
            "error": self.message(),
            "error_code": self.error_code_value(),
            "link": link,
        })
    }
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Backend(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated => ApiError::Unauthorized(err.to_string()),
            AuthError::Forbidden(msg) => ApiError::Forbidden(msg),
            AuthError::MissingPrincipal => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<CodecError> for ApiError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::TooLarge => ApiError::PayloadTooLarge(err.to_string()),
            CodecError::Transport(_) => ApiError::Transport(err.to_string()),
            CodecError::UnsupportedContentType(_)
            | CodecError::Syntax(_)
            | CodecError::ExtendedJson(_)
            | CodecError::Shape(_) => ApiError::Validation(err.to_string()),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Internal(detail) => write!(f, "internal error: {}", detail),
            _ => write!(f, "{}", self.message()),
        }
    }
}

impl std::error::Error for ApiError {}

// The link is a fresh reference id logged alongside the failure
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let link = Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(link = %link, code = self.error_code(), "{}", self);
        } else {
            tracing::warn!(link = %link, code = self.error_code(), status = status.as_u16(), "{}", self);
        }

        (status, Json(self.to_json(&link))).into_response()
    }
}
