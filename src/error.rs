use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// User-facing error messages.
pub mod msg {
    pub const COURSE_NOT_FOUND: &str = "Course not found!";
    pub const USER_NOT_FOUND: &str = "User not found!";
    pub const PURCHASE_NOT_FOUND: &str = "Purchase not found";
    pub const INVALID_WEBHOOK_PAYLOAD: &str = "Invalid webhook payload";
    pub const PAYMENT_SESSION_ERROR: &str = "Error generating payment session";
    pub const MISSING_SIGNATURE: &str = "Missing webhook signature headers";
    pub const INVALID_SIGNATURE_HEADER: &str = "Invalid webhook signature header";
    pub const INVALID_TIMESTAMP: &str = "Invalid webhook timestamp";
    pub const INVALID_WEBHOOK_SECRET: &str = "Invalid webhook secret";
    pub const EMAIL_EMPTY: &str = "Email cannot be empty";
    pub const INVALID_EMAIL_FORMAT: &str = "Invalid email format";
    pub const NAME_EMPTY: &str = "Name cannot be empty";
    pub const TITLE_EMPTY: &str = "Title cannot be empty";
    pub const NEGATIVE_PRICE: &str = "Price cannot be negative";
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Payment session error: {0}")]
    PaymentSession(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "Bad request".to_string(), Some(msg.clone()))
            }
            AppError::InvalidPayload(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::PaymentSession(reason) => {
                // Gateway internals stay in the logs
                tracing::warn!("Payment session error: {}", reason);
                (StatusCode::BAD_REQUEST, msg::PAYMENT_SESSION_ERROR.to_string(), None)
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string(), None),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string(), None)
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string(), None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string(), None)
            }
        };

        let body = ErrorResponse {
            success: false,
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Turns a missing lookup result into `AppError::NotFound`.
pub trait OptionExt<T> {
    fn or_not_found(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, message: &str) -> Result<T> {
        self.ok_or_else(|| AppError::NotFound(message.to_string()))
    }
}
