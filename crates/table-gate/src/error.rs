//! Error types for the table gate.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use session_store::{SessionStatus, StoreError};
use thiserror::Error;

/// Which counter tripped a rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateScope {
    Ip,
    Phone,
}

impl RateScope {
    fn message(self) -> &'static str {
        match self {
            RateScope::Ip => "Too many requests. Please wait a moment and try again.",
            RateScope::Phone => "Too many requests from this number. Try again later.",
        }
    }
}

/// Expected, user-facing declines from the admission pipeline.
///
/// The `Display` text is shown to the customer as-is.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("Missing information. Please try again.")]
    MissingFields,

    #[error("Invalid QR code. Please scan the QR on your table.")]
    InvalidToken,

    #[error("This table does not exist.")]
    InvalidTable,

    #[error("We are currently closed. Hours: {hours}")]
    Closed { hours: String },

    #[error("{}", .0.message())]
    RateLimited(RateScope),

    #[error("Please enter a valid {national_length}-digit mobile number.")]
    InvalidPhone { national_length: usize },

    #[error("This number has been blocked. Please contact staff.")]
    Blocked,

    #[error("Table {table} already has an active session. Ask your friend to order for you, or contact staff.")]
    TableOccupied { table: String },

    #[error("This number already has an active session.")]
    AlreadyExists,
}

impl Rejection {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::MissingFields => "MISSING_FIELDS",
            Rejection::InvalidToken => "INVALID_TOKEN",
            Rejection::InvalidTable => "INVALID_TABLE",
            Rejection::Closed { .. } => "CLOSED",
            Rejection::RateLimited(_) => "RATE_LIMITED",
            Rejection::InvalidPhone { .. } => "INVALID_PHONE",
            Rejection::Blocked => "BLOCKED",
            Rejection::TableOccupied { .. } => "TABLE_OCCUPIED",
            Rejection::AlreadyExists => "ALREADY_EXISTS",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Rejection::MissingFields
            | Rejection::InvalidTable
            | Rejection::InvalidPhone { .. } => StatusCode::BAD_REQUEST,
            Rejection::InvalidToken | Rejection::Blocked => StatusCode::FORBIDDEN,
            Rejection::Closed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Rejection::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Rejection::TableOccupied { .. } | Rejection::AlreadyExists => StatusCode::CONFLICT,
        }
    }
}

/// Gate error types.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("{0}")]
    Rejected(#[from] Rejection),

    #[error("Session not found or expired")]
    NotFound,

    #[error("Session is not pending. Status: {0}")]
    NotPending(SessionStatus),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            GateError::Rejected(r) => (r.status(), r.code()),
            GateError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            GateError::NotPending(_) => (StatusCode::CONFLICT, "NOT_PENDING"),
            GateError::InvalidStatus(_) => (StatusCode::BAD_REQUEST, "INVALID_STATUS"),
            GateError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
        };

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for GateError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyExists(_) => GateError::Rejected(Rejection::AlreadyExists),
            other => GateError::Storage(other.to_string()),
        }
    }
}
