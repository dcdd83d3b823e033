//! API request and response types.

use crate::admin::TableStatus;
use crate::registration::{InvalidReason, RegistrationAction};
use serde::{Deserialize, Serialize};
use session_store::{Session, SessionStatus};

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub venue: String,
    pub tables: u32,
    pub hours: String,
    pub is_open: bool,
    pub active_sessions: usize,
}

#[derive(Debug, Serialize)]
pub struct QrUrl {
    pub table: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct QrUrlsResponse {
    pub success: bool,
    pub urls: Vec<QrUrl>,
}

#[derive(Debug, Deserialize)]
pub struct ScanQuery {
    pub sig: Option<String>,
}

/// A scanned token is good; the customer may enter a phone number.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub success: bool,
    pub venue: String,
    pub table_number: String,
    pub signature: String,
}

/// Registration form. Fields are optional so a partial form is a
/// structured decline rather than a body rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub table_number: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub action: RegistrationAction,
    pub message: String,
}

/// `GET /api/session/validate/:phone`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ValidateResponse {
    #[serde(rename_all = "camelCase")]
    Valid {
        valid: bool,
        phone: String,
        table: String,
        status: SessionStatus,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        expires_at: chrono::DateTime<chrono::Utc>,
    },
    Invalid {
        valid: bool,
        reason: InvalidReason,
        message: String,
    },
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Venue settings the bot and the scan page need.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfigResponse {
    pub venue_name: String,
    pub staff_phones: Vec<String>,
    pub total_tables: u32,
    pub opening_time: String,
    pub closing_time: String,
    pub auto_approve: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub success: bool,
    pub count: usize,
    pub sessions: Vec<Session>,
}

#[derive(Debug, Serialize)]
pub struct TableStatusResponse {
    pub success: bool,
    pub tables: Vec<TableStatus>,
}

#[derive(Debug, Serialize)]
pub struct BlockedResponse {
    pub success: bool,
    pub blocked: Vec<String>,
}
