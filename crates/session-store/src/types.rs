//! Session and status types.

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a table session.
///
/// Any status may follow any other; the store does not validate transitions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Waiting for staff to confirm the customer is at the table
    PendingApproval,
    /// Customer may place orders
    Ordering,
    /// Bill settled; retained past expiry for display
    Paid,
    /// Customer left
    CheckedOut,
    /// Rejected by staff or revoked by a block
    Cancelled,
    /// Timed out
    Expired,
}

impl SessionStatus {
    /// Terminal sessions are invisible to every "active" query.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::CheckedOut | SessionStatus::Cancelled | SessionStatus::Expired
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::PendingApproval => "PENDING_APPROVAL",
            SessionStatus::Ordering => "ORDERING",
            SessionStatus::Paid => "PAID",
            SessionStatus::CheckedOut => "CHECKED_OUT",
            SessionStatus::Cancelled => "CANCELLED",
            SessionStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING_APPROVAL" => Ok(SessionStatus::PendingApproval),
            "ORDERING" => Ok(SessionStatus::Ordering),
            "PAID" => Ok(SessionStatus::Paid),
            "CHECKED_OUT" => Ok(SessionStatus::CheckedOut),
            "CANCELLED" => Ok(SessionStatus::Cancelled),
            "EXPIRED" => Ok(SessionStatus::Expired),
            other => Err(format!("Unknown session status: {}", other)),
        }
    }
}

/// A customer's ordering session at one table, keyed by phone number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Digits only, including country code
    pub phone: String,
    pub table: String,
    pub status: SessionStatus,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    #[serde(with = "ts_milliseconds")]
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new(
        phone: impl Into<String>,
        table: impl Into<String>,
        status: SessionStatus,
        now: DateTime<Utc>,
        timeout: Duration,
    ) -> Self {
        Self {
            phone: phone.into(),
            table: table.into(),
            status,
            created_at: now,
            expires_at: now + timeout,
            last_activity: now,
        }
    }

    /// Liveness predicate shared by every read path.
    ///
    /// A session is live when its status is non-terminal and it is either
    /// paid or not yet past `expires_at`. The stored status may lag behind
    /// this (the sweep materializes `EXPIRED` later); this predicate wins.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal()
            && (self.status == SessionStatus::Paid || self.expires_at >= now)
    }

    /// Whether the periodic sweep should mark this session `EXPIRED`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
            && self.status != SessionStatus::Paid
            && self.status != SessionStatus::Expired
    }
}
