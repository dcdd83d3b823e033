//! Gateway request and response types.

use serde::{Deserialize, Serialize};

/// Suffix the gateway expects on personal chat identifiers.
pub const PERSONAL_JID_SUFFIX: &str = "@s.whatsapp.net";

/// Outgoing text message request.
#[derive(Debug, Clone, Serialize)]
pub struct SendTextRequest {
    pub number: String,
    pub text: String,
}

/// Send text response. Only the message key is of interest.
#[derive(Debug, Clone, Deserialize)]
pub struct SendTextResponse {
    pub key: Option<MessageKey>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageKey {
    pub id: Option<String>,
    #[serde(rename = "remoteJid")]
    pub remote_jid: Option<String>,
}

/// Build the chat identifier for a phone number.
///
/// Non-digit characters are dropped; the number must already carry its
/// country code.
pub fn recipient_jid(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(format!("{}{}", digits, PERSONAL_JID_SUFFIX))
    }
}

/// Mask the middle of a phone number for logs: `9198xxxxx210`.
pub fn mask_phone(phone: &str) -> String {
    if phone.len() < 8 || !phone.is_ascii() {
        return "****".into();
    }
    format!("{}xxxxx{}", &phone[..4], &phone[phone.len() - 3..])
}
