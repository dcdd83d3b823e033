//! Customer and staff message texts.

use chrono::{DateTime, FixedOffset, Utc};
use whatsapp_client::mask_phone;

/// Venue-specific text templates.
#[derive(Debug, Clone)]
pub struct Messages {
    venue: String,
    hours: String,
    offset: FixedOffset,
}

impl Messages {
    pub fn new(venue: impl Into<String>, hours: impl Into<String>, offset: FixedOffset) -> Self {
        Self {
            venue: venue.into(),
            hours: hours.into(),
            offset,
        }
    }

    /// "09:00 - 23:00"
    pub fn hours(&self) -> &str {
        &self.hours
    }

    /// Venue-local "dd/mm/yyyy, hh:mm am".
    pub fn local_time(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset)
            .format("%d/%m/%Y, %I:%M %P")
            .to_string()
    }

    pub fn staff_request(&self, table: &str, phone: &str, at: DateTime<Utc>) -> String {
        format!(
            "🔔 NEW CUSTOMER REQUEST\n\n\
             📍 Table: {table}\n\
             📱 Phone: {masked}\n\
             ⏰ Time: {time}\n\n\
             👉 Please check if someone is sitting at {table}\n\n\
             To APPROVE, reply:\nAPPROVE {phone}\n\n\
             To REJECT, reply:\nREJECT {phone}",
            masked = mask_phone(phone),
            time = self.local_time(at),
        )
    }

    pub fn customer_pending(&self, table: &str) -> String {
        format!(
            "⏳ Welcome to {}!\n\n📍 Table: {}\n\n\
             Staff is verifying your table.\nYou will receive a message once approved.\n\nPlease wait... 🙏",
            self.venue, table
        )
    }

    pub fn customer_active(&self, table: &str) -> String {
        format!(
            "🍽️ Welcome to {}!\n\n📍 You are at {}\n✅ Your session is active!\n\n\
             Send MENU to see our menu\nOr start ordering: \"2 Paneer Tikka\"\n\n\
             Type HELP for all commands",
            self.venue, table
        )
    }

    pub fn customer_approved(&self, table: &str) -> String {
        format!(
            "✅ Your table has been verified!\n\n🍽️ Welcome to {}!\n📍 You are at {}\n\n\
             Send MENU to see our menu\nOr start ordering: \"2 Paneer Tikka\"",
            self.venue, table
        )
    }

    pub fn customer_rejected(&self) -> String {
        format!(
            "❌ Your session was not approved.\n\nPlease visit {} and scan the QR code at your table.",
            self.venue
        )
    }

    pub fn staff_approved(&self, table: &str, phone: &str) -> String {
        format!("✅ Approved: {} at {}", mask_phone(phone), table)
    }

    pub fn registration_pending(&self) -> &'static str {
        "Staff is verifying your table.\nYou will get a WhatsApp message once approved! 📱"
    }

    pub fn registration_started(&self) -> &'static str {
        "Session started! ✅\n\nCheck your WhatsApp for the menu! 📱"
    }

    pub fn registration_existing(&self, table: &str) -> String {
        format!(
            "You already have an active session at {}.\n\nCheck your WhatsApp!",
            table
        )
    }

    pub fn validate_blocked(&self) -> &'static str {
        "🚫 Your number has been blocked. Please contact restaurant staff."
    }

    pub fn validate_closed(&self) -> String {
        format!(
            "🌙 {} is currently closed.\n\n⏰ Hours: {}\n\nVisit us during business hours!",
            self.venue, self.hours
        )
    }

    pub fn validate_no_session(&self) -> &'static str {
        "👋 Welcome! Please scan the QR code on your table to start ordering.\n\n\
         📱 Point your camera at the QR code on your table."
    }

    pub fn validate_pending(&self) -> &'static str {
        "⏳ Please wait! Staff is verifying your table.\n\nYou will receive a message once approved."
    }
}
