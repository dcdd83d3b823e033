//! Table Gate - QR admission for walk-in table ordering.
//!
//! A customer scans a signed QR code on their table and enters a phone
//! number. The gate then:
//! - Verifies the table token and the venue's opening hours
//! - Throttles scans per IP and registrations per phone
//! - Enforces one live session per phone and per table
//! - Hands pending sessions to staff for approval over WhatsApp

pub mod admin;
pub mod api;
pub mod availability;
pub mod blocklist;
pub mod config;
pub mod error;
pub mod maintenance;
pub mod messages;
pub mod notify;
pub mod phone;
pub mod rate_limit;
pub mod registration;
pub mod stores;
pub mod token;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{GateError, Rejection};
pub use maintenance::{spawn_maintenance, Maintenance};
pub use notify::{DisabledNotifier, Notifier, WhatsAppNotifier};
pub use registration::{Registration, RegistrationAction, RegistrationWorkflow, Validation};
pub use stores::GateStores;
pub use token::TokenSigner;
