//! WhatsApp gateway client.

mod client;
mod error;
mod types;

pub use client::WhatsAppClient;
pub use error::WhatsAppError;
pub use types::*;
