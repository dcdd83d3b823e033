//! Per-table ordering sessions.
//!
//! Sessions are keyed by phone number and never deleted, only moved between
//! statuses. Expiry is evaluated lazily on every read (see
//! [`Session::is_live`]) and materialized as `EXPIRED` by a periodic sweep.
//! State is written through to a JSON snapshot on every mutation.

mod clock;
mod error;
mod persist;
mod store;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::StoreError;
pub use persist::{FileSnapshot, Persistence};
pub use store::SessionStore;
pub use types::*;
