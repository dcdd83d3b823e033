//! Banned phone numbers.

use session_store::{Persistence, SessionStore, StoreError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, instrument};
use whatsapp_client::mask_phone;

/// Sole owner of the block set.
///
/// Blocking revokes access immediately: an open session for the phone is
/// cancelled as part of the same call.
#[derive(Clone, Debug)]
pub struct BlocklistManager {
    blocked: Arc<RwLock<Vec<String>>>,
    persistence: Arc<Persistence>,
    sessions: SessionStore,
}

impl BlocklistManager {
    pub fn new(persistence: Persistence, sessions: SessionStore) -> Self {
        Self::with_blocked(Vec::new(), persistence, sessions)
    }

    /// Create a manager seeded from its snapshot.
    pub async fn open(persistence: Persistence, sessions: SessionStore) -> Self {
        let blocked: Vec<String> = persistence.load_or_default().await;
        info!("Loaded {} blocked numbers", blocked.len());
        Self::with_blocked(blocked, persistence, sessions)
    }

    fn with_blocked(blocked: Vec<String>, persistence: Persistence, sessions: SessionStore) -> Self {
        Self {
            blocked: Arc::new(RwLock::new(blocked)),
            persistence: Arc::new(persistence),
            sessions,
        }
    }

    /// Add `phone` to the blocklist and cancel any open session.
    ///
    /// Returns whether a session was cancelled. The session is cancelled
    /// even when the blocklist snapshot cannot be written; that write error
    /// is returned afterwards.
    #[instrument(skip(self, phone), fields(phone = %mask_phone(phone)))]
    pub async fn block(&self, phone: &str) -> Result<bool, StoreError> {
        let saved = {
            let mut blocked = self.blocked.write().await;
            if blocked.iter().any(|p| p == phone) {
                Ok(())
            } else {
                blocked.push(phone.to_string());
                info!("Number blocked");
                self.persistence.save(&*blocked).await.map_err(|e| {
                    error!("Failed to persist blocklist: {}", e);
                    e
                })
            }
        };

        let cancelled = self.sessions.cancel_open(phone).await?;
        saved?;
        Ok(cancelled)
    }

    /// Remove `phone` from the blocklist. Cancelled sessions stay cancelled.
    #[instrument(skip(self, phone), fields(phone = %mask_phone(phone)))]
    pub async fn unblock(&self, phone: &str) -> Result<(), StoreError> {
        let mut blocked = self.blocked.write().await;
        let before = blocked.len();
        blocked.retain(|p| p != phone);

        if blocked.len() != before {
            self.persistence.save(&*blocked).await?;
            info!("Number unblocked");
        }
        Ok(())
    }

    pub async fn is_blocked(&self, phone: &str) -> bool {
        self.blocked.read().await.iter().any(|p| p == phone)
    }

    /// Blocked numbers in the order they were added.
    pub async fn list(&self) -> Vec<String> {
        self.blocked.read().await.clone()
    }
}
