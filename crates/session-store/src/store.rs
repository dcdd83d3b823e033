//! Session store with lazy and periodic expiry.

use crate::clock::Clock;
use crate::error::StoreError;
use crate::persist::Persistence;
use crate::types::{Session, SessionStatus};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};

/// Sessions indexed by phone number.
type SessionMap = HashMap<String, Session>;

/// Sole owner and writer of the session map.
///
/// Every mutation happens under the write lock and is written through to
/// the configured [`Persistence`] before the lock is released. If that write
/// fails the in-memory change stays in place and the error is returned.
#[derive(Clone, Debug)]
pub struct SessionStore {
    sessions: Arc<RwLock<SessionMap>>,
    persistence: Arc<Persistence>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new(persistence: Persistence, clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        Self::with_sessions(SessionMap::new(), persistence, clock, timeout)
    }

    /// Create a store seeded from its snapshot. Unreadable snapshots start empty.
    pub async fn open(persistence: Persistence, clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        let sessions: SessionMap = persistence.load_or_default().await;
        info!("Loaded {} sessions", sessions.len());
        Self::with_sessions(sessions, persistence, clock, timeout)
    }

    fn with_sessions(
        sessions: SessionMap,
        persistence: Persistence,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(sessions)),
            persistence: Arc::new(persistence),
            clock,
            timeout,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn persist(&self, sessions: &SessionMap) -> Result<(), StoreError> {
        self.persistence.save(sessions).await.map_err(|e| {
            error!("Failed to persist sessions: {}", e);
            e
        })
    }

    /// Mark overdue sessions `EXPIRED` in place. Returns how many changed.
    fn expire_locked(sessions: &mut SessionMap, now: DateTime<Utc>) -> usize {
        let mut expired = 0;
        for session in sessions.values_mut() {
            if session.is_overdue(now) {
                session.status = SessionStatus::Expired;
                expired += 1;
            }
        }
        expired
    }

    /// Sweep before a read. Persistence failures here are logged only.
    async fn sweep_locked(&self, sessions: &mut SessionMap, now: DateTime<Utc>) {
        if Self::expire_locked(sessions, now) > 0 {
            let _ = self.persist(sessions).await;
        }
    }

    /// Start a session for `phone` at `table`.
    ///
    /// Fails with [`StoreError::AlreadyExists`] if the phone already has a
    /// live session. Table occupancy is the caller's concern.
    #[instrument(skip(self, phone))]
    pub async fn create(
        &self,
        phone: &str,
        table: &str,
        auto_approve: bool,
    ) -> Result<Session, StoreError> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        Self::expire_locked(&mut sessions, now);

        if sessions.get(phone).is_some_and(|s| s.is_live(now)) {
            return Err(StoreError::AlreadyExists(phone.to_string()));
        }

        let status = if auto_approve {
            SessionStatus::Ordering
        } else {
            SessionStatus::PendingApproval
        };
        let session = Session::new(phone, table, status, now, self.timeout);
        sessions.insert(phone.to_string(), session.clone());

        self.persist(&sessions).await?;

        debug!(table = %table, status = %status, "Session created");
        Ok(session)
    }

    /// Live session for a phone, if any.
    ///
    /// Paid sessions are returned regardless of `expires_at`.
    pub async fn get(&self, phone: &str) -> Option<Session> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        self.sweep_locked(&mut sessions, now).await;

        sessions.get(phone).filter(|s| s.is_live(now)).cloned()
    }

    /// Live session at a table, if any.
    ///
    /// If more than one live session exists for the table, any one of them
    /// may be returned.
    pub async fn get_by_table(&self, table: &str) -> Option<Session> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        self.sweep_locked(&mut sessions, now).await;

        sessions
            .values()
            .find(|s| s.table == table && s.is_live(now))
            .cloned()
    }

    /// All live sessions, in no particular order.
    pub async fn list_active(&self) -> Vec<Session> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        self.sweep_locked(&mut sessions, now).await;

        sessions.values().filter(|s| s.is_live(now)).cloned().collect()
    }

    /// Number of live sessions.
    pub async fn count_active(&self) -> usize {
        let now = self.clock.now();
        let sessions = self.sessions.read().await;
        sessions.values().filter(|s| s.is_live(now)).count()
    }

    /// Stored record for a phone regardless of liveness (audit view).
    pub async fn record(&self, phone: &str) -> Option<Session> {
        self.sessions.read().await.get(phone).cloned()
    }

    /// Unconditionally set a session's status.
    ///
    /// Returns `Ok(false)` without touching anything if the phone is unknown.
    #[instrument(skip(self, phone))]
    pub async fn set_status(&self, phone: &str, status: SessionStatus) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;

        let Some(session) = sessions.get_mut(phone) else {
            return Ok(false);
        };
        session.status = status;
        session.last_activity = now;

        self.persist(&sessions).await?;
        Ok(true)
    }

    /// Shorthand for `set_status(phone, CHECKED_OUT)`.
    pub async fn end_session(&self, phone: &str) -> Result<bool, StoreError> {
        self.set_status(phone, SessionStatus::CheckedOut).await
    }

    /// Cancel the phone's session if its status is non-terminal.
    ///
    /// Returns whether a session was cancelled.
    #[instrument(skip(self, phone))]
    pub async fn cancel_open(&self, phone: &str) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        Self::expire_locked(&mut sessions, now);

        let Some(session) = sessions.get_mut(phone).filter(|s| !s.status.is_terminal()) else {
            return Ok(false);
        };
        session.status = SessionStatus::Cancelled;
        session.last_activity = now;

        self.persist(&sessions).await?;
        Ok(true)
    }

    /// Refresh `last_activity` on a live session and return it.
    #[instrument(skip(self, phone))]
    pub async fn touch(&self, phone: &str) -> Result<Option<Session>, StoreError> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        Self::expire_locked(&mut sessions, now);

        let Some(session) = sessions.get_mut(phone).filter(|s| s.is_live(now)) else {
            return Ok(None);
        };
        session.last_activity = now;
        let touched = session.clone();

        self.persist(&sessions).await?;
        Ok(Some(touched))
    }

    /// Materialize `EXPIRED` on every overdue, unpaid session.
    ///
    /// Returns the number of sessions that changed.
    pub async fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let expired = Self::expire_locked(&mut sessions, now);

        if expired > 0 {
            let _ = self.persist(&sessions).await;
            info!("Cleaned {} expired sessions", expired);
        }

        expired
    }
}
