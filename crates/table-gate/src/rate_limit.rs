//! Fixed-window request counters keyed by IP address or phone number.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use session_store::{Clock, Persistence};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Counter for one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateEntry {
    /// Requests counted in the current window
    pub count: u32,
    /// When the current window opened
    #[serde(rename = "start", with = "chrono::serde::ts_milliseconds")]
    pub window_start: DateTime<Utc>,
}

/// Outcome of a rate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
}

/// Identifier for per-IP scan limits.
pub fn ip_key(addr: &str) -> String {
    format!("ip:{}", addr)
}

/// Identifier for per-phone registration limits.
pub fn phone_key(phone: &str) -> String {
    format!("phone:{}", phone)
}

/// Fixed-window rate limiter; sole owner of the counter map.
///
/// A window resets wholesale once more than its duration has passed since
/// it opened. Bursts at window boundaries are accepted.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    entries: Arc<Mutex<HashMap<String, RateEntry>>>,
    persistence: Arc<Persistence>,
    clock: Arc<dyn Clock>,
    retention: Duration,
}

impl RateLimiter {
    /// Create an empty limiter. Entries older than `retention` are purged.
    pub fn new(persistence: Persistence, clock: Arc<dyn Clock>, retention: Duration) -> Self {
        Self::with_entries(HashMap::new(), persistence, clock, retention)
    }

    /// Create a limiter seeded from its snapshot.
    pub async fn open(persistence: Persistence, clock: Arc<dyn Clock>, retention: Duration) -> Self {
        let entries: HashMap<String, RateEntry> = persistence.load_or_default().await;
        info!("Loaded {} rate entries", entries.len());
        Self::with_entries(entries, persistence, clock, retention)
    }

    fn with_entries(
        entries: HashMap<String, RateEntry>,
        persistence: Persistence,
        clock: Arc<dyn Clock>,
        retention: Duration,
    ) -> Self {
        Self {
            entries: Arc::new(Mutex::new(entries)),
            persistence: Arc::new(persistence),
            clock,
            retention,
        }
    }

    /// Counter writes are best effort; a failed write never fails the check.
    async fn persist(&self, entries: &HashMap<String, RateEntry>) {
        if let Err(e) = self.persistence.save(entries).await {
            warn!("Failed to persist rate entries: {}", e);
        }
    }

    /// Count one request for `identifier` against `limit` per `window`.
    ///
    /// A rejected request leaves the counter untouched.
    pub async fn check(&self, identifier: &str, limit: u32, window: Duration) -> RateDecision {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;

        let entry = match entries.get(identifier) {
            Some(current) if now - current.window_start <= window => {
                if current.count >= limit {
                    debug!(identifier, "Rate limit reached");
                    return RateDecision {
                        allowed: false,
                        remaining: 0,
                    };
                }
                RateEntry {
                    count: current.count + 1,
                    window_start: current.window_start,
                }
            }
            _ => RateEntry {
                count: 1,
                window_start: now,
            },
        };

        let decision = RateDecision {
            allowed: true,
            remaining: limit.saturating_sub(entry.count),
        };
        entries.insert(identifier.to_string(), entry);

        self.persist(&entries).await;
        decision
    }

    /// Drop counters whose window opened more than the retention horizon ago.
    pub async fn purge_stale(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();

        entries.retain(|_, entry| now - entry.window_start <= self.retention);

        let removed = before - entries.len();
        if removed > 0 {
            self.persist(&entries).await;
            debug!("Purged {} stale rate entries", removed);
        }
        removed
    }

    /// Current counter for an identifier.
    pub async fn entry(&self, identifier: &str) -> Option<RateEntry> {
        self.entries.lock().await.get(identifier).cloned()
    }

    /// Number of tracked identifiers.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
