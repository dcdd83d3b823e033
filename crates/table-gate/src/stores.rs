//! The three independently locked state owners.

use crate::blocklist::BlocklistManager;
use crate::config::{chrono_duration, Config};
use crate::rate_limit::RateLimiter;
use session_store::{Clock, Persistence, SessionStore};
use std::sync::Arc;
use tracing::info;

const SESSIONS_FILE: &str = "sessions.json";
const RATE_LIMITS_FILE: &str = "ratelimits.json";
const BLOCKLIST_FILE: &str = "blocked.json";

/// Session map, rate counters and blocklist.
#[derive(Clone, Debug)]
pub struct GateStores {
    pub sessions: SessionStore,
    pub limiter: RateLimiter,
    pub blocklist: BlocklistManager,
}

impl GateStores {
    /// Open the stores described by `config.storage`, loading any snapshots.
    pub async fn open(config: &Config, clock: Arc<dyn Clock>) -> Self {
        if !config.storage.persist {
            info!("Persistence disabled, state is in-memory only");
            return Self::in_memory(config, clock);
        }

        let dir = &config.storage.data_dir;
        info!("Loading state from {:?}", dir);

        let sessions = SessionStore::open(
            Persistence::file(dir.join(SESSIONS_FILE)),
            clock.clone(),
            chrono_duration(config.session.timeout),
        )
        .await;

        let limiter = RateLimiter::open(
            Persistence::file(dir.join(RATE_LIMITS_FILE)),
            clock,
            chrono_duration(config.rate_limit.retention),
        )
        .await;

        let blocklist =
            BlocklistManager::open(Persistence::file(dir.join(BLOCKLIST_FILE)), sessions.clone())
                .await;

        Self {
            sessions,
            limiter,
            blocklist,
        }
    }

    /// Stores that never touch the disk.
    pub fn in_memory(config: &Config, clock: Arc<dyn Clock>) -> Self {
        let sessions = SessionStore::new(
            Persistence::memory(),
            clock.clone(),
            chrono_duration(config.session.timeout),
        );
        let limiter = RateLimiter::new(
            Persistence::memory(),
            clock,
            chrono_duration(config.rate_limit.retention),
        );
        let blocklist = BlocklistManager::new(Persistence::memory(), sessions.clone());

        Self {
            sessions,
            limiter,
            blocklist,
        }
    }
}
