//! Periodic expiry sweep and rate-counter purge.

use crate::rate_limit::RateLimiter;
use session_store::SessionStore;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Background housekeeping over the session store and rate limiter.
#[derive(Clone, Debug)]
pub struct Maintenance {
    sessions: SessionStore,
    limiter: RateLimiter,
    interval: Duration,
}

/// What one pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub expired_sessions: usize,
    pub purged_rate_entries: usize,
}

impl Maintenance {
    pub fn new(sessions: SessionStore, limiter: RateLimiter, interval: Duration) -> Self {
        Self {
            sessions,
            limiter,
            interval,
        }
    }

    pub async fn run_once(&self) -> MaintenanceReport {
        MaintenanceReport {
            expired_sessions: self.sessions.sweep_expired().await,
            purged_rate_entries: self.limiter.purge_stale().await,
        }
    }

    /// Run forever, sleeping `interval` between passes.
    pub async fn run(&self) {
        info!("Starting maintenance task, interval: {:?}", self.interval);

        loop {
            tokio::time::sleep(self.interval).await;

            let report = self.run_once().await;
            if report == MaintenanceReport::default() {
                debug!("Maintenance pass: nothing to do");
            } else {
                info!(
                    "Maintenance pass: {} sessions expired, {} rate entries purged",
                    report.expired_sessions, report.purged_rate_entries
                );
            }
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Spawn maintenance as a background task.
pub fn spawn_maintenance(maintenance: Maintenance) -> JoinHandle<()> {
    info!("Maintenance every {:?}", maintenance.interval());
    tokio::spawn(async move {
        maintenance.run().await;
    })
}
