//! Opening-hours gate.

use crate::config::HoursConfig;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Timelike, Utc};
use session_store::Clock;
use std::sync::Arc;
use tracing::warn;

/// Weekly schedule evaluated in the venue's fixed civil offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// Minutes after local midnight
    pub opening_minutes: u32,
    /// Minutes after local midnight, inclusive
    pub closing_minutes: u32,
    /// Days from Sunday (0) to Saturday (6)
    pub closed_days: Vec<u32>,
    pub offset: FixedOffset,
}

fn minutes_of_day(raw: &str) -> Result<u32> {
    let time = NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .with_context(|| format!("Invalid time of day: {:?}", raw))?;
    Ok(time.hour() * 60 + time.minute())
}

impl Schedule {
    pub fn from_config(hours: &HoursConfig) -> Result<Self> {
        let closed_days = hours
            .closed_days
            .iter()
            .map(|day| match day.parse::<u32>() {
                Ok(n) if n < 7 => Ok(n),
                _ => Err(anyhow!("Invalid closed day: {:?} (expected 0-6)", day)),
            })
            .collect::<Result<Vec<_>>>()?;

        let offset = hours
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| anyhow!("Invalid UTC offset: {} minutes", hours.utc_offset_minutes))?;

        Ok(Self {
            opening_minutes: minutes_of_day(&hours.opening)?,
            closing_minutes: minutes_of_day(&hours.closing)?,
            closed_days,
            offset,
        })
    }

    /// Closing earlier than opening never matches; overnight hours are unsupported.
    pub fn is_overnight(&self) -> bool {
        self.closing_minutes < self.opening_minutes
    }

    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.offset);

        if self.closed_days.contains(&local.weekday().num_days_from_sunday()) {
            return false;
        }

        let minutes = local.hour() * 60 + local.minute();
        self.opening_minutes <= minutes && minutes <= self.closing_minutes
    }
}

/// Answers whether the venue accepts sessions right now.
#[derive(Debug, Clone)]
pub struct AvailabilityGate {
    schedule: Schedule,
    clock: Arc<dyn Clock>,
}

impl AvailabilityGate {
    pub fn new(schedule: Schedule, clock: Arc<dyn Clock>) -> Self {
        if schedule.is_overnight() {
            warn!(
                "Closing time is before opening time; overnight hours are not supported and the venue will report closed"
            );
        }
        Self { schedule, clock }
    }

    pub fn is_open(&self) -> bool {
        self.schedule.is_open_at(self.clock.now())
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }
}
