//! Configuration for the table gate.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;

/// Gate configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Venue configuration
    #[serde(default)]
    pub venue: VenueConfig,

    /// Opening hours
    #[serde(default)]
    pub hours: HoursConfig,

    /// Session lifetime
    #[serde(default)]
    pub session: SessionConfig,

    /// QR token signing
    #[serde(default)]
    pub token: TokenConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Phone number format
    #[serde(default)]
    pub phone: PhoneConfig,

    /// WhatsApp gateway
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// State storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VenueConfig {
    /// Display name used in customer messages
    #[serde(default = "default_venue_name")]
    pub name: String,

    /// Tables are numbered 1..=total_tables
    #[serde(default = "default_total_tables")]
    pub total_tables: u32,

    /// Prefix in front of the table number ("T" gives "T1", "T2", ...)
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,

    /// Start sessions in ORDERING without staff approval
    #[serde(default)]
    pub auto_approve: bool,

    /// Staff numbers that receive approval requests (comma-separated)
    #[serde(default, deserialize_with = "comma_separated")]
    pub staff_phones: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HoursConfig {
    /// Opening time, "HH:MM"
    #[serde(default = "default_opening")]
    pub opening: String,

    /// Closing time, "HH:MM" (inclusive)
    #[serde(default = "default_closing")]
    pub closing: String,

    /// Closed weekdays, 0 = Sunday .. 6 = Saturday (comma-separated)
    #[serde(default, deserialize_with = "comma_separated")]
    pub closed_days: Vec<String>,

    /// Fixed offset of the venue's civil time from UTC, in minutes
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// How long a session lasts from creation
    #[serde(default = "default_session_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// Shared secret for QR signatures
    #[serde(default = "default_token_secret")]
    pub secret: String,

    /// Base URL printed into QR codes (falls back to the request host)
    #[serde(default)]
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// QR scans allowed per IP per window
    #[serde(default = "default_scans_per_ip")]
    pub scans_per_ip: u32,

    #[serde(default = "default_scan_window", with = "humantime_serde")]
    pub scan_window: Duration,

    /// Registrations allowed per phone per window
    #[serde(default = "default_registrations_per_phone")]
    pub registrations_per_phone: u32,

    #[serde(default = "default_registration_window", with = "humantime_serde")]
    pub registration_window: Duration,

    /// Counters older than this are purged
    #[serde(default = "default_retention", with = "humantime_serde")]
    pub retention: Duration,

    /// How often expiry and purge run in the background
    #[serde(default = "default_sweep_interval", with = "humantime_serde")]
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhoneConfig {
    /// Country calling code, digits only
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Digits in a national significant number
    #[serde(default = "default_national_length")]
    pub national_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppConfig {
    /// Gateway base URL; messaging is disabled when empty
    #[serde(default)]
    pub api_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub instance: String,

    /// Upper bound on a single outbound send
    #[serde(default = "default_whatsapp_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding sessions.json, ratelimits.json and blocked.json
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Enable persistence (if false, state is in-memory only)
    #[serde(default = "default_true")]
    pub persist: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default implementations
impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            name: default_venue_name(),
            total_tables: default_total_tables(),
            table_prefix: default_table_prefix(),
            auto_approve: false,
            staff_phones: Vec::new(),
        }
    }
}

impl Default for HoursConfig {
    fn default() -> Self {
        Self {
            opening: default_opening(),
            closing: default_closing(),
            closed_days: Vec::new(),
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: default_session_timeout(),
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: default_token_secret(),
            public_base_url: None,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            scans_per_ip: default_scans_per_ip(),
            scan_window: default_scan_window(),
            registrations_per_phone: default_registrations_per_phone(),
            registration_window: default_registration_window(),
            retention: default_retention(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            country_code: default_country_code(),
            national_length: default_national_length(),
        }
    }
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            instance: String::new(),
            timeout: default_whatsapp_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            persist: true,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            venue: VenueConfig::default(),
            hours: HoursConfig::default(),
            session: SessionConfig::default(),
            token: TokenConfig::default(),
            rate_limit: RateLimitConfig::default(),
            phone: PhoneConfig::default(),
            whatsapp: WhatsAppConfig::default(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
            log: LogConfig::default(),
        }
    }
}

// Default value functions
fn default_venue_name() -> String {
    "My Restaurant".into()
}

fn default_total_tables() -> u32 {
    10
}

fn default_table_prefix() -> String {
    "T".into()
}

fn default_opening() -> String {
    "09:00".into()
}

fn default_closing() -> String {
    "23:00".into()
}

fn default_utc_offset_minutes() -> i32 {
    330
}

fn default_session_timeout() -> Duration {
    Duration::from_secs(180 * 60)
}

fn default_token_secret() -> String {
    "change-this-key".into()
}

fn default_scans_per_ip() -> u32 {
    10
}

fn default_scan_window() -> Duration {
    Duration::from_secs(60)
}

fn default_registrations_per_phone() -> u32 {
    3
}

fn default_registration_window() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_retention() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_country_code() -> String {
    "91".into()
}

fn default_national_length() -> usize {
    10
}

fn default_whatsapp_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_true() -> bool {
    true
}

fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".into()
}

/// Accept "a, b,,c" as `["a", "b", "c"]`.
fn comma_separated<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect())
}

/// Convert a configured duration into a chrono delta, saturating on overflow.
pub fn chrono_duration(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    // Keep phone numbers and "09:00" as strings.
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// "09:00 - 23:00"
    pub fn hours_label(&self) -> String {
        format!("{} - {}", self.hours.opening, self.hours.closing)
    }
}
