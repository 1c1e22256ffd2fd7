// src/config.rs

use chrono::{Local, NaiveDate};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Duration;

// Confidence tiers shared by every aggregator
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.93;
pub const MEDIUM_CONFIDENCE_THRESHOLD: f64 = 0.88;
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.82;

// Jaro-Winkler prefix boost
pub const WINKLER_SCALING_FACTOR: f64 = 0.1;
pub const WINKLER_MAX_PREFIX: usize = 4;

/// Name recorded for source rows that carry no usable assembly name.
pub const UNKNOWN_ASSEMBLY: &str = "Unknown Assembly";

// Combined snapshot cache lifetime (5 minutes)
pub const SNAPSHOT_TTL_SECS: u64 = 5 * 60;

// Upper bound for a single collaborator read / index build
pub const DEFAULT_IO_TIMEOUT_SECS: u64 = 30;

// First day of door-to-door punch data
pub const DEFAULT_PUNCHES_START: (i32, u32, u32) = (2024, 1, 1);

/// Runtime settings for the resolution engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// JSON file mapping canonical keys to alias spellings. `None` means no aliases.
    pub alias_table_path: Option<PathBuf>,
    pub io_timeout: Duration,
    pub snapshot_ttl: Duration,
    /// Inclusive window applied to dated punch records. An open end means "today".
    pub punches_start: NaiveDate,
    pub punches_end: Option<NaiveDate>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            alias_table_path: None,
            io_timeout: Duration::from_secs(DEFAULT_IO_TIMEOUT_SECS),
            snapshot_ttl: Duration::from_secs(SNAPSHOT_TTL_SECS),
            punches_start: default_punches_start(),
            punches_end: None,
        }
    }
}

impl EngineConfig {
    /// Reads environment variables, falling back to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let alias_table_path = std::env::var("ALIAS_TABLE_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let io_timeout = env_secs("SOURCE_IO_TIMEOUT_SECS").unwrap_or(defaults.io_timeout);
        let snapshot_ttl = env_secs("SNAPSHOT_TTL_SECS").unwrap_or(defaults.snapshot_ttl);
        let punches_start = env_date("PUNCHES_START_DATE").unwrap_or(defaults.punches_start);
        let punches_end = env_date("PUNCHES_END_DATE");

        info!(
            "Engine config: aliases={:?}, io_timeout={:?}, snapshot_ttl={:?}, punches_window={}..{}",
            alias_table_path,
            io_timeout,
            snapshot_ttl,
            punches_start,
            punches_end
                .map(|d| d.to_string())
                .unwrap_or_else(|| "today".to_string())
        );

        Self {
            alias_table_path,
            io_timeout,
            snapshot_ttl,
            punches_start,
            punches_end,
        }
    }

    /// Resolves the punch window end against the local calendar.
    pub fn punches_window(&self) -> (NaiveDate, NaiveDate) {
        let end = self
            .punches_end
            .unwrap_or_else(|| Local::now().date_naive());
        (self.punches_start, end)
    }
}

fn default_punches_start() -> NaiveDate {
    let (y, m, d) = DEFAULT_PUNCHES_START;
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

fn env_secs(key: &str) -> Option<Duration> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(e) => {
            warn!("Ignoring {}='{}': {}", key, raw, e);
            None
        }
    }
}

fn env_date(key: &str) -> Option<NaiveDate> {
    let raw = std::env::var(key).ok()?;
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            warn!("Ignoring {}='{}': {}", key, raw, e);
            None
        }
    }
}
