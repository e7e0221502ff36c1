//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use umi_core::SlotGrid;
use umi_core::availability::{DEFAULT_WORK_END_HOUR, DEFAULT_WORK_START_HOUR};
use umi_protocol::{DEFAULT_DAYS, MAX_DAYS};
use umi_providers::google::GoogleConfig;

use crate::error::{ServerError, ServerResult};

/// Runtime configuration of the HTTP server.
///
/// Built once at startup and shared read-only by every request.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_addr: SocketAddr,

    /// Include error causes in 500 responses.
    pub debug: bool,

    /// Key expected in `X-API-Key`.
    pub api_key: String,

    /// Key expected in `X-Admin-Key`; admin routes are closed when unset.
    pub admin_api_key: Option<String>,

    /// JSON file holding the connected calendars.
    pub store_path: PathBuf,

    /// Base64 AES-256 key sealing stored credentials.
    pub encryption_key: String,

    /// Zone in which working hours are read and slots are rendered.
    pub time_zone: Tz,

    /// First bookable hour of a day.
    pub work_start_hour: u32,

    /// Hour at which the last slot ends.
    pub work_end_hour: u32,

    /// Length of one slot.
    pub slot_duration: chrono::Duration,

    /// Horizon used when a request does not give `days`.
    pub default_days: u32,

    /// Calendars fetched at once.
    pub fetch_concurrency: usize,

    /// Deadline for one calendar's answer.
    pub calendar_timeout: Duration,

    /// Google API settings.
    pub google: GoogleConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            debug: false,
            api_key: String::new(),
            admin_api_key: None,
            store_path: PathBuf::from("calendars.json"),
            encryption_key: String::new(),
            time_zone: Tz::UTC,
            work_start_hour: DEFAULT_WORK_START_HOUR,
            work_end_hour: DEFAULT_WORK_END_HOUR,
            slot_duration: chrono::Duration::hours(1),
            default_days: DEFAULT_DAYS,
            fetch_concurrency: 4,
            calendar_timeout: Duration::from_secs(10),
            google: GoogleConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Creates a configuration with the given keys and defaults elsewhere.
    pub fn new(api_key: impl Into<String>, encryption_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            encryption_key: encryption_key.into(),
            ..Default::default()
        }
    }

    /// Builder: set the listen address.
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Builder: set debug mode.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Builder: set the admin key.
    pub fn with_admin_api_key(mut self, key: impl Into<String>) -> Self {
        self.admin_api_key = Some(key.into());
        self
    }

    /// Builder: set the credential store path.
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    /// Builder: set the time zone.
    pub fn with_time_zone(mut self, tz: Tz) -> Self {
        self.time_zone = tz;
        self
    }

    /// Builder: set working hours.
    pub fn with_work_hours(mut self, start: u32, end: u32) -> Self {
        self.work_start_hour = start;
        self.work_end_hour = end;
        self
    }

    /// Builder: set fetch concurrency.
    pub fn with_fetch_concurrency(mut self, concurrency: usize) -> Self {
        self.fetch_concurrency = concurrency;
        self
    }

    /// Builder: set the per-calendar timeout.
    pub fn with_calendar_timeout(mut self, timeout: Duration) -> Self {
        self.calendar_timeout = timeout;
        self
    }

    /// Builder: set Google API settings.
    pub fn with_google(mut self, google: GoogleConfig) -> Self {
        self.google = google;
        self
    }

    /// Slot grid covering `days` days.
    pub fn grid(&self, days: u32) -> SlotGrid {
        SlotGrid::new(days)
            .with_work_hours(self.work_start_hour, self.work_end_hour)
            .with_slot_duration(self.slot_duration)
            .with_time_zone(self.time_zone)
    }

    /// Checks the configuration before serving.
    pub fn validate(&self) -> ServerResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(ServerError::config("api_key must be set"));
        }
        if self.encryption_key.trim().is_empty() {
            return Err(ServerError::config("encryption_key must be set"));
        }
        if !(1..=MAX_DAYS).contains(&self.default_days) {
            return Err(ServerError::config(format!(
                "default_days must be between 1 and {MAX_DAYS}"
            )));
        }
        if self.fetch_concurrency == 0 {
            return Err(ServerError::config("fetch_concurrency must be at least 1"));
        }
        if self.calendar_timeout.is_zero() {
            return Err(ServerError::config("calendar_timeout must be positive"));
        }
        self.grid(self.default_days)
            .validate()
            .map_err(|e| ServerError::config(e.to_string()))?;
        self.google
            .validate()
            .map_err(|e| ServerError::config(e.to_string()))?;
        Ok(())
    }
}
