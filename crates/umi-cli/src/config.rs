//! File configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/umi/config.toml` by default.
//!
//! The secret values (`api_key`, `admin_api_key`, `encryption_key`) may be
//! `env::`/`pass::` references, see [`crate::secret`].

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use umi_core::availability::{DEFAULT_WORK_END_HOUR, DEFAULT_WORK_START_HOUR};
use umi_protocol::DEFAULT_DAYS;
use umi_providers::CredentialCipher;
use umi_providers::google::GoogleConfig;
use umi_server::ServerConfig;

use crate::error::{ClientError, ClientResult};
use crate::secret::SecretRef;

/// Configuration of the umi command and server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Listener settings.
    pub server: ServerSection,

    /// API keys.
    pub auth: AuthSection,

    /// Calendar store settings.
    pub credentials: CredentialsSection,

    /// Slot grid and fan-out settings.
    pub availability: AvailabilitySection,

    /// Google API settings.
    pub google: GoogleSection,
}

/// `[server]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Listen address.
    pub bind: SocketAddr,

    /// Include error causes in 500 responses.
    pub debug: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            debug: false,
        }
    }
}

/// `[auth]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// Key expected in `X-API-Key`.
    pub api_key: Option<String>,

    /// Key expected in `X-Admin-Key`.
    pub admin_api_key: Option<String>,
}

/// `[credentials]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsSection {
    /// Calendar store file; defaults to the data directory.
    pub store_path: Option<PathBuf>,

    /// Base64 AES-256 key sealing stored credentials.
    pub encryption_key: Option<String>,
}

/// `[availability]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilitySection {
    /// IANA time zone of the working hours.
    pub time_zone: String,

    /// First bookable hour.
    pub work_start_hour: u32,

    /// Hour at which the last slot ends.
    pub work_end_hour: u32,

    /// Slot length.
    pub slot_minutes: u32,

    /// Horizon when a request gives no `days`.
    pub default_days: u32,

    /// Calendars fetched at once.
    pub fetch_concurrency: usize,

    /// Deadline for one calendar, in seconds.
    pub calendar_timeout_secs: u64,
}

impl Default for AvailabilitySection {
    fn default() -> Self {
        Self {
            time_zone: "UTC".to_string(),
            work_start_hour: DEFAULT_WORK_START_HOUR,
            work_end_hour: DEFAULT_WORK_END_HOUR,
            slot_minutes: 60,
            default_days: DEFAULT_DAYS,
            fetch_concurrency: 4,
            calendar_timeout_secs: 10,
        }
    }
}

/// `[google]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSection {
    /// Calendar API base URL.
    pub api_base: Option<String>,

    /// HTTP timeout, in seconds.
    pub timeout_secs: Option<u64>,
}

impl AppConfig {
    /// Loads the configuration from `path`, or from the default path.
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(path: Option<&Path>) -> ClientResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            ClientError::config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("umi")
    }

    /// Returns the default data directory path.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("umi")
    }

    /// The calendar store file.
    pub fn store_path(&self) -> PathBuf {
        self.credentials
            .store_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("calendars.json"))
    }

    /// Resolves the encryption key into a cipher.
    pub fn cipher(&self) -> ClientResult<CredentialCipher> {
        let key = resolve_required("credentials.encryption_key", &self.credentials.encryption_key)?;
        Ok(CredentialCipher::from_base64_key(&key)?)
    }

    /// Parsed time zone.
    pub fn time_zone(&self) -> ClientResult<Tz> {
        self.availability.time_zone.parse::<Tz>().map_err(|e| {
            ClientError::config(format!(
                "availability.time_zone `{}`: {}",
                self.availability.time_zone, e
            ))
        })
    }

    /// Google API settings.
    pub fn google(&self) -> GoogleConfig {
        let mut google = GoogleConfig::default();
        if let Some(ref base) = self.google.api_base {
            google = google.with_api_base(base);
        }
        if let Some(secs) = self.google.timeout_secs {
            google = google.with_timeout(Duration::from_secs(secs));
        }
        google
    }

    /// Builds the runtime server configuration, resolving every secret.
    ///
    /// An unset `api_key` is left empty; [`ServerConfig::validate`] rejects
    /// it when serving.
    pub fn to_server_config(&self) -> ClientResult<ServerConfig> {
        let api_key = resolve_optional("auth.api_key", &self.auth.api_key)?.unwrap_or_default();
        let encryption_key =
            resolve_required("credentials.encryption_key", &self.credentials.encryption_key)?;
        let availability = &self.availability;

        let mut config = ServerConfig::new(api_key, encryption_key)
            .with_bind_addr(self.server.bind)
            .with_debug(self.server.debug)
            .with_store_path(self.store_path())
            .with_time_zone(self.time_zone()?)
            .with_work_hours(availability.work_start_hour, availability.work_end_hour)
            .with_fetch_concurrency(availability.fetch_concurrency)
            .with_calendar_timeout(Duration::from_secs(availability.calendar_timeout_secs))
            .with_google(self.google());
        config.slot_duration = chrono::Duration::minutes(i64::from(availability.slot_minutes));
        config.default_days = availability.default_days;
        if let Some(admin) = resolve_optional("auth.admin_api_key", &self.auth.admin_api_key)? {
            config = config.with_admin_api_key(admin);
        }
        Ok(config)
    }

    /// A copy safe to print: plain-text secrets are masked, references kept.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for value in [
            &mut copy.auth.api_key,
            &mut copy.auth.admin_api_key,
            &mut copy.credentials.encryption_key,
        ] {
            if let Some(v) = value
                && !SecretRef::parse(v).is_reference()
            {
                *v = "********".to_string();
            }
        }
        copy
    }
}

fn resolve_optional(field: &'static str, value: &Option<String>) -> ClientResult<Option<String>> {
    value
        .as_deref()
        .map(|raw| SecretRef::parse(raw).resolve(field).map_err(ClientError::from))
        .transpose()
}

fn resolve_required(field: &'static str, value: &Option<String>) -> ClientResult<String> {
    resolve_optional(field, value)?.ok_or_else(|| {
        ClientError::config(format!(
            "{field} is not set. Add it to {}, e.g. `umi credentials keygen` for a new key",
            AppConfig::default_path().display()
        ))
    })
}
