//! Persistent store of connected calendars.
//!
//! One JSON file holds every [`StoredCalendar`]. Records are unique on
//! `(user, email)` and each user has at most one primary calendar. Writes go
//! to a sibling temp file that is renamed over the store.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use umi_providers::google::GoogleCredentials;
use umi_providers::{CredentialCipher, ProviderError};

use crate::error::{ServerError, ServerResult};

/// One connected calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCalendar {
    /// Owner.
    pub user: String,
    /// Account email.
    pub email: String,
    /// Google calendar id.
    pub calendar_id: String,
    /// Whether it is its owner's primary calendar.
    pub is_primary: bool,
    /// Sealed credential payload (see [`CredentialCipher`]).
    pub credentials: String,
    /// When the record was first stored.
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}

impl StoredCalendar {
    /// Creates a record sealing `credentials` with `cipher`.
    pub fn new(
        user: impl Into<String>,
        email: impl Into<String>,
        calendar_id: impl Into<String>,
        credentials: &GoogleCredentials,
        cipher: &CredentialCipher,
    ) -> ServerResult<Self> {
        let payload = credentials.to_json()?;
        let sealed = cipher
            .encrypt(&payload)
            .map_err(|e| ServerError::config(e.to_string()))?;
        let now = Utc::now();
        Ok(Self {
            user: user.into(),
            email: email.into(),
            calendar_id: calendar_id.into(),
            is_primary: false,
            credentials: sealed,
            created_at: now,
            updated_at: now,
        })
    }

    /// Builder: mark primary.
    pub fn with_primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }

    /// Opens and decodes the credential payload.
    pub fn decode_credentials(
        &self,
        cipher: &CredentialCipher,
    ) -> Result<GoogleCredentials, ProviderError> {
        let payload = cipher.decrypt(&self.credentials).map_err(|e| {
            ProviderError::credentials(e.to_string())
                .with_calendar(&self.email)
                .with_source(e)
        })?;
        GoogleCredentials::from_json(&payload).map_err(|e| {
            ProviderError::credentials(e.to_string())
                .with_calendar(&self.email)
                .with_source(e)
        })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    calendars: Vec<StoredCalendar>,
}

/// The calendar store, shared by all requests.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    calendars: RwLock<Vec<StoredCalendar>>,
}

impl CredentialStore {
    /// Opens the store at `path`; a missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> ServerResult<Self> {
        let path = path.into();
        let calendars = read_file(&path).await?;
        info!(path = %path.display(), calendars = calendars.len(), "opened credential store");
        Ok(Self {
            path,
            calendars: RwLock::new(calendars),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the backing file, replacing the in-memory records.
    pub async fn reload(&self) -> ServerResult<usize> {
        let calendars = read_file(&self.path).await?;
        let count = calendars.len();
        *self.calendars.write().await = calendars;
        info!(calendars = count, "reloaded credential store");
        Ok(count)
    }

    /// Every record, in insertion order.
    pub async fn list(&self) -> Vec<StoredCalendar> {
        self.calendars.read().await.clone()
    }

    /// Finds the calendar `email`, narrowed to `user` when given.
    pub async fn lookup(&self, user: Option<&str>, email: &str) -> ServerResult<StoredCalendar> {
        let calendars = self.calendars.read().await;
        find_unique(&calendars, user, email).cloned()
    }

    /// The primary calendar of `user`, or the first primary of any user.
    pub async fn primary(&self, user: Option<&str>) -> Option<StoredCalendar> {
        self.calendars
            .read()
            .await
            .iter()
            .find(|c| c.is_primary && user.is_none_or(|u| c.user == u))
            .cloned()
    }

    /// Inserts or replaces the record for `(user, email)`.
    ///
    /// Emails compare case-insensitively, as in [`lookup`](Self::lookup).
    /// A replaced record keeps its `created_at`. Storing a primary record
    /// clears the flag on the user's other calendars.
    pub async fn upsert(&self, mut record: StoredCalendar) -> ServerResult<StoredCalendar> {
        let mut calendars = self.calendars.write().await;
        let mut next = calendars.clone();

        if record.is_primary {
            clear_primary(&mut next, &record.user);
        }
        match next
            .iter_mut()
            .find(|c| c.user == record.user && c.email.eq_ignore_ascii_case(&record.email))
        {
            Some(existing) => {
                record.created_at = existing.created_at;
                record.updated_at = Utc::now();
                *existing = record.clone();
            }
            None => next.push(record.clone()),
        }

        write_file(&self.path, &next).await?;
        *calendars = next;
        debug!(email = %record.email, user = %record.user, "stored calendar");
        Ok(record)
    }

    /// Makes `email` the primary calendar of its user.
    pub async fn set_primary(&self, user: Option<&str>, email: &str) -> ServerResult<StoredCalendar> {
        let mut calendars = self.calendars.write().await;
        let mut next = calendars.clone();

        let target = find_unique(&next, user, email)?;
        let (owner, email) = (target.user.clone(), target.email.clone());

        clear_primary(&mut next, &owner);
        let now = Utc::now();
        let mut updated = None;
        for calendar in next.iter_mut() {
            if calendar.user == owner && calendar.email.eq_ignore_ascii_case(&email) {
                calendar.is_primary = true;
                calendar.updated_at = now;
                updated = Some(calendar.clone());
            }
        }
        let updated = updated.ok_or_else(|| ServerError::calendar_not_found(&email))?;

        write_file(&self.path, &next).await?;
        *calendars = next;
        info!(email = %email, user = %owner, "set primary calendar");
        Ok(updated)
    }
}

fn find_unique<'a>(
    calendars: &'a [StoredCalendar],
    user: Option<&str>,
    email: &str,
) -> ServerResult<&'a StoredCalendar> {
    let mut matches = calendars
        .iter()
        .filter(|c| c.email.eq_ignore_ascii_case(email) && user.is_none_or(|u| c.user == u));
    let first = matches
        .next()
        .ok_or_else(|| ServerError::calendar_not_found(email))?;
    if matches.next().is_some() {
        return Err(ServerError::AmbiguousCalendar {
            email: email.to_string(),
        });
    }
    Ok(first)
}

fn clear_primary(calendars: &mut [StoredCalendar], user: &str) {
    let now = Utc::now();
    for calendar in calendars.iter_mut().filter(|c| c.user == user && c.is_primary) {
        calendar.is_primary = false;
        calendar.updated_at = now;
    }
}

async fn read_file(path: &Path) -> ServerResult<Vec<StoredCalendar>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice::<StoreFile>(&bytes)?.calendars),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

async fn write_file(path: &Path, calendars: &[StoredCalendar]) -> ServerResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let file = StoreFile {
        calendars: calendars.to_vec(),
    };
    let json = serde_json::to_vec_pretty(&file)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
