//! Calendar store commands.

use std::path::Path;

use chrono::{Duration, Utc};
use tracing::info;
use umi_core::TimeInterval;
use umi_providers::CredentialCipher;
use umi_providers::google::GoogleCredentials;
use umi_server::{Aggregator, CredentialStore, GoogleFactory, ProviderFactory, StoredCalendar};

use crate::config::AppConfig;
use crate::error::{ClientError, ClientResult};

/// Result of checking one stored calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// Calendar account email.
    pub email: String,
    /// Owner.
    pub user: String,
    /// `None` when the calendar is usable.
    pub problem: Option<String>,
}

async fn open_store(config: &AppConfig) -> ClientResult<CredentialStore> {
    Ok(CredentialStore::open(config.store_path()).await?)
}

/// Seals the credentials file at `file` and stores it for `(user, email)`.
///
/// The first calendar of a user becomes its primary.
pub async fn add(
    config: &AppConfig,
    file: &Path,
    email: &str,
    user: &str,
    calendar_id: &str,
    primary: bool,
) -> ClientResult<StoredCalendar> {
    let cipher = config.cipher()?;
    let bytes = tokio::fs::read(file).await?;
    let credentials =
        GoogleCredentials::from_json(&bytes).map_err(|source| ClientError::CredentialsFile {
            path: file.to_path_buf(),
            source,
        })?;

    let store = open_store(config).await?;
    let first_for_user = store.list().await.iter().all(|c| c.user != user);
    let record = StoredCalendar::new(user, email, calendar_id, &credentials, &cipher)?
        .with_primary(primary || first_for_user);
    let stored = store.upsert(record).await?;
    info!(email, user, primary = stored.is_primary, "stored calendar");
    Ok(stored)
}

/// Every stored calendar.
pub async fn list(config: &AppConfig) -> ClientResult<Vec<StoredCalendar>> {
    Ok(open_store(config).await?.list().await)
}

/// Checks that each credential decodes, and with `probe` that its calendar
/// answers for the next day.
pub async fn check(config: &AppConfig, probe: bool) -> ClientResult<Vec<CheckReport>> {
    let cipher = config.cipher()?;
    let calendars = list(config).await?;

    let mut reports: Vec<CheckReport> = calendars
        .iter()
        .map(|c| CheckReport {
            email: c.email.clone(),
            user: c.user.clone(),
            problem: c.decode_credentials(&cipher).err().map(|e| e.message().to_string()),
        })
        .collect();

    if probe {
        let server_config = config.to_server_config()?;
        let factory = GoogleFactory::new(cipher, server_config.google.clone());
        let providers: Vec<_> = calendars.iter().map(|c| factory.connect(c)).collect();
        let now = Utc::now();
        let window = TimeInterval::from_duration(now, Duration::days(1))
            .map_err(|e| ClientError::config(e.to_string()))?;
        let fetches = Aggregator::from_config(&server_config)
            .fetch_events(&providers, window)
            .await;
        for (report, fetch) in reports.iter_mut().zip(fetches) {
            if report.problem.is_none()
                && let Err(e) = fetch.result
            {
                report.problem = Some(e.message().to_string());
            }
        }
    }

    Ok(reports)
}

/// Marks `email` as its owner's primary calendar.
pub async fn set_primary(
    config: &AppConfig,
    email: &str,
    user: Option<&str>,
) -> ClientResult<StoredCalendar> {
    Ok(open_store(config).await?.set_primary(user, email).await?)
}

/// A fresh encryption key.
pub fn keygen() -> String {
    CredentialCipher::generate_key()
}

/// Prints `list` as a table.
pub fn print_list(calendars: &[StoredCalendar]) {
    if calendars.is_empty() {
        println!("No calendars stored.");
        return;
    }
    for c in calendars {
        println!(
            "{} {:<16} {:<32} {:<24} updated {}",
            if c.is_primary { "*" } else { " " },
            c.user,
            c.email,
            c.calendar_id,
            c.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
}

/// Prints `check` results; fails when any calendar has a problem.
pub fn print_check(reports: &[CheckReport]) -> ClientResult<()> {
    let mut failed = 0;
    for report in reports {
        match report.problem {
            None => println!("ok      {} ({})", report.email, report.user),
            Some(ref problem) => {
                failed += 1;
                println!("FAILED  {} ({}): {}", report.email, report.user, problem);
            }
        }
    }
    if failed > 0 {
        return Err(ClientError::config(format!(
            "{failed} of {} calendars failed",
            reports.len()
        )));
    }
    Ok(())
}
