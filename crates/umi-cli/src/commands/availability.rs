//! Local availability: the same computation the API performs, printed as JSON.

use chrono::{DateTime, Utc};
use umi_protocol::{AvailabilityResponse, parse_days_or};
use umi_server::{Aggregator, CredentialStore, GoogleFactory, ProviderFactory};

use crate::config::AppConfig;
use crate::error::{ClientError, ClientResult};

/// Computes availability over the stored calendars, or only `email`.
pub async fn compute(
    config: &AppConfig,
    days: Option<u32>,
    email: Option<&str>,
    user: Option<&str>,
) -> ClientResult<AvailabilityResponse> {
    compute_at(config, days, email, user, Utc::now()).await
}

/// [`compute`] as seen at `now`.
pub async fn compute_at(
    config: &AppConfig,
    days: Option<u32>,
    email: Option<&str>,
    user: Option<&str>,
    now: DateTime<Utc>,
) -> ClientResult<AvailabilityResponse> {
    let server_config = config.to_server_config()?;
    let days = parse_days_or(
        days.map(|d| d.to_string()).as_deref(),
        server_config.default_days,
    )
    .map_err(|e| ClientError::config(e.to_string()))?;

    let store = CredentialStore::open(&server_config.store_path).await?;
    let calendars = match email {
        Some(email) => vec![store.lookup(user, email).await?],
        None => store.list().await,
    };

    let factory = GoogleFactory::new(config.cipher()?, server_config.google.clone());
    let providers: Vec<_> = calendars.iter().map(|c| factory.connect(c)).collect();

    let grid = server_config.grid(days);
    let aggregation = Aggregator::from_config(&server_config)
        .availability(&grid, now, &providers)
        .await
        .map_err(|e| ClientError::config(e.to_string()))?;

    Ok(AvailabilityResponse::new(
        &aggregation.result,
        server_config.time_zone,
        aggregation.calendars,
    ))
}

/// Prints the availability as pretty JSON.
pub async fn run(
    config: &AppConfig,
    days: Option<u32>,
    email: Option<&str>,
    user: Option<&str>,
) -> ClientResult<()> {
    let response = compute(config, days, email, user).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
