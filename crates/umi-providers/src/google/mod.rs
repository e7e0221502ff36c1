//! Google Calendar provider implementation.
//!
//! A [`GoogleProvider`] reads and writes one calendar of a connected Google
//! account through the Calendar API v3, authenticated with the account's
//! stored [`GoogleCredentials`].
//!
//! # Example
//!
//! ```ignore
//! use umi_providers::google::{GoogleConfig, GoogleCredentials, GoogleProvider};
//!
//! let credentials = GoogleCredentials::from_json(&payload)?;
//! let provider = GoogleProvider::new("ada@example.com", "primary", credentials, GoogleConfig::default())?;
//! let events = provider.list_events(window).await?;
//! ```

mod client;
mod config;
mod credentials;
mod provider;

pub use client::GoogleCalendarClient;
pub use config::GoogleConfig;
pub use credentials::{CredentialError, GoogleCredentials, REQUIRED_FIELDS};
pub use provider::GoogleProvider;
