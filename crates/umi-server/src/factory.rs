//! Turns stored calendars into live providers.

use umi_providers::google::{GoogleConfig, GoogleProvider};
use umi_providers::{CalendarProvider, CredentialCipher, ErrorProvider};

use crate::store::StoredCalendar;

/// Builds a provider for a stored calendar.
///
/// Connecting never fails: a calendar that cannot be opened yields a
/// provider whose every call returns the error, so it is reported like any
/// other per-calendar failure.
pub trait ProviderFactory: Send + Sync {
    /// Connects one calendar.
    fn connect(&self, calendar: &StoredCalendar) -> Box<dyn CalendarProvider>;
}

/// Factory for Google calendars whose credentials are sealed with a
/// [`CredentialCipher`].
#[derive(Debug, Clone)]
pub struct GoogleFactory {
    cipher: CredentialCipher,
    config: GoogleConfig,
}

impl GoogleFactory {
    /// Creates a factory.
    pub fn new(cipher: CredentialCipher, config: GoogleConfig) -> Self {
        Self { cipher, config }
    }
}

impl ProviderFactory for GoogleFactory {
    fn connect(&self, calendar: &StoredCalendar) -> Box<dyn CalendarProvider> {
        let provider = calendar
            .decode_credentials(&self.cipher)
            .and_then(|credentials| {
                GoogleProvider::new(
                    &calendar.email,
                    &calendar.calendar_id,
                    credentials,
                    self.config.clone(),
                )
            });
        match provider {
            Ok(provider) => Box::new(provider),
            Err(e) => {
                tracing::warn!(calendar = %calendar.email, error = %e, "cannot connect calendar");
                Box::new(ErrorProvider::new(&calendar.email, &calendar.calendar_id, e))
            }
        }
    }
}
