//! CalendarProvider trait and implementations.
//!
//! This crate provides the access layer to connected calendars:
//!
//! - [`CalendarProvider`] - The trait every calendar backend implements
//! - [`RawEvent`] - Event data as the backend returns it
//! - [`normalize_events`] - Turns raw events into busy periods
//! - [`CredentialCipher`] - Encryption of stored credentials
//! - [`ProviderError`] - Error types for provider operations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Google API     │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ GoogleProvider  │  CalendarProvider
//! └────────┬────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │  RawEvent   │
//!   └──────┬──────┘
//!          │
//!          ▼ normalize_events()
//!   ┌─────────────┐
//!   │ BusyPeriod  │
//!   └─────────────┘
//! ```

pub mod cipher;
pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod normalize;
pub mod provider;
pub mod raw_event;

pub use cipher::{CipherError, CredentialCipher};
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use normalize::{BusyPeriod, normalize_event, normalize_events};
pub use provider::{BoxFuture, CalendarProvider, ErrorProvider, NewEvent};
pub use raw_event::{RawEvent, RawEventTime};
