//! HTTP server: credential store, calendar fan-out, availability and booking.
//!
//! This crate provides the UMI API server that handles:
//! - The calendar store (encrypted Google credentials, primary flags)
//! - Concurrent collection of busy time across every connected calendar
//! - Availability, booking and admin routes over axum
//! - Graceful shutdown and store reload on Unix signals
//!
//! # Example
//!
//! ```rust,no_run
//! use umi_server::{AppState, ServerConfig, SignalHandler, serve};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new("api-key", "base64-encryption-key");
//!     let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
//!     let state = AppState::open(config).await?;
//!     serve(state, listener, SignalHandler::new()).await?;
//!     Ok(())
//! }
//! ```

mod aggregator;
mod config;
mod error;
mod factory;
mod handler;
mod middleware;
mod signals;
mod store;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

pub use aggregator::{Aggregation, Aggregator, CalendarFetch};
pub use config::ServerConfig;
pub use error::{ApiError, ServerError, ServerResult};
pub use factory::{GoogleFactory, ProviderFactory};
pub use handler::{AppState, Clock, router};
pub use middleware::{ADMIN_KEY_HEADER, API_KEY_HEADER};
pub use signals::{ReloadSignal, ShutdownHandle, ShutdownSignal, SignalHandler};
pub use store::{CredentialStore, StoredCalendar};

/// Serves the API on `listener` until `signals` requests shutdown.
///
/// Listens for Unix signals, and reloads the credential store on every
/// reload request so calendars added from the command line are picked up
/// without a restart.
pub async fn serve(state: AppState, listener: TcpListener, signals: SignalHandler) -> ServerResult<()> {
    signals.spawn_listener();

    let store = Arc::clone(&state.store);
    let mut reload = signals.reload();
    let reloader = tokio::spawn(async move {
        while reload.next().await {
            if let Err(e) = store.reload().await {
                warn!(error = %e, "store reload failed, keeping previous calendars");
            }
        }
    });

    let addr = listener.local_addr()?;
    info!(%addr, "listening");

    let shutdown = signals.shutdown();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.wait())
        .await?;

    reloader.abort();
    info!("server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;
    use umi_providers::CredentialCipher;

    #[tokio::test]
    async fn serves_until_shutdown() {
        let dir = TempDir::new().unwrap();
        let config = ServerConfig::new("api-key", CredentialCipher::generate_key())
            .with_store_path(dir.path().join("calendars.json"));
        let state = AppState::open(config).await.unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let signals = SignalHandler::new();
        let handle = signals.shutdown_handle();
        let server = tokio::spawn(serve(state, listener, signals));

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.trigger();

        let result = tokio::time::timeout(Duration::from_secs(2), server).await;
        assert!(result.unwrap().unwrap().is_ok());
    }
}
