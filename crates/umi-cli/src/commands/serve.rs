//! Serve command: runs the HTTP API in the foreground.
//!
//! Blocks until SIGTERM/SIGINT. SIGHUP reloads the calendar store, so
//! `umi credentials add` takes effect without a restart.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;
use umi_server::{AppState, SignalHandler};

use crate::config::AppConfig;
use crate::error::ClientResult;

/// Starts the server.
pub async fn run(config: &AppConfig, bind: Option<SocketAddr>) -> ClientResult<()> {
    let mut server_config = config.to_server_config()?;
    if let Some(addr) = bind {
        server_config = server_config.with_bind_addr(addr);
    }
    let addr = server_config.bind_addr;

    let state = AppState::open(server_config).await?;
    let calendars = state.store.list().await.len();
    info!(calendars, store = %state.store.path().display(), "loaded calendars");

    let listener = TcpListener::bind(addr).await?;
    umi_server::serve(state, listener, SignalHandler::new()).await?;
    Ok(())
}
