//! CLI: serve the API, manage calendars, compute availability locally.
//!
//! This crate provides the `umi` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
