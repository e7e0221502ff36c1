//! Subcommand implementations.

pub mod availability;
pub mod config;
pub mod credentials;
pub mod serve;
