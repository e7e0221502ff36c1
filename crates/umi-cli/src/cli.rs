//! Command-line interface definition.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// umi - availability across every connected calendar
#[derive(Debug, Parser)]
#[command(name = "umi")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "UMI_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API in the foreground
    Serve {
        /// Listen address, overrides `[server] bind`
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Compute availability locally and print it as JSON
    Availability {
        /// Number of days to cover
        #[arg(long)]
        days: Option<u32>,

        /// Only consider this calendar
        #[arg(long)]
        email: Option<String>,

        /// Owner of `--email` when several users share it
        #[arg(long)]
        user: Option<String>,
    },

    /// Manage connected calendars
    Credentials {
        #[command(subcommand)]
        action: CredentialsAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Calendar store actions.
#[derive(Debug, Subcommand)]
pub enum CredentialsAction {
    /// Store a Google authorized-user credentials file for a calendar
    Add {
        /// Path to the credentials JSON (token, refresh_token, client_id, ...)
        file: PathBuf,

        /// Account email of the calendar
        #[arg(long)]
        email: String,

        /// Owner of the calendar
        #[arg(long, default_value = "default")]
        user: String,

        /// Google calendar id
        #[arg(long, default_value = "primary")]
        calendar_id: String,

        /// Make it the owner's primary calendar
        #[arg(long)]
        primary: bool,
    },

    /// List stored calendars
    List,

    /// Check that every stored credential decrypts and decodes
    Check {
        /// Also query each calendar for the next day
        #[arg(long)]
        probe: bool,
    },

    /// Mark a calendar as its owner's primary
    SetPrimary {
        /// Account email of the calendar
        email: String,

        /// Owner, when several users share the email
        #[arg(long)]
        user: Option<String>,
    },

    /// Print a fresh base64 encryption key
    Keygen,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration, secrets masked
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
