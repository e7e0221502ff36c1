//! Client error types.

use std::path::PathBuf;

use thiserror::Error;
use umi_providers::google::CredentialError;
use umi_providers::{CipherError, ProviderError};
use umi_server::ServerError;

use crate::secret::SecretError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A secret reference in the config did not resolve.
    #[error("cannot resolve {0}")]
    Secret(#[from] SecretError),

    /// The encryption key is unusable.
    #[error("encryption key: {0}")]
    Key(#[from] CipherError),

    /// A credentials file could not be used.
    #[error("{}: {source}", path.display())]
    CredentialsFile {
        path: PathBuf,
        #[source]
        source: CredentialError,
    },

    /// Provider error.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Store or server failure.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// Output could not be rendered.
    #[error("cannot render output: {0}")]
    Render(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
