//! Stored OAuth credentials of a connected Google account.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fields every credential payload must carry.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "token",
    "refresh_token",
    "token_uri",
    "client_id",
    "client_secret",
    "scopes",
];

/// A credential payload that cannot be used.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The payload is not a JSON object.
    #[error("credentials are not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Required fields are absent or null.
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

/// Decoded OAuth credentials.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct GoogleCredentials {
    /// Access token sent as bearer.
    pub token: String,
    /// Long-lived token used to mint new access tokens.
    pub refresh_token: String,
    /// Token endpoint.
    pub token_uri: String,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Granted scopes.
    pub scopes: Vec<String>,
}

impl fmt::Debug for GoogleCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleCredentials")
            .field("token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scopes {
    List(Vec<String>),
    Joined(String),
}

#[derive(Deserialize)]
struct PartialCredentials {
    token: Option<String>,
    refresh_token: Option<String>,
    token_uri: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    scopes: Option<Scopes>,
}

impl GoogleCredentials {
    /// Decodes a JSON payload, naming every missing field on failure.
    ///
    /// `scopes` may be a list or a space-separated string.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CredentialError> {
        let partial: PartialCredentials = serde_json::from_slice(bytes)?;

        let present = [
            partial.token.is_some(),
            partial.refresh_token.is_some(),
            partial.token_uri.is_some(),
            partial.client_id.is_some(),
            partial.client_secret.is_some(),
            partial.scopes.is_some(),
        ];
        let missing: Vec<&'static str> = REQUIRED_FIELDS
            .iter()
            .zip(present)
            .filter(|(_, present)| !present)
            .map(|(field, _)| *field)
            .collect();

        match partial {
            PartialCredentials {
                token: Some(token),
                refresh_token: Some(refresh_token),
                token_uri: Some(token_uri),
                client_id: Some(client_id),
                client_secret: Some(client_secret),
                scopes: Some(scopes),
            } => Ok(Self {
                token,
                refresh_token,
                token_uri,
                client_id,
                client_secret,
                scopes: match scopes {
                    Scopes::List(list) => list,
                    Scopes::Joined(joined) => {
                        joined.split_whitespace().map(str::to_string).collect()
                    }
                },
            }),
            _ => Err(CredentialError::MissingFields(missing)),
        }
    }

    /// Encodes the payload as JSON.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
