//! Secret values in `config.toml`.
//!
//! `auth.api_key`, `auth.admin_api_key` and `credentials.encryption_key` may
//! hold the secret itself or point at it: `env::VAR` reads the environment,
//! `pass::entry` asks the `pass` password store for the first line of
//! `entry`.

use std::process::Command;

use thiserror::Error;

/// Why a secret reference could not be resolved. Every variant names the
/// config field it came from.
#[derive(Debug, Error)]
pub enum SecretError {
    /// `env::` or `pass::` with nothing after it.
    #[error("{field}: `{value}` does not name a variable or pass entry")]
    EmptyReference { field: &'static str, value: String },

    /// The environment variable is unset or empty.
    #[error("{field}: environment variable `{var}` is not set")]
    MissingEnv { field: &'static str, var: String },

    /// `pass` could not be started.
    #[error("{field}: cannot run `pass show {entry}`: {source}")]
    PassUnavailable {
        field: &'static str,
        entry: String,
        #[source]
        source: std::io::Error,
    },

    /// `pass` ran and failed.
    #[error("{field}: `pass show {entry}` failed: {stderr}")]
    PassFailed {
        field: &'static str,
        entry: String,
        stderr: String,
    },

    /// `pass` printed no secret.
    #[error("{field}: `pass show {entry}` printed nothing")]
    PassEmpty { field: &'static str, entry: String },
}

impl SecretError {
    /// The config field that failed to resolve.
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyReference { field, .. }
            | Self::MissingEnv { field, .. }
            | Self::PassUnavailable { field, .. }
            | Self::PassFailed { field, .. }
            | Self::PassEmpty { field, .. } => field,
        }
    }
}

/// A secret as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretRef<'a> {
    /// The secret itself.
    Plain(&'a str),
    /// `env::VAR`
    Env(&'a str),
    /// `pass::entry`
    Pass(&'a str),
}

impl<'a> SecretRef<'a> {
    /// Splits off a known reference prefix.
    pub fn parse(value: &'a str) -> Self {
        if let Some(var) = value.strip_prefix("env::") {
            Self::Env(var)
        } else if let Some(entry) = value.strip_prefix("pass::") {
            Self::Pass(entry)
        } else {
            Self::Plain(value)
        }
    }

    /// Whether the secret lives outside the config file.
    pub fn is_reference(&self) -> bool {
        !matches!(self, Self::Plain(_))
    }

    /// Fetches the secret for the config `field`.
    pub fn resolve(&self, field: &'static str) -> Result<String, SecretError> {
        match *self {
            Self::Plain(value) => Ok(value.to_string()),
            Self::Env("") => Err(SecretError::EmptyReference {
                field,
                value: "env::".to_string(),
            }),
            Self::Pass("") => Err(SecretError::EmptyReference {
                field,
                value: "pass::".to_string(),
            }),
            Self::Env(var) => match std::env::var(var) {
                Ok(value) if !value.is_empty() => Ok(value),
                _ => Err(SecretError::MissingEnv {
                    field,
                    var: var.to_string(),
                }),
            },
            Self::Pass(entry) => pass_show(field, entry),
        }
    }
}

fn pass_show(field: &'static str, entry: &str) -> Result<String, SecretError> {
    let output = Command::new("pass")
        .args(["show", entry])
        .output()
        .map_err(|source| SecretError::PassUnavailable {
            field,
            entry: entry.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(SecretError::PassFailed {
            field,
            entry: entry.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SecretError::PassEmpty {
            field,
            entry: entry.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use umi_providers::CredentialCipher;

    #[test]
    fn prefixes_are_recognised() {
        assert_eq!(SecretRef::parse("env::UMI_API_KEY"), SecretRef::Env("UMI_API_KEY"));
        assert_eq!(
            SecretRef::parse("pass::umi/encryption-key"),
            SecretRef::Pass("umi/encryption-key")
        );
        assert_eq!(SecretRef::parse("environment"), SecretRef::Plain("environment"));
        assert!(SecretRef::parse("pass::umi/admin").is_reference());
        assert!(!SecretRef::parse("api-key").is_reference());
    }

    #[test]
    fn plain_encryption_key_is_kept() {
        let key = CredentialCipher::generate_key();
        let resolved = SecretRef::parse(&key)
            .resolve("credentials.encryption_key")
            .unwrap();
        assert_eq!(resolved, key);
        assert!(CredentialCipher::from_base64_key(&resolved).is_ok());
    }

    #[test]
    fn env_reference_reads_variable() {
        unsafe {
            std::env::set_var("_UMI_SECRET_TEST_API_KEY", "k-3f9a");
        }
        let resolved = SecretRef::parse("env::_UMI_SECRET_TEST_API_KEY")
            .resolve("auth.api_key")
            .unwrap();
        assert_eq!(resolved, "k-3f9a");
        unsafe {
            std::env::remove_var("_UMI_SECRET_TEST_API_KEY");
        }
    }

    #[test]
    fn unset_variable_names_field() {
        let err = SecretRef::parse("env::_UMI_SECRET_TEST_UNSET")
            .resolve("auth.admin_api_key")
            .unwrap_err();
        assert!(matches!(err, SecretError::MissingEnv { .. }));
        assert_eq!(err.field(), "auth.admin_api_key");
        assert!(err.to_string().starts_with("auth.admin_api_key:"));
    }

    #[test]
    fn bare_prefix_is_rejected() {
        let err = SecretRef::parse("pass::")
            .resolve("credentials.encryption_key")
            .unwrap_err();
        assert!(matches!(err, SecretError::EmptyReference { .. }));
    }

    #[test]
    fn missing_pass_entry_names_field() {
        // Fails whether or not `pass` is installed.
        let err = SecretRef::parse("pass::umi/does-not-exist-5e1c")
            .resolve("credentials.encryption_key")
            .unwrap_err();
        assert_eq!(err.field(), "credentials.encryption_key");
    }
}
