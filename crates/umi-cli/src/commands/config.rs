//! Configuration commands.

use std::path::Path;

use crate::config::AppConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout, plain-text secrets masked.
pub fn dump(config: &AppConfig, path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(&config.redacted())
        .map_err(|e| ClientError::config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);

    Ok(())
}

/// Validate the configuration as `umi serve` would.
pub fn validate(config: &AppConfig) -> ClientResult<()> {
    let server = config.to_server_config()?;
    server
        .validate()
        .map_err(|e| ClientError::config(e.to_string()))?;
    config.cipher()?;

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration and store paths.
pub fn path(config: &AppConfig, path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    println!("store:  {}", config.store_path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use umi_providers::CredentialCipher;

    #[test]
    fn validate_requires_api_key() {
        let mut config = AppConfig::default();
        config.credentials.encryption_key = Some(CredentialCipher::generate_key());
        assert!(validate(&config).is_err());

        config.auth.api_key = Some("api".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn validate_rejects_short_key() {
        let mut config = AppConfig::default();
        config.auth.api_key = Some("api".to_string());
        config.credentials.encryption_key = Some("c2hvcnQ=".to_string());
        assert!(matches!(validate(&config), Err(ClientError::Key(_))));
    }
}
