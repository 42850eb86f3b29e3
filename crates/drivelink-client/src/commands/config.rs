//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    println!("# config.toml ({})", path.display());
    println!("{}", render(config)?);
    Ok(())
}

fn render(config: &ClientConfig) -> ClientResult<String> {
    toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    let backend_url = config.backend.base_url().map_err(ClientError::Config)?;
    config.backend.to_gateway().map_err(ClientError::Config)?;

    if let Some(ref google) = config.google {
        google
            .to_provider_config(&backend_url, &config.flow)
            .map_err(|e| ClientError::Config(format!("invalid [google] section: {}", e)))?;
        println!("Google Drive settings are valid.");
    }

    if config.flow.script_timeout == 0 || config.flow.authorization_timeout == 0 {
        return Err(ClientError::Config("flow timeouts must be positive".to_string()));
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GoogleSettings;

    #[test]
    fn default_config_renders() {
        insta::assert_snapshot!(render(&ClientConfig::default()).unwrap(), @r#"
        debug = false

        [backend]
        base_url = "http://localhost:8000/"
        timeout = 30

        [flow]
        script_timeout = 15
        authorization_timeout = 300
        "#);
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(validate(&ClientConfig::default()).is_ok());
    }

    #[test]
    fn validate_rejects_bad_google_section() {
        let config = ClientConfig {
            google: Some(GoogleSettings {
                client_id: Some("not-google".to_string()),
                developer_key: Some("k".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("[google]"));
    }

    #[test]
    fn validate_rejects_zero_timeouts() {
        let mut config = ClientConfig::default();
        config.flow.script_timeout = 0;
        assert!(validate(&config).is_err());
    }
}
