//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/drivelink/config.toml` by default.
//!
//! `session_token` and `developer_key` support secret references
//! (`pass::…`, `env::…`), see [`crate::secret`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use drivelink_providers::HttpBackendGateway;
use drivelink_providers::google::GoogleDriveConfig;
use serde::{Deserialize, Serialize};
use url::Url;

/// Configuration for the drivelink client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Product backend settings.
    pub backend: BackendSettings,

    /// Google Drive settings.
    pub google: Option<GoogleSettings>,

    /// Flow timeouts.
    pub flow: FlowSettings,
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults if it does not exist.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("drivelink")
    }

    /// Returns the `[google]` section or an error explaining how to add it.
    pub fn google(&self) -> Result<&GoogleSettings, String> {
        self.google.as_ref().ok_or_else(|| {
            format!(
                "Google Drive is not configured. Add to {}:\n  \
                 [google]\n  \
                 client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
                 developer_key = \"env::DRIVELINK_DEVELOPER_KEY\"",
                Self::default_path().display()
            )
        })
    }
}

/// Product backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Base URL the `/api/v1/integrations/...` paths are resolved against.
    pub base_url: String,

    /// Host session credential (supports `pass::` and `env::` prefixes).
    pub session_token: Option<String>,

    /// Request timeout in seconds.
    pub timeout: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/".to_string(),
            session_token: None,
            timeout: 30,
        }
    }
}

impl BackendSettings {
    pub fn base_url(&self) -> Result<Url, String> {
        Url::parse(&self.base_url).map_err(|e| format!("invalid backend base_url {:?}: {}", self.base_url, e))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Builds the HTTP gateway, resolving the session token reference.
    pub fn to_gateway(&self) -> Result<HttpBackendGateway, String> {
        let gateway = HttpBackendGateway::new(self.base_url()?, self.timeout())
            .map_err(|e| e.to_string())?;
        let token = crate::secret::resolve_optional(self.session_token.as_deref())
            .map_err(|e| format!("failed to resolve session_token: {}", e))?;
        Ok(match token {
            Some(token) => gateway.with_session_token(token),
            None => gateway,
        })
    }
}

/// Google Drive settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client ID.
    pub client_id: Option<String>,

    /// Picker API key (supports `pass::` and `env::` prefixes).
    pub developer_key: Option<String>,

    /// Cloud project number.
    pub app_id: Option<String>,

    /// OAuth scope; only `drive.readonly` is accepted.
    pub scope: Option<String>,

    /// MIME types offered by the picker.
    pub mime_types: Vec<String>,

    /// Redirect URI for the code exchange. Defaults to `<backend origin>/home`.
    pub redirect_uri: Option<String>,
}

impl GoogleSettings {
    /// Converts to provider configuration.
    pub fn to_provider_config(
        &self,
        backend_url: &Url,
        flow: &FlowSettings,
    ) -> Result<GoogleDriveConfig, String> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or_else(|| "client_id is missing from [google] section".to_string())?;
        let developer_key = crate::secret::resolve_optional(self.developer_key.as_deref())
            .map_err(|e| format!("failed to resolve developer_key: {}", e))?
            .ok_or_else(|| "developer_key is missing from [google] section".to_string())?;
        let redirect_uri = self
            .redirect_uri
            .clone()
            .unwrap_or_else(|| GoogleDriveConfig::default_redirect_uri(backend_url));

        let mut config = GoogleDriveConfig::new(client_id, developer_key, redirect_uri)
            .with_mime_types(self.mime_types.clone())
            .with_authorization_timeout(flow.authorization_timeout());
        if let Some(ref app_id) = self.app_id {
            config = config.with_app_id(app_id);
        }
        if let Some(ref scope) = self.scope {
            config.scope = scope.clone();
        }

        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }
}

/// Flow timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowSettings {
    /// How long a provider script may take to load.
    pub script_timeout: u64,

    /// How long to wait for the consent screen.
    pub authorization_timeout: u64,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            script_timeout: drivelink_providers::DEFAULT_SCRIPT_TIMEOUT.as_secs(),
            authorization_timeout: drivelink_providers::DEFAULT_AUTHORIZATION_TIMEOUT.as_secs(),
        }
    }
}

impl FlowSettings {
    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout)
    }

    pub fn authorization_timeout(&self) -> Duration {
        Duration::from_secs(self.authorization_timeout)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const FULL: &str = r#"
debug = true

[backend]
base_url = "https://portal.example.com/"
timeout = 10

[google]
client_id = "123.apps.googleusercontent.com"
developer_key = "AIzaSyExample"
app_id = "987654"
mime_types = ["application/vnd.google-apps.folder"]

[flow]
authorization_timeout = 120
"#;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert!(!config.debug);
        assert_eq!(config.backend.base_url, "http://localhost:8000/");
        assert_eq!(config.flow.script_timeout(), Duration::from_secs(15));
        assert_eq!(config.flow.authorization_timeout(), Duration::from_secs(300));
        assert!(config.google.is_none());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let config = ClientConfig::load_from(file.path()).unwrap();
        assert!(config.debug);
        assert_eq!(config.backend.timeout(), Duration::from_secs(10));
        assert_eq!(config.flow.authorization_timeout, 120);
        assert_eq!(config.flow.script_timeout, 15);

        let backend_url = config.backend.base_url().unwrap();
        let google = config
            .google()
            .unwrap()
            .to_provider_config(&backend_url, &config.flow)
            .unwrap();
        assert_eq!(google.redirect_uri, "https://portal.example.com/home");
        assert_eq!(google.app_id.as_deref(), Some("987654"));
        assert_eq!(google.authorization_timeout, Duration::from_secs(120));
        assert_eq!(google.mime_types.len(), 1);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[backend\nbase_url = 1").unwrap();

        let err = ClientConfig::load_from(&path).unwrap_err();
        assert!(err.starts_with("failed to parse config"));

        let err = ClientConfig::load_from(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.starts_with("failed to read config"));
    }

    #[test]
    fn missing_google_section_explains_fix() {
        let err = ClientConfig::default().google().unwrap_err();
        assert!(err.contains("[google]"));
    }

    #[test]
    fn developer_key_from_env() {
        unsafe {
            std::env::set_var("_DRIVELINK_TEST_CFG_KEY", "AIzaFromEnv");
        }
        let settings = GoogleSettings {
            client_id: Some("123.apps.googleusercontent.com".to_string()),
            developer_key: Some("env::_DRIVELINK_TEST_CFG_KEY".to_string()),
            ..Default::default()
        };
        let url = Url::parse("http://localhost:8000/").unwrap();
        let config = settings.to_provider_config(&url, &FlowSettings::default()).unwrap();
        assert_eq!(config.developer_key, "AIzaFromEnv");
        assert_eq!(config.redirect_uri, "http://localhost:8000/home");
        unsafe {
            std::env::remove_var("_DRIVELINK_TEST_CFG_KEY");
        }
    }

    #[test]
    fn invalid_google_settings_rejected() {
        let url = Url::parse("http://localhost:8000/").unwrap();
        let flow = FlowSettings::default();

        let missing_key = GoogleSettings {
            client_id: Some("123.apps.googleusercontent.com".to_string()),
            ..Default::default()
        };
        assert!(missing_key.to_provider_config(&url, &flow).unwrap_err().contains("developer_key"));

        let wide_scope = GoogleSettings {
            client_id: Some("123.apps.googleusercontent.com".to_string()),
            developer_key: Some("k".to_string()),
            scope: Some("https://www.googleapis.com/auth/drive".to_string()),
            ..Default::default()
        };
        assert!(wide_scope.to_provider_config(&url, &flow).is_err());
    }

    #[test]
    fn gateway_from_settings() {
        let settings = BackendSettings {
            base_url: "https://portal.example.com/app".to_string(),
            session_token: Some("plain-token".to_string()),
            timeout: 5,
        };
        let gateway = settings.to_gateway().unwrap();
        assert_eq!(gateway.base_url().as_str(), "https://portal.example.com/app/");

        let bad = BackendSettings {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(bad.to_gateway().is_err());
    }
}
