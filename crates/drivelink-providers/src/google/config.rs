//! Google Drive integration configuration.

use std::time::Duration;

use drivelink_core::FOLDER_MIME_TYPE;
use url::Url;

use crate::auth::{AuthConfig, DEFAULT_AUTHORIZATION_TIMEOUT};
use crate::picker::PickerConfig;
use crate::provider::UxMode;

/// Read-only Drive scope. The flow never asks for more.
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

/// Google Identity Services client script.
pub const IDENTITY_SCRIPT_URL: &str = "https://accounts.google.com/gsi/client";

/// Google API loader script, which provides the picker.
pub const PICKER_SCRIPT_URL: &str = "https://apis.google.com/js/api.js";

/// Discovery document for Drive v3.
pub const DRIVE_DISCOVERY_DOC: &str = "https://www.googleapis.com/discovery/v1/apis/drive/v3/rest";

/// MIME types offered by the picker unless configured otherwise.
pub const DEFAULT_MIME_TYPES: &[&str] = &[
    FOLDER_MIME_TYPE,
    "application/vnd.google-apps.document",
    "application/pdf",
];

/// Configuration for the Google Drive flavor of the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleDriveConfig {
    /// OAuth client id from the Google Cloud Console.
    pub client_id: String,
    /// API key used by the picker.
    pub developer_key: String,
    /// Cloud project number, passed to the picker as the app id.
    pub app_id: Option<String>,
    pub scope: String,
    pub mime_types: Vec<String>,
    /// Redirect URI the backend uses when exchanging codes.
    pub redirect_uri: String,
    pub identity_script_url: String,
    pub picker_script_url: String,
    pub discovery_doc: String,
    pub authorization_timeout: Duration,
}

impl GoogleDriveConfig {
    /// Creates a configuration with Google's default endpoints.
    pub fn new(
        client_id: impl Into<String>,
        developer_key: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            developer_key: developer_key.into(),
            app_id: None,
            scope: DRIVE_READONLY_SCOPE.to_string(),
            mime_types: DEFAULT_MIME_TYPES.iter().map(|s| s.to_string()).collect(),
            redirect_uri: redirect_uri.into(),
            identity_script_url: IDENTITY_SCRIPT_URL.to_string(),
            picker_script_url: PICKER_SCRIPT_URL.to_string(),
            discovery_doc: DRIVE_DISCOVERY_DOC.to_string(),
            authorization_timeout: DEFAULT_AUTHORIZATION_TIMEOUT,
        }
    }

    /// The redirect URI for a host served from `origin`: its `/home` page.
    pub fn default_redirect_uri(origin: &Url) -> String {
        format!("{}/home", origin.origin().ascii_serialization())
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    /// Replaces the picker MIME filter. An empty list keeps the defaults.
    pub fn with_mime_types(mut self, mime_types: Vec<String>) -> Self {
        if !mime_types.is_empty() {
            self.mime_types = mime_types;
        }
        self
    }

    pub fn with_authorization_timeout(mut self, timeout: Duration) -> Self {
        self.authorization_timeout = timeout;
        self
    }

    /// Checks that the credentials look like Google's.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.developer_key.is_empty() {
            return Err("developer_key is required");
        }
        if self.scope != DRIVE_READONLY_SCOPE {
            return Err("only the drive.readonly scope is supported");
        }
        Ok(())
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            client_id: self.client_id.clone(),
            scope: self.scope.clone(),
            identity_script_url: self.identity_script_url.clone(),
            redirect_uri: self.redirect_uri.clone(),
            ux_mode: UxMode::Popup,
            authorization_timeout: self.authorization_timeout,
        }
    }

    pub fn picker_config(&self) -> PickerConfig {
        PickerConfig {
            developer_key: self.developer_key.clone(),
            app_id: self.app_id.clone(),
            picker_script_url: self.picker_script_url.clone(),
            discovery_doc: self.discovery_doc.clone(),
            mime_types: self.mime_types.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GoogleDriveConfig {
        GoogleDriveConfig::new(
            "123.apps.googleusercontent.com",
            "dev-key",
            "http://localhost:5173/home",
        )
    }

    #[test]
    fn defaults() {
        let config = config();
        assert_eq!(config.scope, DRIVE_READONLY_SCOPE);
        assert_eq!(config.mime_types.len(), 3);
        assert_eq!(config.mime_types[0], FOLDER_MIME_TYPE);
        assert_eq!(config.authorization_timeout, DEFAULT_AUTHORIZATION_TIMEOUT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_credentials() {
        let mut bad = config();
        bad.client_id = "not-a-google-client".to_string();
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.developer_key.clear();
        assert_eq!(bad.validate(), Err("developer_key is required"));

        let mut bad = config();
        bad.scope = "https://www.googleapis.com/auth/drive".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn redirect_uri_from_origin() {
        let origin = Url::parse("https://app.example.com/api/v1/").unwrap();
        assert_eq!(
            GoogleDriveConfig::default_redirect_uri(&origin),
            "https://app.example.com/home"
        );
    }

    #[test]
    fn empty_mime_list_keeps_defaults() {
        let config = config().with_mime_types(Vec::new());
        assert_eq!(config.mime_types.len(), DEFAULT_MIME_TYPES.len());

        let config = config.with_mime_types(vec![FOLDER_MIME_TYPE.to_string()]);
        assert_eq!(config.mime_types, vec![FOLDER_MIME_TYPE.to_string()]);
    }

    #[test]
    fn derived_client_configs() {
        let config = config().with_app_id("987654");
        let auth = config.auth_config();
        assert_eq!(auth.ux_mode, UxMode::Popup);
        assert_eq!(auth.identity_script_url, IDENTITY_SCRIPT_URL);

        let picker = config.picker_config();
        assert_eq!(picker.app_id.as_deref(), Some("987654"));
        assert_eq!(picker.picker_script_url, PICKER_SCRIPT_URL);
        assert_eq!(picker.discovery_doc, DRIVE_DISCOVERY_DOC);
    }
}
