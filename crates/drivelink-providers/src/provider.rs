//! Host capability interfaces.
//!
//! The identity SDK and the picker widget are supplied by the host rather
//! than looked up as ambient globals. A browser host wires these traits to
//! the injected scripts; the native host in [`crate::google`] implements them
//! with a loopback redirect and the Drive REST API; tests use in-memory fakes.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use drivelink_core::AccessToken;
use thiserror::Error;

/// A boxed future for async trait methods.
///
/// Boxed futures keep the capability traits object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A failure reported by a host capability.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HostError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Inserts third-party scripts into the host document.
pub trait ScriptHost: Send + Sync {
    /// Inserts the script at `url` and resolves once it signals readiness.
    ///
    /// Called at most once per URL by [`crate::ScriptLoader`] while a load is
    /// in flight or has succeeded.
    fn inject<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), HostError>>;
}

/// How the provider presents its consent screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UxMode {
    #[default]
    Popup,
    Redirect,
}

impl UxMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Popup => "popup",
            Self::Redirect => "redirect",
        }
    }
}

/// Parameters for the provider's authorization-code client factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeClientConfig {
    pub client_id: String,
    pub scope: String,
    pub ux_mode: UxMode,
}

/// A short-lived authorization code delivered by the provider callback.
#[derive(Clone, PartialEq, Eq)]
pub struct CodeGrant {
    /// The authorization code. Exchanged immediately, never retained.
    pub code: String,
    /// The redirect URI the provider used, when it differs from the configured one.
    pub redirect_uri: Option<String>,
}

impl CodeGrant {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            redirect_uri: None,
        }
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }
}

impl fmt::Debug for CodeGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeGrant")
            .field("code", &"***")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// What the provider callback reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeResponse {
    /// The user granted access.
    Granted(CodeGrant),
    /// The provider reported an error such as `access_denied`.
    Denied {
        error: String,
        description: Option<String>,
    },
    /// The user closed the consent popup without answering.
    Dismissed,
}

/// An authorization-code client created by the identity SDK.
pub trait CodeClient: Send + Sync {
    /// Starts the provider's consent flow and resolves with its callback.
    fn request_code(&self) -> BoxFuture<'_, Result<CodeResponse, HostError>>;
}

/// The identity SDK: a factory for authorization-code clients.
pub trait IdentityProvider: Send + Sync {
    fn init_code_client(&self, config: CodeClientConfig) -> Result<Box<dyn CodeClient>, HostError>;
}

/// Parameters for initializing the picker's API client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerApiConfig {
    pub developer_key: String,
    /// Discovery document of the API the picker browses.
    pub discovery_doc: String,
}

/// A single-selection picker view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerRequest {
    pub oauth_token: AccessToken,
    pub developer_key: String,
    /// Application id registered with the provider, if any.
    pub app_id: Option<String>,
    /// MIME types the view is restricted to.
    pub mime_types: Vec<String>,
    pub include_folders: bool,
    pub select_folder_enabled: bool,
}

/// The action that closed the picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerAction {
    Picked,
    Cancel,
}

/// A document as returned by the picker widget.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PickedDocument {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    /// Link to the document; for items inside a folder view it points at the folder.
    pub url: Option<String>,
    /// Set for items reached through a shared drive or folder.
    pub is_shared: bool,
    pub organization_display_name: Option<String>,
}

/// The picker widget's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerResponse {
    pub action: PickerAction,
    pub docs: Vec<PickedDocument>,
}

impl PickerResponse {
    pub fn picked(doc: PickedDocument) -> Self {
        Self {
            action: PickerAction::Picked,
            docs: vec![doc],
        }
    }

    pub fn cancelled() -> Self {
        Self {
            action: PickerAction::Cancel,
            docs: Vec::new(),
        }
    }
}

/// The provider-hosted file browser.
pub trait PickerProvider: Send + Sync {
    /// Initializes the provider's API client. Requires the picker script.
    fn load_api<'a>(&'a self, config: &'a PickerApiConfig) -> BoxFuture<'a, Result<(), HostError>>;

    /// Shows the widget and resolves when the user picks or cancels.
    fn show(&self, request: PickerRequest) -> BoxFuture<'_, Result<PickerResponse, HostError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_grant_debug_hides_code() {
        let grant = CodeGrant::new("4/0AX-secret").with_redirect_uri("http://localhost:5173/home");
        let debug = format!("{:?}", grant);
        assert!(!debug.contains("4/0AX-secret"));
        assert!(debug.contains("localhost:5173"));
    }

    #[test]
    fn picker_response_helpers() {
        let picked = PickerResponse::picked(PickedDocument {
            id: "F1".to_string(),
            ..Default::default()
        });
        assert_eq!(picked.action, PickerAction::Picked);
        assert_eq!(picked.docs.len(), 1);

        let cancelled = PickerResponse::cancelled();
        assert_eq!(cancelled.action, PickerAction::Cancel);
        assert!(cancelled.docs.is_empty());
    }

    #[test]
    fn ux_mode_names() {
        assert_eq!(UxMode::default().as_str(), "popup");
        assert_eq!(UxMode::Redirect.as_str(), "redirect");
    }
}
