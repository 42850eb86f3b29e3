//! Picker client.
//!
//! Initializes the provider's file browser once authorization is confirmed,
//! shows a single-selection view restricted to the configured MIME types, and
//! normalizes whatever the widget returns into a [`Selection`].

use std::sync::{Arc, LazyLock};

use drivelink_core::{AccessToken, AuthStatus, Selection};
use regex::Regex;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{IntegrationError, IntegrationResult};
use crate::provider::{PickedDocument, PickerAction, PickerApiConfig, PickerProvider, PickerRequest};
use crate::script::ScriptLoader;

/// Matches the folder id in a Drive folder link.
static FOLDER_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"drive/folders/([^/?#]+)").expect("Invalid folder link regex")
});

/// Settings for the picker view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerConfig {
    pub developer_key: String,
    pub app_id: Option<String>,
    /// URL of the picker/API loader script.
    pub picker_script_url: String,
    pub discovery_doc: String,
    /// MIME types offered in the view. Folders are always included.
    pub mime_types: Vec<String>,
}

/// Drives the picker widget for one host.
pub struct PickerClient {
    config: PickerConfig,
    scripts: Arc<ScriptLoader>,
    provider: Arc<dyn PickerProvider>,
    ready: OnceCell<()>,
}

impl PickerClient {
    pub fn new(
        config: PickerConfig,
        scripts: Arc<ScriptLoader>,
        provider: Arc<dyn PickerProvider>,
    ) -> Self {
        Self {
            config,
            scripts,
            provider,
            ready: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &PickerConfig {
        &self.config
    }

    /// Returns true once the picker API client is initialized.
    pub fn is_ready(&self) -> bool {
        self.ready.initialized()
    }

    /// Loads the picker script and initializes its API client.
    ///
    /// Idempotent once it has succeeded.
    ///
    /// # Errors
    ///
    /// `NotAuthenticatedError` if `status` is not authenticated,
    /// `ScriptLoadError` if the script does not load, and
    /// `PickerUnavailableError` if the API client cannot be initialized.
    pub async fn initialize(&self, status: &AuthStatus) -> IntegrationResult<()> {
        if !status.is_authenticated {
            return Err(IntegrationError::not_authenticated(
                "picker requires an authorized session",
            ));
        }
        if self.is_ready() {
            return Ok(());
        }

        self.scripts.load(&self.config.picker_script_url).await?;

        let api = PickerApiConfig {
            developer_key: self.config.developer_key.clone(),
            discovery_doc: self.config.discovery_doc.clone(),
        };
        self.ready
            .get_or_try_init(|| async {
                self.provider.load_api(&api).await.map_err(|e| {
                    warn!(error = %e, "picker API client failed to initialize");
                    IntegrationError::picker_unavailable("picker API client failed to initialize")
                        .with_detail(e.message().to_string())
                        .with_source(e)
                })
            })
            .await?;

        info!("picker ready");
        Ok(())
    }

    /// Shows the picker and waits for the user.
    ///
    /// Returns `None` when the user cancels. Only the first document is
    /// considered; the view is single-selection.
    ///
    /// # Errors
    ///
    /// `PickerUnavailableError` if called before [`initialize`](Self::initialize)
    /// succeeded or if the widget fails.
    pub async fn open_and_select(&self, token: &AccessToken) -> IntegrationResult<Option<Selection>> {
        if !self.is_ready() {
            return Err(IntegrationError::picker_unavailable("picker is not initialized"));
        }

        let request = PickerRequest {
            oauth_token: token.clone(),
            developer_key: self.config.developer_key.clone(),
            app_id: self.config.app_id.clone(),
            mime_types: self.config.mime_types.clone(),
            include_folders: true,
            select_folder_enabled: true,
        };

        let response = self.provider.show(request).await.map_err(|e| {
            IntegrationError::picker_unavailable("picker failed")
                .with_detail(e.message().to_string())
                .with_source(e)
        })?;

        match response.action {
            PickerAction::Cancel => {
                debug!("picker cancelled");
                Ok(None)
            }
            PickerAction::Picked => match response.docs.first() {
                Some(doc) => {
                    let selection = selection_from_document(doc);
                    info!(
                        resource_id = %selection.resource_id,
                        kind = %selection.kind,
                        shared = selection.is_shared_container_item,
                        "resource selected"
                    );
                    Ok(Some(selection))
                }
                None => {
                    debug!("picker returned no documents");
                    Ok(None)
                }
            },
        }
    }
}

impl std::fmt::Debug for PickerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PickerClient")
            .field("config", &self.config)
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Normalizes a picked document.
///
/// The container id comes from a folder link when the document carries one.
/// Shared items without such a link fall back to their own id; for anything
/// else the container id is left unset.
pub fn selection_from_document(doc: &PickedDocument) -> Selection {
    let parent = doc
        .url
        .as_deref()
        .and_then(|url| FOLDER_LINK_REGEX.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .or_else(|| doc.is_shared.then(|| doc.id.clone()));

    let mut selection = Selection::new(&doc.id, &doc.name, &doc.mime_type).with_shared(doc.is_shared);
    selection.parent_or_drive_id = parent;
    selection.organization = doc.organization_display_name.clone();
    selection
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use drivelink_core::{ErrorKind, FOLDER_MIME_TYPE, ResourceKind};

    use super::*;
    use crate::provider::{BoxFuture, HostError, PickerResponse, ScriptHost};

    struct ReadyHost;

    impl ScriptHost for ReadyHost {
        fn inject<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<(), HostError>> {
            Box::pin(async { Ok(()) })
        }
    }

    struct FakePicker {
        api_fails: bool,
        response: PickerResponse,
        requests: Mutex<Vec<PickerRequest>>,
    }

    impl FakePicker {
        fn answering(response: PickerResponse) -> Arc<Self> {
            Arc::new(Self {
                api_fails: false,
                response,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    impl PickerProvider for FakePicker {
        fn load_api<'a>(
            &'a self,
            config: &'a PickerApiConfig,
        ) -> BoxFuture<'a, Result<(), HostError>> {
            let fails = self.api_fails;
            Box::pin(async move {
                assert_eq!(config.developer_key, "dev-key");
                if fails {
                    Err(HostError::new("discovery document unavailable"))
                } else {
                    Ok(())
                }
            })
        }

        fn show(&self, request: PickerRequest) -> BoxFuture<'_, Result<PickerResponse, HostError>> {
            self.requests.lock().unwrap().push(request);
            let response = self.response.clone();
            Box::pin(async move { Ok(response) })
        }
    }

    fn config() -> PickerConfig {
        PickerConfig {
            developer_key: "dev-key".to_string(),
            app_id: Some("123".to_string()),
            picker_script_url: "https://apis.google.com/js/api.js".to_string(),
            discovery_doc: "https://www.googleapis.com/discovery/v1/apis/drive/v3/rest".to_string(),
            mime_types: vec![FOLDER_MIME_TYPE.to_string(), "application/pdf".to_string()],
        }
    }

    fn client(provider: Arc<FakePicker>) -> PickerClient {
        PickerClient::new(
            config(),
            Arc::new(ScriptLoader::new(Arc::new(ReadyHost))),
            provider,
        )
    }

    fn doc(id: &str, mime_type: &str) -> PickedDocument {
        PickedDocument {
            id: id.to_string(),
            name: format!("{} name", id),
            mime_type: mime_type.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn initialize_requires_authentication() {
        let picker = client(FakePicker::answering(PickerResponse::cancelled()));

        let err = picker.initialize(&AuthStatus::unauthenticated()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthenticated);
        assert!(!picker.is_ready());
    }

    #[tokio::test]
    async fn api_failure_is_picker_unavailable() {
        let provider = Arc::new(FakePicker {
            api_fails: true,
            response: PickerResponse::cancelled(),
            requests: Mutex::new(Vec::new()),
        });
        let picker = client(provider);

        let err = picker.initialize(&AuthStatus::authenticated()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PickerUnavailable);
        assert_eq!(err.detail(), Some("discovery document unavailable"));
    }

    #[tokio::test]
    async fn open_before_initialize_is_picker_unavailable() {
        let picker = client(FakePicker::answering(PickerResponse::cancelled()));

        let err = picker
            .open_and_select(&AccessToken::new("ya29.token"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PickerUnavailable);
    }

    #[tokio::test]
    async fn picked_folder_is_normalized() {
        let provider = FakePicker::answering(PickerResponse::picked(doc("F1", FOLDER_MIME_TYPE)));
        let picker = client(provider.clone());
        picker.initialize(&AuthStatus::authenticated()).await.unwrap();

        let selection = picker
            .open_and_select(&AccessToken::new("ya29.token"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(selection.resource_id, "F1");
        assert_eq!(selection.kind, ResourceKind::Folder);

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].oauth_token.secret(), "ya29.token");
        assert!(requests[0].include_folders);
        assert!(requests[0].select_folder_enabled);
        assert_eq!(requests[0].app_id.as_deref(), Some("123"));
    }

    #[tokio::test]
    async fn cancel_and_empty_pick_return_none() {
        let picker = client(FakePicker::answering(PickerResponse::cancelled()));
        picker.initialize(&AuthStatus::authenticated()).await.unwrap();
        assert!(picker.open_and_select(&AccessToken::new("t")).await.unwrap().is_none());

        let empty = PickerResponse {
            action: PickerAction::Picked,
            docs: Vec::new(),
        };
        let picker = client(FakePicker::answering(empty));
        picker.initialize(&AuthStatus::authenticated()).await.unwrap();
        assert!(picker.open_and_select(&AccessToken::new("t")).await.unwrap().is_none());
    }

    #[test]
    fn owned_file_has_no_container() {
        let selection = selection_from_document(&doc("doc-7", "application/pdf"));
        assert_eq!(selection.kind, ResourceKind::File);
        assert!(selection.parent_or_drive_id.is_none());
        assert!(!selection.is_shared_container_item);
    }

    #[test]
    fn container_from_folder_link() {
        let mut picked = doc("doc-7", "application/pdf");
        picked.url = Some("https://drive.google.com/drive/folders/0AbCdEf?usp=sharing".to_string());

        let selection = selection_from_document(&picked);
        assert_eq!(selection.parent_or_drive_id.as_deref(), Some("0AbCdEf"));
    }

    #[test]
    fn shared_item_without_link_uses_own_id() {
        let mut picked = doc("D1", FOLDER_MIME_TYPE);
        picked.is_shared = true;
        picked.organization_display_name = Some("Acme Labs".to_string());

        let selection = selection_from_document(&picked);
        assert_eq!(selection.parent_or_drive_id.as_deref(), Some("D1"));
        assert!(selection.is_shared_container_item);
        assert_eq!(selection.organization.as_deref(), Some("Acme Labs"));
    }

    #[test]
    fn non_folder_link_is_ignored() {
        let mut picked = doc("doc-7", "application/pdf");
        picked.url = Some("https://docs.google.com/document/d/doc-7/edit".to_string());
        assert!(selection_from_document(&picked).parent_or_drive_id.is_none());
    }
}
