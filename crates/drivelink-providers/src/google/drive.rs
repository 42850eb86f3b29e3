//! Native picker backed by the Drive v3 REST API.
//!
//! Lists the files the user can see, filtered to the configured MIME types,
//! and lets a [`Chooser`] pick one. Documents are shaped like the browser
//! picker's: items with a parent carry a folder link, items on shared drives
//! are flagged as shared.

use std::sync::Arc;
use std::time::Duration;

use drivelink_core::FOLDER_MIME_TYPE;
use serde::Deserialize;
use tracing::{debug, info};

use crate::provider::{
    BoxFuture, HostError, PickedDocument, PickerApiConfig, PickerProvider, PickerRequest,
    PickerResponse,
};

/// Base URL for Drive API v3.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

const FILE_FIELDS: &str = "files(id,name,mimeType,parents,driveId,shared)";

const DEFAULT_PAGE_SIZE: u32 = 100;

/// Lets the user choose among listed documents.
///
/// Called on a blocking thread; implementations may wait on stdin.
pub trait Chooser: Send + Sync {
    /// Returns the index of the chosen document, or `None` to cancel.
    fn choose(&self, documents: &[PickedDocument]) -> Result<Option<usize>, HostError>;
}

/// [`PickerProvider`] that talks to the Drive API directly.
pub struct DrivePicker {
    http_client: reqwest::Client,
    api_base: String,
    page_size: u32,
    chooser: Arc<dyn Chooser>,
}

impl DrivePicker {
    /// Creates a picker using `chooser` for the final selection.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(chooser: Arc<dyn Chooser>, timeout: Duration) -> Result<Self, HostError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HostError::new("failed to create HTTP client").with_source(e))?;

        Ok(Self {
            http_client,
            api_base: DRIVE_API_BASE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            chooser,
        })
    }

    /// Overrides the API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    async fn list_files(&self, request: &PickerRequest) -> Result<Vec<PickedDocument>, HostError> {
        let url = format!("{}/files", self.api_base);
        let query = mime_query(request);
        let page_size = self.page_size.to_string();
        debug!(%query, "listing Drive files");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(request.oauth_token.secret())
            .query(&[
                ("q", query.as_str()),
                ("fields", FILE_FIELDS),
                ("pageSize", page_size.as_str()),
                ("orderBy", "folder,name"),
                ("key", request.developer_key.as_str()),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await
            .map_err(|e| HostError::new("Drive file listing failed").with_source(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| HostError::new("failed to read Drive response").with_source(e))?;
        if !status.is_success() {
            return Err(HostError::new(format!("Drive API returned {}: {}", status, body)));
        }

        let list: FileList = serde_json::from_str(&body)
            .map_err(|e| HostError::new("invalid Drive file list").with_source(e))?;

        Ok(list
            .files
            .into_iter()
            .filter(|file| request.select_folder_enabled || file.mime_type != FOLDER_MIME_TYPE)
            .map(DriveFile::into_document)
            .collect())
    }
}

impl std::fmt::Debug for DrivePicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrivePicker")
            .field("api_base", &self.api_base)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl PickerProvider for DrivePicker {
    fn load_api<'a>(&'a self, config: &'a PickerApiConfig) -> BoxFuture<'a, Result<(), HostError>> {
        Box::pin(async move {
            debug!(discovery_doc = %config.discovery_doc, "loading discovery document");
            let response = self
                .http_client
                .get(&config.discovery_doc)
                .query(&[("key", config.developer_key.as_str())])
                .send()
                .await
                .map_err(|e| HostError::new("discovery document request failed").with_source(e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(HostError::new(format!(
                    "discovery document returned {}",
                    status
                )));
            }
            let doc: DiscoveryDoc = response
                .json()
                .await
                .map_err(|e| HostError::new("invalid discovery document").with_source(e))?;
            info!(api = %doc.name, version = %doc.version, "API client ready");
            Ok(())
        })
    }

    fn show(&self, request: PickerRequest) -> BoxFuture<'_, Result<PickerResponse, HostError>> {
        Box::pin(async move {
            let documents = self.list_files(&request).await?;
            debug!(count = documents.len(), "documents listed");

            let chooser = Arc::clone(&self.chooser);
            let (choice, mut documents) = tokio::task::spawn_blocking(move || {
                let choice = chooser.choose(&documents);
                (choice, documents)
            })
            .await
            .map_err(|e| HostError::new("chooser failed").with_source(e))?;

            match choice? {
                Some(index) if index < documents.len() => {
                    Ok(PickerResponse::picked(documents.swap_remove(index)))
                }
                Some(index) => Err(HostError::new(format!("no document at index {}", index))),
                None => Ok(PickerResponse::cancelled()),
            }
        })
    }
}

/// Builds the `q` filter: not trashed, any of the requested MIME types.
fn mime_query(request: &PickerRequest) -> String {
    let mut mime_types: Vec<&str> = request.mime_types.iter().map(String::as_str).collect();
    if request.include_folders && !mime_types.contains(&FOLDER_MIME_TYPE) {
        mime_types.push(FOLDER_MIME_TYPE);
    }

    let clauses: Vec<String> = mime_types
        .iter()
        .map(|mime| format!("mimeType = '{}'", mime.replace('\'', "\\'")))
        .collect();
    if clauses.is_empty() {
        "trashed = false".to_string()
    } else {
        format!("trashed = false and ({})", clauses.join(" or "))
    }
}

#[derive(Debug, Deserialize)]
struct DiscoveryDoc {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    parents: Vec<String>,
    #[serde(default)]
    drive_id: Option<String>,
    #[serde(default)]
    shared: bool,
}

impl DriveFile {
    fn into_document(self) -> PickedDocument {
        PickedDocument {
            url: self
                .parents
                .first()
                .map(|parent| format!("https://drive.google.com/drive/folders/{}", parent)),
            is_shared: self.shared || self.drive_id.is_some(),
            id: self.id,
            name: self.name,
            mime_type: self.mime_type,
            organization_display_name: None,
        }
    }
}
