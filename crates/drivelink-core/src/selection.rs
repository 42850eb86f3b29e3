//! Picker selections and authorization data.
//!
//! A [`Selection`] is the normalized result of one picker interaction. The
//! picker widget returns differently shaped documents for items the user owns
//! and for items reached through a shared drive, so the container id is
//! optional and callers must tolerate its absence.

use std::fmt;

use serde::{Deserialize, Serialize};

/// MIME type the storage provider uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Whether a selected resource is a single file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// A single document.
    File,
    /// A folder; the backend retrieves its contents recursively.
    Folder,
}

impl ResourceKind {
    /// Derives the kind from a provider MIME type.
    pub fn from_mime_type(mime_type: &str) -> Self {
        if mime_type == FOLDER_MIME_TYPE {
            Self::Folder
        } else {
            Self::File
        }
    }

    /// Returns true for folders.
    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Folder)
    }

    /// Returns the lowercase name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of a picker interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Identifier of the picked resource. Always present.
    pub resource_id: String,
    /// Container or shared-drive id, when it could be derived.
    pub parent_or_drive_id: Option<String>,
    /// File or folder.
    pub kind: ResourceKind,
    /// Name shown in the picker.
    pub display_name: String,
    /// Provider MIME type.
    pub mime_type: String,
    /// Whether the item was reached through a shared drive or folder.
    pub is_shared_container_item: bool,
    /// Owning organization, when the provider reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

impl Selection {
    /// Creates a selection, deriving the kind from the MIME type.
    pub fn new(
        resource_id: impl Into<String>,
        display_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        let mime_type = mime_type.into();
        Self {
            resource_id: resource_id.into(),
            parent_or_drive_id: None,
            kind: ResourceKind::from_mime_type(&mime_type),
            display_name: display_name.into(),
            mime_type,
            is_shared_container_item: false,
            organization: None,
        }
    }

    /// Builder method to set the container id.
    pub fn with_parent_or_drive_id(mut self, id: impl Into<String>) -> Self {
        self.parent_or_drive_id = Some(id.into());
        self
    }

    /// Builder method to mark the item as shared.
    pub fn with_shared(mut self, shared: bool) -> Self {
        self.is_shared_container_item = shared;
        self
    }

    /// Returns true if the selection is a folder.
    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }
}

/// Authorization state as reported by the backend.
///
/// Derived, never stored: every orchestrator run queries it again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether the backend holds a usable token for this session.
    #[serde(rename = "isAuthenticated")]
    pub is_authenticated: bool,
}

impl AuthStatus {
    /// An authenticated status.
    pub fn authenticated() -> Self {
        Self {
            is_authenticated: true,
        }
    }

    /// An unauthenticated status.
    pub fn unauthenticated() -> Self {
        Self::default()
    }
}

/// An opaque OAuth access token.
///
/// The backend is the token's system of record; clients only hold it for the
/// duration of one call. `Debug` is redacted so tokens never reach logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for use in an `Authorization` header.
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

impl From<String> for AccessToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_mime_type() {
        assert_eq!(ResourceKind::from_mime_type(FOLDER_MIME_TYPE), ResourceKind::Folder);
        assert_eq!(ResourceKind::from_mime_type("application/pdf"), ResourceKind::File);
        assert_eq!(
            ResourceKind::from_mime_type("application/vnd.google-apps.document"),
            ResourceKind::File
        );
    }

    #[test]
    fn selection_builder() {
        let selection = Selection::new("F1", "Reports", FOLDER_MIME_TYPE)
            .with_parent_or_drive_id("D1")
            .with_shared(true);

        assert_eq!(selection.resource_id, "F1");
        assert!(selection.is_folder());
        assert_eq!(selection.parent_or_drive_id.as_deref(), Some("D1"));
        assert!(selection.is_shared_container_item);
        assert!(selection.organization.is_none());
    }

    #[test]
    fn auth_status_wire_name() {
        let status: AuthStatus = serde_json::from_str(r#"{"isAuthenticated": true}"#).unwrap();
        assert!(status.is_authenticated);
        assert_eq!(
            serde_json::to_string(&AuthStatus::unauthenticated()).unwrap(),
            r#"{"isAuthenticated":false}"#
        );
    }

    #[test]
    fn access_token_debug_is_redacted() {
        let token = AccessToken::new("ya29.secret");
        assert_eq!(format!("{:?}", token), "AccessToken(***)");
        assert_eq!(token.secret(), "ya29.secret");
    }

    #[test]
    fn selection_json_shape() {
        let selection = Selection::new("doc-7", "Lab results.pdf", "application/pdf");
        insta::assert_json_snapshot!(selection, @r#"
        {
          "resource_id": "doc-7",
          "parent_or_drive_id": null,
          "kind": "file",
          "display_name": "Lab results.pdf",
          "mime_type": "application/pdf",
          "is_shared_container_item": false
        }
        "#);
    }
}
