//! Google Drive flavor of the integration flow.
//!
//! [`GoogleDriveConfig`] carries Google's endpoints and derives the auth and
//! picker configs. With the `google` feature, native hosts also get:
//!
//! - [`LoopbackIdentityProvider`] - consent in the system browser, code captured
//!   on a 127.0.0.1 redirect
//! - [`DrivePicker`] - Drive v3 file listing with a pluggable [`Chooser`]
//! - [`ProbeScriptHost`] - reachability check in place of script injection
//!
//! # Example
//!
//! ```ignore
//! use drivelink_providers::google::{GoogleDriveConfig, LoopbackIdentityProvider};
//!
//! let config = GoogleDriveConfig::new(
//!     "your-client-id.apps.googleusercontent.com",
//!     "your-api-key",
//!     "http://localhost:5173/home",
//! );
//! config.validate()?;
//!
//! let auth = AuthSessionClient::new(
//!     config.auth_config(),
//!     scripts,
//!     Arc::new(LoopbackIdentityProvider::new()),
//!     gateway,
//! );
//! ```

mod config;
#[cfg(feature = "google")]
mod drive;
#[cfg(feature = "google")]
mod oauth;
#[cfg(feature = "google")]
mod probe;

pub use config::{
    DEFAULT_MIME_TYPES, DRIVE_DISCOVERY_DOC, DRIVE_READONLY_SCOPE, GoogleDriveConfig,
    IDENTITY_SCRIPT_URL, PICKER_SCRIPT_URL,
};
#[cfg(feature = "google")]
pub use drive::{Chooser, DrivePicker};
#[cfg(feature = "google")]
pub use oauth::LoopbackIdentityProvider;
#[cfg(feature = "google")]
pub use probe::ProbeScriptHost;
