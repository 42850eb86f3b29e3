//! Provider-side pieces of the storage integration flow.
//!
//! - [`ScriptLoader`] - deduplicated, time-bounded loading of provider scripts
//! - [`AuthSessionClient`] - authorization code flow with backend exchange
//! - [`PickerClient`] - picker initialization and selection normalization
//! - [`BackendGateway`] - the four backend endpoints, with an HTTP implementation
//! - [`IntegrationError`] - the error taxonomy shared by all of the above
//!
//! Host capabilities (script injection, the identity SDK, the picker widget)
//! are injected as trait objects from [`provider`], so the same clients run
//! in a browser host, a native host or a test.
//!
//! ```text
//!  ScriptHost ──► ScriptLoader ◄──┬── AuthSessionClient ◄── IdentityProvider
//!                                 │          │
//!                                 │          ▼
//!                                 │    BackendGateway
//!                                 │
//!                                 └── PickerClient ◄── PickerProvider
//! ```

pub mod auth;
pub mod error;
pub mod gateway;
pub mod google;
pub mod picker;
pub mod provider;
pub mod script;

pub use auth::{AuthConfig, AuthSessionClient, AuthorizationOutcome, DEFAULT_AUTHORIZATION_TIMEOUT};
pub use error::{IntegrationError, IntegrationResult};
pub use gateway::{
    BackendGateway, CodeExchange, ExchangeResponse, GatewayError, HttpBackendGateway,
    SubmissionRequest, SubmissionResponse,
};
pub use picker::{PickerClient, PickerConfig, selection_from_document};
pub use provider::{
    BoxFuture, CodeClient, CodeClientConfig, CodeGrant, CodeResponse, HostError, IdentityProvider,
    PickedDocument, PickerAction, PickerApiConfig, PickerProvider, PickerRequest, PickerResponse,
    ScriptHost, UxMode,
};
pub use script::{DEFAULT_SCRIPT_TIMEOUT, ScriptLoader};
