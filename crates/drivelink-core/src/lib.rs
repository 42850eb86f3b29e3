//! Core types: integration session, selections, flow states, tracing

pub mod selection;
pub mod session;
pub mod tracing;

pub use selection::{AccessToken, AuthStatus, FOLDER_MIME_TYPE, ResourceKind, Selection};
pub use session::{ErrorKind, FlowState, IntegrationSession};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
