//! Client error types.

use std::fmt;

use drivelink_providers::{GatewayError, HostError, IntegrationError};

use crate::orchestrator::OrchestratorError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// A host capability could not be set up.
    Host(String),
    /// Backend call failed outside a run.
    Backend(GatewayError),
    /// Another run is still in progress.
    Busy,
    /// The integration run failed.
    Flow(IntegrationError),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Host(msg) => write!(f, "host error: {}", msg),
            Self::Backend(err) => match err.detail {
                Some(ref detail) => write!(f, "backend error: {}: {}", err, detail),
                None => write!(f, "backend error: {}", err),
            },
            Self::Busy => write!(f, "an integration run is already in progress"),
            Self::Flow(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err),
            Self::Flow(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GatewayError> for ClientError {
    fn from(err: GatewayError) -> Self {
        Self::Backend(err)
    }
}

impl From<HostError> for ClientError {
    fn from(err: HostError) -> Self {
        Self::Host(err.to_string())
    }
}

impl From<OrchestratorError> for ClientError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::AlreadyRunning => Self::Busy,
            OrchestratorError::Failed(err) => Self::Flow(err),
        }
    }
}
