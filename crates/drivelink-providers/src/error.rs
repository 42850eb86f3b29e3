//! Error types for the integration flow.
//!
//! Every component reports failures as an [`IntegrationError`] whose
//! [`ErrorKind`] tells the orchestrator which user-visible behavior applies.

use std::fmt;

use drivelink_core::ErrorKind;
use thiserror::Error;

use crate::gateway::GatewayError;

/// An error raised by one step of the integration flow.
#[derive(Debug, Error)]
pub struct IntegrationError {
    kind: ErrorKind,
    message: String,
    /// Backend-provided detail, when the backend sent one.
    detail: Option<String>,
    /// HTTP status of the failing backend call, if any.
    http_status: Option<u16>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl IntegrationError {
    /// Creates a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            http_status: None,
            source: None,
        }
    }

    pub fn script_load(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ScriptLoad, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    pub fn token_exchange(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenExchange, message)
    }

    pub fn not_authenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, message)
    }

    pub fn picker_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PickerUnavailable, message)
    }

    pub fn submission(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Submission, message)
    }

    /// Wraps a failed backend call, keeping its HTTP status and detail.
    pub fn gateway(kind: ErrorKind, message: impl Into<String>, err: GatewayError) -> Self {
        let mut error = Self::new(kind, message);
        error.http_status = err.status;
        error.detail = err.detail.clone();
        error.with_source(err)
    }

    /// Attaches backend-provided detail.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    /// Returns true if the host application's session has expired.
    ///
    /// Only a submission rejected with HTTP 401 counts; the host is expected
    /// to send the user back to its own sign-in.
    pub fn is_session_expired(&self) -> bool {
        self.kind == ErrorKind::Submission && self.http_status == Some(401)
    }
}

impl fmt::Display for IntegrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(status) = self.http_status {
            write!(f, " (HTTP {})", status)?;
        }
        if let Some(ref detail) = self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

/// A specialized Result type for integration steps.
pub type IntegrationResult<T> = Result<T, IntegrationError>;
