//! Integration session state.
//!
//! An [`IntegrationSession`] tracks one authenticate, pick and submit attempt.
//! It is created fresh whenever a run starts, so nothing but the process-wide
//! memoized clients survives from one run to the next.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::selection::Selection;

/// The category of a failed integration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A provider script failed to load or timed out.
    #[serde(rename = "script_load_error")]
    ScriptLoad,
    /// The provider reported an authorization failure, or the popup timed out.
    #[serde(rename = "authorization_error")]
    Authorization,
    /// The backend rejected the authorization code exchange.
    #[serde(rename = "token_exchange_error")]
    TokenExchange,
    /// The picker was used without a valid authorization.
    #[serde(rename = "not_authenticated_error")]
    NotAuthenticated,
    /// The picker API is not available.
    #[serde(rename = "picker_unavailable_error")]
    PickerUnavailable,
    /// Handing the selection to the backend failed.
    #[serde(rename = "submission_error")]
    Submission,
}

impl ErrorKind {
    /// Returns a stable name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScriptLoad => "script_load_error",
            Self::Authorization => "authorization_error",
            Self::TokenExchange => "token_exchange_error",
            Self::NotAuthenticated => "not_authenticated_error",
            Self::PickerUnavailable => "picker_unavailable_error",
            Self::Submission => "submission_error",
        }
    }

    /// A short message suitable for showing to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ScriptLoad => "Could not load the storage provider. Please try again.",
            Self::Authorization => "Authorization with the storage provider failed.",
            Self::TokenExchange => "Could not complete authorization with the server.",
            Self::NotAuthenticated => "Please connect your storage account first.",
            Self::PickerUnavailable => "The file picker is unavailable right now.",
            Self::Submission => "Could not send your selection to the server.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state of the integration flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "error")]
pub enum FlowState {
    Idle,
    Initializing,
    CheckingAuth,
    Authenticating,
    Authenticated,
    Picking,
    Selected,
    Submitting,
    Done,
    Cancelled,
    Failed(ErrorKind),
}

impl FlowState {
    /// Returns true for states that end a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Failed(_))
    }

    /// Returns the error kind if this is a failed state.
    pub fn error(&self) -> Option<ErrorKind> {
        match self {
            Self::Failed(kind) => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Initializing => f.write_str("initializing"),
            Self::CheckingAuth => f.write_str("checking_auth"),
            Self::Authenticating => f.write_str("authenticating"),
            Self::Authenticated => f.write_str("authenticated"),
            Self::Picking => f.write_str("picking"),
            Self::Selected => f.write_str("selected"),
            Self::Submitting => f.write_str("submitting"),
            Self::Done => f.write_str("done"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Failed(kind) => write!(f, "failed({})", kind),
        }
    }
}

/// One authenticate, pick and submit attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrationSession {
    /// Current state.
    pub status: FlowState,
    /// The picker result, once one exists.
    pub selection: Option<Selection>,
    /// The error that ended the run, if it failed.
    pub last_error: Option<ErrorKind>,
    /// States entered during this run, in order, starting with `Idle`.
    pub history: Vec<FlowState>,
}

impl Default for IntegrationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl IntegrationSession {
    /// Creates a clean session in `Idle`.
    pub fn new() -> Self {
        Self {
            status: FlowState::Idle,
            selection: None,
            last_error: None,
            history: vec![FlowState::Idle],
        }
    }

    /// Moves to `to`, returning the previous state.
    pub fn transition(&mut self, to: FlowState) -> FlowState {
        let from = self.status;
        self.status = to;
        self.history.push(to);
        from
    }

    /// Moves to `Failed(kind)`, discarding any partial selection.
    pub fn fail(&mut self, kind: ErrorKind) -> FlowState {
        self.selection = None;
        self.last_error = Some(kind);
        self.transition(FlowState::Failed(kind))
    }

    /// Returns true if the state after `state` in this run's history is `next`.
    pub fn followed_by(&self, state: FlowState, next: FlowState) -> bool {
        self.history
            .windows(2)
            .any(|pair| pair[0] == state && pair[1] == next)
    }
}
