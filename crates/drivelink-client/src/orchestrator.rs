//! The integration state machine.
//!
//! One run walks `Idle → Initializing → CheckingAuth → [Authenticating →]
//! Authenticated → Picking → Selected → Submitting → Done`. Any failure ends
//! the run in `Failed(kind)`; a cancelled picker or a dismissed consent popup
//! ends it in `Cancelled` and the session returns to `Idle`.
//!
//! The orchestrator is the only place that decides what the user sees: a
//! short message through [`HostHooks::notify`] on failure, a redirect through
//! [`HostHooks::session_expired`] when the backend rejects a submission with
//! HTTP 401, and nothing at all on cancel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use drivelink_core::{AuthStatus, ErrorKind, FlowState, IntegrationSession, Selection};
use drivelink_providers::{AuthorizationOutcome, IntegrationError, IntegrationResult};
use thiserror::Error;
use tracing::{Instrument, debug, info, info_span, warn};
use url::Url;

use crate::context::IntegrationContext;

/// Side effects the host application performs on behalf of the flow.
pub trait HostHooks: Send + Sync {
    /// Called after every state change.
    fn on_transition(&self, _from: FlowState, _to: FlowState) {}

    /// Opens a download link in a new browsing context.
    fn open_link(&self, url: &Url);

    /// The host's own session is gone; send the user to sign in again.
    fn session_expired(&self);

    /// Shows a short user-visible message.
    fn notify(&self, message: &str);
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The backend accepted the selection.
    Done {
        selection: Selection,
        download_links: Vec<Url>,
    },
    /// The user cancelled the picker or dismissed the consent popup.
    Cancelled,
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("an integration run is already in progress")]
    AlreadyRunning,

    #[error(transparent)]
    Failed(#[from] IntegrationError),
}

/// Clears the running flag when a run ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives one authenticate, pick and submit attempt at a time.
pub struct IntegrationOrchestrator {
    context: Arc<IntegrationContext>,
    hooks: Arc<dyn HostHooks>,
    session: Mutex<IntegrationSession>,
    running: AtomicBool,
}

impl IntegrationOrchestrator {
    pub fn new(context: Arc<IntegrationContext>, hooks: Arc<dyn HostHooks>) -> Self {
        Self {
            context,
            hooks,
            session: Mutex::new(IntegrationSession::new()),
            running: AtomicBool::new(false),
        }
    }

    pub fn context(&self) -> &IntegrationContext {
        &self.context
    }

    /// Returns true while a run is in progress.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// A copy of the current session.
    pub fn snapshot(&self) -> IntegrationSession {
        self.session().clone()
    }

    /// Discards the last run's session.
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` if a run is in progress; the session is left alone.
    pub fn reset(&self) -> Result<(), OrchestratorError> {
        let _guard = RunGuard::acquire(&self.running).ok_or(OrchestratorError::AlreadyRunning)?;
        *self.session() = IntegrationSession::new();
        Ok(())
    }

    /// Runs the flow from a clean session.
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` if another run is in progress, otherwise the error
    /// that moved the session to `Failed`.
    pub async fn start(&self) -> Result<RunOutcome, OrchestratorError> {
        let _guard = RunGuard::acquire(&self.running).ok_or_else(|| {
            warn!("start rejected, a run is already in progress");
            OrchestratorError::AlreadyRunning
        })?;
        *self.session() = IntegrationSession::new();

        async {
            info!("integration run started");
            match self.run().await {
                Ok(outcome) => Ok(outcome),
                Err(err) => {
                    self.fail(&err);
                    Err(OrchestratorError::Failed(err))
                }
            }
        }
        .instrument(info_span!("integration_run"))
        .await
    }

    async fn run(&self) -> IntegrationResult<RunOutcome> {
        let auth = self.context.auth();
        let picker = self.context.picker();

        self.advance(FlowState::Initializing);
        auth.ensure_client_initialized().await?;

        self.advance(FlowState::CheckingAuth);
        let mut status = auth.check_status().await;

        if !status.is_authenticated {
            self.advance(FlowState::Authenticating);
            match auth.request_authorization().await? {
                AuthorizationOutcome::Authorized => status = AuthStatus::authenticated(),
                AuthorizationOutcome::Dismissed => return Ok(self.cancel()),
            }
        }
        self.advance(FlowState::Authenticated);

        self.advance(FlowState::Picking);
        picker.initialize(&status).await?;
        let token = auth.fetch_access_token().await.map_err(|e| {
            IntegrationError::gateway(
                ErrorKind::NotAuthenticated,
                "no access token available for the picker",
                e,
            )
        })?;
        let Some(selection) = picker.open_and_select(&token).await? else {
            return Ok(self.cancel());
        };
        drop(token);

        self.session().selection = Some(selection.clone());
        self.advance(FlowState::Selected);

        self.advance(FlowState::Submitting);
        let download_links = self.submit(&selection).await?;

        for link in &download_links {
            self.hooks.open_link(link);
        }
        self.advance(FlowState::Done);
        info!(links = download_links.len(), "integration run complete");

        Ok(RunOutcome::Done {
            selection,
            download_links,
        })
    }

    /// Hands the selection to the backend with a token fetched just now.
    async fn submit(&self, selection: &Selection) -> IntegrationResult<Vec<Url>> {
        let gateway = self.context.gateway();

        let token = self.context.auth().fetch_access_token().await.map_err(|e| {
            IntegrationError::gateway(ErrorKind::Submission, "could not fetch an access token", e)
        })?;
        let response = gateway
            .submit_selection(selection, &token)
            .await
            .map_err(|e| {
                IntegrationError::gateway(ErrorKind::Submission, "backend rejected the selection", e)
            })?;

        if let Some(ref message) = response.message {
            debug!(%message, "backend accepted the selection");
        }
        Ok(response
            .download_links
            .iter()
            .filter_map(|link| {
                let resolved = gateway.resolve_link(link);
                if resolved.is_none() {
                    warn!(%link, "ignoring unresolvable download link");
                }
                resolved
            })
            .collect())
    }

    fn advance(&self, to: FlowState) {
        let from = self.session().transition(to);
        debug!(%from, %to, "transition");
        self.hooks.on_transition(from, to);
    }

    /// `Cancelled`, then straight back to `Idle`. Not an error.
    fn cancel(&self) -> RunOutcome {
        info!("integration run cancelled");
        self.advance(FlowState::Cancelled);
        self.session().selection = None;
        self.advance(FlowState::Idle);
        RunOutcome::Cancelled
    }

    fn fail(&self, err: &IntegrationError) {
        let kind = err.kind();
        let from = self.session().fail(kind);
        warn!(error = %err, "integration run failed");
        self.hooks.on_transition(from, FlowState::Failed(kind));

        let message = match err.detail() {
            Some(detail) => format!("{} ({})", kind.user_message(), detail),
            None => kind.user_message().to_string(),
        };
        self.hooks.notify(&message);

        if err.is_session_expired() {
            info!("host session expired");
            self.hooks.session_expired();
        }
    }

    fn session(&self) -> MutexGuard<'_, IntegrationSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for IntegrationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrationOrchestrator")
            .field("session", &self.snapshot())
            .field("running", &self.is_running())
            .finish()
    }
}
