//! Authorization session client.
//!
//! Wraps the provider's authorization-code flow. The code returned by the
//! provider callback is handed straight to the backend, which stores the
//! resulting tokens; nothing long-lived is kept on the client side.

use std::sync::Arc;
use std::time::Duration;

use drivelink_core::{AccessToken, AuthStatus, ErrorKind};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{IntegrationError, IntegrationResult};
use crate::gateway::{BackendGateway, CodeExchange, GatewayError};
use crate::provider::{CodeClient, CodeClientConfig, CodeGrant, CodeResponse, IdentityProvider, UxMode};
use crate::script::ScriptLoader;

/// How long to wait for the consent popup before giving up.
pub const DEFAULT_AUTHORIZATION_TIMEOUT: Duration = Duration::from_secs(300);

/// Settings for the authorization-code client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// OAuth client id registered with the provider.
    pub client_id: String,
    /// Requested scope; the flow only ever needs read access.
    pub scope: String,
    /// URL of the identity SDK script.
    pub identity_script_url: String,
    /// Redirect URI reported to the backend with each code.
    pub redirect_uri: String,
    pub ux_mode: UxMode,
    pub authorization_timeout: Duration,
}

impl AuthConfig {
    fn code_client_config(&self) -> CodeClientConfig {
        CodeClientConfig {
            client_id: self.client_id.clone(),
            scope: self.scope.clone(),
            ux_mode: self.ux_mode,
        }
    }
}

/// How an authorization request ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    /// The code was exchanged and the backend now holds a token.
    Authorized,
    /// The user closed the consent popup.
    Dismissed,
}

/// Manages third-party authorization for one host.
///
/// The code client is constructed once and reused for the lifetime of this
/// value; authorization status is never cached.
pub struct AuthSessionClient {
    config: AuthConfig,
    scripts: Arc<ScriptLoader>,
    identity: Arc<dyn IdentityProvider>,
    gateway: Arc<dyn BackendGateway>,
    code_client: OnceCell<Box<dyn CodeClient>>,
}

impl AuthSessionClient {
    pub fn new(
        config: AuthConfig,
        scripts: Arc<ScriptLoader>,
        identity: Arc<dyn IdentityProvider>,
        gateway: Arc<dyn BackendGateway>,
    ) -> Self {
        Self {
            config,
            scripts,
            identity,
            gateway,
            code_client: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Returns true once the code client exists.
    pub fn is_initialized(&self) -> bool {
        self.code_client.initialized()
    }

    /// Loads the identity SDK and constructs the code client if needed.
    ///
    /// # Errors
    ///
    /// `ScriptLoadError` if the SDK does not load; `AuthorizationError` if
    /// the SDK refuses to create a client.
    pub async fn ensure_client_initialized(&self) -> IntegrationResult<()> {
        self.code_client().await.map(|_| ())
    }

    async fn code_client(&self) -> IntegrationResult<&dyn CodeClient> {
        self.scripts.load(&self.config.identity_script_url).await?;

        let client = self
            .code_client
            .get_or_try_init(|| async {
                debug!(scope = %self.config.scope, ux_mode = self.config.ux_mode.as_str(), "creating code client");
                self.identity
                    .init_code_client(self.config.code_client_config())
                    .map_err(|e| {
                        IntegrationError::authorization("identity SDK rejected the client configuration")
                            .with_detail(e.message().to_string())
                            .with_source(e)
                    })
            })
            .await?;
        Ok(client.as_ref())
    }

    /// Runs the provider consent flow and exchanges the resulting code.
    ///
    /// Suspends until the provider callback fires, the user dismisses the
    /// popup, or the authorization timeout elapses. Never retries.
    ///
    /// # Errors
    ///
    /// `AuthorizationError` on a provider error or timeout;
    /// `TokenExchangeError` if the backend rejects the code.
    pub async fn request_authorization(&self) -> IntegrationResult<AuthorizationOutcome> {
        let client = self.code_client().await?;

        info!("requesting authorization code");
        let timeout = self.config.authorization_timeout;
        let response = match tokio::time::timeout(timeout, client.request_code()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(IntegrationError::authorization("authorization flow failed")
                    .with_detail(e.message().to_string())
                    .with_source(e));
            }
            Err(_) => {
                warn!(?timeout, "no answer from the consent screen");
                return Err(IntegrationError::authorization(format!(
                    "timed out after {:?} waiting for authorization",
                    timeout
                )));
            }
        };

        match response {
            CodeResponse::Granted(grant) => {
                self.exchange(grant).await?;
                info!("authorization complete");
                Ok(AuthorizationOutcome::Authorized)
            }
            CodeResponse::Denied { error, description } => {
                warn!(%error, "provider denied authorization");
                let mut err = IntegrationError::authorization(format!("provider returned {}", error));
                if let Some(description) = description {
                    err = err.with_detail(description);
                }
                Err(err)
            }
            CodeResponse::Dismissed => {
                info!("consent popup dismissed");
                Ok(AuthorizationOutcome::Dismissed)
            }
        }
    }

    /// Exchanges `grant` with the backend. The code is dropped afterwards.
    async fn exchange(&self, grant: CodeGrant) -> IntegrationResult<()> {
        let request = CodeExchange {
            redirect_uri: grant
                .redirect_uri
                .unwrap_or_else(|| self.config.redirect_uri.clone()),
            code: grant.code,
        };

        debug!(redirect_uri = %request.redirect_uri, "exchanging authorization code");
        let response = self.gateway.exchange_code(&request).await.map_err(|e| {
            IntegrationError::gateway(
                ErrorKind::TokenExchange,
                "backend rejected the authorization code",
                e,
            )
        })?;

        if !response.success {
            let mut err = IntegrationError::token_exchange("backend reported an unsuccessful exchange");
            if let Some(message) = response.message {
                err = err.with_detail(message);
            }
            return Err(err);
        }
        Ok(())
    }

    /// Asks the backend whether it holds a usable token.
    ///
    /// Always queried; a failed query counts as unauthenticated.
    pub async fn check_status(&self) -> AuthStatus {
        match self.gateway.status().await {
            Ok(status) => {
                debug!(authenticated = status.is_authenticated, "auth status");
                status
            }
            Err(e) => {
                warn!(error = %e, status = ?e.status, "auth status check failed");
                AuthStatus::unauthenticated()
            }
        }
    }

    /// Fetches a fresh access token from the backend.
    pub async fn fetch_access_token(&self) -> Result<AccessToken, GatewayError> {
        let token = self.gateway.fetch_token().await?;
        debug!("fetched access token");
        Ok(token)
    }
}

impl std::fmt::Debug for AuthSessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSessionClient")
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
