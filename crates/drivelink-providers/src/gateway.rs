//! Backend gateway.
//!
//! The backend is the system of record for provider tokens. The client only
//! asks it four things: whether a usable token exists, to exchange an
//! authorization code, for a fresh access token, and to retrieve a selection.
//!
//! | Endpoint                          | Method | Body                                   |
//! |-----------------------------------|--------|----------------------------------------|
//! | `/api/v1/integrations/status`     | GET    | -                                      |
//! | `/api/v1/integrations/auth`       | POST   | `{ code, redirect_uri }`               |
//! | `/api/v1/integrations/token`      | GET    | -                                      |
//! | `/api/v1/integrations/download`   | POST   | `{ fileInfo: { fileId, isFolder } }`   |

use std::time::Duration;

use drivelink_core::{AccessToken, AuthStatus, Selection};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::provider::BoxFuture;

const STATUS_PATH: &str = "api/v1/integrations/status";
const AUTH_PATH: &str = "api/v1/integrations/auth";
const TOKEN_PATH: &str = "api/v1/integrations/token";
const DOWNLOAD_PATH: &str = "api/v1/integrations/download";

/// A failed backend call.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GatewayError {
    /// HTTP status, if the backend answered.
    pub status: Option<u16>,
    pub message: String,
    /// The backend's error payload, when present.
    pub detail: Option<String>,
}

impl GatewayError {
    /// The request never got an HTTP answer.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            detail: None,
        }
    }

    /// The backend answered with a non-2xx status.
    pub fn http(status: u16, detail: Option<String>) -> Self {
        Self {
            status: Some(status),
            message: format!("backend returned HTTP {}", status),
            detail,
        }
    }

    /// The backend answered 2xx with a body we could not understand.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            detail: None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }
}

/// Body of the authorization code exchange.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct CodeExchange {
    pub code: String,
    pub redirect_uri: String,
}

impl std::fmt::Debug for CodeExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeExchange")
            .field("code", &"***")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExchangeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: AccessToken,
}

/// The canonical download submission body.
///
/// The provider token rides in the body so that `Authorization` stays free
/// for the host session credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionRequest {
    #[serde(rename = "fileInfo")]
    pub file_info: FileInfo,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<AccessToken>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub file_id: String,
    pub is_folder: bool,
}

impl SubmissionRequest {
    pub fn from_selection(selection: &Selection) -> Self {
        Self {
            file_info: FileInfo {
                file_id: selection.resource_id.clone(),
                is_folder: selection.is_folder(),
            },
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: &AccessToken) -> Self {
        self.access_token = Some(token.clone());
        self
    }
}

/// The backend's answer to a download submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubmissionResponse {
    #[serde(default)]
    pub message: Option<String>,
    /// Links to the retrieved files, usually relative to the backend.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub download_links: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// The four backend endpoints the flow consumes.
pub trait BackendGateway: Send + Sync {
    /// `GET /status`: is a usable token stored for this session?
    fn status(&self) -> BoxFuture<'_, Result<AuthStatus, GatewayError>>;

    /// `POST /auth`: exchange an authorization code server-side.
    fn exchange_code<'a>(
        &'a self,
        request: &'a CodeExchange,
    ) -> BoxFuture<'a, Result<ExchangeResponse, GatewayError>>;

    /// `GET /token`: a fresh access token from the backend's store.
    fn fetch_token(&self) -> BoxFuture<'_, Result<AccessToken, GatewayError>>;

    /// `POST /download`: hand a selection over for retrieval.
    fn submit_selection<'a>(
        &'a self,
        selection: &'a Selection,
        token: &'a AccessToken,
    ) -> BoxFuture<'a, Result<SubmissionResponse, GatewayError>>;

    /// Resolves a returned download link to an absolute URL.
    fn resolve_link(&self, link: &str) -> Option<Url> {
        Url::parse(link).ok()
    }
}

/// [`BackendGateway`] over HTTPS with JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpBackendGateway {
    base_url: Url,
    http_client: reqwest::Client,
    /// The host application's own session credential, if it uses bearer auth.
    session_token: Option<String>,
}

impl HttpBackendGateway {
    /// Creates a gateway for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: with_trailing_slash(base_url),
            http_client,
            session_token: None,
        })
    }

    /// Builder method to send the host session credential on flow requests.
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|e| GatewayError::network(format!("invalid endpoint {}: {}", path, e)))
    }

    fn with_session(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session_token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = request
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::network("request timeout")
                } else if e.is_connect() {
                    GatewayError::network(format!("connection failed: {}", e))
                } else {
                    GatewayError::network(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            debug!(%status, "backend call failed");
            return Err(GatewayError::http(status.as_u16(), error_detail(status, &body)));
        }

        serde_json::from_str(&body)
            .map_err(|e| GatewayError::invalid_response(format!("failed to parse response: {}", e)))
    }
}

impl BackendGateway for HttpBackendGateway {
    fn status(&self) -> BoxFuture<'_, Result<AuthStatus, GatewayError>> {
        Box::pin(async move {
            let url = self.endpoint(STATUS_PATH)?;
            self.send(self.with_session(self.http_client.get(url))).await
        })
    }

    fn exchange_code<'a>(
        &'a self,
        request: &'a CodeExchange,
    ) -> BoxFuture<'a, Result<ExchangeResponse, GatewayError>> {
        Box::pin(async move {
            let url = self.endpoint(AUTH_PATH)?;
            self.send(self.with_session(self.http_client.post(url)).json(request))
                .await
        })
    }

    fn fetch_token(&self) -> BoxFuture<'_, Result<AccessToken, GatewayError>> {
        Box::pin(async move {
            let url = self.endpoint(TOKEN_PATH)?;
            let response: TokenResponse =
                self.send(self.with_session(self.http_client.get(url))).await?;
            Ok(response.access_token)
        })
    }

    fn submit_selection<'a>(
        &'a self,
        selection: &'a Selection,
        token: &'a AccessToken,
    ) -> BoxFuture<'a, Result<SubmissionResponse, GatewayError>> {
        Box::pin(async move {
            let url = self.endpoint(DOWNLOAD_PATH)?;
            let body = SubmissionRequest::from_selection(selection).with_access_token(token);
            let request = match self.session_token {
                Some(ref session) => self.http_client.post(url).bearer_auth(session),
                None => self.http_client.post(url).bearer_auth(token.secret()),
            };
            self.send(request.json(&body)).await
        })
    }

    fn resolve_link(&self, link: &str) -> Option<Url> {
        if let Ok(absolute) = Url::parse(link) {
            return Some(absolute);
        }
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = link.trim_start_matches('/');
        Url::parse(&format!("{}/{}", base, path)).ok()
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Extracts the backend's error payload: `detail`, then `message`, then the raw body.
fn error_detail(status: StatusCode, body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return status.canonical_reason().map(String::from);
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => value
            .get("detail")
            .or_else(|| value.get("message"))
            .map(|v| match v.as_str() {
                Some(s) => s.to_string(),
                None => v.to_string(),
            })
            .or_else(|| Some(body.to_string())),
        Err(_) => Some(body.to_string()),
    }
}
