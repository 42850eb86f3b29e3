//! Native identity provider using a loopback redirect.
//!
//! Stands in for the browser identity SDK on desktop hosts. The consent page
//! is opened in the user's browser and Google redirects back to a short-lived
//! listener on 127.0.0.1. Only the authorization code is captured; the code is
//! exchanged by the backend, never here.

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::provider::{
    BoxFuture, CodeClient, CodeClientConfig, CodeGrant, CodeResponse, HostError, IdentityProvider,
};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// How long the listener waits for the browser to come back.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// How long one connection may take to send its request line.
const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Pause between accept attempts on the non-blocking listener.
const ACCEPT_POLL: Duration = Duration::from_millis(50);

type Opener = Arc<dyn Fn(&str) -> std::io::Result<()> + Send + Sync>;

/// [`IdentityProvider`] for native hosts.
#[derive(Clone)]
pub struct LoopbackIdentityProvider {
    port_range: (u16, u16),
    callback_timeout: Duration,
    opener: Opener,
}

impl LoopbackIdentityProvider {
    /// Ports tried for the loopback listener.
    pub const DEFAULT_PORT_RANGE: (u16, u16) = (8080, 8090);

    pub fn new() -> Self {
        Self {
            port_range: Self::DEFAULT_PORT_RANGE,
            callback_timeout: CALLBACK_TIMEOUT,
            opener: Arc::new(|url: &str| open::that(url)),
        }
    }

    /// Sets the port range. `(0, 0)` lets the OS pick a port.
    pub fn with_port_range(mut self, start: u16, end: u16) -> Self {
        self.port_range = (start, end);
        self
    }

    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    /// Replaces how the consent URL is shown to the user.
    pub fn with_opener<F>(mut self, opener: F) -> Self
    where
        F: Fn(&str) -> std::io::Result<()> + Send + Sync + 'static,
    {
        self.opener = Arc::new(opener);
        self
    }
}

impl Default for LoopbackIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LoopbackIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackIdentityProvider")
            .field("port_range", &self.port_range)
            .field("callback_timeout", &self.callback_timeout)
            .finish()
    }
}

impl IdentityProvider for LoopbackIdentityProvider {
    fn init_code_client(&self, config: CodeClientConfig) -> Result<Box<dyn CodeClient>, HostError> {
        if config.client_id.is_empty() {
            return Err(HostError::new("client_id is required"));
        }
        Ok(Box::new(LoopbackCodeClient {
            config,
            provider: self.clone(),
        }))
    }
}

struct LoopbackCodeClient {
    config: CodeClientConfig,
    provider: LoopbackIdentityProvider,
}

impl CodeClient for LoopbackCodeClient {
    fn request_code(&self) -> BoxFuture<'_, Result<CodeResponse, HostError>> {
        Box::pin(async move {
            let (listener, port) = bind_loopback(self.provider.port_range)?;
            let redirect_uri = format!("http://127.0.0.1:{}/callback", port);
            let state = generate_state();
            let auth_url = build_auth_url(&self.config, &redirect_uri, &state);

            info!("opening browser for Google consent");
            debug!("authorization URL: {}", auth_url);
            if let Err(e) = (self.provider.opener)(&auth_url) {
                warn!("failed to open browser: {}", e);
                eprintln!("\nPlease open this URL in your browser:\n\n{}\n", auth_url);
            }

            let timeout = self.provider.callback_timeout;
            let cancelled = Arc::new(AtomicBool::new(false));
            let _stop = StopOnDrop(Arc::clone(&cancelled));
            let callback = tokio::task::spawn_blocking(move || {
                wait_for_callback(listener, timeout, &cancelled)
            })
            .await
            .map_err(|e| HostError::new("callback listener failed").with_source(e))??;

            Ok(callback.into_response(&state, redirect_uri))
        })
    }
}

/// What the browser brought back to the listener.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Callback {
    Code { code: String, state: Option<String> },
    Error { error: String, description: Option<String> },
}

impl Callback {
    fn into_response(self, expected_state: &str, redirect_uri: String) -> CodeResponse {
        match self {
            Self::Code { code, state } if state.as_deref() == Some(expected_state) => {
                CodeResponse::Granted(CodeGrant::new(code).with_redirect_uri(redirect_uri))
            }
            Self::Code { .. } => {
                warn!("OAuth state mismatch on callback");
                CodeResponse::Denied {
                    error: "state_mismatch".to_string(),
                    description: Some("callback state did not match the request".to_string()),
                }
            }
            Self::Error { error, description } => CodeResponse::Denied { error, description },
        }
    }
}

fn bind_loopback(port_range: (u16, u16)) -> Result<(TcpListener, u16), HostError> {
    for port in port_range.0..=port_range.1 {
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
            let bound = listener
                .local_addr()
                .map_err(|e| HostError::new("failed to read listener address").with_source(e))?
                .port();
            debug!("bound loopback listener on port {}", bound);
            return Ok((listener, bound));
        }
    }
    Err(HostError::new(format!(
        "no available port in range {}-{}",
        port_range.0, port_range.1
    )))
}

fn generate_state() -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..16).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

fn build_auth_url(config: &CodeClientConfig, redirect_uri: &str, state: &str) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&\
        access_type=offline&prompt=consent&include_granted_scopes=true",
        GOOGLE_AUTH_URL,
        urlencoding::encode(&config.client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(&config.scope),
        urlencoding::encode(state),
    )
}

/// Stops the listener when the waiting future finishes or is dropped.
struct StopOnDrop(Arc<AtomicBool>);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Accepts connections until a callback arrives, `timeout` elapses or
/// `cancelled` is set. The listener is closed on return.
fn wait_for_callback(
    listener: TcpListener,
    timeout: Duration,
    cancelled: &AtomicBool,
) -> Result<Callback, HostError> {
    listener
        .set_nonblocking(true)
        .map_err(|e| HostError::new("failed to configure listener").with_source(e))?;
    let deadline = Instant::now() + timeout;

    loop {
        if cancelled.load(Ordering::Acquire) {
            return Err(HostError::new("authorization request abandoned"));
        }
        if Instant::now() >= deadline {
            return Err(HostError::new(format!("no OAuth callback within {:?}", timeout)));
        }

        match listener.accept() {
            Ok((stream, _)) => {
                if let Some(callback) = handle_connection(stream) {
                    return Ok(callback);
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(e) => {
                error!("failed to accept connection: {}", e);
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

fn handle_connection(mut stream: TcpStream) -> Option<Callback> {
    stream.set_nonblocking(false).ok()?;
    stream.set_read_timeout(Some(READ_TIMEOUT)).ok()?;

    let mut request_line = String::new();
    BufReader::new(&stream).read_line(&mut request_line).ok()?;

    let callback = parse_callback(&request_line)?;
    let response = match callback {
        Callback::Code { .. } => {
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
            <html><body><h1>Drive access granted</h1>\
            <p>You can close this window and return to the terminal.</p></body></html>"
        }
        Callback::Error { .. } => {
            "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
            <html><body><h1>Authorization failed</h1>\
            <p>You can close this window.</p></body></html>"
        }
    };
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
    Some(callback)
}

/// Parses `GET /callback?... HTTP/1.1`. Other requests yield `None`.
fn parse_callback(request_line: &str) -> Option<Callback> {
    let mut parts = request_line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let target = Url::parse(&format!("http://127.0.0.1{}", parts.next()?)).ok()?;
    if target.path() != "/callback" {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut description = None;
    for (key, value) in target.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => description = Some(value.into_owned()),
            _ => {}
        }
    }

    Some(match (error, code) {
        (Some(error), _) => Callback::Error { error, description },
        (None, Some(code)) => Callback::Code { code, state },
        (None, None) => Callback::Error {
            error: "invalid_request".to_string(),
            description: Some("missing authorization code in callback".to_string()),
        },
    })
}

#[cfg(test)]
mod tests {
    use crate::provider::UxMode;

    use super::*;

    fn code_config() -> CodeClientConfig {
        CodeClientConfig {
            client_id: "123.apps.googleusercontent.com".to_string(),
            scope: "https://www.googleapis.com/auth/drive.readonly".to_string(),
            ux_mode: UxMode::Popup,
        }
    }

    #[test]
    fn auth_url_format() {
        let url = build_auth_url(&code_config(), "http://127.0.0.1:8080/callback", "st8");

        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("client_id=123.apps.googleusercontent.com"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2Fcallback"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fdrive.readonly"));
        assert!(url.contains("state=st8"));
        assert!(!url.contains("code_challenge"));
    }

    #[test]
    fn state_is_random() {
        assert_ne!(generate_state(), generate_state());
    }

    #[test]
    fn parse_code_callback() {
        let callback = parse_callback("GET /callback?code=4%2F0Ab&state=xyz HTTP/1.1\r\n");
        assert_eq!(
            callback,
            Some(Callback::Code {
                code: "4/0Ab".to_string(),
                state: Some("xyz".to_string()),
            })
        );
    }

    #[test]
    fn parse_error_callback() {
        let callback = parse_callback(
            "GET /callback?error=access_denied&error_description=User+said+no HTTP/1.1\r\n",
        );
        assert_eq!(
            callback,
            Some(Callback::Error {
                error: "access_denied".to_string(),
                description: Some("User said no".to_string()),
            })
        );
    }

    #[test]
    fn parse_ignores_other_requests() {
        assert!(parse_callback("GET /favicon.ico HTTP/1.1\r\n").is_none());
        assert!(parse_callback("POST /callback?code=x HTTP/1.1\r\n").is_none());
        assert!(parse_callback("").is_none());
        assert!(matches!(
            parse_callback("GET /callback HTTP/1.1\r\n"),
            Some(Callback::Error { .. })
        ));
    }

    #[test]
    fn state_mismatch_is_denied() {
        let callback = Callback::Code {
            code: "4/0Ab".to_string(),
            state: Some("forged".to_string()),
        };
        let response = callback.into_response("expected", "http://127.0.0.1:1/callback".to_string());
        assert!(matches!(response, CodeResponse::Denied { ref error, .. } if error == "state_mismatch"));
    }

    #[test]
    fn empty_client_id_is_rejected() {
        let mut config = code_config();
        config.client_id.clear();
        assert!(LoopbackIdentityProvider::new().init_code_client(config).is_err());
    }

    #[test]
    fn timeout_releases_port() {
        let (listener, port) = bind_loopback((0, 0)).unwrap();
        let err = wait_for_callback(listener, Duration::from_millis(100), &AtomicBool::new(false))
            .unwrap_err();
        assert!(err.message().starts_with("no OAuth callback"));
        assert!(TcpListener::bind(("127.0.0.1", port)).is_ok());
    }

    #[test]
    fn cancelled_wait_stops_listening() {
        let (listener, port) = bind_loopback((0, 0)).unwrap();
        let started = Instant::now();
        let err = wait_for_callback(listener, Duration::from_secs(30), &AtomicBool::new(true))
            .unwrap_err();
        assert_eq!(err.message(), "authorization request abandoned");
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(TcpListener::bind(("127.0.0.1", port)).is_ok());
    }

    #[test]
    fn idle_connection_does_not_block_callback() {
        let (listener, port) = bind_loopback((0, 0)).unwrap();

        let browser = thread::spawn(move || {
            let _idle = TcpStream::connect(("127.0.0.1", port)).unwrap();
            thread::sleep(Duration::from_millis(100));
            let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
            stream
                .write_all(b"GET /callback?code=4%2F0Ab&state=st8 HTTP/1.1\r\n\r\n")
                .unwrap();
            let mut status = String::new();
            BufReader::new(&stream).read_line(&mut status).unwrap();
            status
        });

        let callback =
            wait_for_callback(listener, Duration::from_secs(10), &AtomicBool::new(false)).unwrap();
        assert_eq!(
            callback,
            Callback::Code {
                code: "4/0Ab".to_string(),
                state: Some("st8".to_string()),
            }
        );
        assert!(browser.join().unwrap().starts_with("HTTP/1.1 200 OK"));
    }

    #[tokio::test]
    async fn browser_redirect_yields_grant() {
        let (tx, rx) = std::sync::mpsc::channel::<String>();
        let provider = LoopbackIdentityProvider::new()
            .with_port_range(0, 0)
            .with_callback_timeout(Duration::from_secs(5))
            .with_opener(move |url| {
                let _ = tx.send(url.to_string());
                Ok(())
            });

        // Plays the browser: follows the consent URL straight to the callback.
        let browser = thread::spawn(move || {
            let auth_url = Url::parse(&rx.recv().unwrap()).unwrap();
            let param = |name: &str| {
                auth_url
                    .query_pairs()
                    .find(|(k, _)| k == name)
                    .map(|(_, v)| v.into_owned())
                    .unwrap()
            };
            let redirect = Url::parse(&param("redirect_uri")).unwrap();
            let state = param("state");

            let mut stream =
                TcpStream::connect(("127.0.0.1", redirect.port().unwrap())).unwrap();
            let request = format!(
                "GET /callback?code=4%2F0Ab&state={} HTTP/1.1\r\n\r\n",
                urlencoding::encode(&state)
            );
            stream.write_all(request.as_bytes()).unwrap();
            let mut status = String::new();
            BufReader::new(&stream).read_line(&mut status).unwrap();
            assert!(status.starts_with("HTTP/1.1 200 OK"));
        });

        let client = provider.init_code_client(code_config()).unwrap();
        let response = client.request_code().await.unwrap();
        browser.join().unwrap();

        match response {
            CodeResponse::Granted(grant) => {
                assert_eq!(grant.code, "4/0Ab");
                assert!(
                    grant
                        .redirect_uri
                        .as_deref()
                        .is_some_and(|uri| uri.starts_with("http://127.0.0.1:"))
                );
            }
            other => panic!("expected a grant, got {:?}", other),
        }
    }
}
