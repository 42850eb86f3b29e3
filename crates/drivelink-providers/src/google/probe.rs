//! Script host for native runs.
//!
//! There is no document to inject into, so "loading" a script means checking
//! the provider is reachable from this machine. A failed probe surfaces as a
//! script load error, the same way a blocked script tag would in a browser.

use std::time::Duration;

use tracing::debug;

use crate::provider::{BoxFuture, HostError, ScriptHost};

/// [`ScriptHost`] that fetches each script URL once and discards the body.
#[derive(Debug, Clone)]
pub struct ProbeScriptHost {
    http_client: reqwest::Client,
}

impl ProbeScriptHost {
    pub fn new(timeout: Duration) -> Result<Self, HostError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HostError::new("failed to create HTTP client").with_source(e))?;
        Ok(Self { http_client })
    }
}

impl ScriptHost for ProbeScriptHost {
    fn inject<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), HostError>> {
        Box::pin(async move {
            let response = self
                .http_client
                .get(url)
                .send()
                .await
                .map_err(|e| HostError::new(format!("{} is unreachable", url)).with_source(e))?;

            let status = response.status();
            debug!(url, %status, "script probe");
            if status.is_success() {
                Ok(())
            } else {
                Err(HostError::new(format!("{} returned {}", url, status)))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reachable_script_loads() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/gsi/client")
            .with_status(200)
            .with_body("/* sdk */")
            .create_async()
            .await;

        let host = ProbeScriptHost::new(Duration::from_secs(5)).unwrap();
        host.inject(&format!("{}/gsi/client", server.url())).await.unwrap();
    }

    #[tokio::test]
    async fn missing_script_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/js/api.js")
            .with_status(404)
            .create_async()
            .await;

        let host = ProbeScriptHost::new(Duration::from_secs(5)).unwrap();
        let err = host
            .inject(&format!("{}/js/api.js", server.url()))
            .await
            .unwrap_err();
        assert!(err.message().contains("404"));
    }
}
