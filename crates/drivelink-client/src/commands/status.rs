//! Status command.

use drivelink_providers::BackendGateway;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Prints whether the backend holds a usable Drive token.
pub async fn run(config: &ClientConfig) -> ClientResult<()> {
    let gateway = config.backend.to_gateway().map_err(ClientError::Config)?;
    debug!(backend = %gateway.base_url(), "querying integration status");

    if check(&gateway).await? {
        println!("Google Drive is connected.");
    } else {
        println!("Google Drive is not connected. Run `drivelink connect` to authorize.");
    }
    Ok(())
}

/// Queries the status endpoint. Unlike a flow run, a failed query is an error here.
pub async fn check(gateway: &dyn BackendGateway) -> ClientResult<bool> {
    Ok(gateway.status().await?.is_authenticated)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use drivelink_providers::HttpBackendGateway;
    use url::Url;

    use super::*;

    async fn gateway(server: &mockito::Server) -> HttpBackendGateway {
        HttpBackendGateway::new(Url::parse(&server.url()).unwrap(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn reports_connected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/integrations/status")
            .with_status(200)
            .with_body(r#"{"isAuthenticated": true}"#)
            .create_async()
            .await;

        assert!(check(&gateway(&server).await).await.unwrap());
    }

    #[tokio::test]
    async fn backend_errors_surface() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/integrations/status")
            .with_status(401)
            .with_body(r#"{"detail": "Not authenticated"}"#)
            .create_async()
            .await;

        let err = check(&gateway(&server).await).await.unwrap_err();
        assert!(matches!(err, ClientError::Backend(ref e) if e.is_unauthorized()));
    }
}
