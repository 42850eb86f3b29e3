//! Connect command: one full integration run from the terminal.

use std::sync::Arc;

use drivelink_providers::google::{DrivePicker, LoopbackIdentityProvider, ProbeScriptHost};
use tracing::info;

use crate::config::ClientConfig;
use crate::context::{HostCapabilities, IntegrationContext};
use crate::error::{ClientError, ClientResult};
use crate::host::{CliHooks, TerminalChooser};
use crate::orchestrator::{IntegrationOrchestrator, RunOutcome};

/// Authorizes if needed, lets the user pick an item and hands it to the backend.
pub async fn run(config: &ClientConfig, no_open: bool) -> ClientResult<()> {
    let backend_url = config.backend.base_url().map_err(ClientError::Config)?;
    let google = config
        .google()
        .and_then(|settings| settings.to_provider_config(&backend_url, &config.flow))
        .map_err(ClientError::Config)?;
    let gateway = config.backend.to_gateway().map_err(ClientError::Config)?;

    let host = HostCapabilities {
        scripts: Arc::new(ProbeScriptHost::new(config.flow.script_timeout())?),
        identity: Arc::new(
            LoopbackIdentityProvider::new()
                .with_callback_timeout(config.flow.authorization_timeout()),
        ),
        picker: Arc::new(DrivePicker::new(
            Arc::new(TerminalChooser),
            config.backend.timeout(),
        )?),
    };
    let context = Arc::new(IntegrationContext::new(
        &google,
        host,
        Arc::new(gateway),
        config.flow.script_timeout(),
    ));
    let orchestrator = IntegrationOrchestrator::new(context, Arc::new(CliHooks { no_open }));

    match orchestrator.start().await? {
        RunOutcome::Done {
            selection,
            download_links,
        } => {
            info!(resource_id = %selection.resource_id, links = download_links.len(), "import accepted");
            println!("Imported {} \"{}\".", selection.kind, selection.display_name);
            if download_links.is_empty() {
                println!("The server did not return any download links.");
            }
        }
        RunOutcome::Cancelled => println!("Cancelled."),
    }
    Ok(())
}
