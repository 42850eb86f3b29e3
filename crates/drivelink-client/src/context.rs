//! Process-wide integration state.
//!
//! The script loader and the memoized auth and picker clients outlive a single
//! run. They are owned here instead of living in globals; dropping the context
//! tears them down.

use std::sync::Arc;
use std::time::Duration;

use drivelink_providers::google::GoogleDriveConfig;
use drivelink_providers::{
    AuthSessionClient, BackendGateway, IdentityProvider, PickerClient, PickerProvider, ScriptHost,
    ScriptLoader,
};

/// The host-supplied capabilities the flow is built on.
#[derive(Clone)]
pub struct HostCapabilities {
    pub scripts: Arc<dyn ScriptHost>,
    pub identity: Arc<dyn IdentityProvider>,
    pub picker: Arc<dyn PickerProvider>,
}

/// Long-lived state shared by every run of one orchestrator.
pub struct IntegrationContext {
    scripts: Arc<ScriptLoader>,
    auth: AuthSessionClient,
    picker: PickerClient,
    gateway: Arc<dyn BackendGateway>,
}

impl IntegrationContext {
    pub fn new(
        config: &GoogleDriveConfig,
        host: HostCapabilities,
        gateway: Arc<dyn BackendGateway>,
        script_timeout: Duration,
    ) -> Self {
        let scripts = Arc::new(ScriptLoader::new(host.scripts).with_timeout(script_timeout));
        let auth = AuthSessionClient::new(
            config.auth_config(),
            Arc::clone(&scripts),
            host.identity,
            Arc::clone(&gateway),
        );
        let picker = PickerClient::new(config.picker_config(), Arc::clone(&scripts), host.picker);

        Self {
            scripts,
            auth,
            picker,
            gateway,
        }
    }

    pub fn scripts(&self) -> &ScriptLoader {
        &self.scripts
    }

    pub fn auth(&self) -> &AuthSessionClient {
        &self.auth
    }

    pub fn picker(&self) -> &PickerClient {
        &self.picker
    }

    pub fn gateway(&self) -> &dyn BackendGateway {
        self.gateway.as_ref()
    }
}

impl std::fmt::Debug for IntegrationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrationContext")
            .field("scripts", &self.scripts)
            .field("auth", &self.auth)
            .field("picker", &self.picker)
            .finish()
    }
}
