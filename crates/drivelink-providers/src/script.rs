//! On-demand loading of provider scripts.
//!
//! Each URL gets one shared handle. Concurrent and repeated loads of the
//! same URL wait on the same in-flight load and observe the same outcome.
//! A failed load is evicted once settled, so the next run can try again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{IntegrationError, IntegrationResult};
use crate::provider::ScriptHost;

/// How long a script may take to signal readiness.
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(15);

type ScriptHandle = Arc<OnceCell<Result<(), String>>>;

/// Loads third-party scripts at most once per URL.
pub struct ScriptLoader {
    host: Arc<dyn ScriptHost>,
    timeout: Duration,
    handles: Mutex<HashMap<String, ScriptHandle>>,
}

impl ScriptLoader {
    pub fn new(host: Arc<dyn ScriptHost>) -> Self {
        Self {
            host,
            timeout: DEFAULT_SCRIPT_TIMEOUT,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Builder method to set the readiness timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Loads the script at `url`, sharing any load already in flight.
    ///
    /// # Errors
    ///
    /// Returns a `ScriptLoadError` if the host fails to load the script or
    /// it does not become ready within the timeout.
    pub async fn load(&self, url: &str) -> IntegrationResult<()> {
        let handle = self.handle(url);

        let outcome = handle.get_or_init(|| self.inject(url)).await;
        match outcome {
            Ok(()) => Ok(()),
            Err(reason) => {
                self.evict(url, &handle);
                Err(IntegrationError::script_load(format!("failed to load {}", url))
                    .with_detail(reason.clone()))
            }
        }
    }

    /// Returns true if `url` has been loaded successfully.
    pub fn is_loaded(&self, url: &str) -> bool {
        self.lock()
            .get(url)
            .and_then(|handle| handle.get())
            .is_some_and(|outcome| outcome.is_ok())
    }

    /// Number of scripts loaded successfully.
    pub fn loaded_count(&self) -> usize {
        self.lock()
            .values()
            .filter(|handle| handle.get().is_some_and(|outcome| outcome.is_ok()))
            .count()
    }

    fn handle(&self, url: &str) -> ScriptHandle {
        self.lock().entry(url.to_string()).or_default().clone()
    }

    async fn inject(&self, url: &str) -> Result<(), String> {
        debug!(url, "injecting script");
        match tokio::time::timeout(self.timeout, self.host.inject(url)).await {
            Ok(Ok(())) => {
                info!(url, "script ready");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(url, error = %e, "script failed to load");
                Err(e.to_string())
            }
            Err(_) => {
                warn!(url, timeout = ?self.timeout, "script load timed out");
                Err(format!("not ready after {:?}", self.timeout))
            }
        }
    }

    fn evict(&self, url: &str, handle: &ScriptHandle) {
        let mut handles = self.lock();
        if handles
            .get(url)
            .is_some_and(|current| Arc::ptr_eq(current, handle))
        {
            handles.remove(url);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ScriptHandle>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ScriptLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptLoader")
            .field("timeout", &self.timeout)
            .field("loaded", &self.loaded_count())
            .finish()
    }
}
