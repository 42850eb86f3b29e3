//! Orchestrator, configuration and the `drivelink` CLI
//!
//! [`IntegrationOrchestrator`] drives one run of the storage integration
//! flow (status check, authorization, picker, submission) over an
//! [`IntegrationContext`] and reports side effects through [`HostHooks`].

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod orchestrator;
pub mod secret;

pub use cli::Cli;
pub use context::{HostCapabilities, IntegrationContext};
pub use error::{ClientError, ClientResult};
pub use orchestrator::{HostHooks, IntegrationOrchestrator, OrchestratorError, RunOutcome};
