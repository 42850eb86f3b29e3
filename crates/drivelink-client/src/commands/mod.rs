//! Subcommand implementations.

pub mod config;
#[cfg(feature = "google")]
pub mod connect;
pub mod status;
