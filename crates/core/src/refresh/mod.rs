//! Refresh module - keeps the store in sync with the brokerage terminal.
//!
//! ```text
//! RefreshSupervisor (restarts, shutdown grace)
//!        │ spawns
//!        ▼
//!   RefreshLoop ── one cycle per interval ──► Persistent store
//!        │
//!        └── owns ──► TerminalClient session (reconnect with backoff)
//! ```

mod reconnect;
mod refresh_model;
mod refresh_service;
mod supervisor;

#[cfg(test)]
mod refresh_service_tests;

use tokio::sync::watch;

pub use reconnect::ReconnectBackoff;
pub use refresh_model::{CycleOutcome, CycleReport, RefreshConfig, RefreshStores};
pub use refresh_service::RefreshLoop;
pub use supervisor::{RefreshSupervisor, SupervisorConfig, TerminalFactory};

/// Resolves once shutdown is requested or the sender is gone.
pub(crate) async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
