//! Lifecycle supervision of the refresh loop.
//!
//! The supervisor owns the loop task. It restarts the loop after an
//! unexpected exit (error or panic) up to `max_restarts` times, then gives
//! up with status `failed`. On shutdown it waits `shutdown_grace` for the
//! running cycle to finish and aborts the task after that.

use std::sync::Arc;
use std::time::Duration;

use ibdash_terminal::TerminalClient;
use log::{error, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use super::refresh_model::{RefreshConfig, RefreshStores};
use super::refresh_service::RefreshLoop;
use super::shutdown_requested;
use crate::constants::{DEFAULT_MAX_RESTARTS, DEFAULT_RESTART_DELAY, DEFAULT_SHUTDOWN_GRACE};
use crate::errors::{Error, Result};
use crate::status::{RefreshState, StatusReporter};

/// Builds a fresh, unconnected terminal client for every loop start.
pub type TerminalFactory = Arc<dyn Fn() -> Box<dyn TerminalClient> + Send + Sync>;

#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Restarts allowed after unexpected exits before giving up.
    pub max_restarts: u32,
    /// Delay before restart `n` is `restart_delay * n`.
    pub restart_delay: Duration,
    /// Time the running cycle gets to finish after shutdown is requested.
    pub shutdown_grace: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_restarts: DEFAULT_MAX_RESTARTS,
            restart_delay: DEFAULT_RESTART_DELAY,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

pub struct RefreshSupervisor {
    config: SupervisorConfig,
    refresh_config: RefreshConfig,
    stores: RefreshStores,
    status: Arc<StatusReporter>,
    terminal_factory: TerminalFactory,
}

impl RefreshSupervisor {
    pub fn new(
        config: SupervisorConfig,
        refresh_config: RefreshConfig,
        stores: RefreshStores,
        status: Arc<StatusReporter>,
        terminal_factory: TerminalFactory,
    ) -> Self {
        Self {
            config,
            refresh_config,
            stores,
            status,
            terminal_factory,
        }
    }

    fn spawn_loop(&self, shutdown: watch::Receiver<bool>) -> JoinHandle<Result<()>> {
        let refresh_config = self.refresh_config.clone();
        let stores = self.stores.clone();
        let status = self.status.clone();
        let terminal = (self.terminal_factory)();

        tokio::spawn(async move {
            let refresh_loop = RefreshLoop::new(refresh_config, terminal, stores, status)?;
            refresh_loop.run(shutdown).await
        })
    }

    /// Runs the loop until shutdown is requested (`Ok`) or the restart
    /// budget is exhausted (`Err`).
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut restarts: u32 = 0;

        loop {
            let mut handle = self.spawn_loop(shutdown.clone());

            let exit = tokio::select! {
                joined = &mut handle => Some(joined),
                _ = shutdown_requested(&mut shutdown) => None,
            };
            let Some(exit) = exit else {
                self.stop(handle).await;
                return Ok(());
            };

            let stopping = *shutdown.borrow();
            if stopping {
                // The loop saw shutdown first and returned on its own.
                self.status
                    .update(|s| {
                        s.state = RefreshState::Terminating;
                        s.connected = false;
                    })
                    .await;
                info!("Refresh loop stopped");
                return Ok(());
            }

            let reason = match exit {
                Ok(Ok(())) => "loop exited unexpectedly".to_string(),
                Ok(Err(e)) => format!("loop failed: {}", e),
                Err(e) if e.is_panic() => "loop panicked".to_string(),
                Err(e) => format!("loop task failed: {}", e),
            };

            restarts += 1;
            if restarts > self.config.max_restarts {
                error!(
                    "Refresh {}; giving up after {} restarts",
                    reason, self.config.max_restarts
                );
                let message = reason.clone();
                self.status
                    .update(|s| {
                        s.state = RefreshState::Failed;
                        s.connected = false;
                        s.last_error = Some(message);
                    })
                    .await;
                return Err(Error::RefreshStopped(reason));
            }

            let delay = self.config.restart_delay * restarts;
            warn!(
                "Refresh {}; restart {}/{} in {:?}",
                reason, restarts, self.config.max_restarts, delay
            );
            self.status
                .update(|s| {
                    s.state = RefreshState::Disconnected;
                    s.connected = false;
                    s.restarts = restarts;
                    s.last_error = Some(reason);
                })
                .await;

            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown_requested(&mut shutdown) => {
                    self.status.update(|s| s.state = RefreshState::Terminating).await;
                    return Ok(());
                }
            }
        }
    }

    /// Waits for the loop to observe shutdown, aborting it after the grace period.
    async fn stop(&self, mut handle: JoinHandle<Result<()>>) {
        info!(
            "Shutdown requested, waiting up to {:?} for the refresh loop",
            self.config.shutdown_grace
        );
        match timeout(self.config.shutdown_grace, &mut handle).await {
            Ok(Ok(Ok(()))) => info!("Refresh loop stopped"),
            Ok(Ok(Err(e))) => warn!("Refresh loop ended with error during shutdown: {}", e),
            Ok(Err(e)) => warn!("Refresh loop task failed during shutdown: {}", e),
            Err(_) => {
                warn!("Refresh loop did not stop in time, aborting");
                handle.abort();
                let _ = handle.await;
            }
        }
        self.status
            .update(|s| {
                s.state = RefreshState::Terminating;
                s.connected = false;
            })
            .await;
    }
}
