use std::future::Future;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use log::warn;

use super::status_model::RefreshStatus;
use super::status_traits::StatusRepositoryTrait;

/// In-memory refresh status, mirrored to the store on every change.
///
/// Shared by the refresh loop, the supervisor and the HTTP status endpoint.
/// A failed write is logged and otherwise ignored; the in-memory copy stays
/// authoritative for this process.
pub struct StatusReporter {
    current: RwLock<RefreshStatus>,
    repository: Arc<dyn StatusRepositoryTrait>,
}

impl StatusReporter {
    pub fn new(repository: Arc<dyn StatusRepositoryTrait>) -> Self {
        Self {
            current: RwLock::new(RefreshStatus::default()),
            repository,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RefreshStatus> {
        self.current.read().unwrap_or_else(|poisoned| {
            warn!("Status lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, RefreshStatus> {
        self.current.write().unwrap_or_else(|poisoned| {
            warn!("Status lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn snapshot(&self) -> RefreshStatus {
        self.read().clone()
    }

    /// Applies `change` and stamps `updated_at` right away. The returned
    /// future persists the result and holds no lock, so it can be awaited
    /// from a spawned task.
    pub fn update<F>(&self, change: F) -> impl Future<Output = ()> + Send + '_
    where
        F: FnOnce(&mut RefreshStatus),
    {
        let status = {
            let mut guard = self.write();
            change(&mut guard);
            guard.updated_at = Utc::now();
            guard.clone()
        };
        let repository = Arc::clone(&self.repository);

        async move {
            if let Err(e) = repository.save_status(status).await {
                warn!("Failed to persist refresh status: {}", e);
            }
        }
    }
}
