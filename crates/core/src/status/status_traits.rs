use crate::errors::Result;
use crate::status::status_model::RefreshStatus;
use async_trait::async_trait;

/// Trait for the persisted refresh status row
#[async_trait]
pub trait StatusRepositoryTrait: Send + Sync {
    fn load_status(&self) -> Result<Option<RefreshStatus>>;
    async fn save_status(&self, status: RefreshStatus) -> Result<()>;
}
