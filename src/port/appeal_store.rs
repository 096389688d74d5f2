use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{AppealRecord, AppealStatus};
use crate::error::RepError;

#[async_trait]
pub trait AppealRepository: Send + Sync {
    /// Insert a new appeal. Fails with `AlreadyAppealed` if the event already has one.
    async fn insert(&self, record: AppealRecord) -> Result<(), RepError>;

    async fn get(&self, appeal_id: Uuid) -> Result<Option<AppealRecord>, RepError>;

    async fn find_by_event(&self, event_id: Uuid) -> Result<Option<AppealRecord>, RepError>;

    /// Replace a stored appeal with its updated state.
    async fn update(&self, record: AppealRecord) -> Result<(), RepError>;

    async fn list_by_status(&self, status: AppealStatus) -> Result<Vec<AppealRecord>, RepError>;
}
