use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::adapter::json_file::AppealJournal;
use crate::domain::{AppealRecord, AppealStatus};
use crate::error::RepError;
use crate::port::AppealRepository;

#[derive(Default)]
struct Inner {
    appeals: HashMap<Uuid, AppealRecord>,
    by_event: HashMap<Uuid, Uuid>,
}

impl Inner {
    fn put(&mut self, record: AppealRecord) {
        self.by_event.insert(record.event_id, record.id);
        self.appeals.insert(record.id, record);
    }
}

/// Appeal records keyed by id, at most one per event.
///
/// With a journal attached every insert and update is written out first, so
/// resolved appeals survive a restart.
#[derive(Default)]
pub struct MemoryAppealRepository {
    inner: RwLock<Inner>,
    journal: Option<AppealJournal>,
}

impl MemoryAppealRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_journal(journal: AppealJournal) -> Self {
        Self {
            journal: Some(journal),
            ..Self::default()
        }
    }

    /// Rebuild from journal revisions, oldest first. The last revision of each appeal wins.
    pub async fn restore(&self, revisions: Vec<AppealRecord>) -> usize {
        let mut inner = self.inner.write().await;
        for record in revisions {
            inner.put(record);
        }
        inner.appeals.len()
    }

    async fn persist(&self, record: &AppealRecord) -> Result<(), RepError> {
        match &self.journal {
            Some(journal) => journal
                .append(record)
                .await
                .map_err(|e| RepError::Storage(format!("appeal journal write failed: {e}"))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AppealRepository for MemoryAppealRepository {
    async fn insert(&self, record: AppealRecord) -> Result<(), RepError> {
        let mut inner = self.inner.write().await;
        if inner.by_event.contains_key(&record.event_id) {
            return Err(RepError::AlreadyAppealed(record.event_id));
        }
        self.persist(&record).await?;
        inner.put(record);
        Ok(())
    }

    async fn get(&self, appeal_id: Uuid) -> Result<Option<AppealRecord>, RepError> {
        Ok(self.inner.read().await.appeals.get(&appeal_id).cloned())
    }

    async fn find_by_event(&self, event_id: Uuid) -> Result<Option<AppealRecord>, RepError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_event
            .get(&event_id)
            .and_then(|id| inner.appeals.get(id))
            .cloned())
    }

    async fn update(&self, record: AppealRecord) -> Result<(), RepError> {
        let mut inner = self.inner.write().await;
        if !inner.appeals.contains_key(&record.id) {
            return Err(RepError::not_found("Appeal", record.id));
        }
        self.persist(&record).await?;
        inner.put(record);
        Ok(())
    }

    async fn list_by_status(&self, status: AppealStatus) -> Result<Vec<AppealRecord>, RepError> {
        let mut appeals: Vec<AppealRecord> = self
            .inner
            .read()
            .await
            .appeals
            .values()
            .filter(|a| a.status == status)
            .cloned()
            .collect();
        appeals.sort_by_key(|a| a.created_at);
        Ok(appeals)
    }
}
