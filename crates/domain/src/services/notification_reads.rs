//! Notification read/mutate operations scoped by principal visibility.

use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::models::{NotificationRecord, Principal, ReadFilter, Visibility};
use crate::store::{NotificationStore, StoreError};

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Notification not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Count, list, mark-read and delete notifications on behalf of a principal.
#[derive(Clone)]
pub struct NotificationReadService {
    notifications: Arc<dyn NotificationStore>,
}

impl NotificationReadService {
    pub fn new(notifications: Arc<dyn NotificationStore>) -> Self {
        Self { notifications }
    }

    /// Resolve what the principal may see. Principals with no scope are refused.
    pub fn visibility(principal: &Principal) -> Result<Visibility, ReadError> {
        principal.visibility().ok_or_else(|| {
            ReadError::Forbidden(format!(
                "role {} has no notification scope",
                principal.role
            ))
        })
    }

    /// Fetch a record the principal can see. Invisible records read as missing.
    async fn visible_record(
        &self,
        principal: &Principal,
        id: i64,
    ) -> Result<NotificationRecord, ReadError> {
        let visibility = Self::visibility(principal)?;
        self.notifications
            .find_by_id(id)
            .await?
            .filter(|record| visibility.can_see(record))
            .ok_or(ReadError::NotFound)
    }

    pub async fn count_unread(&self, principal: &Principal) -> Result<i64, ReadError> {
        let visibility = Self::visibility(principal)?;
        Ok(self.notifications.count_unread(&visibility).await?)
    }

    pub async fn list(
        &self,
        principal: &Principal,
        filter: ReadFilter,
    ) -> Result<Vec<NotificationRecord>, ReadError> {
        let visibility = Self::visibility(principal)?;
        Ok(self.notifications.list(&visibility, filter).await?)
    }

    /// Mark one record read. Already-read records succeed unchanged.
    pub async fn mark_read(
        &self,
        principal: &Principal,
        id: i64,
    ) -> Result<NotificationRecord, ReadError> {
        let mut record = self.visible_record(principal, id).await?;
        if record.is_read {
            return Ok(record);
        }

        if !self.notifications.mark_read(id).await? {
            return Err(ReadError::NotFound);
        }
        record.is_read = true;
        Ok(record)
    }

    /// Mark every visible unread record read. Returns how many were flipped.
    pub async fn mark_all_read(&self, principal: &Principal) -> Result<u64, ReadError> {
        let visibility = Self::visibility(principal)?;
        let updated = self.notifications.mark_all_read(&visibility).await?;
        info!(user_id = %principal.user_id, updated, "Marked notifications read");
        Ok(updated)
    }

    /// Hard delete. The record's dedup key stays used for its day.
    pub async fn delete(&self, principal: &Principal, id: i64) -> Result<(), ReadError> {
        self.visible_record(principal, id).await?;
        if !self.notifications.delete(id).await? {
            return Err(ReadError::NotFound);
        }
        info!(user_id = %principal.user_id, notification_id = id, "Notification deleted");
        Ok(())
    }
}
