//! In-memory store implementations.
//!
//! Used by tests. The notification store enforces the dedup invariant by
//! checking and inserting under one write lock. Outage and insert-failure
//! hooks are only compiled with the `test-utils` feature.

use async_trait::async_trait;
use std::collections::HashMap;
#[cfg(any(test, feature = "test-utils"))]
use std::collections::HashSet;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NotificationStore, StoreError, TenantStore};
use crate::models::{
    DedupKey, NewNotification, NotificationRecord, ReadFilter, School, Visibility,
};

/// In-memory school store.
#[derive(Debug, Default)]
pub struct InMemoryTenantStore {
    schools: RwLock<HashMap<Uuid, School>>,
    #[cfg(any(test, feature = "test-utils"))]
    unavailable: RwLock<bool>,
}

impl InMemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schools(schools: impl IntoIterator<Item = School>) -> Self {
        Self {
            schools: RwLock::new(schools.into_iter().map(|s| (s.id, s)).collect()),
            #[cfg(any(test, feature = "test-utils"))]
            unavailable: RwLock::new(false),
        }
    }

    /// Insert or replace a school.
    pub async fn upsert(&self, school: School) {
        self.schools.write().await.insert(school.id, school);
    }

    /// Simulate an outage: every call fails with [`StoreError::Unavailable`].
    #[cfg(any(test, feature = "test-utils"))]
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    #[cfg(any(test, feature = "test-utils"))]
    async fn check_available(&self) -> Result<(), StoreError> {
        if *self.unavailable.read().await {
            return Err(StoreError::Unavailable("tenant store offline".to_string()));
        }
        Ok(())
    }

    #[cfg(not(any(test, feature = "test-utils")))]
    async fn check_available(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn list_with_subscription_end(&self) -> Result<Vec<School>, StoreError> {
        self.check_available().await?;
        let mut schools: Vec<School> = self
            .schools
            .read()
            .await
            .values()
            .filter(|s| s.subscription_end.is_some())
            .cloned()
            .collect();
        schools.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(schools)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<School>, StoreError> {
        self.check_available().await?;
        Ok(self.schools.read().await.get(&id).cloned())
    }
}

#[derive(Debug, Default)]
struct NotificationTable {
    next_id: i64,
    records: Vec<NotificationRecord>,
    /// Keys ever inserted. Deleting a record does not free its key.
    keys: HashMap<DedupKey, i64>,
}

/// In-memory notification store.
#[derive(Debug, Default)]
pub struct InMemoryNotificationStore {
    table: RwLock<NotificationTable>,
    #[cfg(any(test, feature = "test-utils"))]
    rejected_schools: RwLock<HashSet<Uuid>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make inserts for `school_id` fail, to exercise per-school error isolation.
    #[cfg(any(test, feature = "test-utils"))]
    pub async fn reject_inserts_for(&self, school_id: Uuid) {
        self.rejected_schools.write().await.insert(school_id);
    }

    /// Number of stored records, regardless of visibility.
    pub async fn len(&self) -> usize {
        self.table.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn exists(&self, key: &DedupKey) -> Result<bool, StoreError> {
        Ok(self.table.read().await.keys.contains_key(key))
    }

    async fn insert_if_absent(
        &self,
        notification: NewNotification,
    ) -> Result<Option<NotificationRecord>, StoreError> {
        #[cfg(any(test, feature = "test-utils"))]
        if let Some(school_id) = notification.school_id {
            if self.rejected_schools.read().await.contains(&school_id) {
                return Err(StoreError::Database(format!(
                    "insert rejected for school {}",
                    school_id
                )));
            }
        }

        let mut table = self.table.write().await;
        let key = notification.dedup_key();
        if let Some(key) = key {
            if table.keys.contains_key(&key) {
                return Ok(None);
            }
        }

        table.next_id += 1;
        let record = NotificationRecord {
            id: table.next_id,
            school_id: notification.school_id,
            user_id: notification.user_id,
            kind: notification.kind,
            message: notification.message,
            days_left: notification.days_left,
            is_read: false,
            created_at: notification.created_at,
        };
        if let Some(key) = key {
            table.keys.insert(key, record.id);
        }
        table.records.push(record.clone());

        Ok(Some(record))
    }

    async fn count_unread(&self, visibility: &Visibility) -> Result<i64, StoreError> {
        let table = self.table.read().await;
        Ok(table
            .records
            .iter()
            .filter(|r| !r.is_read && visibility.can_see(r))
            .count() as i64)
    }

    async fn list(
        &self,
        visibility: &Visibility,
        filter: ReadFilter,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let table = self.table.read().await;
        let mut records: Vec<NotificationRecord> = table
            .records
            .iter()
            .filter(|r| visibility.can_see(r) && filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<NotificationRecord>, StoreError> {
        let table = self.table.read().await;
        Ok(table.records.iter().find(|r| r.id == id).cloned())
    }

    async fn mark_read(&self, id: i64) -> Result<bool, StoreError> {
        let mut table = self.table.write().await;
        match table.records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, visibility: &Visibility) -> Result<u64, StoreError> {
        let mut table = self.table.write().await;
        let mut updated = 0;
        for record in table
            .records
            .iter_mut()
            .filter(|r| !r.is_read && visibility.can_see(r))
        {
            record.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut table = self.table.write().await;
        let before = table.records.len();
        table.records.retain(|r| r.id != id);
        Ok(table.records.len() < before)
    }
}
