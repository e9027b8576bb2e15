//! Store traits consumed by the expiry engine.
//!
//! The engine never talks to a database directly. The persistence crate
//! provides PostgreSQL implementations, [`memory`] provides in-process ones.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    DedupKey, NewNotification, NotificationRecord, ReadFilter, School, Visibility,
};

pub use memory::{InMemoryNotificationStore, InMemoryTenantStore};

/// Errors raised by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::InvalidData(err.to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Database(err.to_string()),
        }
    }
}

/// Read access to schools and their subscription windows.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// All schools with a subscription end date.
    async fn list_with_subscription_end(&self) -> Result<Vec<School>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<School>, StoreError>;
}

/// Append/query/mutate access to notification records.
///
/// Implementations must make [`NotificationStore::insert_if_absent`] atomic
/// with respect to the record's [`DedupKey`]: of N concurrent inserts for the
/// same key at most one succeeds, the others return `Ok(None)`.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Whether a record for the key already exists.
    async fn exists(&self, key: &DedupKey) -> Result<bool, StoreError>;

    /// Insert unless the dedup key is taken. `Ok(None)` when it was.
    async fn insert_if_absent(
        &self,
        notification: NewNotification,
    ) -> Result<Option<NotificationRecord>, StoreError>;

    async fn count_unread(&self, visibility: &Visibility) -> Result<i64, StoreError>;

    /// Records newest first.
    async fn list(
        &self,
        visibility: &Visibility,
        filter: ReadFilter,
    ) -> Result<Vec<NotificationRecord>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<NotificationRecord>, StoreError>;

    /// Set `is_read`. Returns false when the record does not exist.
    async fn mark_read(&self, id: i64) -> Result<bool, StoreError>;

    /// Mark every visible unread record read. Returns the number flipped.
    async fn mark_all_read(&self, visibility: &Visibility) -> Result<u64, StoreError>;

    /// Hard delete. Returns false when the record does not exist.
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}
