//! Notification repository for database operations.
//!
//! Tenant-scoped inserts claim their `(school_id, kind, created_day)` row in
//! `notification_dedup_keys` first. Ledger rows are never deleted, so a
//! deleted notification keeps its key used for the rest of the day.

use async_trait::async_trait;
use domain::models::{DedupKey, NewNotification, NotificationRecord, ReadFilter, Visibility};
use domain::store::{NotificationStore, StoreError};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use crate::entities::{NotificationEntity, NotificationKindDb};
use crate::metrics::{record_dedup_conflict, QueryTimer};

const NOTIFICATION_COLUMNS: &str =
    "id, school_id, user_id, kind, message, days_left, is_read, created_at";

/// Repository for notification records.
#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Creates a new NotificationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Appends `AND (<visibility predicate>)` to a query that already has a WHERE.
fn push_visibility(builder: &mut QueryBuilder<'_, Postgres>, visibility: &Visibility) {
    match visibility {
        Visibility::All => {}
        Visibility::School { school_id, user_id } => {
            builder
                .push(" AND (school_id = ")
                .push_bind(*school_id)
                .push(" OR user_id = ")
                .push_bind(*user_id)
                .push(")");
        }
        Visibility::User(user_id) => {
            builder.push(" AND user_id = ").push_bind(*user_id);
        }
    }
}

fn push_read_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: ReadFilter) {
    if let Some(is_read) = filter.is_read() {
        builder.push(" AND is_read = ").push_bind(is_read);
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn exists(&self, key: &DedupKey) -> Result<bool, StoreError> {
        let _timer = QueryTimer::new("notification_dedup_key_exists");
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM notification_dedup_keys
                WHERE school_id = $1 AND kind = $2 AND created_day = $3
            )
            "#,
        )
        .bind(key.school_id)
        .bind(NotificationKindDb::from(key.kind))
        .bind(key.day)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_if_absent(
        &self,
        notification: NewNotification,
    ) -> Result<Option<NotificationRecord>, StoreError> {
        let _timer = QueryTimer::new("insert_notification");
        let kind = NotificationKindDb::from(notification.kind);

        let Some(school_id) = notification.school_id else {
            let row = sqlx::query_as::<_, NotificationEntity>(&format!(
                r#"
                INSERT INTO notifications
                    (school_id, user_id, kind, message, days_left, is_read, created_at, created_day)
                VALUES (NULL, $1, $2, $3, $4, false, $5, $6)
                RETURNING {NOTIFICATION_COLUMNS}
                "#
            ))
            .bind(notification.user_id)
            .bind(kind)
            .bind(&notification.message)
            .bind(notification.days_left)
            .bind(notification.created_at)
            .bind(notification.created_day)
            .fetch_one(&self.pool)
            .await?;
            return Ok(Some(row.into()));
        };

        // The ledger claim and the insert run as one statement, so a lost
        // race produces no notification row.
        let row = sqlx::query_as::<_, NotificationEntity>(&format!(
            r#"
            WITH claimed AS (
                INSERT INTO notification_dedup_keys (school_id, kind, created_day)
                VALUES ($1, $2, $3)
                ON CONFLICT (school_id, kind, created_day) DO NOTHING
                RETURNING school_id
            )
            INSERT INTO notifications
                (school_id, user_id, kind, message, days_left, is_read, created_at, created_day)
            SELECT claimed.school_id, $4, $2, $5, $6, false, $7, $3
            FROM claimed
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(school_id)
        .bind(kind)
        .bind(notification.created_day)
        .bind(notification.user_id)
        .bind(&notification.message)
        .bind(notification.days_left)
        .bind(notification.created_at)
        .fetch_optional(&self.pool)
        .await?;

        if row.is_none() {
            record_dedup_conflict();
            debug!(
                school_id = %school_id,
                kind = %notification.kind,
                day = %notification.created_day,
                "Dedup key already claimed"
            );
        }

        Ok(row.map(Into::into))
    }

    async fn count_unread(&self, visibility: &Visibility) -> Result<i64, StoreError> {
        let _timer = QueryTimer::new("count_unread_notifications");
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM notifications WHERE is_read = false");
        push_visibility(&mut builder, visibility);

        let count: i64 = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list(
        &self,
        visibility: &Visibility,
        filter: ReadFilter,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let _timer = QueryTimer::new("list_notifications");
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE TRUE"
        ));
        push_visibility(&mut builder, visibility);
        push_read_filter(&mut builder, filter);
        builder.push(" ORDER BY created_at DESC, id DESC");

        let rows = builder
            .build_query_as::<NotificationEntity>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<NotificationRecord>, StoreError> {
        let _timer = QueryTimer::new("find_notification_by_id");
        let row = sqlx::query_as::<_, NotificationEntity>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn mark_read(&self, id: i64) -> Result<bool, StoreError> {
        let _timer = QueryTimer::new("mark_notification_read");
        let result = sqlx::query("UPDATE notifications SET is_read = true WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, visibility: &Visibility) -> Result<u64, StoreError> {
        let _timer = QueryTimer::new("mark_all_notifications_read");
        let mut builder = QueryBuilder::<Postgres>::new(
            "UPDATE notifications SET is_read = true WHERE is_read = false",
        );
        push_visibility(&mut builder, visibility);

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let _timer = QueryTimer::new("delete_notification");
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_visibility_all_adds_no_predicate() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 WHERE TRUE");
        push_visibility(&mut builder, &Visibility::All);
        assert_eq!(builder.sql(), "SELECT 1 WHERE TRUE");
    }

    #[test]
    fn test_school_visibility_includes_user_addressed_rows() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 WHERE TRUE");
        push_visibility(
            &mut builder,
            &Visibility::School {
                school_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
            },
        );
        assert_eq!(
            builder.sql(),
            "SELECT 1 WHERE TRUE AND (school_id = $1 OR user_id = $2)"
        );
    }

    #[test]
    fn test_read_filter_predicates() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 WHERE TRUE");
        push_read_filter(&mut builder, ReadFilter::All);
        assert_eq!(builder.sql(), "SELECT 1 WHERE TRUE");

        push_visibility(&mut builder, &Visibility::User(Uuid::new_v4()));
        push_read_filter(&mut builder, ReadFilter::Unread);
        assert_eq!(
            builder.sql(),
            "SELECT 1 WHERE TRUE AND user_id = $1 AND is_read = $2"
        );
    }
}
