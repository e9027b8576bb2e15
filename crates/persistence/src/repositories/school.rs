//! School repository for database operations.

use async_trait::async_trait;
use domain::models::School;
use domain::store::{StoreError, TenantStore};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::SchoolEntity;
use crate::metrics::QueryTimer;

/// Repository for school (tenant) reads.
#[derive(Clone)]
pub struct SchoolRepository {
    pool: PgPool,
}

impl SchoolRepository {
    /// Creates a new SchoolRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantStore for SchoolRepository {
    async fn list_with_subscription_end(&self) -> Result<Vec<School>, StoreError> {
        let _timer = QueryTimer::new("list_schools_with_subscription_end");
        let rows = sqlx::query_as::<_, SchoolEntity>(
            r#"
            SELECT id, name, subscription_start, subscription_end, account_state,
                   created_at, updated_at
            FROM schools
            WHERE subscription_end IS NOT NULL
            ORDER BY name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<School>, StoreError> {
        let _timer = QueryTimer::new("find_school_by_id");
        let row = sqlx::query_as::<_, SchoolEntity>(
            r#"
            SELECT id, name, subscription_start, subscription_end, account_state,
                   created_at, updated_at
            FROM schools
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}
