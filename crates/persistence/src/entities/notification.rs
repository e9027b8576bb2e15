//! Notification entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{NotificationKind, NotificationRecord};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for notification_kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "notification_kind")]
pub enum NotificationKindDb {
    #[sqlx(rename = "SUBSCRIPTION_5_DAYS")]
    FiveDays,
    #[sqlx(rename = "SUBSCRIPTION_2_DAYS")]
    TwoDays,
    #[sqlx(rename = "SUBSCRIPTION_1_DAY")]
    OneDay,
    #[sqlx(rename = "SUBSCRIPTION_EXPIRED")]
    Expired,
}

impl From<NotificationKindDb> for NotificationKind {
    fn from(db: NotificationKindDb) -> Self {
        match db {
            NotificationKindDb::FiveDays => Self::FiveDays,
            NotificationKindDb::TwoDays => Self::TwoDays,
            NotificationKindDb::OneDay => Self::OneDay,
            NotificationKindDb::Expired => Self::Expired,
        }
    }
}

impl From<NotificationKind> for NotificationKindDb {
    fn from(kind: NotificationKind) -> Self {
        match kind {
            NotificationKind::FiveDays => Self::FiveDays,
            NotificationKind::TwoDays => Self::TwoDays,
            NotificationKind::OneDay => Self::OneDay,
            NotificationKind::Expired => Self::Expired,
        }
    }
}

/// Database row mapping for the notifications table.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationEntity {
    pub id: i64,
    pub school_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub kind: NotificationKindDb,
    pub message: String,
    pub days_left: i32,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationEntity> for NotificationRecord {
    fn from(entity: NotificationEntity) -> Self {
        Self {
            id: entity.id,
            school_id: entity.school_id,
            user_id: entity.user_id,
            kind: entity.kind.into(),
            message: entity.message,
            days_left: entity.days_left,
            is_read: entity.is_read,
            created_at: entity.created_at,
        }
    }
}
