//! Notification domain models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Closed set of notification kinds emitted by the expiry engine.
///
/// Ordered least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NotificationKind {
    #[serde(rename = "SUBSCRIPTION_5_DAYS")]
    FiveDays,
    #[serde(rename = "SUBSCRIPTION_2_DAYS")]
    TwoDays,
    #[serde(rename = "SUBSCRIPTION_1_DAY")]
    OneDay,
    #[serde(rename = "SUBSCRIPTION_EXPIRED")]
    Expired,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 4] = [
        NotificationKind::FiveDays,
        NotificationKind::TwoDays,
        NotificationKind::OneDay,
        NotificationKind::Expired,
    ];

    /// Wire label of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::FiveDays => "SUBSCRIPTION_5_DAYS",
            NotificationKind::TwoDays => "SUBSCRIPTION_2_DAYS",
            NotificationKind::OneDay => "SUBSCRIPTION_1_DAY",
            NotificationKind::Expired => "SUBSCRIPTION_EXPIRED",
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, NotificationKind::Expired)
    }

    /// Display severity for UI badges.
    pub fn severity(&self) -> Severity {
        match self {
            NotificationKind::FiveDays => Severity::Info,
            NotificationKind::TwoDays | NotificationKind::OneDay => Severity::Warning,
            NotificationKind::Expired => Severity::Critical,
        }
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown notification type: {}", s))
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity derived from the notification kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// A persisted notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NotificationRecord {
    pub id: i64,
    pub school_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub days_left: i32,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A notification about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub school_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub message: String,
    pub days_left: i32,
    pub created_at: DateTime<Utc>,
    /// Calendar day of `created_at` in the deployment's reference timezone.
    pub created_day: NaiveDate,
}

impl NewNotification {
    /// Dedup key of this notification, when it is tenant scoped.
    pub fn dedup_key(&self) -> Option<DedupKey> {
        self.school_id.map(|school_id| DedupKey {
            school_id,
            kind: self.kind,
            day: self.created_day,
        })
    }
}

/// At most one notification exists per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub school_id: Uuid,
    pub kind: NotificationKind,
    pub day: NaiveDate,
}

/// Read-state filter for listing notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadFilter {
    #[default]
    All,
    Unread,
    Read,
}

impl ReadFilter {
    pub fn matches(&self, record: &NotificationRecord) -> bool {
        match self {
            ReadFilter::All => true,
            ReadFilter::Unread => !record.is_read,
            ReadFilter::Read => record.is_read,
        }
    }

    /// The `is_read` value to filter on, `None` for all.
    pub fn is_read(&self) -> Option<bool> {
        match self {
            ReadFilter::All => None,
            ReadFilter::Unread => Some(false),
            ReadFilter::Read => Some(true),
        }
    }
}

impl FromStr for ReadFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(ReadFilter::All),
            "unread" => Ok(ReadFilter::Unread),
            "read" => Ok(ReadFilter::Read),
            _ => Err(format!("Unknown filter: {} (expected all, unread or read)", s)),
        }
    }
}
