//! School (tenant) domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::notification::NotificationKind;

/// Administrative account state of a school.
///
/// Set by platform operators; the expiry engine reads it but never changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountState {
    Pending,
    Active,
    Suspended,
    Inactive,
}

impl FromStr for AccountState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(AccountState::Pending),
            "ACTIVE" => Ok(AccountState::Active),
            "SUSPENDED" => Ok(AccountState::Suspended),
            "INACTIVE" => Ok(AccountState::Inactive),
            _ => Err(format!("Unknown account state: {}", s)),
        }
    }
}

impl std::fmt::Display for AccountState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountState::Pending => write!(f, "PENDING"),
            AccountState::Active => write!(f, "ACTIVE"),
            AccountState::Suspended => write!(f, "SUSPENDED"),
            AccountState::Inactive => write!(f, "INACTIVE"),
        }
    }
}

/// Subscription window violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("subscription ends ({end}) before it starts ({start})")]
    EndsBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// School domain model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct School {
    pub id: Uuid,
    pub name: String,
    pub subscription_start: Option<DateTime<Utc>>,
    pub subscription_end: Option<DateTime<Utc>>,
    pub account_state: AccountState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl School {
    /// Check the window invariant: the end, when both are set, is not before the start.
    pub fn validate_window(&self) -> Result<(), WindowError> {
        match (self.subscription_start, self.subscription_end) {
            (Some(start), Some(end)) if end < start => {
                Err(WindowError::EndsBeforeStart { start, end })
            }
            _ => Ok(()),
        }
    }
}

/// Computed subscription status of a school at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SubscriptionStatus {
    pub school_id: Uuid,
    pub name: String,
    pub account_state: AccountState,
    pub subscription_start: Option<DateTime<Utc>>,
    pub subscription_end: Option<DateTime<Utc>>,
    /// Whole days remaining (rounded up), `None` without an end date.
    pub days_left: Option<i64>,
    /// Threshold the school sits on today, if any.
    pub threshold: Option<NotificationKind>,
    pub checked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn school(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> School {
        let now = Utc::now();
        School {
            id: Uuid::new_v4(),
            name: "Riverside Primary".to_string(),
            subscription_start: start,
            subscription_end: end,
            account_state: AccountState::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_account_state_from_str() {
        assert_eq!(AccountState::from_str("active"), Ok(AccountState::Active));
        assert_eq!(
            AccountState::from_str("SUSPENDED"),
            Ok(AccountState::Suspended)
        );
        assert!(AccountState::from_str("archived").is_err());
    }

    #[test]
    fn test_account_state_serialization() {
        assert_eq!(
            serde_json::to_string(&AccountState::Pending).unwrap(),
            "\"PENDING\""
        );
        assert_eq!(AccountState::Inactive.to_string(), "INACTIVE");
    }

    #[test]
    fn test_window_valid_when_end_after_start() {
        let now = Utc::now();
        assert!(school(Some(now), Some(now + Duration::days(30)))
            .validate_window()
            .is_ok());
    }

    #[test]
    fn test_window_valid_with_missing_bounds() {
        let now = Utc::now();
        assert!(school(None, Some(now)).validate_window().is_ok());
        assert!(school(Some(now), None).validate_window().is_ok());
        assert!(school(None, None).validate_window().is_ok());
    }

    #[test]
    fn test_window_invalid_when_end_before_start() {
        let now = Utc::now();
        let result = school(Some(now), Some(now - Duration::days(1))).validate_window();
        assert!(matches!(result, Err(WindowError::EndsBeforeStart { .. })));
    }
}
