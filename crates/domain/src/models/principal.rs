//! Authenticated caller context and visibility rules.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::notification::NotificationRecord;

/// Operator role carried by the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform operator, sees every school.
    SuperAdmin,
    /// Operator of a single school.
    SchoolAdmin,
    Teacher,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "super_admin" => Ok(Role::SuperAdmin),
            "school_admin" => Ok(Role::SchoolAdmin),
            "teacher" => Ok(Role::Teacher),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::SuperAdmin => write!(f, "super_admin"),
            Role::SchoolAdmin => write!(f, "school_admin"),
            Role::Teacher => write!(f, "teacher"),
        }
    }
}

/// Resolved caller, produced by the auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
    pub school_id: Option<Uuid>,
}

impl Principal {
    pub fn super_admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::SuperAdmin,
            school_id: None,
        }
    }

    pub fn school_admin(user_id: Uuid, school_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::SchoolAdmin,
            school_id: Some(school_id),
        }
    }

    pub fn teacher(user_id: Uuid, school_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::Teacher,
            school_id: Some(school_id),
        }
    }

    /// Which notifications this principal may see. `None` means access denied.
    pub fn visibility(&self) -> Option<Visibility> {
        match (self.role, self.school_id) {
            (Role::SuperAdmin, _) => Some(Visibility::All),
            (Role::SchoolAdmin, Some(school_id)) => Some(Visibility::School {
                school_id,
                user_id: self.user_id,
            }),
            (Role::SchoolAdmin, None) => None,
            (Role::Teacher, _) => Some(Visibility::User(self.user_id)),
        }
    }

    /// Administrators may force a scan.
    pub fn can_trigger_scan(&self) -> bool {
        match self.role {
            Role::SuperAdmin => true,
            Role::SchoolAdmin => self.school_id.is_some(),
            Role::Teacher => false,
        }
    }

    /// Whether the subscription details of `school_id` are visible.
    pub fn can_view_school(&self, school_id: Uuid) -> bool {
        match self.role {
            Role::SuperAdmin => true,
            Role::SchoolAdmin => self.school_id == Some(school_id),
            Role::Teacher => false,
        }
    }
}

/// Notification scope of a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Every notification on the platform.
    All,
    /// Notifications of one school plus those addressed to the user.
    School { school_id: Uuid, user_id: Uuid },
    /// Only notifications addressed to the user.
    User(Uuid),
}

impl Visibility {
    pub fn can_see(&self, record: &NotificationRecord) -> bool {
        match self {
            Visibility::All => true,
            Visibility::School { school_id, user_id } => {
                record.school_id == Some(*school_id) || record.user_id == Some(*user_id)
            }
            Visibility::User(user_id) => record.user_id == Some(*user_id),
        }
    }
}
