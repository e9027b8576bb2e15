//! School entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::AccountState;
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for account_state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "account_state", rename_all = "UPPERCASE")]
pub enum AccountStateDb {
    Pending,
    Active,
    Suspended,
    Inactive,
}

impl From<AccountStateDb> for AccountState {
    fn from(db: AccountStateDb) -> Self {
        match db {
            AccountStateDb::Pending => Self::Pending,
            AccountStateDb::Active => Self::Active,
            AccountStateDb::Suspended => Self::Suspended,
            AccountStateDb::Inactive => Self::Inactive,
        }
    }
}

impl From<AccountState> for AccountStateDb {
    fn from(state: AccountState) -> Self {
        match state {
            AccountState::Pending => Self::Pending,
            AccountState::Active => Self::Active,
            AccountState::Suspended => Self::Suspended,
            AccountState::Inactive => Self::Inactive,
        }
    }
}

/// Database row mapping for the schools table.
#[derive(Debug, Clone, FromRow)]
pub struct SchoolEntity {
    pub id: Uuid,
    pub name: String,
    pub subscription_start: Option<DateTime<Utc>>,
    pub subscription_end: Option<DateTime<Utc>>,
    pub account_state: AccountStateDb,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SchoolEntity> for domain::models::School {
    fn from(entity: SchoolEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            subscription_start: entity.subscription_start,
            subscription_end: entity.subscription_end,
            account_state: entity.account_state.into(),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_state_conversion() {
        assert_eq!(AccountState::from(AccountStateDb::Active), AccountState::Active);
        assert_eq!(
            AccountState::from(AccountStateDb::Suspended),
            AccountState::Suspended
        );
        assert_eq!(
            AccountStateDb::from(AccountState::Inactive),
            AccountStateDb::Inactive
        );
        assert_eq!(AccountStateDb::from(AccountState::Pending), AccountStateDb::Pending);
    }

    #[test]
    fn test_entity_into_domain() {
        let now = Utc::now();
        let entity = SchoolEntity {
            id: Uuid::new_v4(),
            name: "Maple Grove".to_string(),
            subscription_start: Some(now),
            subscription_end: None,
            account_state: AccountStateDb::Pending,
            created_at: now,
            updated_at: now,
        };
        let school: domain::models::School = entity.clone().into();
        assert_eq!(school.id, entity.id);
        assert_eq!(school.account_state, AccountState::Pending);
        assert!(school.subscription_end.is_none());
    }
}
