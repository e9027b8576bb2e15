//! Domain models for School Manager.

pub mod notification;
pub mod principal;
pub mod school;

pub use notification::{
    DedupKey, NewNotification, NotificationKind, NotificationRecord, ReadFilter, Severity,
};
pub use principal::{Principal, Role, Visibility};
pub use school::{AccountState, School, SubscriptionStatus, WindowError};
