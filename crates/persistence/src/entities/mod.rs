//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod notification;
pub mod school;

pub use notification::{NotificationEntity, NotificationKindDb};
pub use school::{AccountStateDb, SchoolEntity};
