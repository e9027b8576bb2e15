//! Repository implementations for database operations.

pub mod notification;
pub mod school;

pub use notification::NotificationRepository;
pub use school::SchoolRepository;
