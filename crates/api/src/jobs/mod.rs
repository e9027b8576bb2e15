//! Background job runner and job implementations.

mod scheduler;
mod subscription_expiry;

pub use scheduler::{Job, JobScheduler};
pub use subscription_expiry::SubscriptionExpiryJob;
