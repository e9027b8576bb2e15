//! Domain layer for the School Manager backend.
//!
//! This crate contains:
//! - Domain models (School, NotificationRecord, Principal)
//! - The subscription threshold policy and expiry scanner
//! - The notification read service
//! - Store traits and in-memory store implementations

pub mod models;
pub mod services;
pub mod store;
