//! Domain services for School Manager.
//!
//! Services contain the subscription expiry logic and operate on the store
//! traits rather than on a concrete database.

pub mod expiry_scanner;
pub mod notification_reads;
pub mod threshold;

pub use expiry_scanner::{render_message, ExpiryScanner, ScanError, ScanReport};
pub use notification_reads::{NotificationReadService, ReadError};
pub use threshold::{classify, days_left, subscription_status, Threshold};
