//! Periodic subscription expiry scan.

use domain::services::ExpiryScanner;
use std::time::Duration;
use tracing::info;

use super::scheduler::Job;
use crate::middleware::metrics::{record_scan, record_scan_error};

/// Runs [`ExpiryScanner::scan`] on a fixed interval.
pub struct SubscriptionExpiryJob {
    scanner: ExpiryScanner,
    interval: Duration,
}

impl SubscriptionExpiryJob {
    pub fn new(scanner: ExpiryScanner, interval_minutes: u64) -> Self {
        Self {
            scanner,
            interval: Duration::from_secs(interval_minutes.max(1).saturating_mul(60)),
        }
    }
}

#[async_trait::async_trait]
impl Job for SubscriptionExpiryJob {
    fn name(&self) -> &'static str {
        "subscription_expiry"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self) -> Result<(), String> {
        match self.scanner.scan().await {
            Ok(report) => {
                record_scan("periodic", &report);
                info!(
                    schools_scanned = report.schools_scanned,
                    notifications_created = report.notifications_created,
                    duplicates_skipped = report.duplicates_skipped,
                    failures = report.failures,
                    "Periodic subscription scan finished"
                );
                Ok(())
            }
            Err(e) => {
                record_scan_error("periodic");
                Err(e.to_string())
            }
        }
    }
}
