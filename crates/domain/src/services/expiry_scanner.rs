//! Subscription expiry scanner.
//!
//! One scan walks every school with a subscription end date, classifies it
//! and emits the day's notification unless one already exists. Scans hold no
//! state and may run concurrently: the notification store's atomic insert is
//! what keeps the one-per-(school, kind, day) guarantee.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::threshold::{classify, Threshold};
use crate::models::{DedupKey, NewNotification, NotificationRecord, School, WindowError};
use crate::store::{NotificationStore, StoreError, TenantStore};

/// Scan-level failure. Per-school problems never end up here.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to list schools: {0}")]
    ListSchools(#[from] StoreError),
}

/// Failure while processing one school.
#[derive(Debug, Error)]
enum SchoolScanError {
    #[error(transparent)]
    InvalidWindow(#[from] WindowError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Counts from a single scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScanReport {
    pub schools_scanned: usize,
    pub notifications_created: usize,
    pub duplicates_skipped: usize,
    pub failures: usize,
}

#[derive(Debug)]
enum SchoolOutcome {
    NotDue,
    Created(NotificationRecord),
    AlreadyEmitted,
}

/// Scans schools and emits subscription notifications.
#[derive(Clone)]
pub struct ExpiryScanner {
    tenants: Arc<dyn TenantStore>,
    notifications: Arc<dyn NotificationStore>,
    reference_offset: FixedOffset,
}

impl ExpiryScanner {
    /// Create a scanner whose calendar days are UTC days.
    pub fn new(tenants: Arc<dyn TenantStore>, notifications: Arc<dyn NotificationStore>) -> Self {
        Self {
            tenants,
            notifications,
            reference_offset: Utc.fix(),
        }
    }

    /// Use `offset` as the deployment's reference timezone for dedup days.
    pub fn with_reference_offset(mut self, offset: FixedOffset) -> Self {
        self.reference_offset = offset;
        self
    }

    pub fn reference_offset(&self) -> FixedOffset {
        self.reference_offset
    }

    /// Calendar day of `at` in the reference timezone.
    pub fn reference_day(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.reference_offset).date_naive()
    }

    /// Run a scan at the current time.
    pub async fn scan(&self) -> Result<ScanReport, ScanError> {
        self.scan_at(Utc::now()).await
    }

    /// Run a scan as if the current time were `now`.
    pub async fn scan_at(&self, now: DateTime<Utc>) -> Result<ScanReport, ScanError> {
        let schools = self.tenants.list_with_subscription_end().await?;
        let day = self.reference_day(now);
        let mut report = ScanReport::default();

        for school in &schools {
            report.schools_scanned += 1;

            match self.process_school(school, now, day).await {
                Ok(SchoolOutcome::NotDue) => {}
                Ok(SchoolOutcome::Created(record)) => {
                    report.notifications_created += 1;
                    info!(
                        school_id = %school.id,
                        notification_id = record.id,
                        kind = %record.kind,
                        severity = ?record.kind.severity(),
                        days_left = record.days_left,
                        "Subscription notification created"
                    );
                }
                Ok(SchoolOutcome::AlreadyEmitted) => {
                    report.duplicates_skipped += 1;
                }
                Err(e) => {
                    report.failures += 1;
                    warn!(school_id = %school.id, error = %e, "Skipping school in expiry scan");
                }
            }
        }

        info!(
            schools = report.schools_scanned,
            created = report.notifications_created,
            duplicates = report.duplicates_skipped,
            failures = report.failures,
            day = %day,
            "Subscription expiry scan finished"
        );

        Ok(report)
    }

    async fn process_school(
        &self,
        school: &School,
        now: DateTime<Utc>,
        day: NaiveDate,
    ) -> Result<SchoolOutcome, SchoolScanError> {
        school.validate_window()?;

        let Some(threshold) = classify(now, school.subscription_end) else {
            return Ok(SchoolOutcome::NotDue);
        };

        let key = DedupKey {
            school_id: school.id,
            kind: threshold.kind,
            day,
        };

        // Fast path only; the insert below is the authoritative check.
        if self.notifications.exists(&key).await? {
            debug!(school_id = %school.id, kind = %threshold.kind, "Notification already emitted today");
            return Ok(SchoolOutcome::AlreadyEmitted);
        }

        let notification = build_notification(school.id, &school.name, threshold, now, day);

        match self.notifications.insert_if_absent(notification).await? {
            Some(record) => Ok(SchoolOutcome::Created(record)),
            None => {
                debug!(school_id = %school.id, kind = %threshold.kind, "Lost insert race to a concurrent scan");
                Ok(SchoolOutcome::AlreadyEmitted)
            }
        }
    }
}

fn build_notification(
    school_id: Uuid,
    school_name: &str,
    threshold: Threshold,
    now: DateTime<Utc>,
    day: NaiveDate,
) -> NewNotification {
    NewNotification {
        school_id: Some(school_id),
        user_id: None,
        kind: threshold.kind,
        message: render_message(school_name, threshold),
        days_left: threshold.days_left as i32,
        created_at: now,
        created_day: day,
    }
}

/// Human-readable notification text.
pub fn render_message(school_name: &str, threshold: Threshold) -> String {
    if threshold.kind.is_expired() {
        return format!(
            "{} subscription has expired. Please renew to keep access.",
            school_name
        );
    }

    let unit = if threshold.days_left == 1 { "day" } else { "days" };
    format!(
        "{} subscription expires in {} {}.",
        school_name, threshold.days_left, unit
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountState, NotificationKind, ReadFilter, Visibility};
    use crate::store::{InMemoryNotificationStore, InMemoryTenantStore};
    use chrono::{Duration, TimeZone};
    use fake::faker::company::en::CompanyName;
    use fake::Fake;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 20, 8, 0, 0).unwrap()
    }

    fn school_ending_in(offset: Duration) -> School {
        School {
            id: Uuid::new_v4(),
            name: CompanyName().fake(),
            subscription_start: Some(now() - Duration::days(365)),
            subscription_end: Some(now() + offset),
            account_state: AccountState::Active,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn scanner_for(
        schools: Vec<School>,
    ) -> (ExpiryScanner, Arc<InMemoryNotificationStore>) {
        let tenants = Arc::new(InMemoryTenantStore::with_schools(schools));
        let notifications = Arc::new(InMemoryNotificationStore::new());
        let scanner = ExpiryScanner::new(tenants, notifications.clone());
        (scanner, notifications)
    }

    async fn all_records(store: &InMemoryNotificationStore) -> Vec<NotificationRecord> {
        store.list(&Visibility::All, ReadFilter::All).await.unwrap()
    }

    #[tokio::test]
    async fn test_one_day_left_creates_one_day_notification() {
        let school = school_ending_in(Duration::days(1));
        let (scanner, store) = scanner_for(vec![school.clone()]);

        let report = scanner.scan_at(now()).await.unwrap();

        assert_eq!(report.schools_scanned, 1);
        assert_eq!(report.notifications_created, 1);
        let records = all_records(&store).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, NotificationKind::OneDay);
        assert_eq!(records[0].days_left, 1);
        assert_eq!(records[0].school_id, Some(school.id));
        assert!(records[0].message.contains(&school.name));
        assert!(!records[0].is_read);
    }

    #[tokio::test]
    async fn test_rescan_same_day_is_idempotent() {
        let school = school_ending_in(Duration::days(1));
        let (scanner, store) = scanner_for(vec![school]);

        scanner.scan_at(now()).await.unwrap();
        let report = scanner
            .scan_at(now() + Duration::seconds(10))
            .await
            .unwrap();

        assert_eq!(report.notifications_created, 0);
        assert_eq!(report.duplicates_skipped, 1);
        assert_eq!(all_records(&store).await.len(), 1);
    }

    #[tokio::test]
    async fn test_many_scans_in_a_day_emit_once() {
        let school = school_ending_in(Duration::days(5));
        let (scanner, store) = scanner_for(vec![school]);

        for minutes in 0..10 {
            scanner
                .scan_at(now() + Duration::minutes(minutes * 5))
                .await
                .unwrap();
        }

        let records = all_records(&store).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, NotificationKind::FiveDays);
    }

    #[tokio::test]
    async fn test_expired_subscription_has_zero_days_left() {
        let school = school_ending_in(Duration::days(-3));
        let (scanner, store) = scanner_for(vec![school]);

        scanner.scan_at(now()).await.unwrap();

        let records = all_records(&store).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, NotificationKind::Expired);
        assert_eq!(records[0].days_left, 0);
        assert!(records[0].message.contains("has expired"));
    }

    #[tokio::test]
    async fn test_four_days_left_emits_nothing() {
        let (scanner, store) = scanner_for(vec![school_ending_in(Duration::days(4))]);

        let report = scanner.scan_at(now()).await.unwrap();

        assert_eq!(report.schools_scanned, 1);
        assert_eq!(report.notifications_created, 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_school_notified_again_next_day() {
        let school = school_ending_in(Duration::days(-1));
        let (scanner, store) = scanner_for(vec![school]);

        scanner.scan_at(now()).await.unwrap();
        scanner.scan_at(now() + Duration::days(1)).await.unwrap();

        let records = all_records(&store).await;
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.kind == NotificationKind::Expired));
    }

    #[tokio::test]
    async fn test_invalid_window_does_not_block_other_schools() {
        let mut broken = school_ending_in(Duration::days(1));
        broken.subscription_start = Some(now() + Duration::days(10));
        let healthy = school_ending_in(Duration::days(2));
        let (scanner, store) = scanner_for(vec![broken, healthy.clone()]);

        let report = scanner.scan_at(now()).await.unwrap();

        assert_eq!(report.failures, 1);
        assert_eq!(report.notifications_created, 1);
        let records = all_records(&store).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].school_id, Some(healthy.id));
        assert_eq!(records[0].kind, NotificationKind::TwoDays);
    }

    #[tokio::test]
    async fn test_store_failure_for_one_school_is_isolated() {
        let failing = school_ending_in(Duration::days(1));
        let healthy = school_ending_in(Duration::days(-2));
        let tenants = Arc::new(InMemoryTenantStore::with_schools([
            failing.clone(),
            healthy.clone(),
        ]));
        let store = Arc::new(InMemoryNotificationStore::new());
        store.reject_inserts_for(failing.id).await;
        let scanner = ExpiryScanner::new(tenants, store.clone());

        let report = scanner.scan_at(now()).await.unwrap();

        assert_eq!(report.failures, 1);
        assert_eq!(report.notifications_created, 1);
        let records = all_records(&store).await;
        assert_eq!(records[0].school_id, Some(healthy.id));
    }

    #[tokio::test]
    async fn test_listing_failure_fails_the_scan() {
        let tenants = Arc::new(InMemoryTenantStore::new());
        tenants.set_unavailable(true).await;
        let scanner = ExpiryScanner::new(tenants, Arc::new(InMemoryNotificationStore::new()));

        assert!(matches!(
            scanner.scan_at(now()).await,
            Err(ScanError::ListSchools(StoreError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_scans_emit_exactly_once() {
        let school = school_ending_in(Duration::days(2));
        let (scanner, store) = scanner_for(vec![school]);

        let handles: Vec<_> = (0..12)
            .map(|i| {
                let scanner = scanner.clone();
                tokio::spawn(async move {
                    scanner
                        .scan_at(now() + Duration::milliseconds(i))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut created = 0;
        let mut duplicates = 0;
        for handle in handles {
            let report = handle.await.unwrap();
            created += report.notifications_created;
            duplicates += report.duplicates_skipped;
        }

        assert_eq!(created, 1);
        assert_eq!(duplicates, 11);
        assert_eq!(all_records(&store).await.len(), 1);
    }

    #[tokio::test]
    async fn test_deleted_notification_is_not_recreated_same_day() {
        let school = school_ending_in(Duration::days(1));
        let (scanner, store) = scanner_for(vec![school]);

        scanner.scan_at(now()).await.unwrap();
        let record = all_records(&store).await.remove(0);
        store.delete(record.id).await.unwrap();

        let report = scanner.scan_at(now() + Duration::hours(1)).await.unwrap();
        assert_eq!(report.notifications_created, 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_reference_offset_moves_day_boundary() {
        // 23:30 UTC is already the next day at UTC+02:00.
        let late = Utc.with_ymd_and_hms(2026, 5, 20, 23, 30, 0).unwrap();
        let (scanner, _) = scanner_for(vec![]);
        let scanner = scanner.with_reference_offset(FixedOffset::east_opt(2 * 3600).unwrap());

        assert_eq!(
            scanner.reference_day(late),
            NaiveDate::from_ymd_opt(2026, 5, 21).unwrap()
        );
    }

    #[test]
    fn test_render_message() {
        let threshold = Threshold {
            kind: NotificationKind::OneDay,
            days_left: 1,
        };
        assert_eq!(
            render_message("Oak School", threshold),
            "Oak School subscription expires in 1 day."
        );

        let threshold = Threshold {
            kind: NotificationKind::FiveDays,
            days_left: 5,
        };
        assert_eq!(
            render_message("Oak School", threshold),
            "Oak School subscription expires in 5 days."
        );

        let threshold = Threshold {
            kind: NotificationKind::Expired,
            days_left: 0,
        };
        assert!(render_message("Oak School", threshold).contains("has expired"));
    }
}
