//! Subscription threshold policy.
//!
//! Maps the time left on a subscription to at most one notification kind.
//! Only exact day counts fire: 5, 2 and 1 days left, or expired. A school
//! with 3, 4 or 6+ days left gets nothing that day.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{NotificationKind, School, SubscriptionStatus};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// A threshold the subscription currently sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threshold {
    pub kind: NotificationKind,
    /// Days left, clamped to 0 once expired.
    pub days_left: i64,
}

/// Whole days until `end`, rounded up. Zero or negative once it has passed.
pub fn days_left(now: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let millis = (end - now).num_milliseconds();
    let whole = millis.div_euclid(MILLIS_PER_DAY);
    if millis.rem_euclid(MILLIS_PER_DAY) > 0 {
        whole + 1
    } else {
        whole
    }
}

/// Classify a subscription end date against `now`.
pub fn classify(now: DateTime<Utc>, subscription_end: Option<DateTime<Utc>>) -> Option<Threshold> {
    let days = days_left(now, subscription_end?);

    let kind = match days {
        d if d <= 0 => NotificationKind::Expired,
        1 => NotificationKind::OneDay,
        2 => NotificationKind::TwoDays,
        5 => NotificationKind::FiveDays,
        _ => return None,
    };

    Some(Threshold {
        kind,
        days_left: days.max(0),
    })
}

/// Snapshot of a school's subscription state at `now`.
pub fn subscription_status(school: &School, now: DateTime<Utc>) -> SubscriptionStatus {
    SubscriptionStatus {
        school_id: school.id,
        name: school.name.clone(),
        account_state: school.account_state,
        subscription_start: school.subscription_start,
        subscription_end: school.subscription_end,
        days_left: school.subscription_end.map(|end| days_left(now, end).max(0)),
        threshold: classify(now, school.subscription_end).map(|t| t.kind),
        checked_at: now,
    }
}
