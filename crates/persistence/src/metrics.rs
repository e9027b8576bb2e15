//! Database metrics collection.

use metrics::{counter, histogram};
use std::time::Instant;

/// Record database query duration.
pub fn record_query_duration(query_name: &str, duration_secs: f64) {
    histogram!(
        "database_query_duration_seconds",
        "query" => query_name.to_string()
    )
    .record(duration_secs);
}

/// Record an insert that lost the dedup race.
pub fn record_dedup_conflict() {
    counter!("notification_dedup_conflicts_total").increment(1);
}

/// Times a query and records the duration when dropped.
///
/// ```ignore
/// let _timer = QueryTimer::new("count_unread_notifications");
/// sqlx::query_scalar::<_, i64>(...).fetch_one(&pool).await
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }
}

impl Drop for QueryTimer {
    fn drop(&mut self) {
        record_query_duration(self.query_name, self.start.elapsed().as_secs_f64());
    }
}
