//! Subscription endpoint handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use domain::models::SubscriptionStatus;
use domain::services::{subscription_status, ScanReport};
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthPrincipal;
use crate::middleware::metrics::{record_scan, record_scan_error};

/// Run an expiry scan now.
///
/// POST /api/v1/subscriptions/check
pub async fn check_subscriptions(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<ScanReport>, ApiError> {
    if !principal.can_trigger_scan() {
        return Err(ApiError::Forbidden(
            "Only administrators can run a subscription check".to_string(),
        ));
    }

    let report = match state.scanner.scan().await {
        Ok(report) => report,
        Err(e) => {
            record_scan_error("explicit");
            return Err(e.into());
        }
    };
    record_scan("explicit", &report);

    info!(
        user_id = %principal.user_id,
        schools_scanned = report.schools_scanned,
        notifications_created = report.notifications_created,
        failures = report.failures,
        "Subscription check requested"
    );

    Ok(Json(report))
}

/// Subscription window and computed status of one school.
///
/// GET /api/v1/schools/:id/subscription
pub async fn get_school_subscription(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(school_id): Path<Uuid>,
) -> Result<Json<SubscriptionStatus>, ApiError> {
    if !principal.can_view_school(school_id) {
        return Err(ApiError::Forbidden(
            "Not allowed to view this school's subscription".to_string(),
        ));
    }

    let school = state
        .tenants
        .find_by_id(school_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("School not found".to_string()))?;

    Ok(Json(subscription_status(&school, Utc::now())))
}
