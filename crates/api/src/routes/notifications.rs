//! Notification endpoint handlers.
//!
//! List and count run a read-triggered expiry scan first (when enabled) so
//! callers see alerts that became due since the last periodic run. Callers
//! without a notification scope are refused before any scan runs.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::{NotificationRecord, ReadFilter};
use domain::services::NotificationReadService;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthPrincipal;

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub filter: Option<String>,
}

impl ListNotificationsQuery {
    fn read_filter(&self) -> Result<ReadFilter, ApiError> {
        match self.filter.as_deref() {
            None | Some("") => Ok(ReadFilter::All),
            Some(raw) => raw.parse().map_err(ApiError::Validation),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListNotificationsResponse {
    pub notifications: Vec<NotificationRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub notification: NotificationRecord,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

/// Unread notification count.
///
/// GET /api/v1/notifications/count
pub async fn count_unread(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<CountResponse>, ApiError> {
    NotificationReadService::visibility(&principal)?;
    state.scan_before_read().await;
    let count = state.reads.count_unread(&principal).await?;
    Ok(Json(CountResponse { count }))
}

/// Notifications visible to the caller, newest first.
///
/// GET /api/v1/notifications?filter=all|unread|read
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<ListNotificationsResponse>, ApiError> {
    let filter = query.read_filter()?;
    NotificationReadService::visibility(&principal)?;
    state.scan_before_read().await;
    let notifications = state.reads.list(&principal, filter).await?;
    Ok(Json(ListNotificationsResponse { notifications }))
}

/// Mark one notification read.
///
/// PATCH /api/v1/notifications/:id
pub async fn mark_read(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<i64>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let notification = state.reads.mark_read(&principal, id).await?;
    Ok(Json(NotificationResponse { notification }))
}

/// Mark every visible notification read.
///
/// POST /api/v1/notifications
pub async fn mark_all_read(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<MarkAllReadResponse>, ApiError> {
    let updated = state.reads.mark_all_read(&principal).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

/// Permanently delete a notification.
///
/// DELETE /api/v1/notifications/:id
pub async fn delete_notification(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.reads.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
