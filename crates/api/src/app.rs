use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use domain::services::{ExpiryScanner, NotificationReadService};
use domain::store::{NotificationStore, TenantStore};
use shared::jwt::JwtConfig;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::metrics::{record_scan, record_scan_error};
use crate::middleware::{
    metrics_handler, metrics_middleware, security_headers_middleware, trace_id,
};
use crate::routes::{health, notifications, subscriptions};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    pub tenants: Arc<dyn TenantStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub scanner: ExpiryScanner,
    pub reads: NotificationReadService,
    /// Set when the stores are backed by PostgreSQL; used by health checks.
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(
        config: Config,
        jwt: JwtConfig,
        tenants: Arc<dyn TenantStore>,
        notifications: Arc<dyn NotificationStore>,
    ) -> Self {
        let mut scanner = ExpiryScanner::new(tenants.clone(), notifications.clone());
        // Out-of-range offsets are rejected by config validation; keep UTC otherwise.
        if let Some(offset) = config.notifications.reference_offset() {
            scanner = scanner.with_reference_offset(offset);
        }

        Self {
            config: Arc::new(config),
            jwt: Arc::new(jwt),
            reads: NotificationReadService::new(notifications.clone()),
            tenants,
            notifications,
            scanner,
            pool: None,
        }
    }

    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Scan ahead of a notification read. Failures are logged and swallowed.
    pub async fn scan_before_read(&self) {
        if !self.config.notifications.scan_on_read {
            return;
        }

        match self.scanner.scan().await {
            Ok(report) => record_scan("read", &report),
            Err(e) => {
                record_scan_error("read");
                tracing::warn!(error = %e, "Read-triggered subscription scan failed");
            }
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Authenticated routes; handlers take an `AuthPrincipal`.
    let api_routes = Router::new()
        .route(
            "/api/v1/notifications",
            get(notifications::list_notifications).post(notifications::mark_all_read),
        )
        .route(
            "/api/v1/notifications/count",
            get(notifications::count_unread),
        )
        .route(
            "/api/v1/notifications/:id",
            patch(notifications::mark_read).delete(notifications::delete_notification),
        )
        .route(
            "/api/v1/subscriptions/check",
            post(subscriptions::check_subscriptions),
        )
        .route(
            "/api/v1/schools/:id/subscription",
            get(subscriptions::get_school_subscription),
        );

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(middleware::from_fn_with_state(
            config.security.hsts_enabled,
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
