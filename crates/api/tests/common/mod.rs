//! Common test utilities for integration tests.
//!
//! The router is built over in-memory stores, so these tests need no
//! database. Tokens are HS256-signed with the test secret.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use domain::models::{AccountState, NewNotification, NotificationKind, NotificationRecord, Principal, School};
use domain::store::{InMemoryNotificationStore, InMemoryTenantStore, NotificationStore};
use fake::{faker::company::en::CompanyName, Fake};
use school_manager_api::{
    app::{create_app, AppState},
    config::Config,
};
use shared::jwt::JwtConfig;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

/// Router plus handles on its backing stores.
pub struct TestContext {
    pub app: Router,
    pub tenants: Arc<InMemoryTenantStore>,
    pub notifications: Arc<InMemoryNotificationStore>,
    pub jwt: JwtConfig,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_overrides(&[])
    }

    /// Build with `Config::load_for_test` overrides (e.g. disabling scan on read).
    pub fn with_overrides(overrides: &[(&str, &str)]) -> Self {
        let config = Config::load_for_test(overrides).expect("Failed to load test config");
        let jwt = config.jwt.build().expect("Failed to build JWT config");
        let tenants = Arc::new(InMemoryTenantStore::new());
        let notifications = Arc::new(InMemoryNotificationStore::new());

        let state = AppState::new(config, jwt.clone(), tenants.clone(), notifications.clone());

        Self {
            app: create_app(state),
            tenants,
            notifications,
            jwt,
        }
    }

    pub fn token(&self, principal: &Principal) -> String {
        self.jwt
            .generate_access_token(principal.user_id, &principal.role.to_string(), principal.school_id)
            .expect("Failed to generate token")
            .0
    }

    /// Add a school whose subscription ends `remaining` from now.
    ///
    /// A minute of slack keeps the whole-day count stable while the test runs.
    pub async fn add_school(&self, remaining: Option<Duration>) -> School {
        let now = Utc::now();
        let school = School {
            id: Uuid::new_v4(),
            name: CompanyName().fake(),
            subscription_start: Some(now - Duration::days(365)),
            subscription_end: remaining.map(|d| now + d - Duration::minutes(1)),
            account_state: AccountState::Active,
            created_at: now,
            updated_at: now,
        };
        self.tenants.upsert(school.clone()).await;
        school
    }

    /// Insert a notification directly, bypassing the scanner.
    pub async fn seed_notification(
        &self,
        school_id: Option<Uuid>,
        user_id: Option<Uuid>,
        kind: NotificationKind,
    ) -> NotificationRecord {
        let now = Utc::now();
        self.notifications
            .insert_if_absent(NewNotification {
                school_id,
                user_id,
                kind,
                message: format!("{} notice", kind),
                days_left: 0,
                created_at: now,
                created_day: now.date_naive(),
            })
            .await
            .expect("Failed to seed notification")
            .expect("Seeded notification was deduplicated")
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }
}

/// Build a request with a bearer token and no body.
pub fn request_with_auth(method: Method, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

/// Build a GET request with authentication.
pub fn get_request_with_auth(uri: &str, token: &str) -> Request<Body> {
    request_with_auth(Method::GET, uri, token)
}

/// Build an unauthenticated GET request.
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Helper to parse JSON response body.
pub async fn parse_response_body(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}
