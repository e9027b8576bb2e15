//! Bearer token authentication extractor.
//!
//! Validates the JWT in the `Authorization` header and turns its claims into
//! a domain [`Principal`].

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use domain::models::{Principal, Role};
use shared::jwt::{extract_school_id, extract_user_id, Claims, JwtError};

use crate::app::AppState;
use crate::error::ApiError;

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthPrincipal(pub Principal);

impl AuthPrincipal {
    pub fn from_claims(claims: &Claims) -> Result<Self, ApiError> {
        let user_id = extract_user_id(claims)
            .map_err(|_| ApiError::Unauthorized("Invalid subject claim".to_string()))?;
        let school_id = extract_school_id(claims)
            .map_err(|_| ApiError::Unauthorized("Invalid school_id claim".to_string()))?;
        let role: Role = claims
            .role
            .parse()
            .map_err(|_| ApiError::Unauthorized(format!("Unknown role: {}", claims.role)))?;

        Ok(Self(Principal {
            user_id,
            role,
            school_id,
        }))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<AuthPrincipal>() {
            return Ok(principal.clone());
        }

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::Unauthorized("Missing or malformed Authorization header".to_string())
                })?;

        let claims = state.jwt.validate_token(bearer.token()).map_err(|e| match e {
            JwtError::TokenExpired => ApiError::Unauthorized("Token has expired".to_string()),
            _ => ApiError::Unauthorized("Invalid token".to_string()),
        })?;

        let principal = Self::from_claims(&claims)?;
        tracing::debug!(
            user_id = %principal.0.user_id,
            role = %principal.0.role,
            "Authenticated request"
        );
        parts.extensions.insert(principal.clone());
        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn claims(role: &str, school_id: Option<String>) -> Claims {
        Claims {
            sub: Uuid::new_v4().to_string(),
            role: role.to_string(),
            school_id,
            exp: 0,
            iat: 0,
            jti: Uuid::new_v4().to_string(),
        }
    }

    #[test]
    fn test_from_claims_school_admin() {
        let school_id = Uuid::new_v4();
        let principal =
            AuthPrincipal::from_claims(&claims("school_admin", Some(school_id.to_string())))
                .unwrap()
                .0;
        assert_eq!(principal.role, Role::SchoolAdmin);
        assert_eq!(principal.school_id, Some(school_id));
    }

    #[test]
    fn test_from_claims_super_admin_without_school() {
        let principal = AuthPrincipal::from_claims(&claims("super_admin", None))
            .unwrap()
            .0;
        assert_eq!(principal.role, Role::SuperAdmin);
        assert!(principal.school_id.is_none());
    }

    #[test]
    fn test_from_claims_rejects_unknown_role() {
        assert!(matches!(
            AuthPrincipal::from_claims(&claims("janitor", None)),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_from_claims_rejects_bad_school_id() {
        assert!(matches!(
            AuthPrincipal::from_claims(&claims("teacher", Some("not-a-uuid".to_string()))),
            Err(ApiError::Unauthorized(_))
        ));
    }
}
