use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

use crate::auth::session::SessionStore;
use crate::auth::{ROLE_ADMIN, ROLE_STAFF};

/// Session claims extracted from the Authorization: Bearer header.
/// Implements axum's FromRequestParts for use as an extractor.
#[derive(Debug, Clone)]
pub struct Claims {
    pub account_id: i64,
    pub name: String,
    pub email: String,
    pub role: i32,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Extract Bearer token from Authorization header
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(StatusCode::UNAUTHORIZED)?;

        // Get the session store from request extensions (set by middleware layer)
        let sessions = parts
            .extensions
            .get::<Sessions>()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

        let claims = sessions
            .0
            .claims_for(token)
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(Claims {
            account_id: claims.account_id,
            name: claims.name,
            email: claims.email,
            role: claims.role,
        })
    }
}

/// Session store handle stored in request extensions for the Claims extractor
#[derive(Clone)]
pub struct Sessions(pub Arc<SessionStore>);

/// Require the caller to be an admin; 403 otherwise.
pub fn require_admin(claims: &Claims) -> Result<(), (StatusCode, String)> {
    if claims.role == ROLE_ADMIN {
        Ok(())
    } else {
        Err((StatusCode::FORBIDDEN, "Admin role required".to_string()))
    }
}

/// Require the caller to be admin or staff; 403 otherwise.
pub fn require_staff(claims: &Claims) -> Result<(), (StatusCode, String)> {
    if claims.role == ROLE_ADMIN || claims.role == ROLE_STAFF {
        Ok(())
    } else {
        Err((StatusCode::FORBIDDEN, "Staff role required".to_string()))
    }
}
