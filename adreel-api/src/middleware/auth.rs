use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

const ADMIN_ROLES: [&str; 2] = ["ADMIN", "SUPER_ADMIN"];

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminClaims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

impl AdminClaims {
    pub fn new(sub: impl Into<String>, role: impl Into<String>, ttl: Duration) -> Self {
        Self {
            sub: sub.into(),
            role: role.into(),
            exp: usize::try_from((Utc::now() + ttl).timestamp()).unwrap_or_default(),
        }
    }

    pub fn is_admin(&self) -> bool {
        ADMIN_ROLES.contains(&self.role.as_str())
    }
}

/// Signs claims with the shared HS256 secret.
pub fn issue_token(claims: &AdminClaims, secret: &str) -> Result<String, AppError> {
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

// ============================================================================
// Admin Authentication Middleware
// ============================================================================

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))?;

    let token_data = decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::AuthenticationError(format!("Invalid token: {}", e)))?;

    if !token_data.claims.is_admin() {
        return Err(AppError::AuthorizationError(format!(
            "Role {} may not manage advertisements",
            token_data.claims.role
        )));
    }

    tracing::debug!("Admin request from {}", token_data.claims.sub);
    req.extensions_mut().insert(token_data.claims);

    Ok(next.run(req).await)
}
