//! JWT auth for the task API.
//!
//! - `POST /auth/register` creates an account and returns a token
//! - `POST /auth/login` verifies credentials and returns a token
//! - All `/tasks` endpoints require `Authorization: Bearer <jwt>`
//!
//! The verified identity is carried as an [`AuthUser`] request extension, so
//! every handler receives it explicitly rather than reading ambient state.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use super::routes::AppState;
use super::types::{AuthResponse, LoginRequest, RegisterRequest};
use crate::users::{User, UserError};

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Claims {
    /// Subject: the user id.
    sub: Uuid,
    /// Email (for display/auditing).
    #[serde(default)]
    eml: String,
    /// Issued-at unix seconds
    iat: i64,
    /// Expiration unix seconds
    exp: i64,
}

/// The verified identity attached to each authenticated request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

fn issue_jwt(secret: &str, ttl_days: i64, user: &User) -> anyhow::Result<(String, i64)> {
    let now = Utc::now();
    let exp = now + Duration::days(ttl_days.max(1));
    let claims = Claims {
        sub: user.id,
        eml: user.email.clone(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };
    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok((token, claims.exp))
}

fn verify_jwt(token: &str, secret: &str) -> anyhow::Result<Claims> {
    let validation = Validation::default();
    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(token_data.claims)
}

fn user_error_response(err: UserError) -> (StatusCode, String) {
    match &err {
        UserError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        UserError::EmailTaken => (StatusCode::CONFLICT, err.to_string()),
        UserError::InvalidCredentials => (StatusCode::UNAUTHORIZED, err.to_string()),
        UserError::Io(_) => {
            tracing::error!("User store failure: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage failure".to_string(),
            )
        }
    }
}

pub async fn register(
    State(state): State<std::sync::Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let user = state
        .users
        .register(&req.email, &req.password)
        .await
        .map_err(user_error_response)?;

    tracing::info!("Registered user {}", user.id);

    let (token, exp) = issue_jwt(&state.config.jwt_secret, state.config.jwt_ttl_days, &user)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(AuthResponse { token, exp }))
}

pub async fn login(
    State(state): State<std::sync::Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let user = state
        .users
        .verify(&req.email, &req.password)
        .await
        .map_err(user_error_response)?;

    let (token, exp) = issue_jwt(&state.config.jwt_secret, state.config.jwt_ttl_days, &user)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(AuthResponse { token, exp }))
}

pub async fn require_auth(
    State(state): State<std::sync::Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    let token = auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .unwrap_or("");

    if token.is_empty() {
        return (StatusCode::UNAUTHORIZED, "Missing Authorization header").into_response();
    }

    let claims = match verify_jwt(token, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(_) => {
            return (StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response();
        }
    };

    // The subject must still exist; a deleted account's tokens stop working.
    match state.users.get(claims.sub).await {
        Some(user) => {
            req.extensions_mut().insert(AuthUser {
                id: user.id,
                email: user.email,
            });
            next.run(req).await
        }
        None => (StatusCode::UNAUTHORIZED, "Unknown user").into_response(),
    }
}
