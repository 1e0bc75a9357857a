use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use audiomill_auth::AuthError;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// Extract username/secret from an HTTP Basic Authorization header.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = general_purpose::STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, secret) = decoded.split_once(':')?;
    if username.is_empty() {
        return None;
    }
    Some((username.to_string(), secret.to_string()))
}

fn unauthorized(reason: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"audiomill\"")],
        Json(ErrorResponse {
            error: format!("Unauthorized: {}", reason),
            details: None,
            code: "UNAUTHORIZED".to_string(),
            recoverable: true,
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/api/v0/login",
    tag = "auth",
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Missing or invalid credentials", body = ErrorResponse),
        (status = 500, description = "Credential store unavailable", body = ErrorResponse)
    )
)]
pub async fn login(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some((username, secret)) = basic_credentials(&headers) else {
        tracing::debug!("Login attempt without usable Basic credentials");
        return unauthorized("missing credentials");
    };

    match state.token_service.issue(&username, &secret).await {
        Ok(token) => Json(TokenResponse { token }).into_response(),
        Err(AuthError::InvalidCredentials) => {
            tracing::debug!(username = %username, "Login rejected");
            unauthorized("invalid credentials")
        }
        Err(e) => HttpAppError::from(e).into_response(),
    }
}
