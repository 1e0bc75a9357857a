//! Bearer-token authentication middleware.
//!
//! Protected routes run [`auth_middleware`], which verifies the token and
//! stores the decoded claim in request extensions; handlers extract it via
//! [`AuthContext`].

use crate::error::{ErrorResponse, HttpAppError};
use audiomill_auth::{Claim, TokenService};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use audiomill_core::AppError;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthState {
    pub token_service: Arc<TokenService>,
}

/// Verified claim for the current request, inserted by the middleware.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claim: Claim,
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            return HttpAppError(AppError::Unauthorized(
                "Missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return HttpAppError(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        ))
        .into_response();
    };

    match auth_state.token_service.verify(token) {
        Ok(claim) => {
            tracing::debug!(principal = %claim.sub, privileged = claim.privileged, "Token verified");
            request.extensions_mut().insert(AuthContext { claim });
            next.run(request).await
        }
        Err(e) => HttpAppError(AppError::Unauthorized(e.to_string())).into_response(),
    }
}

// FromRequestParts rather than Extension so handlers taking Multipart can
// still extract the context.
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthContext>().cloned().ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Missing authentication context".to_string(),
                    details: None,
                    code: "UNAUTHORIZED".to_string(),
                    recoverable: true,
                }),
            )
        })
    }
}
