//! Route configuration and setup

use crate::api_doc::ApiDoc;
use crate::auth::{auth_middleware, AuthState};
use crate::handlers;
use crate::state::AppState;
use audiomill_core::constants::API_PREFIX;
use audiomill_core::Config;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// Assemble the application router: public routes, bearer-gated routes, and
/// cross-cutting layers.
pub fn build_router(state: Arc<AppState>) -> Router {
    let auth_state = Arc::new(AuthState {
        token_service: state.token_service.clone(),
    });

    let cors = setup_cors(&state.config);
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes());

    // Protected routes (require a verified bearer token)
    let protected = Router::new()
        .route("/media", post(handlers::upload::upload_media))
        .route("/download", get(handlers::download::download_product))
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ));

    // Public routes (no authentication required)
    let api = Router::new()
        .route("/login", post(handlers::login::login))
        .merge(protected);

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest(API_PREFIX, api)
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn setup_cors(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
