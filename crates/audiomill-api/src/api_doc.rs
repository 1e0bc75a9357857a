//! OpenAPI document.

use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::handlers::login::TokenResponse;
use crate::handlers::upload::UploadResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health,
        crate::handlers::login::login,
        crate::handlers::upload::upload_media,
        crate::handlers::download::download_product,
    ),
    components(schemas(ErrorResponse, TokenResponse, UploadResponse)),
    tags(
        (name = "auth", description = "Token issuance"),
        (name = "media", description = "Upload and artifact retrieval"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;
