use crate::auth::AuthContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use audiomill_core::constants::PRODUCT_CONTENT_TYPE;
use audiomill_core::{AppError, BlobId};
use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    /// Identifier of the product blob to fetch.
    pub blob_id: String,
}

#[utoipa::path(
    get,
    path = "/api/v0/download",
    tag = "media",
    params(
        ("blob_id" = String, Query, description = "Product blob identifier")
    ),
    responses(
        (status = 200, description = "Audio artifact (audio/mpeg)"),
        (status = 400, description = "Malformed blob id", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Caller is not privileged", body = ErrorResponse),
        (status = 404, description = "No such blob", body = ErrorResponse)
    )
)]
pub async fn download_product(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, HttpAppError> {
    // Binary privilege check; any privileged principal may fetch any blob.
    if !auth.claim.privileged {
        tracing::debug!(principal = %auth.claim.sub, "Unprivileged download attempt");
        return Err(AppError::Forbidden("privileged access required".to_string()).into());
    }

    let blob_id: BlobId = query
        .blob_id
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("Invalid blob id '{}'", query.blob_id)))?;

    let bytes = state.product_store.get(blob_id).await?;

    tracing::info!(
        principal = %auth.claim.sub,
        blob_id = %blob_id,
        size_bytes = bytes.len(),
        "Product download"
    );

    let headers = [
        (header::CONTENT_TYPE, PRODUCT_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.mp3\"", blob_id),
        ),
    ];

    Ok((headers, bytes).into_response())
}
