use crate::auth::AuthContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use audiomill_core::AppError;
use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Durable job id assigned at enqueue time.
    pub job_id: String,
    pub source_blob_id: String,
}

#[utoipa::path(
    post,
    path = "/api/v0/media",
    tag = "media",
    responses(
        (status = 200, description = "Media accepted for conversion", body = UploadResponse),
        (status = 400, description = "Not exactly one file in the request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Storage or queue failure", body = ErrorResponse)
    )
)]
pub async fn upload_media(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    // Exactly one file per call; zero or several is a client error.
    let mut file: Option<(String, bytes::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart request: {}", e)))?
    {
        let Some(filename) = field.file_name().map(String::from) else {
            // Non-file form fields are ignored.
            continue;
        };

        if file.is_some() {
            return Err(AppError::InvalidInput(
                "Exactly one file is accepted per upload".to_string(),
            )
            .into());
        }

        let data = field.bytes().await.map_err(|e| {
            if e.to_string().contains("length limit") {
                AppError::PayloadTooLarge(format!("Uploaded file exceeds the size limit: {}", e))
            } else {
                AppError::InvalidInput(format!("Failed to read uploaded file: {}", e))
            }
        })?;

        file = Some((filename, data));
    }

    let Some((filename, data)) = file else {
        return Err(AppError::InvalidInput("No file in upload request".to_string()).into());
    };

    if data.is_empty() {
        return Err(AppError::InvalidInput("Uploaded file is empty".to_string()).into());
    }

    let receipt = state.ingress.submit(&auth.claim, data, &filename).await?;

    Ok(Json(UploadResponse {
        job_id: receipt.job_id.to_string(),
        source_blob_id: receipt.source_blob_id.to_string(),
    }))
}
