use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
};

use super::{AppState, ImageUrlBody};
use crate::error::{KeyFileError, UploadError};

/// GET /health — always public, no secrets leaked.
pub(super) async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /encryptionkeys/{file} — key-file retrieval behind the path guard.
pub(super) async fn handle_key_file(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Response {
    match state.key_files.read(&file).await {
        Ok((_resolved, bytes)) => {
            tracing::debug!(file = %file, "serving key file");
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/octet-stream")],
                bytes,
            )
                .into_response()
        }
        Err(KeyFileError::Denied(reason)) => {
            tracing::warn!(file = %file, reason = %reason, "key file request denied");
            let err = serde_json::json!({
                "error": "File names must be a bare file name inside the key directory",
                "reason": reason.kind(),
            });
            (StatusCode::FORBIDDEN, Json(err)).into_response()
        }
        Err(KeyFileError::NotFound) => {
            let err = serde_json::json!({ "error": "No such key file" });
            (StatusCode::NOT_FOUND, Json(err)).into_response()
        }
        Err(KeyFileError::Io(detail)) => {
            tracing::error!(file = %file, error = %detail, "key file read failed");
            let err = serde_json::json!({ "error": "Failed to read key file" });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(err)).into_response()
        }
    }
}

/// PUT /profile/image-url — upload-by-URL behind the URL guard.
pub(super) async fn handle_image_url_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ImageUrlBody>, axum::extract::rejection::JsonRejection>,
) -> Response {
    // ── Bearer token auth via the session-lookup collaborator ──
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    let user = match state.store.current_user(token).await {
        Ok(Some(identity)) => identity,
        Ok(None) => {
            tracing::warn!("image upload without a valid session");
            let err = serde_json::json!({ "error": "Authentication required" });
            return (StatusCode::UNAUTHORIZED, Json(err)).into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "session lookup failed");
            let err = serde_json::json!({ "error": "Session lookup failed" });
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(err)).into_response();
        }
    };

    // ── Parse body ──
    let Json(upload) = match body {
        Ok(b) => b,
        Err(e) => {
            let err = serde_json::json!({
                "error": format!("Invalid JSON: {e}. Expected: {{\"imageUrl\": \"...\"}}")
            });
            return (StatusCode::BAD_REQUEST, Json(err)).into_response();
        }
    };

    match state.uploads.upload_profile_image(&user, &upload.image_url).await {
        Ok(receipt) => {
            let body = serde_json::json!({ "profileImage": receipt.reference });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(error @ UploadError::Denied(_)) => {
            tracing::warn!(user_id = user.id, error = %error, "image URL denied");
            let err = serde_json::json!({
                "error": "Blocked request to potentially unsafe URL",
                "reason": error.kind(),
            });
            (StatusCode::BAD_REQUEST, Json(err)).into_response()
        }
        Err(error @ (UploadError::FetchFailed(_) | UploadError::TooManyRedirects(_))) => {
            tracing::warn!(user_id = user.id, error = %error, "image fetch failed");
            let err = serde_json::json!({
                "error": "Could not retrieve the image",
                "reason": error.kind(),
            });
            (StatusCode::BAD_GATEWAY, Json(err)).into_response()
        }
        Err(error @ UploadError::PersistFailed(_)) => {
            tracing::error!(user_id = user.id, error = %error, "image persist failed");
            let err = serde_json::json!({
                "error": "Failed to store the image",
                "reason": error.kind(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(err)).into_response()
        }
    }
}
