//! Multipart document upload.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use super::HandlerResult;
use crate::http::auth::AuthUser;
use crate::http::dto::ListResponse;
use crate::http::error::AppError;
use crate::http::state::AppState;
use crate::models::{Document, UserId};
use crate::services::documents;

const DEFAULT_KIND: &str = "other";

/// POST /v1/users/{id}/documents
///
/// Expects a `file` part and an optional `kind` text part.
pub async fn upload_document(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(user_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Document>), AppError> {
    let user_id = UserId::new(user_id);
    caller.require_self_or_staff(user_id)?;

    let mut kind = DEFAULT_KIND.to_string();
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("kind") => kind = field.text().await?,
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                file = Some((filename, content_type, bytes.to_vec()));
            }
            other => debug!(field = ?other, "Ignoring multipart field"),
        }
    }

    let (filename, content_type, bytes) =
        file.ok_or_else(|| AppError::BadRequest("Missing 'file' part".to_string()))?;
    let document = documents::store_upload(
        state.repo(),
        &state.config,
        user_id,
        &kind,
        &filename,
        &content_type,
        &bytes,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// GET /v1/users/{id}/documents
pub async fn list_documents(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(user_id): Path<i64>,
) -> HandlerResult<ListResponse<Document>> {
    let user_id = UserId::new(user_id);
    caller.require_self_or_staff(user_id)?;
    let items = documents::list_documents(state.repo(), user_id).await?;
    Ok(Json(items.into()))
}
