//! Uploaded files (license scans, ID proofs, photos).

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::config::AppConfig;
use crate::db::repository::{FullRepository, UserRepository};
use crate::models::{Document, NewDocument, UserId};

const MAX_KIND_LEN: usize = 32;
const MAX_NAME_LEN: usize = 100;

/// Strip directory components and keep only `[A-Za-z0-9._-]`.
///
/// Leading dots are dropped so the result is never hidden or `..`.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    let cleaned: String = cleaned.chars().take(MAX_NAME_LEN).collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

fn validate_kind(kind: &str) -> ServiceResult<String> {
    let kind = kind.trim().to_ascii_lowercase();
    if kind.is_empty()
        || kind.len() > MAX_KIND_LEN
        || !kind
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-'))
    {
        return Err(ServiceError::bad_request(format!(
            "Invalid document kind '{}'",
            kind
        )));
    }
    Ok(kind)
}

fn upload_path(root: &Path, user_id: UserId, filename: &str) -> PathBuf {
    root.join(user_id.to_string())
        .join(format!("{}-{}", Uuid::new_v4(), filename))
}

/// Write an uploaded file under the upload directory and record its metadata.
pub async fn store_upload<R: FullRepository + ?Sized>(
    repo: &R,
    config: &AppConfig,
    user_id: UserId,
    kind: &str,
    filename: &str,
    content_type: &str,
    bytes: &[u8],
) -> ServiceResult<Document> {
    repo.get_user(user_id).await?;
    let kind = validate_kind(kind)?;

    let uploads = &config.uploads;
    if !uploads.is_allowed(content_type) {
        return Err(ServiceError::bad_request(format!(
            "Content type '{}' is not allowed",
            content_type
        )));
    }
    if bytes.is_empty() {
        return Err(ServiceError::bad_request("Uploaded file is empty"));
    }
    if bytes.len() > uploads.max_file_bytes() {
        return Err(ServiceError::bad_request(format!(
            "File exceeds the {} MB limit",
            uploads.max_file_mb
        )));
    }

    let name = sanitize_filename(filename);
    let path = upload_path(&uploads.dir, user_id, &name);
    let document = write_and_record(
        repo,
        &path,
        bytes,
        NewDocument {
            user_id,
            kind,
            original_filename: name,
            stored_path: path.to_string_lossy().into_owned(),
            content_type: content_type.trim().to_ascii_lowercase(),
            size_bytes: bytes.len() as i64,
        },
    )
    .await?;
    info!(
        document_id = %document.id,
        user_id = %user_id,
        kind = %document.kind,
        size = document.size_bytes,
        "Document stored"
    );
    Ok(document)
}

/// Write `bytes` to `path`, then insert the record. The file is removed again
/// when the insert fails.
async fn write_and_record<R: FullRepository + ?Sized>(
    repo: &R,
    path: &Path,
    bytes: &[u8],
    document: NewDocument,
) -> ServiceResult<Document> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            ServiceError::Internal(format!("Cannot create {}: {}", parent.display(), e))
        })?;
    }
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| ServiceError::Internal(format!("Cannot write {}: {}", path.display(), e)))?;

    match repo.add_document(document).await {
        Ok(document) => Ok(document),
        Err(e) => {
            if let Err(io) = tokio::fs::remove_file(path).await {
                warn!(path = %path.display(), error = %io, "Failed to remove orphaned upload");
            }
            Err(e.into())
        }
    }
}

pub async fn list_documents<R: FullRepository + ?Sized>(
    repo: &R,
    user_id: UserId,
) -> ServiceResult<Vec<Document>> {
    repo.get_user(user_id).await?;
    Ok(repo.list_documents(user_id).await?)
}
