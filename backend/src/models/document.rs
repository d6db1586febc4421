use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DocumentId, UserId};

/// Metadata for a file uploaded by or for a user (license scan, ID proof, photo).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub user_id: UserId,
    pub kind: String,
    pub original_filename: String,
    pub stored_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// Insert payload for document metadata.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub user_id: UserId,
    pub kind: String,
    pub original_filename: String,
    pub stored_path: String,
    pub content_type: String,
    pub size_bytes: i64,
}
