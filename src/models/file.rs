use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File metadata attached to a version.
/// Maps to the `review_file` table.
///
/// Copies made for a resubmission point at the same `object_name`; the
/// object bytes are never duplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewFile {
    pub id: i64,
    pub tenant_id: i64,
    pub version_id: i64,
    pub file_name: String,
    pub object_name: String,
    pub content_hash: Option<String>,
    pub file_size: Option<i64>,
    pub content_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ReviewFile {
    /// Copy of this row re-targeted at another version
    pub fn copy_to(&self, version_id: i64) -> NewReviewFile {
        NewReviewFile {
            tenant_id: self.tenant_id,
            version_id,
            file_name: self.file_name.clone(),
            object_name: self.object_name.clone(),
            content_hash: self.content_hash.clone(),
            file_size: self.file_size,
            content_type: self.content_type.clone(),
        }
    }
}

/// New ReviewFile for creation (without generated fields)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReviewFile {
    pub tenant_id: i64,
    pub version_id: i64,
    pub file_name: String,
    pub object_name: String,
    pub content_hash: Option<String>,
    pub file_size: Option<i64>,
    pub content_type: Option<String>,
}
