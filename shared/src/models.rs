use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a `Video`. Transitions are owned by the status
/// updater, never by a handler directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VideoStatus {
    Uploaded,
    Processing,
    Ready,
    Failed,
}

impl std::fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VideoStatus::Uploaded => "UPLOADED",
            VideoStatus::Processing => "PROCESSING",
            VideoStatus::Ready => "READY",
            VideoStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// A video owned by a single user, stored as an ArangoDB document.
///
/// `id` is the ArangoDB `_key` (internal numeric-ish id, opaque to clients);
/// `rev` is the document `_rev`, doubling as the optimistic-lock version.
/// `public_id` is the externally visible 36-character token and never changes
/// after creation, same as `storage_path`.
fn is_empty_string(s: &String) -> bool {
    s.is_empty()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    #[serde(rename = "_key", skip_serializing_if = "is_empty_string", default)]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none", default)]
    pub rev: Option<String>,
    pub public_id: String,
    pub owner_username: String,
    pub description: String,
    pub uploaded_at: DateTime<Utc>,
    pub storage_path: String,
    #[serde(default)]
    pub processed_storage_path: Option<String>,
    pub file_size: u64,
    pub mime_type: String,
    #[serde(default)]
    pub duration: Option<f64>,
    pub status: VideoStatus,
}

impl Video {
    /// `processedStoragePath ≠ null ⇔ status = READY` — callers that build a
    /// `Video` by hand (not through the status updater) should assert this.
    pub fn invariant_holds(&self) -> bool {
        self.processed_storage_path.is_some() == (self.status == VideoStatus::Ready)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// A registered account. `username` doubles as the ArangoDB document key,
/// since it is already unique and immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_key", skip_serializing_if = "is_empty_string", default)]
    pub username: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none", default)]
    pub rev: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub email: String,
    #[serde(default)]
    pub verified: bool,
}

/// Request DTO for `POST /api/videos/{publicId}/process`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EditOptions {
    #[serde(default)]
    pub cut_start_time: Option<f64>,
    #[serde(default)]
    pub cut_end_time: Option<f64>,
    pub mute: bool,
    #[serde(default)]
    pub target_resolution_height: Option<u32>,
}

/// Public-facing projection of a `Video`, returned from every video endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct VideoResponse {
    pub public_id: String,
    pub description: String,
    pub file_size: u64,
    pub status: VideoStatus,
    pub upload_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl From<&Video> for VideoResponse {
    fn from(v: &Video) -> Self {
        Self {
            public_id: v.public_id.clone(),
            description: v.description.clone(),
            file_size: v.file_size,
            status: v.status,
            upload_date: v.uploaded_at,
            duration: v.duration,
        }
    }
}

/// A single page of a larger ordered sequence.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total: u64,
}

/// RFC 7807 Problem Details body, the shape every error response takes.
#[derive(Debug, Clone, Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub instance: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<HashMap<String, Vec<String>>>,
}
