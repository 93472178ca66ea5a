//! # Domain Models
//!
//! Stored rows (`Board`, `Image`, `BoardPinLink`) mirror the remote tables.
//! `Pin`, `BoardSummary` and `SearchResult` are client-side views derived
//! from them and are never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated user the session runs as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
}

impl SessionUser {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }

    /// Display handle: the local part of the email, or "anonymous".
    pub fn handle(&self) -> &str {
        match self.email.split('@').next() {
            Some(local) if !local.trim().is_empty() => local,
            _ => "anonymous",
        }
    }
}

/// A named, user-owned collection of pins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a board insert. The gateway assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBoard {
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
}

/// Partial board update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardUpdate {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
}

/// An uploaded or saved image. Backs exactly one pin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub user_id: String,
    /// Storage key of the file.
    pub filename: String,
    pub url: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for an image insert. The id is chosen by the caller because
/// pins saved from external sources keep the id they were shown under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewImage {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    pub url: String,
    pub title: String,
}

/// Persisted "image saved to board" association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardPinLink {
    pub id: String,
    pub board_id: String,
    pub image_id: String,
    pub created_at: DateTime<Utc>,
}

/// Client view of an image plus the boards it is saved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    /// Same as the backing image id.
    pub id: String,
    pub image_url: String,
    pub title: String,
    /// Ordered by link creation, oldest first. Never contains duplicates.
    pub board_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A board together with counters derived from the mirrored links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSummary {
    pub board: Board,
    pub pin_count: usize,
    /// URL of the most recently linked image.
    pub cover_image: Option<String>,
}

/// Session-only remark on a pin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub pin_id: String,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Board,
    Pin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub kind: SearchKind,
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Location of a file after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub key: String,
    pub url: String,
}

/// A file the user picked for upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: bytes::Bytes,
    /// Falls back to the file name when absent.
    pub title: Option<String>,
}

/// Generates a new time-ordered identifier.
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}
