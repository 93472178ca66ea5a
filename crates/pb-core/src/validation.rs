//! Input checks that run before any gateway round-trip.

use crate::error::{AppError, Result};
use crate::models::ImageUpload;

pub const MAX_BOARD_NAME_LEN: usize = 100;
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

/// Returns the trimmed name when it is non-empty and at most 100 chars.
pub fn board_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError("board name must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_BOARD_NAME_LEN {
        return Err(AppError::ValidationError(format!(
            "board name must be at most {MAX_BOARD_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Blank descriptions are stored as absent.
pub fn description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

pub fn image_upload(upload: &ImageUpload) -> Result<()> {
    if upload.data.is_empty() {
        return Err(AppError::ValidationError("file is empty".into()));
    }
    if upload.data.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::ValidationError(
            "file size must be less than 10MB".into(),
        ));
    }
    let content_type = upload.content_type.to_ascii_lowercase();
    if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
        return Err(AppError::ValidationError(
            "file must be an image (JPEG, PNG, GIF, or WebP)".into(),
        ));
    }
    Ok(())
}
