//! Uploaded post images.
//!
//! An upload counts as an image only if the `image` crate recognises the
//! format and fully decodes it; the client-supplied name and content type
//! are ignored. Accepted files are written under `MEDIA_ROOT/posts/` with a
//! random name and the database stores the path relative to `MEDIA_ROOT`.
//!
//! Decoding is CPU-bound, so async callers go through `check_image`, which
//! runs it on the blocking pool.

use std::path::{Component, Path};

use axum::body::Bytes;
use image::{GenericImageView, ImageFormat};
use serde::Serializer;
use tracing::{debug, warn};
use uuid::Uuid;

pub const UPLOAD_DIR: &str = "posts";
pub const MEDIA_URL: &str = "/media/";

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("upload is not a supported image (gif, png, jpeg, webp)")]
    NotAnImage,
    #[error("image exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("image storage failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("image check did not finish: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Gif,
    Png,
    Jpeg,
    Webp,
}

impl ImageKind {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }

    fn from_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Gif => Some(Self::Gif),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::WebP => Some(Self::Webp),
            _ => None,
        }
    }
}

/// Check size, format and pixel data of an upload before anything touches
/// disk. Blocking; see `check_image`.
///
/// # Errors
///
/// `TooLarge` past `max_bytes`, `NotAnImage` for an unknown format or data
/// that does not decode.
pub fn validate_image(bytes: &[u8], max_bytes: usize) -> Result<ImageKind, MediaError> {
    if bytes.len() > max_bytes {
        return Err(MediaError::TooLarge { limit: max_bytes });
    }
    let format = image::guess_format(bytes).map_err(|_| MediaError::NotAnImage)?;
    let kind = ImageKind::from_format(format).ok_or(MediaError::NotAnImage)?;

    let decoded = image::load_from_memory_with_format(bytes, format).map_err(|e| {
        debug!(error = %e, ?kind, "upload failed to decode");
        MediaError::NotAnImage
    })?;
    let (width, height) = decoded.dimensions();
    debug!(?kind, width, height, "upload decoded");
    Ok(kind)
}

/// `validate_image` on the blocking thread pool.
///
/// # Errors
///
/// As `validate_image`, plus `Task` if the blocking task panicked.
pub async fn check_image(bytes: Bytes, max_bytes: usize) -> Result<ImageKind, MediaError> {
    tokio::task::spawn_blocking(move || validate_image(&bytes, max_bytes)).await?
}

/// Write a checked image under `media_root/posts/` and return its relative
/// path.
///
/// # Errors
///
/// Returns `Io` if the directory or file cannot be written.
pub async fn store_image(media_root: &Path, bytes: &[u8], kind: ImageKind) -> Result<String, MediaError> {
    let dir = media_root.join(UPLOAD_DIR);
    tokio::fs::create_dir_all(&dir).await?;

    let file_name = format!("{}.{}", Uuid::new_v4().simple(), kind.extension());
    tokio::fs::write(dir.join(&file_name), bytes).await?;
    Ok(format!("{UPLOAD_DIR}/{file_name}"))
}

/// Best-effort removal of a replaced image. Paths that would escape
/// `media_root` are ignored.
pub async fn remove_image(media_root: &Path, relative: &str) {
    let rel = Path::new(relative);
    if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
        warn!(path = %relative, "refusing to remove media path outside media root");
        return;
    }
    if let Err(e) = tokio::fs::remove_file(media_root.join(rel)).await {
        warn!(error = %e, path = %relative, "failed to remove replaced image");
    }
}

#[must_use]
pub fn media_url(relative: &str) -> String {
    format!("{MEDIA_URL}{relative}")
}

/// Serde helper: relative media path -> public URL.
pub fn serialize_url<S>(path: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match path {
        Some(p) => serializer.serialize_some(&media_url(p)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
#[path = "media_test.rs"]
mod tests;
