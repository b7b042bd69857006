use std::path::Path;

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};
use uuid::Uuid;

use scholarify_types::api::MediaUploadResponse;

use crate::auth::AppState;
use crate::error::ApiError;

/// 10 MB upload limit for images
pub const MAX_MEDIA_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct MediaQuery {
    pub kind: Option<String>,
}

/// File extension for an accepted image content type.
fn extension_for(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    match mime.to_ascii_lowercase().as_str() {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// POST /admin/media?kind=gallery|listings accepts a raw image body, saves it
/// under the media directory and returns its relative path and public URL.
pub async fn upload_media(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<MediaQuery>, ApiError>,
    headers: HeaderMap,
    WithRejection(bytes, _): WithRejection<Bytes, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = match query.kind.as_deref() {
        Some("gallery") => "gallery",
        Some("listings") => "listings",
        _ => return Err(ApiError::bad_request("kind must be 'gallery' or 'listings'")),
    };

    let ext = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(extension_for)
        .ok_or(ApiError::UnsupportedMediaType)?;

    if bytes.is_empty() {
        return Err(ApiError::bad_request("Empty upload"));
    }

    let dir = state.media_dir.join(kind);
    tokio::fs::create_dir_all(&dir).await.map_err(|e| {
        error!("Failed to create media directory {}: {}", dir.display(), e);
        ApiError::Internal(e.into())
    })?;

    let file_name = format!("{}.{}", Uuid::new_v4(), ext);
    let file_path = dir.join(&file_name);
    store_file(&file_path, &bytes)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;

    let path = format!("{}/{}", kind, file_name);
    info!("Stored media {} ({} bytes)", path, bytes.len());

    Ok((
        StatusCode::CREATED,
        Json(MediaUploadResponse {
            url: format!("/media/{}", path),
            path,
        }),
    ))
}

/// Writes `bytes` to `path`. A file left half-written by a failed write is removed.
async fn store_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let written = async {
        let mut file = tokio::fs::File::create(path).await?;
        file.write_all(bytes).await?;
        file.flush().await
    }
    .await;

    if let Err(e) = &written {
        error!("Failed to write file {}: {}", path.display(), e);
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(rm) if rm.kind() == std::io::ErrorKind::NotFound => {}
            Err(rm) => warn!("Failed to remove partial file {}: {}", path.display(), rm),
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_web_images_are_accepted() {
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("IMAGE/PNG"), Some("png"));
        assert_eq!(extension_for("image/webp; charset=binary"), Some("webp"));
        assert_eq!(extension_for("image/svg+xml"), None);
        assert_eq!(extension_for("application/octet-stream"), None);
    }

    #[tokio::test]
    async fn stored_files_hold_the_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        store_file(&path, b"png-bytes").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn failed_store_leaves_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("a.png");
        assert!(store_file(&path, b"png-bytes").await.is_err());
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
