//! Clip extraction and preview routes.
//!
//! `GET /clip/...` runs a full encode and then serves the finished file with
//! HTTP range support, since download managers probe with ranged requests.
//! `GET /preview/...` pipes fragmented MP4 straight from the encoder.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    routing::get,
    Extension, Router,
};
use serde::Deserialize;
use std::io::SeekFrom;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::clip::{ClipRequest, FinishedClip};
use crate::error::Error;
use crate::server::auth::{current_user_name, CurrentUser};
use crate::server::error::ApiError;
use crate::server::AppContext;

/// Create clip and preview routes.
pub fn clip_routes() -> Router<AppContext> {
    Router::new()
        .route("/clip/:rating_key/:from/:to", get(download_clip))
        .route("/preview/:rating_key/:from/:to", get(stream_preview))
}

#[derive(Debug, Deserialize)]
pub struct ClipQuery {
    /// Target height; 0 keeps the source height.
    #[serde(default)]
    pub height: u32,
    /// Target quantizer; 0 keeps the backend default.
    #[serde(default)]
    pub qp: u32,
    /// Explicit rendition id, for items with more than one file.
    #[serde(default)]
    pub media: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    #[serde(default)]
    pub media: Option<i64>,
}

/// Extract a clip and serve it as a download.
async fn download_clip(
    State(ctx): State<AppContext>,
    Path((rating_key, from, to)): Path<(String, String, String)>,
    Query(query): Query<ClipQuery>,
    user: Option<Extension<CurrentUser>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let user = current_user_name(user);
    let request = ClipRequest {
        rating_key,
        media_id: query.media,
        from,
        to,
        height: query.height,
        qp: query.qp,
    };

    let clip = ctx.clips.clip(&request, &user).await?;
    serve_clip(&clip, &headers).await
}

/// Start a preview encode and stream it as it is produced.
async fn stream_preview(
    State(ctx): State<AppContext>,
    Path((rating_key, from, to)): Path<(String, String, String)>,
    Query(query): Query<PreviewQuery>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Response, ApiError> {
    let user = current_user_name(user);
    // Height and quality are fixed on the preview path.
    let request = ClipRequest {
        rating_key,
        media_id: query.media,
        from,
        to,
        height: 0,
        qp: 0,
    };

    let stdout = ctx.clips.preview(&request, &user).await?;
    let body = Body::from_stream(ReaderStream::new(stdout));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .body(body)
        .map_err(|e| ApiError::from(Error::Internal(e.to_string())))
}

/// Serve a finished clip with range request support.
async fn serve_clip(clip: &FinishedClip, headers: &HeaderMap) -> Result<Response, ApiError> {
    let metadata = tokio::fs::metadata(&clip.path).await.map_err(Error::from)?;
    let file_size = metadata.len();

    let range = headers
        .get(header::RANGE)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| parse_range_header(s, file_size));

    let disposition = attachment_disposition(&clip.filename);

    match range {
        Some((start, end)) => {
            // Partial content response
            let length = end - start + 1;

            let mut file = File::open(&clip.path).await.map_err(Error::from)?;
            file.seek(SeekFrom::Start(start))
                .await
                .map_err(Error::from)?;

            let stream = ReaderStream::new(file.take(length));
            let body = Body::from_stream(stream);

            Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, "video/mp4")
                .header(header::CONTENT_LENGTH, length.to_string())
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", start, end, file_size),
                )
                .header(header::ACCEPT_RANGES, "bytes")
                .header(header::CONTENT_DISPOSITION, disposition)
                .body(body)
                .map_err(|e| ApiError::from(Error::Internal(e.to_string())))
        }
        None => {
            // Full file response
            let file = File::open(&clip.path).await.map_err(Error::from)?;

            let stream = ReaderStream::new(file);
            let body = Body::from_stream(stream);

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "video/mp4")
                .header(header::CONTENT_LENGTH, file_size.to_string())
                .header(header::ACCEPT_RANGES, "bytes")
                .header(header::CONTENT_DISPOSITION, disposition)
                .body(body)
                .map_err(|e| ApiError::from(Error::Internal(e.to_string())))
        }
    }
}

/// Content-Disposition value for a derived clip name. Double quotes would
/// terminate the quoted-string early, so they are downgraded.
fn attachment_disposition(filename: &str) -> String {
    format!("attachment; filename=\"{}\"", filename.replace('"', "'"))
}

/// Parse HTTP Range header.
///
/// Supports formats:
/// - bytes=0-499
/// - bytes=500-999
/// - bytes=500-
/// - bytes=-500 (last 500 bytes)
fn parse_range_header(header: &str, file_size: u64) -> Option<(u64, u64)> {
    let header = header.strip_prefix("bytes=")?;

    let parts: Vec<&str> = header.split('-').collect();
    if parts.len() != 2 {
        return None;
    }

    let start = parts[0].trim();
    let end = parts[1].trim();

    match (start.is_empty(), end.is_empty()) {
        // bytes=-500 (last 500 bytes)
        (true, false) => {
            let suffix_len: u64 = end.parse().ok()?;
            let start = file_size.saturating_sub(suffix_len);
            Some((start, file_size - 1))
        }
        // bytes=500- (from 500 to end)
        (false, true) => {
            let start: u64 = start.parse().ok()?;
            if start >= file_size {
                return None;
            }
            Some((start, file_size - 1))
        }
        // bytes=0-499
        (false, false) => {
            let start: u64 = start.parse().ok()?;
            let end: u64 = end.parse().ok()?;
            if start >= file_size {
                return None;
            }
            let end = end.min(file_size - 1);
            if start > end {
                return None;
            }
            Some((start, end))
        }
        // bytes=- (invalid)
        (true, true) => None,
    }
}
