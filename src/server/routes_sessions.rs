//! Playback session routes.
//!
//! Thin views over the paired server's `/status/sessions` endpoint, plus a
//! thumbnail proxy so the browser never needs the server token.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::Error;
use crate::plex::PlaySession;
use crate::server::error::ApiError;
use crate::server::AppContext;

/// Create session routes.
pub fn session_routes() -> Router<AppContext> {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/sessions/:user", get(user_session))
        .route("/thumb", get(thumbnail))
}

/// All playback sessions currently active on the paired server.
async fn list_sessions(State(ctx): State<AppContext>) -> Result<Json<Vec<PlaySession>>, ApiError> {
    Ok(Json(ctx.plex.sessions().await?))
}

/// The named user's active session. 404 when they are not playing anything.
async fn user_session(
    State(ctx): State<AppContext>,
    Path(user): Path<String>,
) -> Result<Json<PlaySession>, ApiError> {
    let session = ctx
        .plex
        .sessions()
        .await?
        .into_iter()
        .find(|s| s.user == user)
        .ok_or_else(|| Error::not_found("session", &user))?;
    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
pub struct ThumbQuery {
    /// Server-relative image path, e.g. "/library/metadata/42/thumb/1".
    pub path: String,
    #[serde(default = "default_thumb_width")]
    pub width: u32,
    #[serde(default = "default_thumb_height")]
    pub height: u32,
}

fn default_thumb_width() -> u32 {
    240
}
fn default_thumb_height() -> u32 {
    360
}

/// Proxy a poster or frame through the server's image transcoder.
async fn thumbnail(
    State(ctx): State<AppContext>,
    Query(query): Query<ThumbQuery>,
) -> Result<Response, ApiError> {
    let (content_type, bytes) = ctx
        .plex
        .thumbnail(&query.path, query.width, query.height)
        .await?;

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "max-age=3600")
        .body(Body::from(bytes))
        .map_err(|e| ApiError::from(Error::Internal(e.to_string())))
}
