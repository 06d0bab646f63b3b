//! Media resolution: from a rating key to a source URL, filename and tag set.

use crate::clip::ClipRequest;
use crate::error::{Error, Result};
use crate::plex::{MediaItem, PlexServer};
use crate::transcode::ClipTags;

/// Everything the executor needs that came out of the catalog.
#[derive(Debug, Clone)]
pub struct ResolvedClip {
    pub source_url: String,
    pub filename: String,
    pub tags: ClipTags,
}

/// Resolve a clip request against the media server.
pub async fn resolve(plex: &PlexServer, request: &ClipRequest, user: &str) -> Result<ResolvedClip> {
    let rating_key = parse_rating_key(&request.rating_key)?;

    let item = plex.metadata(rating_key).await?;

    let rendition = item
        .select_rendition(request.media_id)
        .ok_or_else(|| Error::not_found("rendition", request.media_id.unwrap_or_default()))?;
    let part = rendition
        .parts
        .first()
        .ok_or_else(|| Error::not_found("part", &item.rating_key))?;

    Ok(ResolvedClip {
        source_url: plex.part_url(&part.key),
        filename: derive_filename(&item, &request.from, &request.to),
        tags: derive_tags(&item, &request.from, user),
    })
}

/// Rating keys travel as strings but are numeric in the upstream protocol,
/// floating-point included.
pub fn parse_rating_key(raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| Error::InvalidIdentifier(raw.to_string()))
}

/// Human-readable download name for the clip.
fn derive_filename(item: &MediaItem, from: &str, to: &str) -> String {
    let name = if item.is_episode() {
        format!(
            "{} S{:02}E{:02} {} ({} - {}).mp4",
            item.show.as_deref().unwrap_or_default(),
            item.season.unwrap_or_default(),
            item.episode.unwrap_or_default(),
            item.title,
            from,
            to,
        )
    } else {
        format!(
            "{} ({}) ({} - {}).mp4",
            item.title,
            item.year.unwrap_or_default(),
            from,
            to,
        )
    };

    sanitize_filename(&name)
}

/// Titles must not escape the output directory.
fn sanitize_filename(name: &str) -> String {
    name.replace(['/', '\\'], "-")
}

fn derive_tags(item: &MediaItem, from: &str, user: &str) -> ClipTags {
    let mut tags = ClipTags {
        title: item.title.clone(),
        comment: from.to_string(),
        artist: user.to_string(),
        ..ClipTags::default()
    };

    if item.is_episode() {
        tags.show = item.show.clone().unwrap_or_default();
        tags.season_number = item.season.unwrap_or_default();
        tags.episode_id = item.episode.unwrap_or_default();
    } else {
        tags.year = item.year.unwrap_or_default();
    }

    tags
}
