//! HTTP client for the Plex Media Server API.

use bytes::Bytes;
use reqwest::header;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::config::PlexConfig;
use crate::error::{Error, Result};
use crate::plex::types::{MediaItem, MediaPart, MediaRendition, PlaySession};

/// Timeout for PMS API requests.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the configured Plex Media Server.
///
/// Carries the server-owner token; every call it makes is on the server's
/// behalf, not the requesting user's.
pub struct PlexServer {
    client: Client,
    base_url: String,
    token: String,
}

impl PlexServer {
    pub fn new(config: &PlexConfig) -> Self {
        let client = Client::builder()
            .timeout(CONNECTION_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: config.host.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .header(header::ACCEPT, "application/json")
            .header("X-Plex-Token", &self.token)
    }

    /// The server's stable machine identifier, also a connectivity check.
    pub async fn identity(&self) -> Result<String> {
        let response = self.get("/identity").send().await?;
        if !response.status().is_success() {
            return Err(Error::upstream(format!(
                "identity request returned {}",
                response.status()
            )));
        }

        let body: Wrapper<IdentityDto> = response.json().await?;
        body.media_container
            .machine_identifier
            .ok_or_else(|| Error::upstream("identity response carried no machineIdentifier"))
    }

    /// Fetch catalog metadata for one item.
    pub async fn metadata(&self, rating_key: f64) -> Result<MediaItem> {
        let response = self
            .get(&format!("/library/metadata/{rating_key}"))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(Error::not_found("item", rating_key));
            }
            status if !status.is_success() => {
                return Err(Error::upstream(format!(
                    "metadata request returned {status}"
                )));
            }
            _ => {}
        }

        let body: Wrapper<LibraryContainer> = response.json().await?;
        let dto = body
            .media_container
            .metadata
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found("item", rating_key))?;

        Ok(map_item(dto))
    }

    /// Currently active playback sessions.
    pub async fn sessions(&self) -> Result<Vec<PlaySession>> {
        let response = self.get("/status/sessions").send().await?;
        if !response.status().is_success() {
            return Err(Error::upstream(format!(
                "sessions request returned {}",
                response.status()
            )));
        }

        let body: Wrapper<LibraryContainer> = response.json().await?;
        Ok(body
            .media_container
            .metadata
            .into_iter()
            .map(map_session)
            .collect())
    }

    /// Fetch a resized poster through the server's photo transcoder.
    /// Returns the content type and the raw image bytes.
    pub async fn thumbnail(&self, path: &str, width: u32, height: u32) -> Result<(String, Bytes)> {
        let response = self
            .get("/photo/:/transcode")
            .query(&[
                ("width", width.to_string()),
                ("height", height.to_string()),
                ("minSize", "1".to_string()),
                ("url", path.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::upstream(format!(
                "thumbnail request returned {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();

        Ok((content_type, response.bytes().await?))
    }

    /// The fully-qualified, token-bearing URL for a part's raw file.
    pub fn part_url(&self, part_key: &str) -> String {
        format!("{}{}?X-Plex-Token={}", self.base_url, part_key, self.token)
    }
}

#[derive(Debug, Deserialize)]
struct Wrapper<T> {
    #[serde(rename = "MediaContainer")]
    media_container: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityDto {
    machine_identifier: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LibraryContainer {
    #[serde(default, rename = "Metadata")]
    metadata: Vec<ItemDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemDto {
    rating_key: Option<String>,
    #[serde(rename = "type")]
    item_type: Option<String>,
    title: Option<String>,
    grandparent_title: Option<String>,
    parent_index: Option<u32>,
    index: Option<u32>,
    year: Option<u32>,
    thumb: Option<String>,
    view_offset: Option<u64>,
    #[serde(default, rename = "Media")]
    media: Vec<MediaDto>,
    #[serde(rename = "User")]
    user: Option<UserDto>,
    #[serde(rename = "Player")]
    player: Option<PlayerDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaDto {
    id: Option<i64>,
    video_profile: Option<String>,
    #[serde(default, rename = "Part")]
    part: Vec<PartDto>,
}

#[derive(Debug, Deserialize)]
struct PartDto {
    id: Option<i64>,
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserDto {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlayerDto {
    product: Option<String>,
    state: Option<String>,
}

fn map_item(dto: ItemDto) -> MediaItem {
    MediaItem {
        rating_key: dto.rating_key.unwrap_or_default(),
        item_type: dto.item_type.unwrap_or_default(),
        title: dto.title.unwrap_or_default(),
        show: dto.grandparent_title,
        season: dto.parent_index,
        episode: dto.index,
        year: dto.year,
        media: dto
            .media
            .into_iter()
            .map(|m| MediaRendition {
                id: m.id.unwrap_or_default(),
                video_profile: m.video_profile,
                parts: m
                    .part
                    .into_iter()
                    .filter_map(|p| {
                        p.key.map(|key| MediaPart {
                            id: p.id.unwrap_or_default(),
                            key,
                        })
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn map_session(dto: ItemDto) -> PlaySession {
    let user = dto
        .user
        .as_ref()
        .and_then(|u| u.title.clone())
        .unwrap_or_default();
    let (player, state) = dto
        .player
        .as_ref()
        .map(|p| (p.product.clone(), p.state.clone()))
        .unwrap_or((None, None));

    PlaySession {
        rating_key: dto.rating_key.unwrap_or_default(),
        item_type: dto.item_type.unwrap_or_default(),
        title: dto.title.unwrap_or_default(),
        show: dto.grandparent_title,
        season: dto.parent_index,
        episode: dto.index,
        user,
        player,
        state,
        view_offset_ms: dto.view_offset,
        thumb: dto.thumb,
    }
}
