//! Domain types mapped out of the Plex API payloads.

use serde::Serialize;

/// A catalog item as the clip pipeline sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub rating_key: String,
    /// Plex item type, e.g. "episode" or "movie".
    pub item_type: String,
    pub title: String,
    /// Show title, present on episodes.
    pub show: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub year: Option<u32>,
    /// Renditions in server order.
    pub media: Vec<MediaRendition>,
}

impl MediaItem {
    pub fn is_episode(&self) -> bool {
        self.item_type == "episode"
    }

    /// Pick the rendition to clip from.
    ///
    /// An explicitly requested id must match exactly. Without one, the first
    /// rendition whose video profile is not 10-bit wins (10-bit sources choke
    /// some hardware encoders), falling back to the first rendition.
    pub fn select_rendition(&self, requested: Option<i64>) -> Option<&MediaRendition> {
        if let Some(id) = requested {
            return self.media.iter().find(|r| r.id == id);
        }

        self.media
            .iter()
            .find(|r| !r.is_ten_bit())
            .or_else(|| self.media.first())
    }
}

/// One encoded version (resolution/bitrate/codec) of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRendition {
    pub id: i64,
    /// Plex video profile string, e.g. "high" or "main 10".
    pub video_profile: Option<String>,
    pub parts: Vec<MediaPart>,
}

impl MediaRendition {
    /// Plex spells 10-bit profiles with a trailing "10" ("main 10",
    /// "high 10").
    pub fn is_ten_bit(&self) -> bool {
        self.video_profile
            .as_deref()
            .map(|p| p.trim().to_lowercase().ends_with("10"))
            .unwrap_or(false)
    }
}

/// One file of a rendition; `key` is the server-relative download path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPart {
    pub id: i64,
    pub key: String,
}

/// An active playback session, trimmed to what the frontend needs.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlaySession {
    pub rating_key: String,
    pub item_type: String,
    pub title: String,
    pub show: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    /// Title of the account playing the item.
    pub user: String,
    pub player: Option<String>,
    pub state: Option<String>,
    pub view_offset_ms: Option<u64>,
    /// Poster path, resolvable through the thumbnail proxy.
    pub thumb: Option<String>,
}

/// A plex.tv account, as returned for a valid token.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlexAccount {
    pub id: i64,
    pub uuid: String,
    pub username: String,
    pub title: String,
    pub email: Option<String>,
    pub thumb: Option<String>,
}

impl PlexAccount {
    /// Human-facing name: the account title, or the username where plex.tv
    /// left the title empty.
    pub fn display_name(&self) -> &str {
        if self.title.is_empty() {
            &self.username
        } else {
            &self.title
        }
    }
}

/// A login PIN from plex.tv, shown to the user for linking.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoginPin {
    pub id: i64,
    pub code: String,
    pub expires_in: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendition(id: i64, profile: Option<&str>) -> MediaRendition {
        MediaRendition {
            id,
            video_profile: profile.map(String::from),
            parts: vec![MediaPart {
                id: id * 10,
                key: format!("/library/parts/{id}/file.mkv"),
            }],
        }
    }

    fn item(media: Vec<MediaRendition>) -> MediaItem {
        MediaItem {
            rating_key: "100".to_string(),
            item_type: "movie".to_string(),
            title: "Baz".to_string(),
            show: None,
            season: None,
            episode: None,
            year: Some(1999),
            media,
        }
    }

    #[test]
    fn explicit_rendition_id_wins() {
        let item = item(vec![rendition(1, Some("high")), rendition(2, Some("main 10"))]);
        assert_eq!(item.select_rendition(Some(2)).unwrap().id, 2);
    }

    #[test]
    fn unknown_explicit_id_selects_nothing() {
        let item = item(vec![rendition(1, Some("high"))]);
        assert!(item.select_rendition(Some(99)).is_none());
    }

    #[test]
    fn ten_bit_profiles_are_skipped() {
        let item = item(vec![
            rendition(1, Some("main 10")),
            rendition(2, Some("High 10")),
            rendition(3, Some("high")),
        ]);
        assert_eq!(item.select_rendition(None).unwrap().id, 3);
    }

    #[test]
    fn all_ten_bit_falls_back_to_first() {
        let item = item(vec![rendition(1, Some("main 10")), rendition(2, Some("high 10"))]);
        assert_eq!(item.select_rendition(None).unwrap().id, 1);
    }

    #[test]
    fn missing_profile_counts_as_eight_bit() {
        let item = item(vec![rendition(1, None)]);
        assert_eq!(item.select_rendition(None).unwrap().id, 1);
        assert!(!item.media[0].is_ten_bit());
    }

    #[test]
    fn no_renditions_selects_nothing() {
        let item = item(vec![]);
        assert!(item.select_rendition(None).is_none());
    }

    #[test]
    fn display_name_prefers_title() {
        let mut account = PlexAccount {
            id: 1,
            uuid: "u".to_string(),
            username: "alice99".to_string(),
            title: "Alice".to_string(),
            email: None,
            thumb: None,
        };
        assert_eq!(account.display_name(), "Alice");
        account.title.clear();
        assert_eq!(account.display_name(), "alice99");
    }
}
