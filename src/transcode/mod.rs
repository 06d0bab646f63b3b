//! Encoder parameter derivation.
//!
//! [`EncodeParams`] is built once per request and fully determines the ffmpeg
//! invocation: no global state feeds into the argument lists. Derivation is
//! pure, the same parameters always produce the same arguments.

mod backend;
mod command;

pub use backend::Backend;
pub use command::{ToolCommand, ToolOutput};

use std::path::Path;

/// Previews always re-encode at this height, whatever the source carries.
pub const PREVIEW_HEIGHT: u32 = 720;

/// Container metadata written into the produced clip.
///
/// Every tag is optional in the output: empty strings and zero numbers are
/// omitted rather than written as placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipTags {
    pub title: String,
    /// The clip's start timestamp, kept so a clip can be traced back to its
    /// position in the source.
    pub comment: String,
    /// Title of the account that requested the clip.
    pub artist: String,
    pub show: String,
    pub season_number: u32,
    pub episode_id: u32,
    pub year: u32,
}

impl ClipTags {
    /// `-metadata key=value` pairs for every non-empty tag, in a fixed order.
    pub fn metadata_args(&self) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();

        let mut tag = |key: &str, value: String| {
            if !value.is_empty() {
                args.extend(["-metadata".to_string(), format!("{key}={value}")]);
            }
        };

        tag("title", self.title.clone());
        tag("comment", self.comment.clone());
        tag("artist", self.artist.clone());
        tag("show", self.show.clone());
        if self.season_number != 0 {
            tag("season_number", self.season_number.to_string());
        }
        if self.episode_id != 0 {
            tag("episode_id", self.episode_id.to_string());
        }
        if self.year != 0 {
            tag("year", self.year.to_string());
        }

        args
    }
}

/// Everything needed to build one encoder invocation.
///
/// Constructed fresh per request from the resolved media, the probe result
/// and the caller's overrides; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct EncodeParams {
    /// Fully-qualified, credential-bearing source URL.
    pub source_url: String,
    /// Start timestamp, passed through to `-ss` untouched.
    pub from: String,
    /// End timestamp, passed through to `-to` untouched.
    pub to: String,
    pub backend: Backend,
    /// Target height; 0 keeps the source height.
    pub height: u32,
    /// Target quantizer; 0 leaves quality at the backend default.
    pub qp: u32,
    /// Codec name of the source's first video stream, as probed.
    pub source_codec: String,
    pub tags: ClipTags,
}

impl EncodeParams {
    /// Whether the clip path must re-encode.
    ///
    /// Stream copy is only safe when the source is already the target codec
    /// family and no resize or quality override was requested. Previews never
    /// take this path.
    pub fn requires_reencode(&self) -> bool {
        self.source_codec != "h264" || self.height != 0 || self.qp != 0
    }

    /// Complete argument list for a clip encode writing to `output`.
    pub fn clip_args(&self, output: &Path) -> Vec<String> {
        let reencode = self.requires_reencode();
        let mut args = self.input_args(reencode);

        if reencode {
            args.extend(self.video_encode_args(self.height));
        } else {
            args.extend(["-c:v".to_string(), "copy".to_string()]);
        }

        args.extend(self.common_output_args());
        args.extend([
            "-movflags".to_string(),
            "+use_metadata_tags+faststart".to_string(),
        ]);

        // Keep source timestamps so `-to` trims at the absolute position and
        // the comment tag matches what players display.
        args.extend(["-copyts".to_string(), "-to".to_string(), self.to.clone()]);

        args.extend(["-y".to_string(), output.to_string_lossy().to_string()]);
        args
    }

    /// Complete argument list for a preview encode writing fragmented MP4 to
    /// stdout. Always re-encodes: arbitrary source codecs cannot be
    /// stream-copied into a live MP4 stream.
    pub fn preview_args(&self) -> Vec<String> {
        let mut args = self.input_args(true);

        args.extend(self.video_encode_args(self.height));
        args.extend(self.common_output_args());
        args.extend([
            "-movflags".to_string(),
            "frag_keyframe+empty_moov".to_string(),
        ]);

        args.extend(["-to".to_string(), self.to.clone()]);
        args.extend(["-f".to_string(), "mp4".to_string(), "pipe:1".to_string()]);
        args
    }

    fn input_args(&self, reencode: bool) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ];

        // Hardware decode setup only matters when frames get touched.
        if reencode {
            args.extend(self.backend.hwaccel_args().iter().map(|s| s.to_string()));
        }

        args.extend(["-ss".to_string(), self.from.clone()]);
        args.extend(["-i".to_string(), self.source_url.clone()]);
        args
    }

    fn video_encode_args(&self, height: u32) -> Vec<String> {
        let mut args = vec!["-c:v".to_string(), self.backend.encoder().to_string()];

        if let Some(chain) = self.backend.filter_chain(height) {
            args.extend(["-vf".to_string(), chain]);
        }

        args.extend(self.backend.quality_args(self.qp));
        args
    }

    fn common_output_args(&self) -> Vec<String> {
        let mut args = vec!["-c:a".to_string(), "libvorbis".to_string()];

        // Drop source chapters, keep the global metadata, then layer our own
        // tags on top.
        args.extend([
            "-map_chapters".to_string(),
            "-1".to_string(),
            "-map_metadata".to_string(),
            "0".to_string(),
        ]);
        args.extend(self.tags.metadata_args());
        args
    }
}
