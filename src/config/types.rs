use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::transcode::Backend;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub plex: PlexConfig,

    #[serde(default)]
    pub transcode: TranscodeConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory with the built web frontend, served at `/` when set.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
            auth: AuthConfig::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Require a plex.tv login for API access (default: true).
    #[serde(default = "default_auth_enabled")]
    pub enabled: bool,

    /// Session cookie lifetime in hours (default: 720 = 30 days).
    #[serde(default = "default_session_timeout")]
    pub session_timeout_hours: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: default_auth_enabled(),
            session_timeout_hours: default_session_timeout(),
        }
    }
}

fn default_auth_enabled() -> bool {
    true
}
fn default_session_timeout() -> u64 {
    720
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlexConfig {
    /// Base URL of the Plex Media Server, e.g. "http://192.168.1.10:32400".
    #[serde(default)]
    pub host: String,

    /// Server-owner token used for catalog lookups and source playback.
    #[serde(default)]
    pub token: String,

    /// X-Plex-Client-Identifier sent to plex.tv. Must stay stable across
    /// restarts or claimed PIN tokens become orphaned.
    #[serde(default = "default_client_identifier")]
    pub client_identifier: String,
}

impl Default for PlexConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            token: String::new(),
            client_identifier: default_client_identifier(),
        }
    }
}

fn default_client_identifier() -> String {
    "plexclip".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodeConfig {
    /// Encoder backend: "software", "vaapi" or "nvenc".
    #[serde(default)]
    pub backend: Backend,

    /// Directory finished clips are written to before download.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Maximum ffmpeg processes running at once; further requests get 503.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Seconds a finished clip survives in the output directory.
    #[serde(default = "default_keep_for")]
    pub keep_for_secs: u64,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            output_dir: default_output_dir(),
            max_concurrent: default_max_concurrent(),
            keep_for_secs: default_keep_for(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    std::env::temp_dir().join("plexclip")
}
fn default_max_concurrent() -> usize {
    2
}
fn default_keep_for() -> u64 {
    3600
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}

impl ToolsConfig {
    /// Path to ffmpeg, falling back to PATH lookup by name.
    pub fn ffmpeg(&self) -> PathBuf {
        self.ffmpeg_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("ffmpeg"))
    }

    /// Path to ffprobe, falling back to PATH lookup by name.
    pub fn ffprobe(&self) -> PathBuf {
        self.ffprobe_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("ffprobe"))
    }
}
