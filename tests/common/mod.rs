//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which wires a full [`AppContext`] against two
//! wiremock doubles (the media server and plex.tv) and stub encoder scripts
//! in a temp directory. The [`with_server`] constructor starts Axum on a
//! random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use plexclip::clip::ClipService;
use plexclip::config::Config;
use plexclip::plex::{PlexServer, PlexTv};
use plexclip::server::{create_router, AppContext};

/// Machine identifier reported for the paired mock server.
pub const MACHINE_ID: &str = "machine-under-test";

/// ffprobe stub reporting a single h264 stream.
pub const H264_FFPROBE: &str = r#"#!/bin/sh
printf '{"streams":[{"codec_name":"h264"}]}'
"#;

/// ffprobe stub reporting a single hevc stream.
pub const HEVC_FFPROBE: &str = r#"#!/bin/sh
printf '{"streams":[{"codec_name":"hevc"}]}'
"#;

/// ffprobe stub that fails outright.
pub const FAILING_FFPROBE: &str = r#"#!/bin/sh
echo 'Connection refused' >&2
exit 1
"#;

/// ffmpeg stub: writes a canned payload to the output file, or to stdout on
/// the streaming invocation.
pub const WORKING_FFMPEG: &str = r#"#!/bin/sh
for last; do :; done
if [ "$last" = "pipe:1" ]; then
    printf 'FAKE-PREVIEW-STREAM'
else
    printf 'FAKE-MP4-PAYLOAD' > "$last"
fi
"#;

/// ffmpeg stub: leaves a partial file behind and exits non-zero.
pub const FAILING_FFMPEG: &str = r#"#!/bin/sh
for last; do :; done
if [ "$last" != "pipe:1" ]; then
    printf 'partial' > "$last"
fi
echo 'Conversion failed!' >&2
exit 1
"#;

/// ffmpeg stub: holds its encode slot for a second before finishing.
pub const SLOW_FFMPEG: &str = r#"#!/bin/sh
for last; do :; done
sleep 1
if [ "$last" = "pipe:1" ]; then
    printf 'FAKE-PREVIEW-STREAM'
else
    printf 'FAKE-MP4-PAYLOAD' > "$last"
fi
"#;

/// ffmpeg stub: records its arguments next to itself, then behaves like
/// [`WORKING_FFMPEG`].
pub const RECORDING_FFMPEG: &str = r#"#!/bin/sh
echo "$@" > "$(dirname "$0")/ffmpeg-args.txt"
for last; do :; done
if [ "$last" = "pipe:1" ]; then
    printf 'FAKE-PREVIEW-STREAM'
else
    printf 'FAKE-MP4-PAYLOAD' > "$last"
fi
"#;

/// Write an executable stub script into `dir` and return its path.
pub fn stub_tool(dir: &Path, name: &str, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, script).expect("failed to write stub tool");
    let mut perms = std::fs::metadata(&path)
        .expect("failed to stat stub tool")
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("failed to chmod stub tool");
    path
}

/// Test harness wrapping a fully-constructed [`AppContext`] backed by mock
/// upstreams and stub tools.
pub struct TestHarness {
    pub ctx: AppContext,
    pub pms: MockServer,
    pub plex_tv: MockServer,
    /// Owns the stub tool scripts and the clip output directory.
    pub dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new harness with auth disabled and well-behaved stub tools.
    pub async fn new() -> Self {
        let mut config = Config::default();
        config.server.auth.enabled = false;
        Self::with_config(config).await
    }

    /// Create a harness from a custom config. The Plex host, output
    /// directory and tool paths are overwritten to point at the harness
    /// doubles; everything else is honored.
    pub async fn with_config(mut config: Config) -> Self {
        let pms = MockServer::start().await;
        let plex_tv = MockServer::start().await;
        let dir = tempfile::tempdir().expect("failed to create temp dir");

        config.plex.host = pms.uri();
        config.plex.token = "server-token".to_string();
        config.transcode.output_dir = dir.path().join("clips");
        config.tools.ffmpeg_path = Some(stub_tool(dir.path(), "ffmpeg", WORKING_FFMPEG));
        config.tools.ffprobe_path = Some(stub_tool(dir.path(), "ffprobe", H264_FFPROBE));

        let plex = Arc::new(PlexServer::new(&config.plex));
        let tv = Arc::new(PlexTv::with_base_url(
            plex_tv.uri(),
            config.plex.client_identifier.clone(),
        ));
        let clips = Arc::new(ClipService::new(plex.clone(), &config));

        let ctx = AppContext {
            config: Arc::new(config),
            plex,
            plex_tv: tv,
            clips,
            machine_id: MACHINE_ID.to_string(),
        };

        Self {
            ctx,
            pms,
            plex_tv,
            dir,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        let mut config = Config::default();
        config.server.auth.enabled = false;
        Self::with_server_config(config).await
    }

    /// Start an Axum server with custom config on a random port.
    pub async fn with_server_config(config: Config) -> (Self, SocketAddr) {
        let harness = Self::with_config(config).await;
        let app = create_router(harness.ctx.clone(), None);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Directory where finished clips land.
    pub fn clips_dir(&self) -> PathBuf {
        self.dir.path().join("clips")
    }

    /// Swap the ffmpeg stub the running service invokes.
    pub fn use_ffmpeg(&self, script: &str) {
        stub_tool(self.dir.path(), "ffmpeg", script);
    }

    /// Swap the ffprobe stub the running service invokes.
    pub fn use_ffprobe(&self, script: &str) {
        stub_tool(self.dir.path(), "ffprobe", script);
    }

    /// Arguments of the last ffmpeg invocation, as recorded by
    /// [`RECORDING_FFMPEG`].
    pub fn recorded_ffmpeg_args(&self) -> String {
        std::fs::read_to_string(self.dir.path().join("ffmpeg-args.txt"))
            .expect("no ffmpeg invocation was recorded")
    }

    /// Mount `/library/metadata/42`: episode "Bar" of "Foo" S02E05 with one
    /// h264 rendition.
    pub async fn mount_episode(&self) {
        Mock::given(method("GET"))
            .and(path("/library/metadata/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(episode_metadata()))
            .mount(&self.pms)
            .await;
    }

    /// Mount `/library/metadata/99`: the movie "Baz" (1999).
    pub async fn mount_movie(&self) {
        Mock::given(method("GET"))
            .and(path("/library/metadata/99"))
            .respond_with(ResponseTemplate::new(200).set_body_json(movie_metadata()))
            .mount(&self.pms)
            .await;
    }

    /// Mount `/status/sessions` with one playing session per user name.
    pub async fn mount_sessions(&self, users: &[&str]) {
        Mock::given(method("GET"))
            .and(path("/status/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sessions_body(users)))
            .mount(&self.pms)
            .await;
    }
}

pub fn episode_metadata() -> serde_json::Value {
    json!({
        "MediaContainer": {
            "size": 1,
            "Metadata": [{
                "ratingKey": "42",
                "type": "episode",
                "title": "Bar",
                "grandparentTitle": "Foo",
                "parentIndex": 2,
                "index": 5,
                "thumb": "/library/metadata/42/thumb/1",
                "Media": [{
                    "id": 7,
                    "videoProfile": "high",
                    "Part": [{"id": 70, "key": "/library/parts/70/file.mkv"}]
                }]
            }]
        }
    })
}

pub fn movie_metadata() -> serde_json::Value {
    json!({
        "MediaContainer": {
            "size": 1,
            "Metadata": [{
                "ratingKey": "99",
                "type": "movie",
                "title": "Baz",
                "year": 1999,
                "Media": [{
                    "id": 9,
                    "videoProfile": "high",
                    "Part": [{"id": 90, "key": "/library/parts/90/file.mp4"}]
                }]
            }]
        }
    })
}

pub fn sessions_body(users: &[&str]) -> serde_json::Value {
    let sessions: Vec<serde_json::Value> = users
        .iter()
        .map(|user| {
            json!({
                "ratingKey": "42",
                "type": "episode",
                "title": "Bar",
                "grandparentTitle": "Foo",
                "parentIndex": 2,
                "index": 5,
                "viewOffset": 60000,
                "thumb": "/library/metadata/42/thumb/1",
                "User": {"id": "1", "title": user},
                "Player": {"product": "Plex Web", "state": "playing"}
            })
        })
        .collect();

    json!({
        "MediaContainer": {
            "size": sessions.len(),
            "Metadata": sessions
        }
    })
}
