//! FFprobe-based source inspection.

pub mod tools;

pub use tools::{check_tools, ToolInfo};

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::transcode::ToolCommand;

/// A probe against a live URL should answer well before this.
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// What the pipeline needs to know about a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// Codec name of the stream the encoder will read.
    pub video_codec: String,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_name: Option<String>,
}

/// Probe a source URL with ffprobe and report its codec.
///
/// Only the first reported stream is consulted; sources with unusual stream
/// ordering may report an unexpected codec. Failures are never retried.
pub async fn probe(ffprobe: &Path, source_url: &str) -> Result<ProbeResult> {
    let output = ToolCommand::new(ffprobe.to_path_buf())
        .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
        .arg(source_url)
        .timeout(PROBE_TIMEOUT)
        .capture()
        .await
        .map_err(|e| Error::Probe(e.to_string()))?;

    if !output.stderr.trim().is_empty() {
        tracing::debug!(stderr = %output.stderr.trim(), "ffprobe diagnostics");
    }

    if !output.status.success() {
        return Err(Error::Probe(format!(
            "ffprobe exited with {}: {}",
            output.status,
            output.stderr.trim()
        )));
    }

    parse_probe_output(&output.stdout)
}

fn parse_probe_output(stdout: &str) -> Result<ProbeResult> {
    let parsed: FfprobeOutput = serde_json::from_str(stdout)
        .map_err(|e| Error::Probe(format!("unparseable ffprobe output: {e}")))?;

    let video_codec = parsed
        .streams
        .first()
        .and_then(|s| s.codec_name.clone())
        .ok_or_else(|| Error::Probe("no streams reported".to_string()))?;

    Ok(ProbeResult { video_codec })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_stream() {
        let json = r#"{
            "streams": [
                {"index": 0, "codec_name": "hevc", "codec_type": "video"},
                {"index": 1, "codec_name": "aac", "codec_type": "audio"}
            ]
        }"#;
        let result = parse_probe_output(json).unwrap();
        assert_eq!(result.video_codec, "hevc");
    }

    #[test]
    fn empty_stream_list_fails() {
        let err = parse_probe_output(r#"{"streams": []}"#).unwrap_err();
        assert!(matches!(err, Error::Probe(_)));
    }

    #[test]
    fn missing_codec_name_fails() {
        let err = parse_probe_output(r#"{"streams": [{"index": 0}]}"#).unwrap_err();
        assert!(matches!(err, Error::Probe(_)));
    }

    #[test]
    fn malformed_json_fails() {
        let err = parse_probe_output("moov atom not found").unwrap_err();
        assert!(matches!(err, Error::Probe(_)));
        assert!(err.to_string().contains("unparseable"));
    }
}
