mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./plexclip.toml",
        "~/.config/plexclip/config.toml",
        "/etc/plexclip/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    Ok(Config::default())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if !config.plex.host.is_empty()
        && !config.plex.host.starts_with("http://")
        && !config.plex.host.starts_with("https://")
    {
        anyhow::bail!("plex.host must be an http(s) URL: {}", config.plex.host);
    }

    if config.plex.client_identifier.is_empty() {
        anyhow::bail!("plex.client_identifier cannot be empty");
    }

    if config.transcode.max_concurrent == 0 {
        anyhow::bail!("transcode.max_concurrent must be at least 1");
    }

    if config.transcode.keep_for_secs == 0 {
        anyhow::bail!("transcode.keep_for_secs must be at least 1");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcode::Backend;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn default_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert!(config.server.auth.enabled);
        assert_eq!(config.plex.client_identifier, "plexclip");
        assert_eq!(config.transcode.max_concurrent, 2);
        assert_eq!(config.transcode.keep_for_secs, 3600);
        assert!(matches!(config.transcode.backend, Backend::Software));
    }

    #[test]
    fn parses_full_config() {
        let file = write_config(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9090

            [plex]
            host = "http://plex.local:32400"
            token = "abc123"

            [transcode]
            backend = "vaapi"
            max_concurrent = 4
            keep_for_secs = 120

            [tools]
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
            "#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.plex.host, "http://plex.local:32400");
        assert_eq!(config.plex.token, "abc123");
        assert!(matches!(config.transcode.backend, Backend::Vaapi));
        assert_eq!(config.transcode.max_concurrent, 4);
        assert_eq!(config.transcode.keep_for_secs, 120);
        assert_eq!(
            config.tools.ffmpeg_path.as_deref(),
            Some(Path::new("/opt/ffmpeg/bin/ffmpeg"))
        );
    }

    #[test]
    fn rejects_zero_port() {
        let file = write_config("[server]\nport = 0\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn rejects_non_http_plex_host() {
        let file = write_config("[plex]\nhost = \"plex.local:32400\"\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn rejects_zero_concurrency() {
        let file = write_config("[transcode]\nmax_concurrent = 0\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_config(Path::new("/definitely/not/here.toml")).is_err());
    }

    #[test]
    fn unknown_backend_is_an_error() {
        let file = write_config("[transcode]\nbackend = \"quicksync\"\n");
        assert!(load_config(file.path()).is_err());
    }
}
