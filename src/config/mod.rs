mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config = parse_config(&content)
        .with_context(|| format!("Failed to load config file: {:?}", path))?;

    Ok(config)
}

/// Parse and validate configuration text
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config")?;
    validate_config(&config)?;
    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./hlsforge.toml",
        "./config.toml",
        "~/.config/hlsforge/config.toml",
        "/etc/hlsforge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.input.candidates.is_empty() {
        anyhow::bail!("At least one input candidate path is required");
    }

    if config.transcode.segment_seconds == 0 {
        anyhow::bail!("transcode.segment_seconds must be greater than 0");
    }

    if config.transcode.job_timeout_secs == Some(0) {
        anyhow::bail!("transcode.job_timeout_secs must be greater than 0 when set");
    }

    if config.output.manifest_name.trim().is_empty() {
        anyhow::bail!("output.manifest_name cannot be empty");
    }

    config
        .encode_settings()
        .context("Invalid transcode.audio_bitrate")?;

    if !config.server.static_root.exists() {
        tracing::warn!(
            "Static root does not exist: {:?}",
            config.server.static_root
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hlsforge_common::{Bitrate, EncoderBackend};
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.input.candidates.len(), 2);
        assert_eq!(
            config.output.manifest_path(),
            std::path::PathBuf::from("output/master.m3u8")
        );
        assert_eq!(config.encoder.backend, BackendChoice::Auto);
        assert_eq!(config.encoder.vaapi_device, "/dev/dri/renderD128");
        assert!(config.transcode.job_timeout().is_none());
        assert!(!config.transcode.omit_failed_renditions);

        let settings = config.encode_settings().unwrap();
        assert_eq!(settings.segment_seconds, 6);
        assert_eq!(settings.audio_bitrate, Bitrate::from_kbps(128));
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
[server]
port = 9000
static_root = "/srv/www"

[input]
candidates = ["media/source.mkv"]

[output]
dir = "/srv/hls"

[tools]
ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"

[encoder]
backend = "vaapi"
vaapi_device = "/dev/dri/renderD129"

[transcode]
segment_seconds = 4
audio_bitrate = "96k"
job_timeout_secs = 3600
omit_failed_renditions = true
"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.input.candidates[0].to_str(), Some("media/source.mkv"));
        assert_eq!(config.encoder.backend.pinned(), Some(EncoderBackend::Vaapi));
        assert_eq!(
            config.transcode.job_timeout(),
            Some(std::time::Duration::from_secs(3600))
        );
        assert!(config.transcode.omit_failed_renditions);
        assert_eq!(config.output.manifest_name, "master.m3u8");
    }

    #[test]
    fn test_validation_errors() {
        assert!(parse_config("[server]\nport = 0\n").is_err());
        assert!(parse_config("[input]\ncandidates = []\n").is_err());
        assert!(parse_config("[transcode]\nsegment_seconds = 0\n").is_err());
        assert!(parse_config("[transcode]\naudio_bitrate = \"loud\"\n").is_err());
        assert!(parse_config("[transcode]\naudio_bitrate = \"99999999999999999k\"\n").is_err());
        assert!(parse_config("[transcode]\njob_timeout_secs = 0\n").is_err());
        assert!(parse_config("[encoder]\nbackend = \"cuda\"\n").is_err());
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hlsforge.toml");
        std::fs::write(&path, "[server]\nport = 8181\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.server.port, 8181);

        assert!(load_config(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    #[serial]
    fn test_load_config_or_default_searches_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let defaulted = load_config_or_default(None);
        std::fs::write(dir.path().join("hlsforge.toml"), "[server]\nport = 7070\n").unwrap();
        let found = load_config_or_default(None);

        std::env::set_current_dir(original).unwrap();

        // A user-level config may exist on the host; only assert what the cwd controls.
        assert!(defaulted.is_ok());
        assert_eq!(found.unwrap().server.port, 7070);
    }
}
