use hlsforge_av::EncodeSettings;
use hlsforge_common::{Bitrate, EncoderBackend};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub encoder: EncoderConfig,

    #[serde(default)]
    pub transcode: TranscodeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory that unmatched GET paths are resolved against.
    #[serde(default = "default_static_root")]
    pub static_root: PathBuf,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_static_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_root: default_static_root(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    /// Checked in order; the first existing file is transcoded.
    #[serde(default = "default_candidates")]
    pub candidates: Vec<PathBuf>,
}

fn default_candidates() -> Vec<PathBuf> {
    vec![
        PathBuf::from("input/input.mp4"),
        PathBuf::from("input/input.ts"),
    ]
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            candidates: default_candidates(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Root holding one directory per rendition plus the master playlist.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}
fn default_manifest_name() -> String {
    "master.m3u8".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            manifest_name: default_manifest_name(),
        }
    }
}

impl OutputConfig {
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(&self.manifest_name)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}

/// Backend selection: detect at runtime, or pin one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    #[default]
    Auto,
    Software,
    VideoToolbox,
    Nvenc,
    Qsv,
    Vaapi,
}

impl BackendChoice {
    /// The pinned backend, or `None` for auto-detection.
    pub fn pinned(&self) -> Option<EncoderBackend> {
        match self {
            BackendChoice::Auto => None,
            BackendChoice::Software => Some(EncoderBackend::Software),
            BackendChoice::VideoToolbox => Some(EncoderBackend::VideoToolbox),
            BackendChoice::Nvenc => Some(EncoderBackend::Nvenc),
            BackendChoice::Qsv => Some(EncoderBackend::Qsv),
            BackendChoice::Vaapi => Some(EncoderBackend::Vaapi),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EncoderConfig {
    #[serde(default)]
    pub backend: BackendChoice,

    #[serde(default = "default_vaapi_device")]
    pub vaapi_device: String,
}

fn default_vaapi_device() -> String {
    hlsforge_av::job::DEFAULT_VAAPI_DEVICE.to_string()
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            backend: BackendChoice::default(),
            vaapi_device: default_vaapi_device(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodeConfig {
    /// Target HLS segment length in seconds.
    #[serde(default = "default_segment_seconds")]
    pub segment_seconds: u32,

    /// AAC bitrate, ffmpeg shorthand (e.g. `128k`).
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Kill a rendition encode after this many seconds.
    #[serde(default)]
    pub job_timeout_secs: Option<u64>,

    /// Leave failed renditions out of the master playlist.
    #[serde(default)]
    pub omit_failed_renditions: bool,
}

fn default_segment_seconds() -> u32 {
    6
}
fn default_audio_bitrate() -> String {
    "128k".to_string()
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            segment_seconds: default_segment_seconds(),
            audio_bitrate: default_audio_bitrate(),
            job_timeout_secs: None,
            omit_failed_renditions: false,
        }
    }
}

impl TranscodeConfig {
    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Per-job encode settings derived from the `transcode` and `encoder` sections.
    pub fn encode_settings(&self) -> Result<EncodeSettings, hlsforge_common::Error> {
        let audio_bitrate: Bitrate = self.transcode.audio_bitrate.parse()?;
        Ok(EncodeSettings {
            segment_seconds: self.transcode.segment_seconds,
            audio_bitrate,
            vaapi_device: self.encoder.vaapi_device.clone(),
        })
    }
}
