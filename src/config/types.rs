use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use stromboli_av::TranscodeSettings;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub transcode: TranscodeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory whose contents are browsed and played.
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            root: default_root(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// Seconds before a hung ffprobe is killed and the file treated as
    /// needing conversion.
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
}

fn default_probe_timeout() -> u64 {
    10
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_probe_timeout(),
        }
    }
}

/// Live transcode settings as they appear in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodeConfig {
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    #[serde(default = "default_preset")]
    pub preset: String,

    #[serde(default = "default_tune")]
    pub tune: String,

    #[serde(default = "default_crf")]
    pub crf: u32,

    #[serde(default = "default_max_rate")]
    pub max_rate: String,

    #[serde(default = "default_buf_size")]
    pub buf_size: String,

    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    #[serde(default = "default_audio_channels")]
    pub audio_channels: u32,

    /// Read input at native frame rate (`-re`).
    #[serde(default = "default_realtime")]
    pub realtime: bool,
}

fn default_video_codec() -> String {
    "libx264".to_string()
}
fn default_preset() -> String {
    "ultrafast".to_string()
}
fn default_tune() -> String {
    "zerolatency".to_string()
}
fn default_crf() -> u32 {
    23
}
fn default_max_rate() -> String {
    "3M".to_string()
}
fn default_buf_size() -> String {
    "6M".to_string()
}
fn default_pixel_format() -> String {
    "yuv420p".to_string()
}
fn default_audio_codec() -> String {
    "aac".to_string()
}
fn default_audio_bitrate() -> String {
    "128k".to_string()
}
fn default_audio_channels() -> u32 {
    2
}
fn default_realtime() -> bool {
    true
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            video_codec: default_video_codec(),
            preset: default_preset(),
            tune: default_tune(),
            crf: default_crf(),
            max_rate: default_max_rate(),
            buf_size: default_buf_size(),
            pixel_format: default_pixel_format(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            audio_channels: default_audio_channels(),
            realtime: default_realtime(),
        }
    }
}

impl From<&TranscodeConfig> for TranscodeSettings {
    fn from(config: &TranscodeConfig) -> Self {
        TranscodeSettings {
            video_codec: config.video_codec.clone(),
            preset: config.preset.clone(),
            tune: config.tune.clone(),
            crf: config.crf,
            max_rate: config.max_rate.clone(),
            buf_size: config.buf_size.clone(),
            pixel_format: config.pixel_format.clone(),
            audio_codec: config.audio_codec.clone(),
            audio_bitrate: config.audio_bitrate.clone(),
            audio_channels: config.audio_channels,
            realtime: config.realtime,
        }
    }
}
