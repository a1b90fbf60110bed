use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_PORT: u16 = 8099;
pub const DEFAULT_TARGET_URL: &str = "https://www.familystream.com";
pub const DEFAULT_HUB_URL: &str = "http://supervisor/core";
const DEFAULT_PUBLIC_DIR: &str = "public";

#[derive(Deserialize, Default, Debug)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub localhost: Option<bool>,
    pub target_url: Option<String>,
    pub hub_url: Option<String>,
    pub default_media_player: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub public_dir: Option<PathBuf>,
    pub public_url: Option<String>,
    pub accept_invalid_certs: Option<bool>,
    #[serde(default)]
    pub capture: FileCaptureConfig,
}

/// `[capture]` table of the config file.
#[derive(Deserialize, Default, Debug)]
pub struct FileCaptureConfig {
    pub enabled: Option<bool>,
    pub ffmpeg: Option<PathBuf>,
    pub input_format: Option<String>,
    pub input_device: Option<String>,
    pub bitrate: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub ffmpeg: PathBuf,
    pub input_format: String,
    pub input_device: String,
    pub bitrate: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            ffmpeg: PathBuf::from("ffmpeg"),
            input_format: "pulse".to_string(),
            input_device: "default".to_string(),
            bitrate: "192k".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub localhost: bool,
    pub target_url: String,
    pub hub_url: String,
    pub token: String,
    pub default_media_player: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub public_dir: PathBuf,
    pub public_url: Option<String>,
    pub accept_invalid_certs: bool,
    /// `None` when capture is disabled.
    pub capture: Option<CaptureConfig>,
}

impl Config {
    pub fn resolve(file: Option<FileConfig>, args: &crate::cli::Args) -> Self {
        let file = file.unwrap_or_default();
        let capture_enabled = args.capture || file.capture.enabled.unwrap_or(false);
        let capture = capture_enabled.then(|| {
            let defaults = CaptureConfig::default();
            CaptureConfig {
                ffmpeg: file.capture.ffmpeg.unwrap_or(defaults.ffmpeg),
                input_format: file.capture.input_format.unwrap_or(defaults.input_format),
                input_device: file.capture.input_device.unwrap_or(defaults.input_device),
                bitrate: file.capture.bitrate.unwrap_or(defaults.bitrate),
            }
        });

        Config {
            port: args.port.or(file.port).unwrap_or(DEFAULT_PORT),
            localhost: args.localhost || file.localhost.unwrap_or(false),
            target_url: trim_base(args.target.clone().or(file.target_url))
                .unwrap_or_else(|| DEFAULT_TARGET_URL.to_string()),
            hub_url: trim_base(args.hub_url.clone().or(file.hub_url))
                .unwrap_or_else(|| DEFAULT_HUB_URL.to_string()),
            token: args.token.clone().unwrap_or_default(),
            default_media_player: args
                .default_media_player
                .clone()
                .or(file.default_media_player)
                .filter(|s| !s.is_empty()),
            cache_dir: args.cache_dir.clone().or(file.cache_dir),
            public_dir: args
                .public_dir
                .clone()
                .or(file.public_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PUBLIC_DIR)),
            public_url: trim_base(args.public_url.clone().or(file.public_url)),
            accept_invalid_certs: file.accept_invalid_certs.unwrap_or(true),
            capture,
        }
    }
}

/// Drop trailing slashes so paths can be appended with `format!("{base}{path}")`.
fn trim_base(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim_end_matches('/').to_string())
        .filter(|u| !u.is_empty())
}

pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_owned());
    }
    let cwd_config = PathBuf::from("familystream.toml");
    if cwd_config.exists() {
        return Some(cwd_config);
    }
    if let Some(config_dir) = dirs::config_dir() {
        let xdg_config = config_dir.join("familystream").join("config.toml");
        if xdg_config.exists() {
            return Some(xdg_config);
        }
    }
    None
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: FileConfig = toml::from_str(&content)?;
    Ok(config)
}
