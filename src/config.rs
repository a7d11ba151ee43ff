use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::frame::DEFAULT_PLAYBACK_FPS;

const DEFAULT_BACKEND_ORIGIN: &str = "http://localhost:8000";
const DEFAULT_API_PREFIX: &str = "/api/v1";
const DEFAULT_BYPASS_HEADER: &str = "ngrok-skip-browser-warning";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DETECTION_LIMIT: u32 = 10_000;
const DEFAULT_CONTAINER_WIDTH: u32 = 960;

#[derive(Debug, Deserialize, Default)]
struct SentryConfigFile {
    backend: Option<BackendConfigFile>,
    player: Option<PlayerConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct BackendConfigFile {
    origin: Option<String>,
    api_prefix: Option<String>,
    bypass_header: Option<String>,
    timeout_secs: Option<u64>,
    detection_limit: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct PlayerConfigFile {
    default_fps: Option<f64>,
    container_width: Option<u32>,
    font_path: Option<PathBuf>,
    snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub backend: BackendSettings,
    pub player: PlayerSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendSettings {
    /// Backend origin, e.g. `https://abc123.ngrok-free.app`. Frame locators are
    /// resolved against it; API paths additionally get `api_prefix`.
    pub origin: String,
    pub api_prefix: String,
    /// Header that bypasses the tunnel's browser-warning interstitial.
    pub bypass_header: String,
    pub timeout: Duration,
    pub detection_limit: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSettings {
    /// Used when the backend suggests no playback rate.
    pub default_fps: f64,
    /// Available width for the rendered frame, in pixels.
    pub container_width: u32,
    pub font_path: Option<PathBuf>,
    /// PNG written after every successful draw.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            origin: DEFAULT_BACKEND_ORIGIN.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            bypass_header: DEFAULT_BYPASS_HEADER.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            detection_limit: DEFAULT_DETECTION_LIMIT,
        }
    }
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            default_fps: DEFAULT_PLAYBACK_FPS,
            container_width: DEFAULT_CONTAINER_WIDTH,
            font_path: None,
            snapshot_path: None,
        }
    }
}

impl SentryConfig {
    /// File at `$SENTRY_CONFIG` (JSON, or TOML by extension), then env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SENTRY_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SentryConfigFile) -> Self {
        let backend_defaults = BackendSettings::default();
        let player_defaults = PlayerSettings::default();
        let backend = file.backend.unwrap_or_default();
        let player = file.player.unwrap_or_default();
        Self {
            backend: BackendSettings {
                origin: backend.origin.unwrap_or(backend_defaults.origin),
                api_prefix: backend.api_prefix.unwrap_or(backend_defaults.api_prefix),
                bypass_header: backend
                    .bypass_header
                    .unwrap_or(backend_defaults.bypass_header),
                timeout: backend
                    .timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(backend_defaults.timeout),
                detection_limit: backend
                    .detection_limit
                    .unwrap_or(backend_defaults.detection_limit),
            },
            player: PlayerSettings {
                default_fps: player.default_fps.unwrap_or(player_defaults.default_fps),
                container_width: player
                    .container_width
                    .unwrap_or(player_defaults.container_width),
                font_path: player.font_path,
                snapshot_path: player.snapshot_path,
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(origin) = std::env::var("SENTRY_BACKEND_URL") {
            if !origin.trim().is_empty() {
                self.backend.origin = origin.trim().to_string();
            }
        }
        if let Ok(timeout) = std::env::var("SENTRY_TIMEOUT_SECS") {
            let seconds: u64 = timeout.trim().parse().map_err(|_| {
                anyhow!("SENTRY_TIMEOUT_SECS must be an integer number of seconds")
            })?;
            self.backend.timeout = Duration::from_secs(seconds);
        }
        if let Ok(fps) = std::env::var("SENTRY_DEFAULT_FPS") {
            self.player.default_fps = fps
                .trim()
                .parse()
                .map_err(|_| anyhow!("SENTRY_DEFAULT_FPS must be a number"))?;
        }
        if let Ok(width) = std::env::var("SENTRY_CONTAINER_WIDTH") {
            self.player.container_width = width
                .trim()
                .parse()
                .map_err(|_| anyhow!("SENTRY_CONTAINER_WIDTH must be an integer pixel width"))?;
        }
        if let Ok(path) = std::env::var("SENTRY_FONT_PATH") {
            if !path.trim().is_empty() {
                self.player.font_path = Some(PathBuf::from(path));
            }
        }
        Ok(())
    }

    /// Reject values the player cannot work with. Also normalizes the origin
    /// (no trailing slash) and the API prefix (leading slash, no trailing one).
    pub fn validate(&mut self) -> Result<()> {
        let origin = Url::parse(&self.backend.origin)
            .map_err(|e| anyhow!("invalid backend origin '{}': {}", self.backend.origin, e))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(anyhow!(
                "backend origin must be http(s), got '{}'",
                origin.scheme()
            ));
        }
        self.backend.origin = self.backend.origin.trim_end_matches('/').to_string();

        let prefix = self.backend.api_prefix.trim().trim_end_matches('/');
        self.backend.api_prefix = if prefix.is_empty() || prefix.starts_with('/') {
            prefix.to_string()
        } else {
            format!("/{}", prefix)
        };

        if self.backend.bypass_header.trim().is_empty() {
            return Err(anyhow!("bypass header name must not be empty"));
        }
        if self.backend.timeout.as_secs() == 0 {
            return Err(anyhow!("backend timeout must be greater than zero"));
        }
        if self.backend.detection_limit == 0 {
            return Err(anyhow!("detection limit must be greater than zero"));
        }
        if !self.player.default_fps.is_finite() || self.player.default_fps <= 0.0 {
            return Err(anyhow!("default playback fps must be positive"));
        }
        if self.player.container_width == 0 {
            return Err(anyhow!("container width must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            backend: BackendSettings::default(),
            player: PlayerSettings::default(),
        }
    }
}

fn read_config_file(path: &Path) -> Result<SentryConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
