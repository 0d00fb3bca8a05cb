//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{SlidecastError, SlidecastResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Output surface and encoder settings.
    pub output: OutputDefaults,

    /// Font used for text elements.
    pub fonts: FontConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Surface size, frame rate and encoder parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputDefaults {
    /// Surface width in pixels.
    pub width: u32,

    /// Surface height in pixels.
    pub height: u32,

    /// Export frame rate.
    pub fps: u32,

    /// Encoder target bitrate in kbps.
    pub video_bitrate_kbps: u32,

    /// Refresh cadence of the interactive playback loop (Hz).
    pub refresh_hz: u32,
}

/// Font selection for the raster surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Explicit TrueType/OpenType file. When unset, well-known system
    /// locations are searched.
    pub path: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "slidecast=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for OutputDefaults {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            video_bitrate_kbps: 6000,
            refresh_hz: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Reject settings no surface or encoder can honor.
    pub fn validate(&self) -> SlidecastResult<()> {
        let output = &self.output;
        if output.width == 0 || output.height == 0 {
            return Err(SlidecastError::config(format!(
                "output size {}x{} must be non-zero",
                output.width, output.height
            )));
        }
        if output.fps == 0 || output.refresh_hz == 0 {
            return Err(SlidecastError::config(
                "output fps and refresh_hz must be positive",
            ));
        }
        if output.video_bitrate_kbps == 0 {
            return Err(SlidecastError::config("video_bitrate_kbps must be positive"));
        }
        Ok(())
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("slidecast").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fixed_output() {
        let config = AppConfig::default();
        assert_eq!(config.output.width, 1280);
        assert_eq!(config.output.height, 720);
        assert_eq!(config.output.fps, 30);
        assert_eq!(config.output.video_bitrate_kbps, 6000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"output":{"fps":24}}"#).unwrap();
        assert_eq!(config.output.fps, 24);
        assert_eq!(config.output.width, 1280);
        assert!(config.fonts.path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_output() {
        let mut config = AppConfig::default();
        config.output.fps = 0;
        assert!(matches!(
            config.validate(),
            Err(SlidecastError::Config { .. })
        ));

        let mut config = AppConfig::default();
        config.output.height = 0;
        assert!(config.validate().is_err());
    }
}
