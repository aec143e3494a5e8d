//! Pipeline configuration.
//!
//! Persisted as JSON under the platform config directory
//! (`<config_dir>/Signify/pipeline.json`). Missing file or unreadable
//! content falls back to defaults; individual missing fields take their
//! default values so old config files survive upgrades.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::capture::CaptureOptions;
use crate::detection::DetectionSettings;
use crate::error::ConfigError;
use crate::transport::BackoffPolicy;

const CONFIG_DIR_NAME: &str = "Signify";
const CONFIG_FILE_NAME: &str = "pipeline.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Recognition backend WebSocket endpoint
    pub endpoint: String,

    /// Minimum milliseconds between outbound frames
    pub min_send_interval_ms: u64,

    /// Reconnection attempts before giving up
    pub max_reconnect_attempts: u32,

    /// First reconnection delay in milliseconds; doubles per attempt
    pub reconnect_base_delay_ms: u64,

    /// Reconnection delay ceiling in milliseconds
    pub reconnect_max_delay_ms: u64,

    /// Milliseconds between camera captures
    pub frame_interval_ms: u64,

    /// JPEG quality in [0.0, 1.0]
    pub jpeg_quality: f64,

    /// Frames wider than this are downscaled
    pub max_frame_width: u32,

    /// Minimum confidence for a detection to fire
    pub confidence_threshold: f64,

    /// Consecutive qualifying results required before a detection fires
    pub required_consecutive_detections: u32,

    /// Log every recognition comparison at debug level
    pub debug_mode: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:8000/ws".to_string(),
            min_send_interval_ms: 100,
            max_reconnect_attempts: 5,
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 10000,
            frame_interval_ms: 200,
            jpeg_quality: 0.5,
            max_frame_width: 640,
            confidence_threshold: 0.8,
            required_consecutive_detections: 1,
            debug_mode: false,
        }
    }
}

impl PipelineConfig {
    /// Load from the default location, falling back to defaults when the
    /// file is missing or unreadable
    pub fn load() -> Self {
        match Self::config_path() {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                warn!("Config directory unavailable, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Load from a specific path, falling back to defaults
    pub fn load_from(path: &PathBuf) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Invalid config at {}, using defaults: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Save to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save to a specific path, creating parent directories as needed
    pub fn save_to(&self, path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::DirectoryCreationFailed {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let contents =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })?;

        fs::write(path, contents).map_err(|e| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Default config file location
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or_else(|| {
            ConfigError::Invalid("platform config directory not available".to_string())
        })?;
        Ok(dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.is_empty() {
            return Err(ConfigError::Invalid("endpoint must not be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "jpeg_quality must be in [0.0, 1.0], got {}",
                self.jpeg_quality
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::Invalid(format!(
                "confidence_threshold must be in [0.0, 1.0], got {}",
                self.confidence_threshold
            )));
        }
        if self.max_frame_width == 0 {
            return Err(ConfigError::Invalid(
                "max_frame_width must be positive".to_string(),
            ));
        }
        if self.required_consecutive_detections == 0 {
            return Err(ConfigError::Invalid(
                "required_consecutive_detections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            frame_interval: Duration::from_millis(self.frame_interval_ms),
            quality: self.jpeg_quality,
            max_width: self.max_frame_width,
        }
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            base_delay: Duration::from_millis(self.reconnect_base_delay_ms),
            max_delay: Duration::from_millis(self.reconnect_max_delay_ms),
            max_attempts: self.max_reconnect_attempts,
        }
    }

    pub fn detection_settings(&self) -> DetectionSettings {
        DetectionSettings {
            confidence_threshold: self.confidence_threshold,
            required_consecutive_detections: self.required_consecutive_detections,
            debug_mode: self.debug_mode,
        }
    }

    pub fn min_send_interval(&self) -> Duration {
        Duration::from_millis(self.min_send_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.endpoint, "ws://localhost:8000/ws");
        assert_eq!(config.frame_interval_ms, 200);
        assert_eq!(config.min_send_interval_ms, 100);
        assert_eq!(config.max_reconnect_attempts, 5);
        assert!((config.confidence_threshold - 0.8).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipeline.json");

        let mut config = PipelineConfig::default();
        config.endpoint = "ws://example.com:9000/ws".to_string();
        config.confidence_threshold = 0.6;
        config.save_to(&path).unwrap();

        let loaded = PipelineConfig::load_from(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("does_not_exist.json");

        let config = PipelineConfig::load_from(&path);
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_load_invalid_json_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipeline.json");
        fs::write(&path, "not json at all").unwrap();

        let config = PipelineConfig::load_from(&path);
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipeline.json");
        fs::write(&path, r#"{"endpoint":"ws://10.0.0.1:8000/ws"}"#).unwrap();

        let config = PipelineConfig::load_from(&path);
        assert_eq!(config.endpoint, "ws://10.0.0.1:8000/ws");
        assert_eq!(config.frame_interval_ms, 200);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.jpeg_quality = 1.5;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.endpoint = String::new();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.required_consecutive_detections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_derived_settings() {
        let config = PipelineConfig::default();

        let backoff = config.backoff_policy();
        assert_eq!(backoff.base_delay, Duration::from_millis(1000));
        assert_eq!(backoff.max_attempts, 5);

        let capture = config.capture_options();
        assert_eq!(capture.frame_interval, Duration::from_millis(200));
        assert_eq!(capture.max_width, 640);

        let detection = config.detection_settings();
        assert_eq!(detection.required_consecutive_detections, 1);
    }
}
