//! Configuration types and defaults

use crate::host::EntryPoint;
use mockrtc_core::{DevicePreset, MockRtcError, MockRtcResult, PRESET_NAMES};
use mockrtc_media::{MAX_FRAME_RATE, MIN_SCALE_FACTOR};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default media load timeout
pub const DEFAULT_MEDIA_TIMEOUT_MS: u64 = 10_000;

/// Default render frame rate
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// Which entry points `mock()` intercepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockOptions {
    /// Intercept `getUserMedia`
    pub get_user_media: bool,
    /// Intercept `getSupportedConstraints`
    pub get_supported_constraints: bool,
    /// Intercept `enumerateDevices`
    pub enumerate_devices: bool,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            get_user_media: true,
            get_supported_constraints: true,
            enumerate_devices: true,
        }
    }
}

impl MockOptions {
    /// Intercept only `getUserMedia`
    pub fn stream_only() -> Self {
        Self {
            get_user_media: true,
            get_supported_constraints: false,
            enumerate_devices: false,
        }
    }

    /// Whether `entry` should be intercepted
    pub fn intercepts(&self, entry: EntryPoint) -> bool {
        match entry {
            EntryPoint::GetUserMedia => self.get_user_media,
            EntryPoint::GetSupportedConstraints => self.get_supported_constraints,
            EntryPoint::EnumerateDevices => self.enumerate_devices,
        }
    }
}

/// Session configuration, typically loaded from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Initial media reference
    pub media_url: Option<String>,
    /// Media load timeout in milliseconds
    pub media_timeout_ms: u64,
    /// Share of the surface an image occupies
    pub canvas_scale_factor: f64,
    /// Render frame rate
    pub frame_rate: f64,
    /// Attach debug elements to the document
    pub debug: bool,
    /// Built-in preset name
    pub device: Option<String>,
    /// Inline preset; wins over `device`
    pub device_preset: Option<DevicePreset>,
    /// Entry points to intercept
    pub options: MockOptions,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            media_url: None,
            media_timeout_ms: DEFAULT_MEDIA_TIMEOUT_MS,
            canvas_scale_factor: 1.0,
            frame_rate: DEFAULT_FRAME_RATE,
            debug: false,
            device: None,
            device_preset: None,
            options: MockOptions::default(),
        }
    }
}

impl MockConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> MockRtcResult<Self> {
        let config: MockConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> MockRtcResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Reject values no setter would accept
    pub fn validate(&self) -> MockRtcResult<()> {
        if let Some(url) = &self.media_url {
            if url.trim().is_empty() {
                return Err(config_error("media_url must not be blank"));
            }
        }
        if self.media_timeout_ms == 0 {
            return Err(config_error("media_timeout_ms must be positive"));
        }
        if i64::try_from(self.media_timeout_ms).is_err() {
            return Err(config_error(format!(
                "media_timeout_ms must be at most {}",
                i64::MAX
            )));
        }
        if !self.canvas_scale_factor.is_finite() {
            return Err(config_error("canvas_scale_factor must be finite"));
        }
        if !(self.frame_rate > 0.0 && self.frame_rate <= MAX_FRAME_RATE) {
            return Err(config_error(format!(
                "frame_rate must be in (0, {}]",
                MAX_FRAME_RATE
            )));
        }
        if self.device_preset.is_none() {
            if let Some(name) = &self.device {
                if DevicePreset::by_name(name).is_none() {
                    return Err(config_error(format!(
                        "unknown device '{}', expected one of {:?}",
                        name, PRESET_NAMES
                    )));
                }
            }
        }
        Ok(())
    }

    /// Preset this configuration selects
    pub fn resolve_preset(&self) -> MockRtcResult<DevicePreset> {
        if let Some(preset) = &self.device_preset {
            return Ok(preset.clone());
        }
        match &self.device {
            Some(name) => DevicePreset::by_name(name).ok_or_else(|| MockRtcError::DeviceNotFound {
                device_id: name.clone(),
            }),
            None => Ok(DevicePreset::default()),
        }
    }

    /// Load timeout as a duration
    pub fn media_timeout(&self) -> Duration {
        Duration::from_millis(self.media_timeout_ms)
    }

    /// Scale factor after the lower clamp
    pub fn effective_scale_factor(&self) -> f64 {
        self.canvas_scale_factor.max(MIN_SCALE_FACTOR)
    }
}

fn config_error(reason: impl Into<String>) -> MockRtcError {
    MockRtcError::Configuration {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MockConfig::from_json("{}").unwrap();
        assert_eq!(config, MockConfig::default());
        assert_eq!(config.media_timeout(), Duration::from_secs(10));
        assert_eq!(config.resolve_preset().unwrap().name, "MacBook Pro");
    }

    #[test]
    fn test_partial_options() {
        let config = MockConfig::from_json(
            r#"{"device": "iphone_12", "options": {"enumerate_devices": false}, "canvas_scale_factor": 0.05}"#,
        )
        .unwrap();
        assert!(config.options.get_user_media);
        assert!(!config.options.enumerate_devices);
        assert_eq!(config.resolve_preset().unwrap().name, "iPhone 12");
        assert_eq!(config.effective_scale_factor(), MIN_SCALE_FACTOR);
    }

    #[test]
    fn test_validation_failures() {
        for json in [
            r#"{"media_timeout_ms": 0}"#,
            r#"{"media_timeout_ms": 18446744073709551615}"#,
            r#"{"frame_rate": 0}"#,
            r#"{"frame_rate": 500}"#,
            r#"{"media_url": "   "}"#,
            r#"{"device": "rotary_phone"}"#,
        ] {
            assert!(
                matches!(
                    MockConfig::from_json(json),
                    Err(MockRtcError::Configuration { .. })
                ),
                "{json}"
            );
        }
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            MockConfig::from_json("{not json"),
            Err(MockRtcError::Json { .. })
        ));
    }
}
