//! Simulated device descriptors
//!
//! A [`DevicePreset`] is read-only data describing a named piece of
//! hardware: the resolutions its camera produces, the camera identities it
//! enumerates and the constraint names it claims to support.

use crate::error::MockRtcResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Video resolution information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoResolution {
    pub width: u32,
    pub height: u32,
}

impl VideoResolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const VGA: Self = Self::new(640, 480);
    pub const HD: Self = Self::new(1280, 720);
    pub const FULL_HD: Self = Self::new(1920, 1080);

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Width and height swapped
    pub fn transposed(&self) -> Self {
        Self::new(self.height, self.width)
    }

    /// Strictly wider than tall
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }

    /// Strictly taller than wide
    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }
}

impl std::fmt::Display for VideoResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Inclusive integer range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ULongRange {
    pub min: u32,
    pub max: u32,
}

/// Inclusive floating point range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoubleRange {
    pub min: f64,
    pub max: f64,
}

/// Logical camera orientation tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera
    User,
    /// Back camera
    Environment,
    Left,
    Right,
}

impl FacingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::User => "user",
            FacingMode::Environment => "environment",
            FacingMode::Left => "left",
            FacingMode::Right => "right",
        }
    }

    /// Parse a constraint string (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Some(FacingMode::User),
            "environment" => Some(FacingMode::Environment),
            "left" => Some(FacingMode::Left),
            "right" => Some(FacingMode::Right),
            _ => None,
        }
    }
}

/// Capability set advertised by a camera
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTrackCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<ULongRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<ULongRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<DoubleRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<DoubleRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facing_mode: Vec<FacingMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<DoubleRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torch: Option<bool>,
}

impl MediaTrackCapabilities {
    /// True when nothing at all is advertised
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn supports_facing_mode(&self, mode: FacingMode) -> bool {
        self.facing_mode.contains(&mode)
    }
}

/// Kind of enumerated media device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaDeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

/// Device identity record returned by device enumeration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDeviceInfo {
    pub device_id: String,
    #[serde(default)]
    pub group_id: String,
    pub kind: MediaDeviceKind,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<MediaTrackCapabilities>,
}

impl MediaDeviceInfo {
    /// Create a camera entry with the given capability set
    pub fn video_input(
        device_id: impl Into<String>,
        group_id: impl Into<String>,
        label: impl Into<String>,
        capabilities: MediaTrackCapabilities,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            group_id: group_id.into(),
            kind: MediaDeviceKind::VideoInput,
            label: label.into(),
            capabilities: Some(capabilities),
        }
    }

    pub fn is_video_input(&self) -> bool {
        self.kind == MediaDeviceKind::VideoInput
    }

    /// Whether this entry's capability set advertises `mode`
    pub fn faces(&self, mode: FacingMode) -> bool {
        self.capabilities
            .as_ref()
            .is_some_and(|caps| caps.supports_facing_mode(mode))
    }
}

/// Map of constraint name to support flag
pub type SupportedConstraints = BTreeMap<String, bool>;

/// A named bundle of simulated hardware capabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePreset {
    #[serde(default)]
    pub name: String,
    /// Candidate resolutions in the device's native orientation
    pub video_resolutions: Vec<VideoResolution>,
    pub device_info_list: Vec<MediaDeviceInfo>,
    #[serde(default)]
    pub supported_constraints: SupportedConstraints,
}

impl DevicePreset {
    /// Parse a preset from JSON
    pub fn from_json(json: &str) -> MockRtcResult<Self> {
        let preset: DevicePreset = serde_json::from_str(json)?;
        preset.check();
        Ok(preset)
    }

    /// Load a preset from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> MockRtcResult<Self> {
        let path = path.as_ref();
        debug!("Loading device preset from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Log a warning for presets the resolver can only answer by fallback
    pub fn check(&self) {
        if self.video_resolutions.is_empty() {
            warn!(
                "Device preset '{}' lists no video resolutions; captures will fall back to 640x480",
                self.name
            );
        }
    }

    /// Camera entries, in enumeration order
    pub fn video_inputs(&self) -> impl Iterator<Item = &MediaDeviceInfo> {
        self.device_info_list.iter().filter(|d| d.is_video_input())
    }

    /// Look up a device entry by id
    pub fn device(&self, device_id: &str) -> Option<&MediaDeviceInfo> {
        self.device_info_list
            .iter()
            .find(|d| d.device_id == device_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_shape() {
        let hd = VideoResolution::HD;
        assert!(hd.is_landscape());
        assert!(!hd.is_portrait());
        assert_eq!(hd.transposed(), VideoResolution::new(720, 1280));
        assert!(hd.transposed().is_portrait());
        assert_eq!(hd.pixel_count(), 921_600);
        assert_eq!(hd.to_string(), "1280x720");

        let square = VideoResolution::new(500, 500);
        assert!(!square.is_landscape());
        assert!(!square.is_portrait());
    }

    #[test]
    fn test_preset_json_round_shape() {
        let json = r#"{
            "name": "Test Cam",
            "videoResolutions": [{"width": 1280, "height": 720}],
            "deviceInfoList": [{
                "deviceId": "cam-1",
                "groupId": "group-1",
                "kind": "videoinput",
                "label": "Test Camera",
                "capabilities": {
                    "width": {"min": 1, "max": 1280},
                    "facingMode": ["environment"],
                    "torch": true
                }
            }],
            "supportedConstraints": {"width": true, "torch": true}
        }"#;
        let preset = DevicePreset::from_json(json).unwrap();
        assert_eq!(preset.video_resolutions, vec![VideoResolution::HD]);

        let camera = preset.device("cam-1").unwrap();
        assert!(camera.is_video_input());
        assert!(camera.faces(FacingMode::Environment));
        assert!(!camera.faces(FacingMode::User));
        assert_eq!(preset.supported_constraints.get("torch"), Some(&true));
    }

    #[test]
    fn test_facing_mode_parse() {
        assert_eq!(FacingMode::parse("Environment"), Some(FacingMode::Environment));
        assert_eq!(FacingMode::parse(" user "), Some(FacingMode::User));
        assert_eq!(FacingMode::parse("sideways"), None);
    }
}
