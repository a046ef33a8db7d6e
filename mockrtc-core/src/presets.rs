//! Built-in device presets
//!
//! Values mirror what the real devices report through the browser capture
//! APIs. Resolutions are listed in the camera's native landscape orientation.

use crate::device::{
    DevicePreset, DoubleRange, FacingMode, MediaDeviceInfo, MediaTrackCapabilities,
    SupportedConstraints, ULongRange, VideoResolution,
};

/// Names accepted by [`DevicePreset::by_name`]
pub const PRESET_NAMES: &[&str] = &["iphone_12", "samsung_galaxy_m53", "macbook_pro"];

fn supported(names: &[&str]) -> SupportedConstraints {
    names.iter().map(|name| (name.to_string(), true)).collect()
}

fn camera_caps(
    device_id: &str,
    group_id: &str,
    max: VideoResolution,
    max_fps: f64,
    facing: FacingMode,
    zoom: Option<DoubleRange>,
    torch: Option<bool>,
) -> MediaTrackCapabilities {
    MediaTrackCapabilities {
        device_id: Some(device_id.to_string()),
        group_id: Some(group_id.to_string()),
        width: Some(ULongRange { min: 1, max: max.width }),
        height: Some(ULongRange { min: 1, max: max.height }),
        frame_rate: Some(DoubleRange { min: 1.0, max: max_fps }),
        aspect_ratio: Some(DoubleRange {
            min: 1.0 / max.height as f64,
            max: max.width as f64,
        }),
        facing_mode: vec![facing],
        zoom,
        torch,
    }
}

impl DevicePreset {
    /// iPhone 12: one front and two back cameras
    pub fn iphone_12() -> Self {
        let group = "iphone12-group";
        let devices = vec![
            MediaDeviceInfo::video_input(
                "iphone12-front",
                group,
                "Front Camera",
                camera_caps(
                    "iphone12-front",
                    group,
                    VideoResolution::FULL_HD,
                    60.0,
                    FacingMode::User,
                    None,
                    None,
                ),
            ),
            MediaDeviceInfo::video_input(
                "iphone12-back-ultrawide",
                group,
                "Back Ultra Wide Camera",
                camera_caps(
                    "iphone12-back-ultrawide",
                    group,
                    VideoResolution::new(3840, 2160),
                    60.0,
                    FacingMode::Environment,
                    Some(DoubleRange { min: 1.0, max: 5.0 }),
                    Some(true),
                ),
            ),
            MediaDeviceInfo::video_input(
                "iphone12-back",
                group,
                "Back Camera",
                camera_caps(
                    "iphone12-back",
                    group,
                    VideoResolution::new(3840, 2160),
                    60.0,
                    FacingMode::Environment,
                    Some(DoubleRange { min: 1.0, max: 5.0 }),
                    Some(true),
                ),
            ),
        ];

        Self {
            name: "iPhone 12".to_string(),
            video_resolutions: vec![
                VideoResolution::new(3840, 2160),
                VideoResolution::FULL_HD,
                VideoResolution::HD,
                VideoResolution::VGA,
            ],
            device_info_list: devices,
            supported_constraints: supported(&[
                "aspectRatio",
                "deviceId",
                "facingMode",
                "frameRate",
                "groupId",
                "height",
                "width",
                "zoom",
                "torch",
            ]),
        }
    }

    /// Samsung Galaxy M53: front camera plus main and wide back cameras
    pub fn samsung_galaxy_m53() -> Self {
        let group = "m53-group";
        let devices = vec![
            MediaDeviceInfo::video_input(
                "m53-front",
                group,
                "camera2 1, facing front",
                camera_caps(
                    "m53-front",
                    group,
                    VideoResolution::FULL_HD,
                    30.0,
                    FacingMode::User,
                    None,
                    None,
                ),
            ),
            MediaDeviceInfo::video_input(
                "m53-back-wide",
                group,
                "camera2 2, facing back",
                camera_caps(
                    "m53-back-wide",
                    group,
                    VideoResolution::FULL_HD,
                    30.0,
                    FacingMode::Environment,
                    None,
                    Some(false),
                ),
            ),
            MediaDeviceInfo::video_input(
                "m53-back",
                group,
                "camera2 0, facing back",
                camera_caps(
                    "m53-back",
                    group,
                    VideoResolution::new(3840, 2160),
                    30.0,
                    FacingMode::Environment,
                    Some(DoubleRange { min: 1.0, max: 10.0 }),
                    Some(true),
                ),
            ),
        ];

        Self {
            name: "Samsung Galaxy M53".to_string(),
            video_resolutions: vec![
                VideoResolution::new(3840, 2160),
                VideoResolution::FULL_HD,
                VideoResolution::HD,
                VideoResolution::new(800, 600),
                VideoResolution::VGA,
            ],
            device_info_list: devices,
            supported_constraints: supported(&[
                "aspectRatio",
                "deviceId",
                "facingMode",
                "frameRate",
                "height",
                "width",
                "resizeMode",
                "zoom",
                "torch",
            ]),
        }
    }

    /// MacBook Pro: single built-in FaceTime camera
    pub fn macbook_pro() -> Self {
        let group = "macbook-group";
        let devices = vec![MediaDeviceInfo::video_input(
            "macbook-facetime",
            group,
            "FaceTime HD Camera",
            camera_caps(
                "macbook-facetime",
                group,
                VideoResolution::FULL_HD,
                30.0,
                FacingMode::User,
                None,
                None,
            ),
        )];

        Self {
            name: "MacBook Pro".to_string(),
            video_resolutions: vec![
                VideoResolution::FULL_HD,
                VideoResolution::HD,
                VideoResolution::VGA,
            ],
            device_info_list: devices,
            supported_constraints: supported(&[
                "aspectRatio",
                "deviceId",
                "frameRate",
                "groupId",
                "height",
                "width",
            ]),
        }
    }

    /// Look up a built-in preset (case-insensitive, `-`/space treated as `_`)
    pub fn by_name(name: &str) -> Option<Self> {
        let key = name.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match key.as_str() {
            "iphone_12" | "iphone12" => Some(Self::iphone_12()),
            "samsung_galaxy_m53" | "galaxy_m53" => Some(Self::samsung_galaxy_m53()),
            "macbook_pro" | "macbook" => Some(Self::macbook_pro()),
            _ => None,
        }
    }
}

impl Default for DevicePreset {
    fn default() -> Self {
        Self::macbook_pro()
    }
}
