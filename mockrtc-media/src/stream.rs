//! Stream synthesis and track normalization
//!
//! Captures a canvas into a stream, then dresses its tracks up as a real
//! camera's: identity from the selected device entry, a capability set, and
//! settings that always report width, height and frame rate.

use crate::canvas::Canvas;
use crate::tracks::{MediaStream, MediaStreamTrack, SettingsFallback};
use mockrtc_core::{
    DevicePreset, DoubleRange, FacingMode, MediaDeviceInfo, MediaTrackCapabilities,
    MediaTrackConstraints, ULongRange, VideoResolution, FALLBACK_RESOLUTION,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Caller hook applied to the synthesized tracks before they are wrapped
pub type TrackTransform = Arc<dyn Fn(Vec<MediaStreamTrack>) -> Vec<MediaStreamTrack> + Send + Sync>;

/// Hook that returns the tracks unchanged
pub fn identity_transform() -> TrackTransform {
    Arc::new(|tracks| tracks)
}

/// Facing mode named by the constraints, if it is one we know
pub fn requested_facing_mode(constraints: Option<&MediaTrackConstraints>) -> Option<FacingMode> {
    constraints
        .and_then(MediaTrackConstraints::requested_facing_mode)
        .and_then(FacingMode::parse)
}

/// Pick the device entry a capture is attributed to.
///
/// With a facing mode, the last camera advertising it wins (the last
/// enumerated back camera is the conventional default). Otherwise, or when
/// nothing advertises it, the first camera is used.
pub fn select_device(
    preset: &DevicePreset,
    facing_mode: Option<FacingMode>,
) -> Option<&MediaDeviceInfo> {
    if let Some(mode) = facing_mode {
        if let Some(device) = preset.video_inputs().filter(|d| d.faces(mode)).last() {
            return Some(device);
        }
    }
    preset.video_inputs().next()
}

/// Capability set derived from the preset's resolution list
pub fn derive_capabilities(preset: &DevicePreset) -> MediaTrackCapabilities {
    let resolutions = if preset.video_resolutions.is_empty() {
        vec![FALLBACK_RESOLUTION]
    } else {
        preset.video_resolutions.clone()
    };

    let range = |pick: fn(&VideoResolution) -> u32| ULongRange {
        min: resolutions.iter().map(pick).min().unwrap_or_default(),
        max: resolutions.iter().map(pick).max().unwrap_or_default(),
    };

    MediaTrackCapabilities {
        width: Some(range(|r| r.width)),
        height: Some(range(|r| r.height)),
        frame_rate: Some(DoubleRange { min: 1.0, max: 60.0 }),
        facing_mode: vec![FacingMode::User, FacingMode::Environment],
        ..Default::default()
    }
}

/// Make a captured track look like it came from `device`
pub fn normalize_track(
    track: &MediaStreamTrack,
    device: Option<&MediaDeviceInfo>,
    preset: &DevicePreset,
    resolution: VideoResolution,
    fps: f64,
    requested_facing: Option<FacingMode>,
) {
    if let Some(device) = device {
        track.override_identity(&device.label, &device.device_id);
    }

    if track.get_capabilities().is_none() {
        let capabilities = device
            .and_then(|d| d.capabilities.clone())
            .filter(|caps| !caps.is_empty())
            .unwrap_or_else(|| derive_capabilities(preset));
        track.ensure_capabilities(capabilities);
    }

    let device_facing = device
        .and_then(|d| d.capabilities.as_ref())
        .and_then(|caps| caps.facing_mode.first().copied());

    track.set_settings_fallback(SettingsFallback {
        resolution: Some(resolution),
        frame_rate: Some(fps),
        facing_mode: requested_facing
            .filter(|mode| device.is_some_and(|d| d.faces(*mode)))
            .or(device_facing),
        device_id: device.map(|d| d.device_id.clone()),
        group_id: device.map(|d| d.group_id.clone()),
    });
}

/// Capture `canvas` and return a device-realistic stream
pub fn synthesize_stream(
    canvas: &Canvas,
    fps: f64,
    resolution: VideoResolution,
    preset: &DevicePreset,
    constraints: Option<&MediaTrackConstraints>,
    transform: &TrackTransform,
) -> MediaStream {
    let captured = canvas.capture_stream(fps);
    let facing = requested_facing_mode(constraints);
    let device = select_device(preset, facing);
    debug!(
        "Attributing capture to {:?} (requested facing {:?})",
        device.map(|d| d.label.as_str()),
        facing
    );

    let tracks = captured.get_video_tracks();
    for track in &tracks {
        normalize_track(track, device, preset, resolution, fps, facing);
    }

    let tracks = transform(tracks);
    info!(
        "🎥 Synthesized stream with {} track(s) at {} / {} fps",
        tracks.len(),
        resolution,
        fps
    );
    MediaStream::new(tracks)
}
