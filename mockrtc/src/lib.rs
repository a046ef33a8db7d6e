//! # MockRTC - Camera Test Double
//!
//! MockRTC stands in for a camera. It intercepts the media capture entry
//! points of a host environment and answers them with a synthetic video
//! stream rendered from a still image or a looping video, so automated
//! tests and demos can exercise capture code without hardware or
//! permission prompts.
//!
//! ## Key Features
//!
//! - **Drop-in interception**: `getUserMedia`, `getSupportedConstraints` and
//!   `enumerateDevices` are replaced and restored exactly
//! - **Device presets**: iPhone 12, Samsung Galaxy M53 and MacBook Pro
//!   capability sets, or your own JSON preset
//! - **Orientation-aware resolution negotiation**: exact match, best fit,
//!   then fallback
//! - **Realistic tracks**: device labels and ids, capabilities, and settings
//!   that always report width, height and frame rate
//! - **Clean teardown**: `unmock()` stops every loop and track it started
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mockrtc::{DevicePreset, MediaMock, MediaStreamConstraints, MediaTrackConstraints,
//!     MockOptions, Navigator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let navigator = Navigator::new();
//!     let mock = MediaMock::new(navigator.clone());
//!
//!     mock.set_media_url("assets/face.png").await?
//!         .mock(DevicePreset::iphone_12(), MockOptions::default());
//!
//!     // Application code sees a camera
//!     let devices = navigator.ensure_media_devices();
//!     let constraints = MediaTrackConstraints::new().width(1280).height(720);
//!     let stream = devices
//!         .get_user_media(MediaStreamConstraints::video(constraints))
//!         .await?;
//!
//!     let track = &stream.get_video_tracks()[0];
//!     println!("{} -> {:?}", track.label(), track.get_settings());
//!
//!     mock.unmock();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use mockrtc_core::{
    ConstrainDouble, ConstrainString, DevicePreset, ErrorCategory, FacingMode, MediaDeviceInfo,
    MediaDeviceKind, MediaStreamConstraints, MediaTrackCapabilities, MediaTrackConstraints,
    MockRtcError, MockRtcResult, Orientation, SupportedConstraints, VideoResolution,
    PRESET_NAMES,
};

pub use mockrtc_media::{
    AssetLoader, Canvas, FrameScheduler, MediaStream, MediaStreamTrack, MediaTrackSettings,
    RenderStats, SourceLoader, TrackState, VideoDecoder, VideoFrame, VisualSource,
};

// Public API modules
pub mod config;
pub mod host;
pub mod logging;
pub mod mock;
pub mod patch;

// Re-export main API types
pub use config::{MockConfig, MockOptions};
pub use host::{
    DebugElement, DeviceChangeEvent, Document, ElementKind, EntryHandler, EntryPoint,
    MediaDevices, Navigator, PropertyDescriptor, Viewport,
};
pub use logging::init_logging;
pub use mock::{MediaMock, MediaMockBuilder, DEBUG_BORDER};
pub use patch::{replace_entry_point, Interceptor, PropertyPatcher, RestoreFn};
