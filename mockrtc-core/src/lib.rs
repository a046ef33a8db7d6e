//! # MockRTC Core
//!
//! Constraint model, simulated device descriptors and resolution
//! negotiation for MockRTC. Nothing in this crate touches media or the host
//! environment; every function here is deterministic over its inputs.

#![warn(clippy::all)]

pub mod constraints;
pub mod device;
pub mod error;
pub mod presets;
pub mod resolution;

// Re-export main types
pub use constraints::{
    ConstrainDouble, ConstrainDoubleRange, ConstrainString, ConstrainStringRange,
    MediaStreamConstraints, MediaTrackConstraints, StringOrList, VideoRequest,
};
pub use device::{
    DevicePreset, DoubleRange, FacingMode, MediaDeviceInfo, MediaDeviceKind,
    MediaTrackCapabilities, SupportedConstraints, ULongRange, VideoResolution,
};
pub use error::{ErrorCategory, MockRtcError, MockRtcResult};
pub use presets::PRESET_NAMES;
pub use resolution::{
    best_fit, exact_match, fallback, fit_score, resolve_resolution, Orientation,
    ResolutionTarget, FALLBACK_RESOLUTION,
};
