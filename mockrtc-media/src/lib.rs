//! # MockRTC Media
//!
//! Synthetic media for MockRTC: loading still images and looping videos,
//! compositing them onto an in-memory canvas at a controlled frame rate,
//! and capturing that canvas as a stream of device-realistic tracks.

#![warn(clippy::all)]

pub mod asset;
pub mod canvas;
pub mod engine;
pub mod stream;
pub mod tracks;

pub use mockrtc_core::{MockRtcError, MockRtcResult};

/// Result type alias for media operations
pub type MediaResult<T> = MockRtcResult<T>;

// Re-export main types
pub use asset::{
    classify, AssetLoader, DecodedFrame, ImageSource, MediaKind, MjpegDecoder, SourceLoader,
    VideoDecoder, VideoSource, VisualSource, VIDEO_EXTENSIONS,
};
pub use canvas::{Canvas, CanvasContext2d, BACKGROUND, MAX_CANVAS_PIXELS};
pub use engine::{
    draw_frame, letterbox, DrawContext, DrawingEngine, FrameScheduler, Placement, RenderStats,
    MAX_FRAME_RATE, MIN_SCALE_FACTOR,
};
pub use stream::{
    derive_capabilities, identity_transform, normalize_track, requested_facing_mode,
    select_device, synthesize_stream, TrackTransform,
};
pub use tracks::{
    MediaStream, MediaStreamTrack, MediaTrackSettings, TrackKind, TrackState, VideoFrame,
};
