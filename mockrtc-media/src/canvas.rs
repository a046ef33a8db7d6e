//! In-memory drawing surface
//!
//! A [`Canvas`] is the raster target the drawing engine paints into each
//! frame. Committed frames are published to every track captured from it.

use crate::tracks::{MediaStream, MediaStreamTrack, MediaTrackSettings, VideoFrame};
use crate::MediaResult;
use bytes::Bytes;
use image::{imageops, Rgba, RgbaImage};
use mockrtc_core::{MockRtcError, VideoResolution};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tracing::{debug, trace};

/// Largest surface a drawing context will be created for
pub const MAX_CANVAS_PIXELS: u64 = 268_435_456;

/// Opaque white, painted under every frame
pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

struct CanvasInner {
    id: String,
    resolution: VideoResolution,
    pixels: Mutex<Option<RgbaImage>>,
    released: AtomicBool,
    sequence: AtomicU64,
    frames: watch::Sender<Option<VideoFrame>>,
}

/// Shared handle to a 2D raster surface
#[derive(Clone)]
pub struct Canvas {
    inner: Arc<CanvasInner>,
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("id", &self.inner.id)
            .field("resolution", &self.inner.resolution)
            .field("released", &self.is_released())
            .finish()
    }
}

impl Canvas {
    /// Create a surface; the pixel buffer is allocated by the first
    /// successful [`Canvas::get_context`].
    pub fn new(resolution: VideoResolution) -> Self {
        let (frames, _) = watch::channel(None);
        let id = format!("mockrtc-canvas-{}", uuid::Uuid::new_v4());
        debug!("Creating canvas {} ({})", id, resolution);
        Self {
            inner: Arc::new(CanvasInner {
                id,
                resolution,
                pixels: Mutex::new(None),
                released: AtomicBool::new(false),
                sequence: AtomicU64::new(0),
                frames,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn resolution(&self) -> VideoResolution {
        self.inner.resolution
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::Acquire)
    }

    /// Acquire the 2D drawing context
    pub fn get_context(&self) -> MediaResult<CanvasContext2d> {
        if self.is_released() {
            return Err(MockRtcError::CanvasContextFailure {
                reason: format!("canvas {} has been released", self.inner.id),
            });
        }

        let resolution = self.inner.resolution;
        if resolution.width == 0 || resolution.height == 0 {
            return Err(MockRtcError::CanvasContextFailure {
                reason: format!("zero-area surface {}", resolution),
            });
        }
        if resolution.pixel_count() > MAX_CANVAS_PIXELS {
            return Err(MockRtcError::CanvasContextFailure {
                reason: format!(
                    "surface {} exceeds {} pixels",
                    resolution, MAX_CANVAS_PIXELS
                ),
            });
        }

        let mut pixels = self.inner.pixels.lock();
        if pixels.is_none() {
            *pixels = Some(RgbaImage::new(resolution.width, resolution.height));
        }

        Ok(CanvasContext2d {
            canvas: self.clone(),
        })
    }

    /// Drop the pixel buffer; later draws become no-ops
    pub fn release(&self) {
        if !self.inner.released.swap(true, Ordering::AcqRel) {
            debug!("Releasing canvas {}", self.inner.id);
            self.inner.pixels.lock().take();
            self.inner.frames.send_replace(None);
        }
    }

    /// Copy of the current pixels
    pub fn snapshot(&self) -> Option<RgbaImage> {
        self.inner.pixels.lock().clone()
    }

    /// Capture the surface as a stream with one video track
    pub fn capture_stream(&self, fps: f64) -> MediaStream {
        let resolution = self.inner.resolution;
        // canvas capture reports its dimensions but not a frame rate
        let settings = MediaTrackSettings {
            width: Some(resolution.width),
            height: Some(resolution.height),
            ..Default::default()
        };
        debug!("Capturing canvas {} at {} fps", self.inner.id, fps);
        let track = MediaStreamTrack::video(settings, self.inner.frames.subscribe());
        MediaStream::new(vec![track])
    }

    /// Publish the current pixels to capturing tracks
    pub(crate) fn commit_frame(&self) {
        if self.inner.frames.receiver_count() == 0 {
            return;
        }
        let Some(image) = self.snapshot() else {
            return;
        };

        let sequence = self.inner.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let frame = VideoFrame {
            width: image.width(),
            height: image.height(),
            data: Bytes::from(image.into_raw()),
            timestamp,
            sequence,
        };
        trace!("Canvas {} committed frame {}", self.inner.id, sequence);
        self.inner.frames.send_replace(Some(frame));
    }

    fn with_pixels<R>(&self, f: impl FnOnce(&mut RgbaImage) -> R) -> Option<R> {
        let mut pixels = self.inner.pixels.lock();
        pixels.as_mut().map(f)
    }
}

/// 2D drawing context bound to a canvas
#[derive(Debug, Clone)]
pub struct CanvasContext2d {
    canvas: Canvas,
}

impl CanvasContext2d {
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Reset every pixel to transparent black
    pub fn clear_rect(&self) -> bool {
        self.canvas
            .with_pixels(|pixels| {
                for p in pixels.pixels_mut() {
                    *p = Rgba([0, 0, 0, 0]);
                }
            })
            .is_some()
    }

    /// Fill the whole surface with a color
    pub fn fill_rect(&self, color: Rgba<u8>) -> bool {
        self.canvas
            .with_pixels(|pixels| {
                for p in pixels.pixels_mut() {
                    *p = color;
                }
            })
            .is_some()
    }

    /// Composite an already-scaled image with its top-left corner at (x, y)
    pub fn put_image(&self, image: &RgbaImage, x: i64, y: i64) -> bool {
        self.canvas
            .with_pixels(|pixels| imageops::overlay(pixels, image, x, y))
            .is_some()
    }

    /// Scale `image` to `width`x`height` and composite it at (x, y)
    pub fn draw_image(&self, image: &RgbaImage, x: i64, y: i64, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        if image.width() == width && image.height() == height {
            return self.put_image(image, x, y);
        }
        let scaled = imageops::resize(image, width, height, imageops::FilterType::Triangle);
        self.put_image(&scaled, x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_failures() {
        let zero = Canvas::new(VideoResolution::new(0, 480));
        assert!(matches!(
            zero.get_context(),
            Err(MockRtcError::CanvasContextFailure { .. })
        ));

        let huge = Canvas::new(VideoResolution::new(100_000, 100_000));
        assert!(matches!(
            huge.get_context(),
            Err(MockRtcError::CanvasContextFailure { .. })
        ));

        let released = Canvas::new(VideoResolution::VGA);
        released.release();
        assert!(released.get_context().is_err());
    }

    #[test]
    fn test_fill_and_put() {
        let canvas = Canvas::new(VideoResolution::new(4, 4));
        let ctx = canvas.get_context().unwrap();
        assert!(ctx.clear_rect());
        assert!(ctx.fill_rect(BACKGROUND));

        let red = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));
        assert!(ctx.put_image(&red, 1, 1));

        let pixels = canvas.snapshot().unwrap();
        assert_eq!(*pixels.get_pixel(0, 0), BACKGROUND);
        assert_eq!(*pixels.get_pixel(1, 1), Rgba([255, 0, 0, 255]));
        assert_eq!(*pixels.get_pixel(3, 3), BACKGROUND);
    }

    #[test]
    fn test_draws_after_release_are_noops() {
        let canvas = Canvas::new(VideoResolution::new(4, 4));
        let ctx = canvas.get_context().unwrap();
        canvas.release();
        assert!(!ctx.fill_rect(BACKGROUND));
        assert!(canvas.snapshot().is_none());
    }

    #[test]
    fn test_commit_reaches_tracks() {
        let canvas = Canvas::new(VideoResolution::new(2, 2));
        let ctx = canvas.get_context().unwrap();
        let stream = canvas.capture_stream(30.0);
        ctx.fill_rect(BACKGROUND);
        canvas.commit_frame();

        let track = &stream.get_video_tracks()[0];
        let frame = track.latest_frame().unwrap();
        assert_eq!((frame.width, frame.height), (2, 2));
        assert_eq!(frame.data.len(), 16);
        assert_eq!(frame.sequence, 1);
    }
}
