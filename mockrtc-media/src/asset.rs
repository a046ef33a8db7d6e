//! Visual source loading
//!
//! Turns a media reference (path, `file://` URL or `data:` URI) into a
//! drawable [`VisualSource`]. The reference's extension (or data URI MIME
//! type) decides between a still image and a looping video. Every load is
//! raced against a timeout and nothing is cached.

use crate::MediaResult;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use image::{ImageFormat, RgbaImage};
use mockrtc_core::{MockRtcError, VideoResolution};
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Extensions treated as video containers
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "webm", "ogg", "ogv", "mov", "m4v", "mkv", "avi", "mjpeg", "mjpg",
];

/// Kind of visual source a reference names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

fn data_uri_mime(reference: &str) -> Option<&str> {
    let rest = reference.strip_prefix("data:")?;
    let header = rest.split(',').next().unwrap_or_default();
    Some(header.split(';').next().unwrap_or_default())
}

fn path_extension(reference: &str) -> Option<String> {
    let path = reference
        .split(['?', '#'])
        .next()
        .unwrap_or(reference);
    Path::new(path)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// Classify a reference as image or video
pub fn classify(reference: &str) -> MediaKind {
    if let Some(mime) = data_uri_mime(reference) {
        return if mime.to_ascii_lowercase().starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Image
        };
    }

    match path_extension(reference) {
        Some(ext) if VIDEO_EXTENSIONS.contains(&ext.as_str()) => MediaKind::Video,
        _ => MediaKind::Image,
    }
}

/// Decoded still image
#[derive(Debug, Clone)]
pub struct ImageSource {
    reference: String,
    image: Arc<RgbaImage>,
}

impl ImageSource {
    pub fn new(reference: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            reference: reference.into(),
            image: Arc::new(image),
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn image(&self) -> &Arc<RgbaImage> {
        &self.image
    }
}

/// One decoded video frame and how long it stays on screen
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub image: Arc<RgbaImage>,
    pub duration: Duration,
}

#[derive(Debug, Default)]
struct Playback {
    playing: bool,
    started_at: Option<Instant>,
    offset: Duration,
}

#[derive(Debug)]
struct VideoInner {
    reference: String,
    frames: RwLock<Vec<DecodedFrame>>,
    playback: Mutex<Playback>,
}

/// Hidden, muted, looping video element
#[derive(Debug, Clone)]
pub struct VideoSource {
    inner: Arc<VideoInner>,
}

impl VideoSource {
    /// Wrap decoded frames; at least one frame is required
    pub fn new(reference: impl Into<String>, frames: Vec<DecodedFrame>) -> MediaResult<Self> {
        let reference = reference.into();
        if frames.is_empty() {
            return Err(MockRtcError::load_failure(reference, "video has no frames"));
        }
        Ok(Self {
            inner: Arc::new(VideoInner {
                reference,
                frames: RwLock::new(frames),
                playback: Mutex::new(Playback::default()),
            }),
        })
    }

    pub fn reference(&self) -> &str {
        &self.inner.reference
    }

    pub fn is_muted(&self) -> bool {
        true
    }

    pub fn is_looping(&self) -> bool {
        true
    }

    pub fn frame_count(&self) -> usize {
        self.inner.frames.read().len()
    }

    /// Whether the source has been cleared
    pub fn is_cleared(&self) -> bool {
        self.frame_count() == 0
    }

    pub fn is_playing(&self) -> bool {
        self.inner.playback.lock().playing
    }

    /// Length of one loop
    pub fn duration(&self) -> Duration {
        self.inner.frames.read().iter().map(|f| f.duration).sum()
    }

    /// Dimensions of the first frame
    pub fn natural_size(&self) -> Option<VideoResolution> {
        self.inner
            .frames
            .read()
            .first()
            .map(|f| VideoResolution::new(f.image.width(), f.image.height()))
    }

    /// Start or resume playback
    pub fn play(&self) -> MediaResult<()> {
        if self.is_cleared() {
            return Err(MockRtcError::InvalidState {
                message: format!("video {} has no source", self.inner.reference),
            });
        }
        let mut playback = self.inner.playback.lock();
        if !playback.playing {
            playback.playing = true;
            playback.started_at = Some(Instant::now());
        }
        Ok(())
    }

    /// Pause, keeping the current position
    pub fn pause(&self) {
        let mut playback = self.inner.playback.lock();
        if playback.playing {
            if let Some(started) = playback.started_at.take() {
                playback.offset += started.elapsed();
            }
            playback.playing = false;
        }
    }

    /// Pause and drop the decoded frames
    pub fn clear(&self) {
        self.pause();
        self.inner.frames.write().clear();
        self.inner.playback.lock().offset = Duration::ZERO;
        debug!("Cleared video source {}", self.inner.reference);
    }

    /// Playback position, not wrapped to the loop length
    pub fn position(&self) -> Duration {
        let playback = self.inner.playback.lock();
        match playback.started_at {
            Some(started) if playback.playing => playback.offset + started.elapsed(),
            _ => playback.offset,
        }
    }

    /// Frame showing at the current playback position
    pub fn current_frame(&self) -> Option<Arc<RgbaImage>> {
        let position = self.position();
        let frames = self.inner.frames.read();
        let total: Duration = frames.iter().map(|f| f.duration).sum();
        if frames.is_empty() || total.is_zero() {
            return frames.first().map(|f| f.image.clone());
        }

        let mut remaining = Duration::from_nanos((position.as_nanos() % total.as_nanos()) as u64);
        for frame in frames.iter() {
            if remaining < frame.duration {
                return Some(frame.image.clone());
            }
            remaining -= frame.duration;
        }
        frames.last().map(|f| f.image.clone())
    }
}

/// A ready-to-draw source
#[derive(Debug, Clone)]
pub enum VisualSource {
    Image(ImageSource),
    Video(VideoSource),
}

impl VisualSource {
    pub fn reference(&self) -> &str {
        match self {
            VisualSource::Image(image) => image.reference(),
            VisualSource::Video(video) => video.reference(),
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            VisualSource::Image(_) => MediaKind::Image,
            VisualSource::Video(_) => MediaKind::Video,
        }
    }

    pub fn natural_size(&self) -> Option<VideoResolution> {
        match self {
            VisualSource::Image(image) => Some(VideoResolution::new(
                image.image().width(),
                image.image().height(),
            )),
            VisualSource::Video(video) => video.natural_size(),
        }
    }

    /// Stop playback and release decoded data held by a video
    pub fn dispose(&self) {
        if let VisualSource::Video(video) = self {
            video.clear();
        }
    }
}

/// Decoder for a video container
pub trait VideoDecoder: Send + Sync {
    fn name(&self) -> &str;

    /// `container` is a lowercase file extension or MIME subtype
    fn supports(&self, container: &str) -> bool;

    fn decode(&self, bytes: &[u8]) -> MediaResult<Vec<DecodedFrame>>;
}

/// Motion-JPEG: a plain concatenation of JPEG images
#[derive(Debug, Clone)]
pub struct MjpegDecoder {
    frame_duration: Duration,
}

impl MjpegDecoder {
    pub fn new(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 30.0 };
        Self {
            frame_duration: Duration::from_secs_f64(1.0 / fps),
        }
    }

    /// Split on SOI/EOI markers.
    ///
    /// APPn and COM segments are skipped by their length field, so an EXIF
    /// thumbnail with its own SOI/EOI stays inside its frame.
    fn split_frames(bytes: &[u8]) -> Vec<&[u8]> {
        let mut frames = Vec::new();
        let mut i = 0;
        while i + 1 < bytes.len() {
            if bytes[i] == 0xFF && bytes[i + 1] == 0xD8 {
                let start = i;
                let mut j = Self::skip_metadata_segments(bytes, i + 2);
                while j + 1 < bytes.len() && !(bytes[j] == 0xFF && bytes[j + 1] == 0xD9) {
                    j += 1;
                }
                if j + 1 >= bytes.len() {
                    break;
                }
                frames.push(&bytes[start..j + 2]);
                i = j + 2;
            } else {
                i += 1;
            }
        }
        frames
    }

    fn skip_metadata_segments(bytes: &[u8], mut offset: usize) -> usize {
        while offset + 3 < bytes.len()
            && bytes[offset] == 0xFF
            && matches!(bytes[offset + 1], 0xE0..=0xEF | 0xFE)
        {
            let length = u16::from_be_bytes([bytes[offset + 2], bytes[offset + 3]]) as usize;
            if length < 2 {
                break;
            }
            offset += 2 + length;
        }
        offset.min(bytes.len())
    }
}

impl Default for MjpegDecoder {
    fn default() -> Self {
        Self::new(30.0)
    }
}

impl VideoDecoder for MjpegDecoder {
    fn name(&self) -> &str {
        "mjpeg"
    }

    fn supports(&self, container: &str) -> bool {
        matches!(container, "mjpeg" | "mjpg" | "x-motion-jpeg")
    }

    fn decode(&self, bytes: &[u8]) -> MediaResult<Vec<DecodedFrame>> {
        Self::split_frames(bytes)
            .into_iter()
            .map(|jpeg| {
                image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg)
                    .map(|img| DecodedFrame {
                        image: Arc::new(img.to_rgba8()),
                        duration: self.frame_duration,
                    })
                    .map_err(|e| MockRtcError::load_failure("mjpeg", e.to_string()))
            })
            .collect()
    }
}

/// Produces drawable sources from media references
#[async_trait]
pub trait SourceLoader: Send + Sync {
    /// Load `reference`, failing with `LoadTimeout` after `timeout`
    async fn load(&self, reference: &str, timeout: Duration) -> MediaResult<VisualSource>;
}

/// Default loader: filesystem paths, `file://` URLs and `data:` URIs
#[derive(Clone)]
pub struct AssetLoader {
    decoders: Vec<Arc<dyn VideoDecoder>>,
}

impl std::fmt::Debug for AssetLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.decoders.iter().map(|d| d.name()).collect();
        f.debug_struct("AssetLoader").field("decoders", &names).finish()
    }
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetLoader {
    /// Loader with the built-in MJPEG decoder
    pub fn new() -> Self {
        Self {
            decoders: vec![Arc::new(MjpegDecoder::default())],
        }
    }

    /// Register another video decoder; later registrations win
    pub fn with_decoder(mut self, decoder: Arc<dyn VideoDecoder>) -> Self {
        self.decoders.insert(0, decoder);
        self
    }

    /// Read raw bytes plus a container hint (extension or MIME subtype)
    async fn read_reference(reference: &str) -> MediaResult<(Vec<u8>, String)> {
        if let Some(rest) = reference.strip_prefix("data:") {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| MockRtcError::load_failure(reference, "malformed data URI"))?;
            let mime = header.split(';').next().unwrap_or_default();
            let hint = mime
                .split('/')
                .nth(1)
                .unwrap_or_default()
                .to_ascii_lowercase();

            let bytes = if header.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
                let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
                general_purpose::STANDARD
                    .decode(cleaned)
                    .map_err(|e| MockRtcError::load_failure(reference, e.to_string()))?
            } else {
                payload.as_bytes().to_vec()
            };
            return Ok((bytes, hint));
        }

        let path = match reference.strip_prefix("file://") {
            Some(path) => path,
            None if reference.contains("://") => {
                return Err(MockRtcError::load_failure(
                    reference,
                    "unsupported URL scheme",
                ));
            }
            None => reference,
        };

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| MockRtcError::load_failure(reference, e.to_string()))?;
        Ok((bytes, path_extension(path).unwrap_or_default()))
    }

    async fn load_image(reference: &str, bytes: Vec<u8>) -> MediaResult<VisualSource> {
        let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| MockRtcError::load_failure(reference, e.to_string()))?
            .map_err(|e| MockRtcError::load_failure(reference, e.to_string()))?;
        Ok(VisualSource::Image(ImageSource::new(
            reference,
            decoded.to_rgba8(),
        )))
    }

    async fn load_video(
        &self,
        reference: &str,
        bytes: Vec<u8>,
        container: &str,
    ) -> MediaResult<VisualSource> {
        let decoder = self
            .decoders
            .iter()
            .find(|d| d.supports(container))
            .cloned()
            .ok_or_else(|| {
                MockRtcError::load_failure(
                    reference,
                    format!("no video decoder for container '{}'", container),
                )
            })?;

        let frames = tokio::task::spawn_blocking(move || decoder.decode(&bytes))
            .await
            .map_err(|e| MockRtcError::load_failure(reference, e.to_string()))?
            .map_err(|e| match e {
                MockRtcError::LoadFailure { reason, .. } => {
                    MockRtcError::load_failure(reference, reason)
                }
                other => other,
            })?;

        let video = VideoSource::new(reference, frames)?;
        // frame data is already decoded, so a refused autoplay is not fatal
        if let Err(e) = video.play() {
            warn!("Playback of {} did not start: {}", reference, e);
        }
        Ok(VisualSource::Video(video))
    }

    async fn load_inner(&self, reference: &str) -> MediaResult<VisualSource> {
        let (bytes, container) = Self::read_reference(reference).await?;
        match classify(reference) {
            MediaKind::Image => Self::load_image(reference, bytes).await,
            MediaKind::Video => self.load_video(reference, bytes, &container).await,
        }
    }
}

#[async_trait]
impl SourceLoader for AssetLoader {
    async fn load(&self, reference: &str, timeout: Duration) -> MediaResult<VisualSource> {
        let short: String = reference.chars().take(64).collect();
        debug!("Loading media {} (timeout {:?})", short, timeout);

        match tokio::time::timeout(timeout, self.load_inner(reference)).await {
            Ok(Ok(source)) => {
                info!(
                    "🖼️ Loaded {:?} source {} ({:?})",
                    source.kind(),
                    short,
                    source.natural_size()
                );
                Ok(source)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(MockRtcError::LoadTimeout {
                reference: reference.to_string(),
                duration: timeout,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(ms: u64, shade: u8) -> DecodedFrame {
        DecodedFrame {
            image: Arc::new(RgbaImage::from_pixel(2, 2, image::Rgba([shade, 0, 0, 255]))),
            duration: Duration::from_millis(ms),
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("clips/loop.MP4"), MediaKind::Video);
        assert_eq!(classify("clips/loop.webm?v=2#t=1"), MediaKind::Video);
        assert_eq!(classify("file:///tmp/cam.mjpeg"), MediaKind::Video);
        assert_eq!(classify("photos/face.png"), MediaKind::Image);
        assert_eq!(classify("photos/noext"), MediaKind::Image);
        assert_eq!(classify("data:video/webm;base64,AAAA"), MediaKind::Video);
        assert_eq!(classify("data:image/png;base64,AAAA"), MediaKind::Image);
    }

    #[test]
    fn test_video_position_and_clear() {
        let video = VideoSource::new("loop.mjpeg", vec![frame(10, 1), frame(10, 2)]).unwrap();
        assert!(!video.is_playing());
        assert_eq!(video.position(), Duration::ZERO);
        assert_eq!(video.current_frame().unwrap().get_pixel(0, 0)[0], 1);
        assert_eq!(video.duration(), Duration::from_millis(20));

        video.play().unwrap();
        assert!(video.is_playing());
        video.pause();
        assert!(!video.is_playing());

        video.clear();
        assert!(video.is_cleared());
        assert!(video.current_frame().is_none());
        assert!(video.play().is_err());
    }

    #[test]
    fn test_video_requires_frames() {
        assert!(VideoSource::new("empty.mjpeg", Vec::new()).is_err());
    }

    #[test]
    fn test_mjpeg_split() {
        let bytes = [
            0x00, 0xFF, 0xD8, 0x01, 0xFF, 0xD9, 0xFF, 0xD8, 0x02, 0x03, 0xFF, 0xD9, 0xFF, 0xD8,
        ];
        let frames = MjpegDecoder::split_frames(&bytes);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], &[0xFF, 0xD8, 0x01, 0xFF, 0xD9]);
        assert_eq!(frames[1], &[0xFF, 0xD8, 0x02, 0x03, 0xFF, 0xD9]);
    }

    #[test]
    fn test_mjpeg_split_skips_embedded_thumbnail() {
        // APP1 (length 8) wrapping a thumbnail's own SOI/EOI pair
        let bytes = [
            0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x08, 0x45, 0x78, 0xFF, 0xD8, 0xFF, 0xD9, 0x05, 0xFF,
            0xD9, 0xFF, 0xD8, 0x06, 0xFF, 0xD9,
        ];
        let frames = MjpegDecoder::split_frames(&bytes);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], &bytes[..15]);
        assert_eq!(frames[1], &[0xFF, 0xD8, 0x06, 0xFF, 0xD9]);
    }
}
