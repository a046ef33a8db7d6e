//! Drawing engine
//!
//! Owns the render loop that composites the current visual source onto a
//! canvas at the configured frame rate. The engine is a two-state machine,
//! `Idle` or `Running`, and holds at most one loop handle: starting a loop
//! always cancels the previous one first.
//!
//! Scheduling prefers a per-display-frame tick and throttles draws to the
//! target fps, skipping ticks that arrive early. Without a display tick it
//! falls back to a fixed-period timer at `1000/fps` ms.

use crate::asset::VisualSource;
use crate::canvas::{Canvas, CanvasContext2d, BACKGROUND};
use crate::MediaResult;
use image::RgbaImage;
use mockrtc_core::{MockRtcError, VideoResolution};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

/// Smallest scale factor a source may be drawn at
pub const MIN_SCALE_FACTOR: f64 = 0.1;

/// Highest frame rate a loop accepts
pub const MAX_FRAME_RATE: f64 = 120.0;

/// How frames are scheduled
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameScheduler {
    /// Per-display-frame callback at the given refresh rate, throttled to fps
    AnimationFrame { refresh_rate: f64 },
    /// Fixed-period timer at `1000/fps` ms
    Interval,
}

impl FrameScheduler {
    /// Display tick if a usable refresh rate is known, else a plain timer
    pub fn for_refresh_rate(refresh_rate: Option<f64>) -> Self {
        match refresh_rate {
            Some(hz) if hz.is_finite() && hz > 0.0 => FrameScheduler::AnimationFrame {
                refresh_rate: hz,
            },
            _ => FrameScheduler::Interval,
        }
    }
}

/// Render loop counters
#[derive(Debug, Default, Clone)]
pub struct RenderStats {
    /// Frames composited and published
    pub frames_drawn: u64,
    /// Display ticks skipped by the fps throttle or with nothing to draw
    pub frames_skipped: u64,
    /// Loops started over the engine's lifetime
    pub loops_started: u64,
    /// Time of the last drawn frame
    pub last_frame_at: Option<std::time::Instant>,
}

/// Where a letterboxed image lands on the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Fit an image into `target`, preserving aspect ratio, centered.
///
/// The image is scaled to `scale_factor` of the target width when it is
/// relatively wider than the target, else of the target height. Returns
/// `None` when the geometry is degenerate (zero or non-finite sizes).
pub fn letterbox(
    image_width: u32,
    image_height: u32,
    target: VideoResolution,
    scale_factor: f64,
) -> Option<Placement> {
    let image_ratio = image_width as f64 / image_height as f64;
    let target_ratio = target.width as f64 / target.height as f64;

    let (width, height) = if image_ratio > target_ratio {
        let width = target.width as f64 * scale_factor;
        (width, width / image_ratio)
    } else {
        let height = target.height as f64 * scale_factor;
        (height * image_ratio, height)
    };

    let x = (target.width as f64 - width) / 2.0;
    let y = (target.height as f64 - height) / 2.0;

    if ![width, height, x, y].iter().all(|v| v.is_finite()) {
        return None;
    }

    let (width, height) = (width.round(), height.round());
    if width < 1.0 || height < 1.0 {
        return None;
    }

    Some(Placement {
        x: x.round() as i64,
        y: y.round() as i64,
        width: width as u32,
        height: height as u32,
    })
}

/// Everything a single frame draw needs, passed explicitly to the loop
pub struct DrawContext {
    pub canvas: Canvas,
    pub context: CanvasContext2d,
    pub source: VisualSource,
    pub resolution: VideoResolution,
    pub scale_factor: f64,
    scaled: Mutex<Option<Arc<RgbaImage>>>,
}

impl DrawContext {
    pub fn new(
        canvas: Canvas,
        source: VisualSource,
        resolution: VideoResolution,
        scale_factor: f64,
    ) -> MediaResult<Self> {
        let context = canvas.get_context()?;
        Ok(Self {
            canvas,
            context,
            source,
            resolution,
            scale_factor: scale_factor.max(MIN_SCALE_FACTOR),
            scaled: Mutex::new(None),
        })
    }

    fn scaled_image(&self, image: &RgbaImage, placement: &Placement) -> Arc<RgbaImage> {
        let mut cache = self.scaled.lock();
        if let Some(cached) = cache.as_ref() {
            if cached.width() == placement.width && cached.height() == placement.height {
                return cached.clone();
            }
        }
        let scaled = Arc::new(image::imageops::resize(
            image,
            placement.width,
            placement.height,
            image::imageops::FilterType::Triangle,
        ));
        *cache = Some(scaled.clone());
        scaled
    }
}

/// Composite one frame. Returns `false` when nothing was drawn.
pub fn draw_frame(ctx: &DrawContext) -> bool {
    if ctx.canvas.is_released() {
        return false;
    }

    let drawn = match &ctx.source {
        VisualSource::Video(video) => {
            let Some(frame) = video.current_frame() else {
                return false;
            };
            ctx.context.clear_rect()
                && ctx.context.fill_rect(BACKGROUND)
                && ctx.context.draw_image(
                    &frame,
                    0,
                    0,
                    ctx.resolution.width,
                    ctx.resolution.height,
                )
        }
        VisualSource::Image(image) => {
            let image = image.image();
            let Some(placement) = letterbox(
                image.width(),
                image.height(),
                ctx.resolution,
                ctx.scale_factor,
            ) else {
                trace!("Skipping draw: degenerate letterbox geometry");
                return false;
            };
            let scaled = ctx.scaled_image(image, &placement);
            ctx.context.clear_rect()
                && ctx.context.fill_rect(BACKGROUND)
                && ctx.context.put_image(&scaled, placement.x, placement.y)
        }
    };

    if drawn {
        ctx.canvas.commit_frame();
    }
    drawn
}

/// Handle of the running loop; exactly one kind at a time
#[derive(Debug)]
enum LoopHandle {
    AnimationFrame(JoinHandle<()>),
    Interval(JoinHandle<()>),
}

impl LoopHandle {
    fn cancel(self) {
        match self {
            LoopHandle::AnimationFrame(handle) | LoopHandle::Interval(handle) => handle.abort(),
        }
    }
}

#[derive(Debug)]
struct LoopParams {
    canvas: Canvas,
    resolution: VideoResolution,
    fps: f64,
    scale_factor: f64,
}

#[derive(Debug, Default)]
enum EngineState {
    #[default]
    Idle,
    Running {
        handle: LoopHandle,
        params: LoopParams,
    },
}

/// Render loop owner
#[derive(Debug)]
pub struct DrawingEngine {
    scheduler: FrameScheduler,
    state: EngineState,
    stats: Arc<RwLock<RenderStats>>,
}

impl DrawingEngine {
    pub fn new(scheduler: FrameScheduler) -> Self {
        Self {
            scheduler,
            state: EngineState::Idle,
            stats: Arc::new(RwLock::new(RenderStats::default())),
        }
    }

    pub fn scheduler(&self) -> FrameScheduler {
        self.scheduler
    }

    /// Takes effect for the next loop started
    pub fn set_scheduler(&mut self, scheduler: FrameScheduler) {
        self.scheduler = scheduler;
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, EngineState::Running { .. })
    }

    /// Frame rate of the running loop
    pub fn fps(&self) -> Option<f64> {
        match &self.state {
            EngineState::Running { params, .. } => Some(params.fps),
            EngineState::Idle => None,
        }
    }

    /// Target resolution of the running loop
    pub fn resolution(&self) -> Option<VideoResolution> {
        match &self.state {
            EngineState::Running { params, .. } => Some(params.resolution),
            EngineState::Idle => None,
        }
    }

    pub fn stats(&self) -> RenderStats {
        self.stats.read().clone()
    }

    /// Start drawing `source` onto `canvas`, replacing any running loop.
    ///
    /// Fails with `CanvasContextFailure` if the canvas cannot hand out a
    /// drawing context, and with `InvalidInput` for an unusable fps.
    pub fn start(
        &mut self,
        canvas: Canvas,
        source: VisualSource,
        resolution: VideoResolution,
        fps: f64,
        scale_factor: f64,
    ) -> MediaResult<()> {
        if !fps.is_finite() || fps <= 0.0 || fps > MAX_FRAME_RATE {
            return Err(MockRtcError::invalid_input(format!(
                "frame rate must be in (0, {}], got {}",
                MAX_FRAME_RATE, fps
            )));
        }

        self.stop();

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            MockRtcError::InvalidState {
                message: format!("render loop needs a tokio runtime: {}", e),
            }
        })?;

        let ctx = DrawContext::new(canvas.clone(), source, resolution, scale_factor)?;
        let frame_interval = Duration::from_secs_f64(1.0 / fps);
        let stats = self.stats.clone();
        stats.write().loops_started += 1;

        let handle = match self.scheduler {
            FrameScheduler::AnimationFrame { refresh_rate } => {
                let tick = Duration::from_secs_f64(1.0 / refresh_rate);
                LoopHandle::AnimationFrame(runtime.spawn(animation_frame_loop(
                    ctx,
                    tick,
                    frame_interval,
                    stats,
                )))
            }
            FrameScheduler::Interval => {
                LoopHandle::Interval(runtime.spawn(interval_loop(ctx, frame_interval, stats)))
            }
        };

        info!(
            "▶️ Render loop started: {} at {} fps ({:?})",
            resolution, fps, self.scheduler
        );
        self.state = EngineState::Running {
            handle,
            params: LoopParams {
                canvas,
                resolution,
                fps,
                scale_factor,
            },
        };
        Ok(())
    }

    /// Restart the running loop with a new source at the same canvas,
    /// resolution and fps. Returns `false` if no loop was running.
    pub fn restart_with_source(&mut self, source: VisualSource) -> MediaResult<bool> {
        match std::mem::take(&mut self.state) {
            EngineState::Idle => Ok(false),
            EngineState::Running { handle, params } => {
                handle.cancel();
                debug!("Swapping render source to {}", source.reference());
                self.start(
                    params.canvas,
                    source,
                    params.resolution,
                    params.fps,
                    params.scale_factor,
                )?;
                Ok(true)
            }
        }
    }

    /// Restart the running loop with a new scale factor
    pub fn set_scale_factor(&mut self, scale_factor: f64, source: VisualSource) -> MediaResult<bool> {
        if let EngineState::Running { params, .. } = &mut self.state {
            params.scale_factor = scale_factor;
        }
        self.restart_with_source(source)
    }

    /// Stop any loop and start counting from zero
    pub fn reset(&mut self) {
        self.stop();
        // a cancelled task may still hold the old counters
        self.stats = Arc::new(RwLock::new(RenderStats::default()));
    }

    /// Stop the loop. Returns `true` if one was running.
    pub fn stop(&mut self) -> bool {
        match std::mem::take(&mut self.state) {
            EngineState::Idle => false,
            EngineState::Running { handle, .. } => {
                handle.cancel();
                info!("⏹️ Render loop stopped");
                true
            }
        }
    }
}

impl Drop for DrawingEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn record_draw(stats: &RwLock<RenderStats>, drawn: bool) {
    let mut stats = stats.write();
    if drawn {
        stats.frames_drawn += 1;
        stats.last_frame_at = Some(std::time::Instant::now());
    } else {
        stats.frames_skipped += 1;
    }
}

async fn animation_frame_loop(
    ctx: DrawContext,
    tick: Duration,
    frame_interval: Duration,
    stats: Arc<RwLock<RenderStats>>,
) {
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_draw: Option<Instant> = None;

    loop {
        let now = ticker.tick().await;
        if ctx.canvas.is_released() {
            break;
        }

        if let Some(last) = last_draw {
            let elapsed = now.duration_since(last);
            if elapsed < frame_interval {
                stats.write().frames_skipped += 1;
                continue;
            }
            // keep the cadence aligned to the frame interval
            let drift = elapsed.as_nanos() % frame_interval.as_nanos();
            last_draw = Some(now - Duration::from_nanos(drift as u64));
        } else {
            last_draw = Some(now);
        }

        record_draw(&stats, draw_frame(&ctx));
    }
}

async fn interval_loop(ctx: DrawContext, frame_interval: Duration, stats: Arc<RwLock<RenderStats>>) {
    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if ctx.canvas.is_released() {
            break;
        }
        record_draw(&stats, draw_frame(&ctx));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::ImageSource;
    use image::Rgba;

    #[test]
    fn test_letterbox_wide_image() {
        // 2:1 image into 4:3 target, scale 1.0
        let placement = letterbox(200, 100, VideoResolution::VGA, 1.0).unwrap();
        assert_eq!(placement.width, 640);
        assert_eq!(placement.height, 320);
        assert_eq!((placement.x, placement.y), (0, 80));
    }

    #[test]
    fn test_letterbox_tall_image_scaled() {
        let placement = letterbox(100, 200, VideoResolution::VGA, 0.5).unwrap();
        assert_eq!(placement.height, 240);
        assert_eq!(placement.width, 120);
        assert_eq!((placement.x, placement.y), (260, 120));
    }

    #[test]
    fn test_letterbox_degenerate() {
        assert_eq!(letterbox(100, 0, VideoResolution::VGA, 1.0), None);
        assert_eq!(letterbox(0, 100, VideoResolution::VGA, 1.0), None);
        assert_eq!(letterbox(100, 100, VideoResolution::new(640, 0), 1.0), None);
    }

    #[test]
    fn test_draw_frame_paints_background_and_image() {
        let canvas = Canvas::new(VideoResolution::new(8, 4));
        let black = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let ctx = DrawContext::new(
            canvas.clone(),
            VisualSource::Image(ImageSource::new("black.png", black)),
            canvas.resolution(),
            1.0,
        )
        .unwrap();

        assert!(draw_frame(&ctx));
        let pixels = canvas.snapshot().unwrap();
        assert_eq!(*pixels.get_pixel(0, 0), BACKGROUND);
        assert_eq!(*pixels.get_pixel(4, 2), Rgba([0, 0, 0, 255]));
        assert_eq!(*pixels.get_pixel(7, 3), BACKGROUND);
    }

    #[test]
    fn test_draw_frame_skips_zero_height_image() {
        let canvas = Canvas::new(VideoResolution::new(8, 4));
        let empty = RgbaImage::new(4, 0);
        let ctx = DrawContext::new(
            canvas.clone(),
            VisualSource::Image(ImageSource::new("empty.png", empty)),
            canvas.resolution(),
            1.0,
        )
        .unwrap();
        assert!(!draw_frame(&ctx));
    }

    #[test]
    fn test_start_rejects_bad_fps() {
        let mut engine = DrawingEngine::new(FrameScheduler::Interval);
        let canvas = Canvas::new(VideoResolution::VGA);
        let source = VisualSource::Image(ImageSource::new(
            "white.png",
            RgbaImage::from_pixel(2, 2, BACKGROUND),
        ));
        let result = engine.start(canvas, source, VideoResolution::VGA, 0.0, 1.0);
        assert!(matches!(result, Err(MockRtcError::InvalidInput { .. })));
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn test_reset_clears_stats() {
        let mut engine = DrawingEngine::new(FrameScheduler::Interval);
        let canvas = Canvas::new(VideoResolution::new(16, 12));
        let source = VisualSource::Image(ImageSource::new(
            "white.png",
            RgbaImage::from_pixel(2, 2, BACKGROUND),
        ));
        engine
            .start(canvas, source, VideoResolution::new(16, 12), 50.0, 1.0)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.stats().loops_started, 1);
        assert!(engine.stats().frames_drawn > 0);

        engine.reset();
        assert!(!engine.is_running());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(engine.stats().loops_started, 0);
        assert_eq!(engine.stats().frames_drawn, 0);
    }

    #[test]
    fn test_scheduler_selection() {
        assert_eq!(
            FrameScheduler::for_refresh_rate(Some(60.0)),
            FrameScheduler::AnimationFrame { refresh_rate: 60.0 }
        );
        assert_eq!(FrameScheduler::for_refresh_rate(None), FrameScheduler::Interval);
        assert_eq!(
            FrameScheduler::for_refresh_rate(Some(0.0)),
            FrameScheduler::Interval
        );
    }
}
