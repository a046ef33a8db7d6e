//! Integration tests for asset loading, the drawing engine and stream synthesis
//!
//! Fixtures are synthesized in-process (PNG/JPEG encoded with `image`,
//! wrapped in data URIs or written to temp files) so no binary assets are
//! needed.

use base64::{engine::general_purpose, Engine as _};
use image::{codecs::jpeg::JpegEncoder, ImageFormat, Rgba, RgbaImage};
use mockrtc_core::{
    DevicePreset, FacingMode, MediaTrackConstraints, MockRtcError, VideoResolution,
};
use mockrtc_media::*;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn png_data_uri(width: u32, height: u32, color: [u8; 4]) -> String {
    format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(png_bytes(width, height, color))
    )
}

fn mjpeg_bytes(frames: &[[u8; 3]]) -> Vec<u8> {
    let mut out = Vec::new();
    for rgb in frames {
        let frame = image::RgbImage::from_pixel(16, 8, image::Rgb(*rgb));
        JpegEncoder::new_with_quality(&mut out, 90)
            .encode_image(&frame)
            .unwrap();
    }
    out
}

fn image_source(width: u32, height: u32) -> VisualSource {
    VisualSource::Image(ImageSource::new(
        "test.png",
        RgbaImage::from_pixel(width, height, Rgba([0, 0, 255, 255])),
    ))
}

// ============================================================================
// ASSET LOADING TESTS
// ============================================================================

#[tokio::test]
async fn test_load_png_data_uri() {
    let loader = AssetLoader::new();
    let source = loader
        .load(&png_data_uri(32, 24, [255, 0, 0, 255]), Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(source.kind(), MediaKind::Image);
    assert_eq!(source.natural_size(), Some(VideoResolution::new(32, 24)));
}

#[tokio::test]
async fn test_load_image_file_and_file_url() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("face.png");
    std::fs::write(&path, png_bytes(10, 20, [0, 255, 0, 255])).unwrap();

    let loader = AssetLoader::new();
    let plain = loader
        .load(path.to_str().unwrap(), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(plain.natural_size(), Some(VideoResolution::new(10, 20)));

    let url = format!("file://{}", path.display());
    let via_url = loader.load(&url, Duration::from_secs(5)).await.unwrap();
    assert_eq!(via_url.kind(), MediaKind::Image);
}

#[tokio::test]
async fn test_load_mjpeg_video_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loop.MJPEG");
    std::fs::write(&path, mjpeg_bytes(&[[255, 0, 0], [0, 0, 255], [0, 255, 0]])).unwrap();

    let loader = AssetLoader::new();
    let source = loader
        .load(path.to_str().unwrap(), Duration::from_secs(5))
        .await
        .unwrap();

    let VisualSource::Video(video) = &source else {
        panic!("expected a video source");
    };
    assert_eq!(video.frame_count(), 3);
    assert!(video.is_playing());
    assert!(video.is_muted());
    assert!(video.is_looping());
    assert_eq!(video.natural_size(), Some(VideoResolution::new(16, 8)));

    source.dispose();
    assert!(video.is_cleared());
    assert!(!video.is_playing());
}

#[test]
fn test_mjpeg_frames_with_exif_thumbnails() {
    let thumbnail = mjpeg_bytes(&[[9, 9, 9]]);
    let mut app1 = vec![0xFF, 0xE1];
    app1.extend_from_slice(&((2 + 6 + thumbnail.len()) as u16).to_be_bytes());
    app1.extend_from_slice(b"Exif\0\0");
    app1.extend_from_slice(&thumbnail);

    // every frame carries an APP1 segment right after its SOI
    let mut stream = Vec::new();
    for rgb in [[255, 0, 0], [0, 0, 255]] {
        let frame = mjpeg_bytes(&[rgb]);
        stream.extend_from_slice(&frame[..2]);
        stream.extend_from_slice(&app1);
        stream.extend_from_slice(&frame[2..]);
    }

    let frames = MjpegDecoder::default().decode(&stream).unwrap();
    assert_eq!(frames.len(), 2);
    for frame in &frames {
        assert_eq!(frame.image.dimensions(), (16, 8));
    }
    assert!(frames[0].image.get_pixel(8, 4)[0] > 200);
    assert!(frames[1].image.get_pixel(8, 4)[2] > 200);
}

#[tokio::test]
async fn test_load_video_data_uri() {
    let uri = format!(
        "data:video/x-motion-jpeg;base64,{}",
        general_purpose::STANDARD.encode(mjpeg_bytes(&[[10, 20, 30]]))
    );
    let source = AssetLoader::new()
        .load(&uri, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(source.kind(), MediaKind::Video);
}

#[tokio::test]
async fn test_load_failures_name_reference() {
    let loader = AssetLoader::new();

    let err = loader
        .load("/definitely/not/here.png", Duration::from_secs(5))
        .await
        .unwrap_err();
    match err {
        MockRtcError::LoadFailure { reference, .. } => {
            assert_eq!(reference, "/definitely/not/here.png")
        }
        other => panic!("expected LoadFailure, got {other:?}"),
    }

    let garbage = format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(b"not an image")
    );
    assert!(matches!(
        loader.load(&garbage, Duration::from_secs(5)).await,
        Err(MockRtcError::LoadFailure { .. })
    ));

    assert!(matches!(
        loader.load("https://example.com/cam.png", Duration::from_secs(5)).await,
        Err(MockRtcError::LoadFailure { .. })
    ));
}

#[tokio::test]
async fn test_video_without_decoder_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mp4");
    std::fs::write(&path, b"\x00\x00\x00\x18ftypmp42").unwrap();

    let err = AssetLoader::new()
        .load(path.to_str().unwrap(), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no video decoder"));
}

#[tokio::test]
async fn test_custom_decoder_registration() {
    struct SolidDecoder;

    impl VideoDecoder for SolidDecoder {
        fn name(&self) -> &str {
            "solid"
        }

        fn supports(&self, container: &str) -> bool {
            container == "mp4"
        }

        fn decode(&self, _bytes: &[u8]) -> MediaResult<Vec<DecodedFrame>> {
            Ok(vec![DecodedFrame {
                image: Arc::new(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]))),
                duration: Duration::from_millis(40),
            }])
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mp4");
    std::fs::write(&path, b"whatever").unwrap();

    let loader = AssetLoader::new().with_decoder(Arc::new(SolidDecoder));
    let source = loader
        .load(path.to_str().unwrap(), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(source.natural_size(), Some(VideoResolution::new(4, 4)));
}

#[tokio::test]
async fn test_load_timeout() {
    // large enough that decoding cannot finish before a zero timeout fires
    let uri = png_data_uri(3000, 3000, [200, 100, 50, 255]);
    let err = AssetLoader::new()
        .load(&uri, Duration::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, MockRtcError::LoadTimeout { .. }));
}

// ============================================================================
// DRAWING ENGINE TESTS
// ============================================================================

#[tokio::test]
async fn test_interval_loop_draws_frames() {
    let canvas = Canvas::new(VideoResolution::new(64, 48));
    let stream = canvas.capture_stream(30.0);
    let mut engine = DrawingEngine::new(FrameScheduler::Interval);

    engine
        .start(canvas.clone(), image_source(8, 8), canvas.resolution(), 30.0, 1.0)
        .unwrap();
    assert!(engine.is_running());
    assert_eq!(engine.fps(), Some(30.0));

    let track = stream.get_video_tracks()[0].clone();
    let frame = tokio::time::timeout(Duration::from_secs(2), track.next_frame())
        .await
        .unwrap()
        .unwrap();
    assert_eq!((frame.width, frame.height), (64, 48));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(engine.stats().frames_drawn >= 2);

    assert!(engine.stop());
    assert!(!engine.is_running());
    assert!(!engine.stop());
}

#[tokio::test]
async fn test_animation_frame_loop_throttles() {
    let canvas = Canvas::new(VideoResolution::new(32, 32));
    let mut engine = DrawingEngine::new(FrameScheduler::AnimationFrame { refresh_rate: 120.0 });

    engine
        .start(canvas.clone(), image_source(4, 4), canvas.resolution(), 20.0, 1.0)
        .unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    engine.stop();

    let stats = engine.stats();
    assert!(stats.frames_drawn >= 2, "{stats:?}");
    assert!(stats.frames_skipped > stats.frames_drawn, "{stats:?}");
    assert!(stats.frames_drawn <= 20, "{stats:?}");
}

#[tokio::test]
async fn test_only_one_loop_runs() {
    let canvas = Canvas::new(VideoResolution::new(16, 16));
    let mut engine = DrawingEngine::new(FrameScheduler::Interval);

    for _ in 0..3 {
        engine
            .start(canvas.clone(), image_source(4, 4), canvas.resolution(), 50.0, 1.0)
            .unwrap();
    }
    assert_eq!(engine.stats().loops_started, 3);

    engine.stop();
    let drawn = engine.stats().frames_drawn;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(engine.stats().frames_drawn, drawn);
}

#[tokio::test]
async fn test_swap_source_keeps_loop_parameters() {
    let canvas = Canvas::new(VideoResolution::new(20, 10));
    let mut engine = DrawingEngine::new(FrameScheduler::Interval);

    assert!(!engine.restart_with_source(image_source(2, 2)).unwrap());

    engine
        .start(canvas.clone(), image_source(2, 2), canvas.resolution(), 25.0, 1.0)
        .unwrap();

    let red = VisualSource::Image(ImageSource::new(
        "red.png",
        RgbaImage::from_pixel(20, 10, Rgba([255, 0, 0, 255])),
    ));
    assert!(engine.restart_with_source(red).unwrap());
    assert_eq!(engine.fps(), Some(25.0));
    assert_eq!(engine.resolution(), Some(VideoResolution::new(20, 10)));

    tokio::time::sleep(Duration::from_millis(120)).await;
    let pixels = canvas.snapshot().unwrap();
    assert_eq!(*pixels.get_pixel(10, 5), Rgba([255, 0, 0, 255]));
    engine.stop();
}

#[tokio::test]
async fn test_video_source_fills_target() {
    let frames = vec![DecodedFrame {
        image: Arc::new(RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 255]))),
        duration: Duration::from_millis(33),
    }];
    let video = VideoSource::new("green.mjpeg", frames).unwrap();
    video.play().unwrap();

    let canvas = Canvas::new(VideoResolution::new(12, 6));
    let ctx = DrawContext::new(
        canvas.clone(),
        VisualSource::Video(video.clone()),
        canvas.resolution(),
        0.5,
    )
    .unwrap();
    assert!(draw_frame(&ctx));

    // video is stretched over the whole surface, scale factor ignored
    let pixels = canvas.snapshot().unwrap();
    assert_eq!(*pixels.get_pixel(0, 0), Rgba([0, 255, 0, 255]));
    assert_eq!(*pixels.get_pixel(11, 5), Rgba([0, 255, 0, 255]));

    video.clear();
    assert!(!draw_frame(&ctx));
}

#[tokio::test]
async fn test_start_surfaces_canvas_failure() {
    let mut engine = DrawingEngine::new(FrameScheduler::Interval);
    let canvas = Canvas::new(VideoResolution::new(0, 0));
    let err = engine
        .start(canvas, image_source(2, 2), VideoResolution::new(0, 0), 30.0, 1.0)
        .unwrap_err();
    assert!(matches!(err, MockRtcError::CanvasContextFailure { .. }));
    assert!(!engine.is_running());
}

// ============================================================================
// STREAM SYNTHESIS TESTS
// ============================================================================

#[tokio::test]
async fn test_synthesized_track_looks_like_device() {
    let preset = DevicePreset::iphone_12();
    let canvas = Canvas::new(VideoResolution::new(1080, 1920));
    let constraints = MediaTrackConstraints::new().facing_mode("environment");

    let stream = synthesize_stream(
        &canvas,
        24.0,
        canvas.resolution(),
        &preset,
        Some(&constraints),
        &identity_transform(),
    );

    let tracks = stream.get_video_tracks();
    assert_eq!(tracks.len(), 1);
    let track = &tracks[0];
    assert_eq!(track.label(), "Back Camera");
    assert_eq!(track.id(), "iphone12-back");

    let caps = track.get_capabilities().unwrap();
    assert!(!caps.is_empty());
    assert!(caps.supports_facing_mode(FacingMode::Environment));

    let settings = track.get_settings();
    assert_eq!(settings.width, Some(1080));
    assert_eq!(settings.height, Some(1920));
    assert_eq!(settings.frame_rate, Some(24.0));
    assert_eq!(settings.facing_mode, Some(FacingMode::Environment));
    assert_eq!(settings.device_id.as_deref(), Some("iphone12-back"));
    // the raw canvas track never reported a frame rate
    assert_eq!(track.platform_settings().frame_rate, None);
}

#[tokio::test]
async fn test_capabilities_fall_back_to_resolution_list() {
    let mut preset = DevicePreset::macbook_pro();
    for device in &mut preset.device_info_list {
        device.capabilities = None;
    }
    let canvas = Canvas::new(VideoResolution::VGA);

    let stream = synthesize_stream(
        &canvas,
        30.0,
        VideoResolution::VGA,
        &preset,
        None,
        &identity_transform(),
    );
    let caps = stream.get_video_tracks()[0].get_capabilities().unwrap();
    assert_eq!(caps.width.unwrap().min, 640);
    assert_eq!(caps.width.unwrap().max, 1920);
    assert_eq!(caps.frame_rate.unwrap().max, 60.0);
}

#[tokio::test]
async fn test_track_transform_hook_applies_last() {
    let preset = DevicePreset::samsung_galaxy_m53();
    let canvas = Canvas::new(VideoResolution::HD);
    let transform: TrackTransform = Arc::new(|tracks: Vec<MediaStreamTrack>| {
        for track in &tracks {
            track.set_enabled(false);
        }
        tracks
    });

    let stream = synthesize_stream(
        &canvas,
        30.0,
        VideoResolution::HD,
        &preset,
        None,
        &transform,
    );
    let track = &stream.get_video_tracks()[0];
    assert!(!track.enabled());
    assert_eq!(track.label(), "camera2 1, facing front");

    let emptied: TrackTransform = Arc::new(|_| Vec::new());
    let stream = synthesize_stream(&canvas, 30.0, VideoResolution::HD, &preset, None, &emptied);
    assert!(stream.get_tracks().is_empty());
}
