//! Basic Usage - Serve a synthetic camera to capture code
//!
//! Mocks an iPhone 12, requests a few constraint sets the way an app
//! would, and prints what the returned tracks report.
//!
//! Run with: cargo run --example basic_usage [path/to/image.png]

use base64::{engine::general_purpose, Engine as _};
use image::{ImageFormat, Rgba, RgbaImage};
use mockrtc::{
    init_logging, DevicePreset, MediaMock, MediaStreamConstraints, MediaTrackConstraints,
    MockOptions, Navigator, Viewport,
};
use std::io::Cursor;
use std::time::Duration;

/// Gradient test card, used when no image path is given
fn test_card() -> anyhow::Result<String> {
    let image = RgbaImage::from_fn(320, 240, |x, y| {
        Rgba([(x * 255 / 320) as u8, (y * 255 / 240) as u8, 160, 255])
    });
    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png)?;
    Ok(format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(png.into_inner())
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging("info")?;

    println!("🎭 MockRTC Basic Usage");
    println!("======================");

    let media = match std::env::args().nth(1) {
        Some(path) => path,
        None => test_card()?,
    };

    let navigator = Navigator::new();
    let mock = MediaMock::new(navigator.clone());
    mock.set_media_url(media)
        .await?
        .set_canvas_scale_factor(0.8)
        .mock(DevicePreset::iphone_12(), MockOptions::default());

    let devices = navigator.ensure_media_devices();

    println!("\n📹 Enumerated devices:");
    for device in devices.enumerate_devices().await? {
        println!("  - {} ({})", device.label, device.device_id);
    }

    let requests = [
        ("default", MediaTrackConstraints::new()),
        (
            "720p front",
            MediaTrackConstraints::new()
                .width(1280)
                .height(720)
                .facing_mode("user"),
        ),
        (
            "1080p back @ 24fps",
            MediaTrackConstraints::new()
                .width(1920)
                .height(1080)
                .frame_rate(24)
                .facing_mode("environment"),
        ),
    ];

    for viewport in [Viewport::DESKTOP, Viewport::PHONE_PORTRAIT] {
        navigator.set_viewport(viewport);
        println!("\n🖥️  Viewport {}x{} ({:?})", viewport.width, viewport.height, viewport.orientation());

        for (name, constraints) in &requests {
            let stream = devices
                .get_user_media(MediaStreamConstraints::video(constraints.clone()))
                .await?;
            let track = &stream.get_video_tracks()[0];
            let settings = track.get_settings();
            println!(
                "  {:<20} -> {} [{}] {}x{} @ {} fps",
                name,
                track.label(),
                track.id(),
                settings.width.unwrap_or_default(),
                settings.height.unwrap_or_default(),
                settings.frame_rate.unwrap_or_default()
            );
        }
    }

    let track = mock
        .active_stream()
        .and_then(|stream| stream.get_video_tracks().into_iter().next());
    if let Some(track) = track {
        let mut frames = 0;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout_at(deadline, track.next_frame()).await {
                Ok(Some(_)) => frames += 1,
                _ => break,
            }
        }
        println!("\n🎞️  Received {} frames in one second", frames);
    }

    let stats = mock.render_stats();
    println!(
        "📊 Render loop: {} drawn, {} skipped, {} loops started",
        stats.frames_drawn, stats.frames_skipped, stats.loops_started
    );

    mock.unmock();
    println!("\n✅ Unmocked; getUserMedia is back to {:?}", devices);
    Ok(())
}
