//! Device Hot-Plug Demo - devicechange notifications
//!
//! Listens for `devicechange` on the capture namespace while a USB webcam
//! is plugged in and pulled out of a mocked MacBook.
//!
//! Run with: cargo run --example device_hotplug_demo

use mockrtc::{
    init_logging, DevicePreset, FacingMode, MediaDeviceInfo, MediaMock,
    MediaTrackCapabilities, MockOptions, Navigator,
};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging("mockrtc=debug,info")?;

    println!("🔌 MockRTC Device Hot-Plug Demo");
    println!("===============================");

    // a host without a capture namespace gets a stand-in from mock()
    let navigator = Navigator::headless();
    let mock = MediaMock::new(navigator.clone());
    mock.mock(DevicePreset::macbook_pro(), MockOptions::default());

    let devices = navigator.ensure_media_devices();
    println!("Stand-in namespace: {}", devices.is_stand_in());

    let mut events = devices.subscribe();
    let listener = {
        let devices = devices.clone();
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                let listed = devices.enumerate_devices().await.unwrap_or_default();
                let labels: Vec<String> = listed.into_iter().map(|d| d.label).collect();
                println!("📣 devicechange #{} -> {:?}", event.sequence, labels);
            }
        })
    };

    let webcam = MediaDeviceInfo::video_input(
        "usb-webcam",
        "usb-group",
        "Logitech BRIO",
        MediaTrackCapabilities {
            facing_mode: vec![FacingMode::User],
            ..Default::default()
        },
    );

    println!("\n➕ Plugging in {}", webcam.label);
    mock.add_mock_device(webcam);
    tokio::time::sleep(Duration::from_millis(100)).await;

    println!("\n➖ Unplugging usb-webcam");
    mock.remove_mock_device("usb-webcam")?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    if let Err(e) = mock.remove_mock_device("usb-webcam") {
        println!("\n⚠️  Second removal rejected: {}", e);
    }

    println!("\nTotal devicechange events: {}", devices.device_change_count());

    mock.unmock();
    listener.abort();
    Ok(())
}
