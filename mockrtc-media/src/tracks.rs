//! Track abstractions and media frame types

use bytes::Bytes;
use mockrtc_core::{FacingMode, MediaTrackCapabilities, VideoResolution};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Notify};
use tracing::{debug, info};

/// Video frame representation
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// RGBA8 pixel data, row-major
    pub data: Bytes,
    /// Timestamp in milliseconds
    pub timestamp: u64,
    /// Monotonic frame counter for the producing surface
    pub sequence: u64,
}

/// Track media kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Audio => "audio",
            TrackKind::Video => "video",
        }
    }
}

/// Track lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackState {
    Live,
    Ended,
}

/// Settings a track reports for its current configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTrackSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facing_mode: Option<FacingMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

/// Values injected into settings the platform left out
#[derive(Debug, Clone, Default)]
pub(crate) struct SettingsFallback {
    pub resolution: Option<VideoResolution>,
    pub frame_rate: Option<f64>,
    pub facing_mode: Option<FacingMode>,
    pub device_id: Option<String>,
    pub group_id: Option<String>,
}

#[derive(Debug)]
struct TrackIdentity {
    id: String,
    label: String,
    locked: bool,
}

struct TrackInner {
    kind: TrackKind,
    identity: RwLock<TrackIdentity>,
    state: RwLock<TrackState>,
    enabled: AtomicBool,
    platform_settings: MediaTrackSettings,
    capabilities: RwLock<Option<MediaTrackCapabilities>>,
    fallback: RwLock<Option<SettingsFallback>>,
    frames: Option<tokio::sync::Mutex<watch::Receiver<Option<VideoFrame>>>>,
    latest: Option<watch::Receiver<Option<VideoFrame>>>,
    ended: Notify,
    on_ended: Mutex<Vec<EndedHook>>,
}

type EndedHook = Box<dyn FnOnce() + Send + 'static>;

/// A media track handle; clones share the same underlying track
#[derive(Clone)]
pub struct MediaStreamTrack {
    inner: Arc<TrackInner>,
}

impl std::fmt::Debug for MediaStreamTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let identity = self.inner.identity.read();
        f.debug_struct("MediaStreamTrack")
            .field("id", &identity.id)
            .field("label", &identity.label)
            .field("kind", &self.inner.kind)
            .field("state", &*self.inner.state.read())
            .finish()
    }
}

impl MediaStreamTrack {
    /// Create a live video track fed by a frame channel
    pub(crate) fn video(
        platform_settings: MediaTrackSettings,
        frames: watch::Receiver<Option<VideoFrame>>,
    ) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        debug!("Creating video track {}", id);
        Self {
            inner: Arc::new(TrackInner {
                kind: TrackKind::Video,
                identity: RwLock::new(TrackIdentity {
                    id,
                    label: String::new(),
                    locked: false,
                }),
                state: RwLock::new(TrackState::Live),
                enabled: AtomicBool::new(true),
                platform_settings,
                capabilities: RwLock::new(None),
                fallback: RwLock::new(None),
                latest: Some(frames.clone()),
                frames: Some(tokio::sync::Mutex::new(frames)),
                ended: Notify::new(),
                on_ended: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Get track ID
    pub fn id(&self) -> String {
        self.inner.identity.read().id.clone()
    }

    /// Get track label
    pub fn label(&self) -> String {
        self.inner.identity.read().label.clone()
    }

    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    pub fn ready_state(&self) -> TrackState {
        *self.inner.state.read()
    }

    pub fn is_live(&self) -> bool {
        self.ready_state() == TrackState::Live
    }

    pub fn enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Relaxed);
    }

    /// End the track. Ended tracks stay ended.
    pub fn stop(&self) {
        let mut state = self.inner.state.write();
        if *state == TrackState::Live {
            info!("⏹️ Stopping track {}", self.inner.identity.read().id);
            *state = TrackState::Ended;
            drop(state);
            self.inner.ended.notify_waiters();
            let hooks = std::mem::take(&mut *self.inner.on_ended.lock());
            for hook in hooks {
                hook();
            }
        }
    }

    /// Run `hook` once the track ends; right away if it already has.
    ///
    /// Hooks run on the thread that calls [`stop`](Self::stop).
    pub fn on_ended<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let state = self.inner.state.read();
        if *state == TrackState::Live {
            self.inner.on_ended.lock().push(Box::new(hook));
            return;
        }
        drop(state);
        hook();
    }

    /// Whether the two handles refer to the same track
    pub fn same_track(&self, other: &MediaStreamTrack) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Current settings, with anything the platform omitted filled in
    pub fn get_settings(&self) -> MediaTrackSettings {
        let mut settings = self.inner.platform_settings.clone();
        let fallback = self.inner.fallback.read();
        let Some(fallback) = fallback.as_ref() else {
            return settings;
        };

        if settings.width.is_none() || settings.height.is_none() {
            if let Some(resolution) = fallback.resolution {
                settings.width = Some(resolution.width);
                settings.height = Some(resolution.height);
            }
        }
        if settings.frame_rate.is_none() {
            settings.frame_rate = fallback.frame_rate;
        }
        if settings.aspect_ratio.is_none() {
            if let (Some(w), Some(h)) = (settings.width, settings.height) {
                if h > 0 {
                    settings.aspect_ratio = Some(w as f64 / h as f64);
                }
            }
        }
        if settings.facing_mode.is_none() {
            settings.facing_mode = fallback.facing_mode;
        }
        if settings.device_id.is_none() {
            settings.device_id = fallback.device_id.clone();
        }
        if settings.group_id.is_none() {
            settings.group_id = fallback.group_id.clone();
        }
        settings
    }

    /// Settings exactly as the producing surface reported them
    pub fn platform_settings(&self) -> &MediaTrackSettings {
        &self.inner.platform_settings
    }

    /// Capability set, if the track exposes one
    pub fn get_capabilities(&self) -> Option<MediaTrackCapabilities> {
        self.inner.capabilities.read().clone()
    }

    /// Most recent frame produced for this track
    pub fn latest_frame(&self) -> Option<VideoFrame> {
        if !self.is_live() {
            return None;
        }
        self.inner.latest.as_ref()?.borrow().clone()
    }

    /// Wait for the next frame. Returns `None` once the track has ended or
    /// its surface is gone.
    pub async fn next_frame(&self) -> Option<VideoFrame> {
        let frames = self.inner.frames.as_ref()?;
        let mut rx = frames.lock().await;

        loop {
            let ended = self.inner.ended.notified();
            tokio::pin!(ended);
            ended.as_mut().enable();

            if !self.is_live() {
                return None;
            }

            tokio::select! {
                _ = &mut ended => return None,
                changed = rx.changed() => {
                    changed.ok()?;
                    if let Some(frame) = rx.borrow_and_update().clone() {
                        return Some(frame);
                    }
                }
            }
        }
    }

    /// Replace label and id; only the first override takes effect
    pub(crate) fn override_identity(&self, label: &str, id: &str) -> bool {
        let mut identity = self.inner.identity.write();
        if identity.locked {
            return false;
        }
        identity.label = label.to_string();
        identity.id = id.to_string();
        identity.locked = true;
        true
    }

    /// Install a capability set if none is exposed yet
    pub(crate) fn ensure_capabilities(&self, capabilities: MediaTrackCapabilities) {
        let mut current = self.inner.capabilities.write();
        if current.is_none() {
            *current = Some(capabilities);
        }
    }

    pub(crate) fn set_settings_fallback(&self, fallback: SettingsFallback) {
        *self.inner.fallback.write() = Some(fallback);
    }
}

/// A set of tracks handed back by a capture call
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<MediaStreamTrack>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaStreamTrack>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tracks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get_tracks(&self) -> &[MediaStreamTrack] {
        &self.tracks
    }

    pub fn get_video_tracks(&self) -> Vec<MediaStreamTrack> {
        self.tracks
            .iter()
            .filter(|t| t.kind() == TrackKind::Video)
            .cloned()
            .collect()
    }

    pub fn get_track_by_id(&self, id: &str) -> Option<MediaStreamTrack> {
        self.tracks.iter().find(|t| t.id() == id).cloned()
    }

    /// A stream is active while any of its tracks is live
    pub fn active(&self) -> bool {
        self.tracks.iter().any(MediaStreamTrack::is_live)
    }

    /// Stop every track in the stream
    pub fn stop(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}
