//! Session controller
//!
//! [`MediaMock`] owns the session settings and every resource a capture
//! allocates, and installs/removes the intercepted entry points on the
//! host's capture namespace. Installed handlers hold only a weak reference
//! to the session, so dropping the last [`MediaMock`] handle turns them into
//! `InvalidState` errors instead of keeping the session alive.

use crate::config::{MockConfig, MockOptions, DEFAULT_FRAME_RATE, DEFAULT_MEDIA_TIMEOUT_MS};
use crate::host::{DebugElement, ElementKind, EntryHandler, EntryPoint, MediaDevices, Navigator};
use crate::patch::{Interceptor, PropertyPatcher, RestoreFn};
use futures::FutureExt;
use mockrtc_core::{
    resolve_resolution, DevicePreset, MediaDeviceInfo, MediaStreamConstraints, MockRtcError,
    MockRtcResult, SupportedConstraints, VideoResolution,
};
use mockrtc_media::{
    identity_transform, synthesize_stream, AssetLoader, Canvas, DrawingEngine, MediaKind,
    MediaStream, MediaStreamTrack, RenderStats, SourceLoader, TrackTransform, VisualSource,
    MAX_FRAME_RATE, MIN_SCALE_FACTOR,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Border applied to debug elements
pub const DEBUG_BORDER: &str = "2px solid red";

#[derive(Debug, Clone)]
struct SessionSettings {
    media_url: Option<String>,
    media_timeout: Duration,
    scale_factor: f64,
    frame_rate: f64,
    debug: bool,
    preset: DevicePreset,
    options: MockOptions,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            media_url: None,
            media_timeout: Duration::from_millis(DEFAULT_MEDIA_TIMEOUT_MS),
            scale_factor: 1.0,
            frame_rate: DEFAULT_FRAME_RATE,
            debug: false,
            preset: DevicePreset::default(),
            options: MockOptions::default(),
        }
    }
}

struct LoadedSource {
    source: VisualSource,
    element_id: String,
}

impl LoadedSource {
    fn new(source: VisualSource) -> Self {
        Self {
            source,
            element_id: format!("mockrtc-source-{}", uuid::Uuid::new_v4()),
        }
    }

    fn element(&self) -> DebugElement {
        let kind = match self.source.kind() {
            MediaKind::Image => ElementKind::Image,
            MediaKind::Video => ElementKind::Video,
        };
        DebugElement {
            id: self.element_id.clone(),
            kind,
            border: Some(DEBUG_BORDER.to_string()),
        }
    }
}

struct SessionResources {
    canvas: Option<Canvas>,
    source: Option<LoadedSource>,
    engine: DrawingEngine,
    resolution: Option<VideoResolution>,
    streams: Vec<MediaStream>,
    active_stream: Option<MediaStream>,
}

impl SessionResources {
    fn new(navigator: &Navigator) -> Self {
        Self {
            canvas: None,
            source: None,
            engine: DrawingEngine::new(navigator.frame_scheduler()),
            resolution: None,
            streams: Vec::new(),
            active_stream: None,
        }
    }
}

struct MockInner {
    navigator: Navigator,
    loader: Arc<dyn SourceLoader>,
    interceptor: Arc<dyn Interceptor>,
    settings: RwLock<SessionSettings>,
    resources: Mutex<SessionResources>,
    interceptions: Mutex<HashMap<EntryPoint, RestoreFn>>,
    transform: RwLock<TrackTransform>,
    generation: AtomicU64,
    mocked: AtomicBool,
}

impl MockInner {
    fn attach_debug_elements(&self, resources: &SessionResources) {
        let document = self.navigator.document();
        if let Some(canvas) = &resources.canvas {
            document.append(DebugElement {
                id: canvas.id().to_string(),
                kind: ElementKind::Canvas,
                border: Some(DEBUG_BORDER.to_string()),
            });
        }
        if let Some(loaded) = &resources.source {
            document.append(loaded.element());
        }
    }

    fn detach_element(&self, id: &str) {
        let document = self.navigator.document();
        document.set_border(id, None);
        document.remove(id);
    }

    /// Tear down the render loop and surface once the active stream has no
    /// live track left. Ended streams are forgotten either way.
    fn release_ended_stream(&self, stream_id: &str) {
        let debug_mode = self.settings.read().debug;
        let mut resources = self.resources.lock();
        resources.streams.retain(MediaStream::active);

        let active_ended = resources
            .active_stream
            .as_ref()
            .is_some_and(|stream| stream.id() == stream_id && !stream.active());
        if !active_ended {
            return;
        }

        resources.active_stream = None;
        resources.engine.stop();
        if let Some(canvas) = resources.canvas.take() {
            if debug_mode {
                self.detach_element(canvas.id());
            }
            canvas.release();
        }
        resources.resolution = None;
        info!("🧹 Stream {} ended; render loop released", stream_id);
    }

    fn detach_debug_elements(&self, resources: &SessionResources) {
        if let Some(canvas) = &resources.canvas {
            self.detach_element(canvas.id());
        }
        if let Some(loaded) = &resources.source {
            self.detach_element(&loaded.element_id);
        }
    }
}

impl Drop for MockInner {
    fn drop(&mut self) {
        for (_, restore) in self.interceptions.get_mut().drain() {
            restore.restore();
        }
    }
}

/// Builder for a [`MediaMock`] with non-default collaborators
pub struct MediaMockBuilder {
    navigator: Navigator,
    loader: Arc<dyn SourceLoader>,
    interceptor: Arc<dyn Interceptor>,
}

impl MediaMockBuilder {
    /// Host environment to intercept
    pub fn navigator(mut self, navigator: Navigator) -> Self {
        self.navigator = navigator;
        self
    }

    /// Media loader
    pub fn loader(mut self, loader: Arc<dyn SourceLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Entry point interceptor
    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptor = interceptor;
        self
    }

    /// Create the session
    pub fn build(self) -> MediaMock {
        let resources = SessionResources::new(&self.navigator);
        MediaMock {
            inner: Arc::new(MockInner {
                navigator: self.navigator,
                loader: self.loader,
                interceptor: self.interceptor,
                settings: RwLock::new(SessionSettings::default()),
                resources: Mutex::new(resources),
                interceptions: Mutex::new(HashMap::new()),
                transform: RwLock::new(identity_transform()),
                generation: AtomicU64::new(0),
                mocked: AtomicBool::new(false),
            }),
        }
    }
}

/// Camera test double controller
///
/// Cloning yields another handle to the same session. Setters return the
/// session for chaining.
///
/// # Example
/// ```rust,no_run
/// use mockrtc::{DevicePreset, MediaMock, MediaStreamConstraints, MockOptions, Navigator};
///
/// # async fn demo() -> Result<(), mockrtc::MockRtcError> {
/// let navigator = Navigator::new();
/// let mock = MediaMock::new(navigator.clone());
/// mock.set_media_url("tests/fixtures/face.png").await?
///     .mock(DevicePreset::iphone_12(), MockOptions::default());
///
/// let devices = navigator.ensure_media_devices();
/// let stream = devices.get_user_media(MediaStreamConstraints::any_video()).await?;
/// assert!(stream.active());
///
/// mock.unmock();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MediaMock {
    inner: Arc<MockInner>,
}

impl fmt::Debug for MediaMock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let settings = self.inner.settings.read();
        f.debug_struct("MediaMock")
            .field("mocked", &self.is_mocked())
            .field("media_url", &settings.media_url)
            .field("device", &settings.preset.name)
            .field("frame_rate", &settings.frame_rate)
            .finish()
    }
}

static GLOBAL_MOCK: OnceLock<MediaMock> = OnceLock::new();

impl MediaMock {
    /// Session over `navigator` with the default loader and interceptor
    pub fn new(navigator: Navigator) -> Self {
        Self::builder().navigator(navigator).build()
    }

    /// Session over `navigator` with a custom media loader
    pub fn with_loader(navigator: Navigator, loader: Arc<dyn SourceLoader>) -> Self {
        Self::builder().navigator(navigator).loader(loader).build()
    }

    /// Start building a session
    pub fn builder() -> MediaMockBuilder {
        MediaMockBuilder {
            navigator: Navigator::global(),
            loader: Arc::new(AssetLoader::new()),
            interceptor: Arc::new(PropertyPatcher),
        }
    }

    /// Process-wide session over [`Navigator::global`]
    pub fn global() -> MediaMock {
        GLOBAL_MOCK
            .get_or_init(|| MediaMock::new(Navigator::global()))
            .clone()
    }

    /// Build a session from configuration and install it
    pub async fn from_config(navigator: Navigator, config: MockConfig) -> MockRtcResult<Self> {
        config.validate()?;
        let preset = config.resolve_preset()?;
        let mock = Self::new(navigator);

        let timeout_ms =
            i64::try_from(config.media_timeout_ms).map_err(|_| MockRtcError::Configuration {
                reason: format!("media_timeout_ms {} is out of range", config.media_timeout_ms),
            })?;
        mock.set_media_timeout(timeout_ms)?
            .set_canvas_scale_factor(config.canvas_scale_factor)
            .set_frame_rate(config.frame_rate)?;
        if config.debug {
            mock.enable_debug_mode();
        }
        if let Some(url) = &config.media_url {
            mock.set_media_url(url.as_str()).await?;
        }
        mock.mock(preset, config.options);
        Ok(mock)
    }

    // ========================================================================
    // SETTERS
    // ========================================================================

    /// Load a new visual source and make it current.
    ///
    /// On failure nothing changes: the previous reference and source stay
    /// active. A running render loop is restarted with the new source.
    pub async fn set_media_url(&self, reference: impl Into<String>) -> MockRtcResult<&Self> {
        let reference = reference.into();
        if reference.trim().is_empty() {
            return Err(MockRtcError::invalid_input(
                "media URL must be a non-empty string",
            ));
        }

        let generation = self.inner.generation.load(Ordering::Acquire);
        let timeout = self.inner.settings.read().media_timeout;
        let source = self.inner.loader.load(&reference, timeout).await?;

        let debug_mode = self.is_debug_mode();
        let mut resources = self.inner.resources.lock();
        if self.inner.generation.load(Ordering::Acquire) != generation {
            // unmocked while loading; the next capture reloads from the URL
            debug!("Session reset during load of {}; discarding source", reference);
            source.dispose();
            self.inner.settings.write().media_url = Some(reference);
            return Ok(self);
        }

        match resources.engine.restart_with_source(source.clone()) {
            Ok(true) => info!("🔄 Render source swapped to {}", reference),
            Ok(false) => {}
            Err(e) => {
                warn!("⚠️ Could not render {}: {}", reference, e);
                source.dispose();
                return Err(e);
            }
        }

        self.inner.settings.write().media_url = Some(reference);
        if let Some(previous) = resources.source.replace(LoadedSource::new(source)) {
            previous.source.dispose();
            if debug_mode {
                self.inner.detach_element(&previous.element_id);
            }
        }
        if debug_mode {
            self.inner.attach_debug_elements(&resources);
        }
        Ok(self)
    }

    /// Set the media load timeout in milliseconds; must be positive
    pub fn set_media_timeout(&self, timeout_ms: i64) -> MockRtcResult<&Self> {
        if timeout_ms <= 0 {
            return Err(MockRtcError::invalid_input(format!(
                "media timeout must be a positive number of milliseconds, got {}",
                timeout_ms
            )));
        }
        self.inner.settings.write().media_timeout = Duration::from_millis(timeout_ms as u64);
        Ok(self)
    }

    /// Set how much of the surface an image occupies; clamped to at least 0.1
    pub fn set_canvas_scale_factor(&self, factor: f64) -> &Self {
        let factor = factor.max(MIN_SCALE_FACTOR);
        self.inner.settings.write().scale_factor = factor;

        let mut resources = self.inner.resources.lock();
        if let Some(source) = resources.source.as_ref().map(|l| l.source.clone()) {
            if let Err(e) = resources.engine.set_scale_factor(factor, source) {
                warn!("⚠️ Could not restart render loop at scale {}: {}", factor, e);
            }
        }
        self
    }

    /// Set the default render frame rate for later captures
    pub fn set_frame_rate(&self, fps: f64) -> MockRtcResult<&Self> {
        if !fps.is_finite() || fps <= 0.0 || fps > MAX_FRAME_RATE {
            return Err(MockRtcError::invalid_input(format!(
                "frame rate must be in (0, {}], got {}",
                MAX_FRAME_RATE, fps
            )));
        }
        self.inner.settings.write().frame_rate = fps;
        Ok(self)
    }

    /// Hook applied to synthesized tracks before they are wrapped in a stream
    pub fn set_mocked_video_tracks_handler<F>(&self, handler: F) -> &Self
    where
        F: Fn(Vec<MediaStreamTrack>) -> Vec<MediaStreamTrack> + Send + Sync + 'static,
    {
        *self.inner.transform.write() = Arc::new(handler);
        self
    }

    // ========================================================================
    // DEVICE HOT-PLUG
    // ========================================================================

    fn notify_device_change(&self) {
        match self.inner.navigator.media_devices() {
            Some(devices) => {
                devices.dispatch_device_change();
            }
            None => debug!("No capture namespace to notify of device change"),
        }
    }

    /// Add a device to the active preset and fire `devicechange`
    pub fn add_mock_device(&self, device: MediaDeviceInfo) -> &Self {
        info!("➕ Adding mock device {} ({})", device.device_id, device.label);
        self.inner.settings.write().preset.device_info_list.push(device);
        self.notify_device_change();
        self
    }

    /// Remove a device from the active preset and fire `devicechange`
    pub fn remove_mock_device(&self, device_id: &str) -> MockRtcResult<&Self> {
        {
            let mut settings = self.inner.settings.write();
            let devices = &mut settings.preset.device_info_list;
            let before = devices.len();
            devices.retain(|d| d.device_id != device_id);
            if devices.len() == before {
                return Err(MockRtcError::DeviceNotFound {
                    device_id: device_id.to_string(),
                });
            }
        }
        info!("➖ Removed mock device {}", device_id);
        self.notify_device_change();
        Ok(self)
    }

    // ========================================================================
    // DEBUG MODE
    // ========================================================================

    /// Show the surface and source in the document, bordered
    pub fn enable_debug_mode(&self) -> &Self {
        self.inner.settings.write().debug = true;
        let resources = self.inner.resources.lock();
        self.inner.attach_debug_elements(&resources);
        debug!("Debug mode enabled");
        self
    }

    /// Remove debug elements from the document
    pub fn disable_debug_mode(&self) -> &Self {
        self.inner.settings.write().debug = false;
        let resources = self.inner.resources.lock();
        self.inner.detach_debug_elements(&resources);
        debug!("Debug mode disabled");
        self
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    fn entry_handler(&self, entry: EntryPoint) -> EntryHandler {
        let weak: Weak<MockInner> = Arc::downgrade(&self.inner);
        match entry {
            EntryPoint::GetUserMedia => EntryHandler::GetUserMedia(Arc::new(
                move |constraints: MediaStreamConstraints| {
                    let weak = weak.clone();
                    async move {
                        let inner = weak.upgrade().ok_or_else(session_dropped)?;
                        MediaMock { inner }.get_user_media(constraints).await
                    }
                    .boxed()
                },
            )),
            EntryPoint::GetSupportedConstraints => {
                EntryHandler::GetSupportedConstraints(Arc::new(move || {
                    weak.upgrade()
                        .map(|inner| inner.settings.read().preset.supported_constraints.clone())
                        .unwrap_or_default()
                }))
            }
            EntryPoint::EnumerateDevices => EntryHandler::EnumerateDevices(Arc::new(move || {
                let weak = weak.clone();
                async move {
                    let inner = weak.upgrade().ok_or_else(session_dropped)?;
                    let devices = inner.settings.read().preset.device_info_list.clone();
                    Ok::<_, MockRtcError>(devices)
                }
                .boxed()
            })),
        }
    }

    /// Install interception with `preset` as the active device.
    ///
    /// Calling again while mocked swaps the preset, installs entry points
    /// newly enabled in `options` and restores those now disabled. A host
    /// that refuses replacement is logged and skipped.
    pub fn mock(&self, preset: DevicePreset, options: MockOptions) -> &Self {
        preset.check();
        let devices: MediaDevices = self.inner.navigator.ensure_media_devices();
        let name = preset.name.clone();
        {
            let mut settings = self.inner.settings.write();
            settings.preset = preset;
            settings.options = options;
        }

        let mut interceptions = self.inner.interceptions.lock();
        for entry in EntryPoint::ALL {
            let installed = interceptions.contains_key(&entry);
            match (options.intercepts(entry), installed) {
                (true, false) => {
                    let restore = match self.inner.interceptor.install(
                        &devices,
                        entry,
                        self.entry_handler(entry),
                    ) {
                        Ok(restore) => restore,
                        Err(e) => {
                            warn!("⚠️ Leaving {} unmocked: {}", entry, e);
                            RestoreFn::noop(entry)
                        }
                    };
                    interceptions.insert(entry, restore);
                }
                (false, true) => {
                    if let Some(restore) = interceptions.remove(&entry) {
                        restore.restore();
                        debug!("Restored {}", entry);
                    }
                }
                _ => {}
            }
        }
        drop(interceptions);

        self.inner.mocked.store(true, Ordering::Release);
        info!("🎭 Camera mocked as '{}' ({:?})", name, options);
        self
    }

    /// Tear everything down and restore the host. Safe to call repeatedly.
    pub fn unmock(&self) -> &Self {
        let was_mocked = self.inner.mocked.swap(false, Ordering::AcqRel);
        self.inner.generation.fetch_add(1, Ordering::AcqRel);

        let streams = {
            let mut resources = self.inner.resources.lock();
            resources.engine.reset();
            resources.active_stream = None;
            self.inner.detach_debug_elements(&resources);
            if let Some(canvas) = resources.canvas.take() {
                canvas.release();
            }
            if let Some(loaded) = resources.source.take() {
                loaded.source.dispose();
            }
            resources.resolution = None;
            std::mem::take(&mut resources.streams)
        };
        // ended-track hooks lock the resources again
        for stream in streams {
            stream.stop();
        }

        let restores: Vec<RestoreFn> = self
            .inner
            .interceptions
            .lock()
            .drain()
            .map(|(_, restore)| restore)
            .collect();
        for restore in restores {
            restore.restore();
        }

        if was_mocked {
            info!("🧹 Camera unmocked");
        } else {
            debug!("unmock() with nothing mocked");
        }
        self
    }

    /// What the intercepted `getUserMedia` runs
    pub async fn get_user_media(
        &self,
        constraints: MediaStreamConstraints,
    ) -> MockRtcResult<MediaStream> {
        if !self.is_mocked() {
            return Err(MockRtcError::InvalidState {
                message: "camera is not mocked".to_string(),
            });
        }
        if !constraints.wants_video() {
            return Err(if constraints.audio {
                MockRtcError::NotSupported {
                    operation: "audio capture".to_string(),
                }
            } else {
                MockRtcError::invalid_input("at least one of audio and video must be requested")
            });
        }

        let generation = self.inner.generation.load(Ordering::Acquire);
        let track_constraints = constraints.video_constraints().cloned();
        let settings = self.inner.settings.read().clone();

        let fps = track_constraints
            .as_ref()
            .and_then(|c| c.requested_frame_rate())
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .map(|fps| fps.min(MAX_FRAME_RATE))
            .unwrap_or(settings.frame_rate);
        let orientation = self.inner.navigator.orientation();
        let resolution =
            resolve_resolution(track_constraints.as_ref(), &settings.preset, orientation);
        debug!(
            "getUserMedia: {} at {} fps ({:?} viewport)",
            resolution, fps, orientation
        );

        let canvas = Canvas::new(resolution);
        canvas.get_context()?;

        let current = {
            let resources = self.inner.resources.lock();
            resources
                .source
                .as_ref()
                .filter(|loaded| Some(loaded.source.reference()) == settings.media_url.as_deref())
                .map(|loaded| loaded.source.clone())
        };
        let (source, fresh) = match current {
            Some(VisualSource::Video(video)) if video.is_cleared() => {
                (self.load_current(&settings).await?, true)
            }
            Some(source) => (source, false),
            None => (self.load_current(&settings).await?, true),
        };

        let mut resources = self.inner.resources.lock();
        if self.inner.generation.load(Ordering::Acquire) != generation {
            drop(resources);
            canvas.release();
            if fresh {
                source.dispose();
            }
            return Err(MockRtcError::InvalidState {
                message: "camera was unmocked while the capture was pending".to_string(),
            });
        }

        // set_media_url may have swapped the media while this capture waited
        let current_url = self.inner.settings.read().media_url.clone();
        let (source, fresh) = match resources
            .source
            .as_ref()
            .filter(|loaded| Some(loaded.source.reference()) == current_url.as_deref())
        {
            Some(loaded) if Some(source.reference()) != current_url.as_deref() => {
                debug!(
                    "Media changed to {} during capture; dropping {}",
                    loaded.source.reference(),
                    source.reference()
                );
                if fresh {
                    source.dispose();
                }
                (loaded.source.clone(), false)
            }
            _ => (source, fresh),
        };

        if fresh {
            if let Some(previous) = resources.source.replace(LoadedSource::new(source.clone())) {
                previous.source.dispose();
                if settings.debug {
                    self.inner.detach_element(&previous.element_id);
                }
            }
        }

        resources
            .engine
            .set_scheduler(self.inner.navigator.frame_scheduler());
        if let Err(e) = resources.engine.start(
            canvas.clone(),
            source,
            resolution,
            fps,
            settings.scale_factor,
        ) {
            canvas.release();
            return Err(e);
        }

        if let Some(previous) = resources.canvas.replace(canvas.clone()) {
            if settings.debug {
                self.inner.detach_element(previous.id());
            }
        }
        resources.resolution = Some(resolution);

        let transform = self.inner.transform.read().clone();
        let stream = synthesize_stream(
            &canvas,
            fps,
            resolution,
            &settings.preset,
            track_constraints.as_ref(),
            &transform,
        );
        resources.streams.push(stream.clone());
        resources.active_stream = Some(stream.clone());

        if settings.debug {
            self.inner.attach_debug_elements(&resources);
        }
        drop(resources);

        // a track the transform hook already stopped fires right away
        for track in stream.get_tracks() {
            let weak = Arc::downgrade(&self.inner);
            let stream_id = stream.id().to_string();
            track.on_ended(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.release_ended_stream(&stream_id);
                }
            });
        }
        info!(
            "📸 Served stream {} from {} at {}",
            stream.id(),
            settings.preset.name,
            resolution
        );
        Ok(stream)
    }

    async fn load_current(&self, settings: &SessionSettings) -> MockRtcResult<VisualSource> {
        let url = settings
            .media_url
            .as_deref()
            .ok_or_else(|| MockRtcError::InvalidState {
                message: "no media URL set; call set_media_url first".to_string(),
            })?;
        self.inner.loader.load(url, settings.media_timeout).await
    }

    // ========================================================================
    // GETTERS
    // ========================================================================

    /// Host this session intercepts
    pub fn navigator(&self) -> &Navigator {
        &self.inner.navigator
    }

    /// Current media reference
    pub fn media_url(&self) -> Option<String> {
        self.inner.settings.read().media_url.clone()
    }

    /// Media load timeout
    pub fn media_timeout(&self) -> Duration {
        self.inner.settings.read().media_timeout
    }

    /// Effective canvas scale factor
    pub fn canvas_scale_factor(&self) -> f64 {
        self.inner.settings.read().scale_factor
    }

    /// Default render frame rate
    pub fn frame_rate(&self) -> f64 {
        self.inner.settings.read().frame_rate
    }

    /// Active device preset
    pub fn device_preset(&self) -> DevicePreset {
        self.inner.settings.read().preset.clone()
    }

    /// Constraint support map of the active preset
    pub fn supported_constraints(&self) -> SupportedConstraints {
        self.inner.settings.read().preset.supported_constraints.clone()
    }

    /// Options of the last `mock()` call
    pub fn options(&self) -> MockOptions {
        self.inner.settings.read().options
    }

    /// Whether interception is installed
    pub fn is_mocked(&self) -> bool {
        self.inner.mocked.load(Ordering::Acquire)
    }

    /// Whether debug mode is on
    pub fn is_debug_mode(&self) -> bool {
        self.inner.settings.read().debug
    }

    /// Entry points with a recorded interception (including refused ones)
    pub fn intercepted_entry_points(&self) -> Vec<EntryPoint> {
        let interceptions = self.inner.interceptions.lock();
        EntryPoint::ALL
            .into_iter()
            .filter(|entry| interceptions.contains_key(entry))
            .collect()
    }

    /// Resolution of the last capture
    pub fn current_resolution(&self) -> Option<VideoResolution> {
        self.inner.resources.lock().resolution
    }

    /// Stream returned by the last capture
    pub fn active_stream(&self) -> Option<MediaStream> {
        self.inner.resources.lock().active_stream.clone()
    }

    /// Current drawing surface
    pub fn canvas(&self) -> Option<Canvas> {
        self.inner.resources.lock().canvas.clone()
    }

    /// Whether a render loop is running
    pub fn is_rendering(&self) -> bool {
        self.inner.resources.lock().engine.is_running()
    }

    /// Render loop counters
    pub fn render_stats(&self) -> RenderStats {
        self.inner.resources.lock().engine.stats()
    }
}

fn session_dropped() -> MockRtcError {
    MockRtcError::InvalidState {
        message: "mock session has been dropped".to_string(),
    }
}
