//! In-process model of the host's media capture surface
//!
//! There is no ambient browser in a Rust process, so the pieces a page
//! would see are modeled explicitly: a [`Navigator`] that may or may not
//! carry a [`MediaDevices`] namespace, a [`Viewport`] whose shape decides
//! orientation, and a [`Document`] that debug artifacts are attached to.
//!
//! Entry points on [`MediaDevices`] are replaceable slots guarded by a
//! [`PropertyDescriptor`], so restrictive hosts (frozen or read-only
//! properties) can be simulated.

use futures::future::BoxFuture;
use mockrtc_core::{
    MediaDeviceInfo, MediaStreamConstraints, MockRtcError, MockRtcResult, Orientation,
    SupportedConstraints,
};
use mockrtc_media::{FrameScheduler, MediaStream};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::broadcast;
use tracing::debug;

/// Capacity of the device change broadcast channel
const DEVICE_CHANGE_CAPACITY: usize = 64;

/// A replaceable capture entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    /// Obtain a media stream
    GetUserMedia,
    /// List supported constraint names
    GetSupportedConstraints,
    /// List capture devices
    EnumerateDevices,
}

impl EntryPoint {
    /// Every entry point, in installation order
    pub const ALL: [EntryPoint; 3] = [
        EntryPoint::GetUserMedia,
        EntryPoint::GetSupportedConstraints,
        EntryPoint::EnumerateDevices,
    ];

    /// Property name on the capture namespace
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::GetUserMedia => "getUserMedia",
            EntryPoint::GetSupportedConstraints => "getSupportedConstraints",
            EntryPoint::EnumerateDevices => "enumerateDevices",
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implementation of `getUserMedia`
pub type GetUserMediaFn = Arc<
    dyn Fn(MediaStreamConstraints) -> BoxFuture<'static, MockRtcResult<MediaStream>> + Send + Sync,
>;

/// Implementation of `getSupportedConstraints`
pub type GetSupportedConstraintsFn = Arc<dyn Fn() -> SupportedConstraints + Send + Sync>;

/// Implementation of `enumerateDevices`
pub type EnumerateDevicesFn =
    Arc<dyn Fn() -> BoxFuture<'static, MockRtcResult<Vec<MediaDeviceInfo>>> + Send + Sync>;

/// Value stored in an entry point slot
#[derive(Clone)]
pub enum EntryHandler {
    /// `getUserMedia` implementation
    GetUserMedia(GetUserMediaFn),
    /// `getSupportedConstraints` implementation
    GetSupportedConstraints(GetSupportedConstraintsFn),
    /// `enumerateDevices` implementation
    EnumerateDevices(EnumerateDevicesFn),
}

impl EntryHandler {
    /// Entry point this handler implements
    pub fn entry_point(&self) -> EntryPoint {
        match self {
            EntryHandler::GetUserMedia(_) => EntryPoint::GetUserMedia,
            EntryHandler::GetSupportedConstraints(_) => EntryPoint::GetSupportedConstraints,
            EntryHandler::EnumerateDevices(_) => EntryPoint::EnumerateDevices,
        }
    }

    /// Whether both values are the same function object
    pub fn same_handler(&self, other: &EntryHandler) -> bool {
        match (self, other) {
            (EntryHandler::GetUserMedia(a), EntryHandler::GetUserMedia(b)) => Arc::ptr_eq(a, b),
            (EntryHandler::GetSupportedConstraints(a), EntryHandler::GetSupportedConstraints(b)) => {
                Arc::ptr_eq(a, b)
            }
            (EntryHandler::EnumerateDevices(a), EntryHandler::EnumerateDevices(b)) => {
                Arc::ptr_eq(a, b)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for EntryHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryHandler({})", self.entry_point())
    }
}

/// Attributes of an entry point slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptor {
    /// Slot may be redefined
    pub configurable: bool,
    /// Slot may be assigned
    pub writable: bool,
}

impl PropertyDescriptor {
    /// Neither redefinable nor assignable
    pub const FROZEN: Self = Self {
        configurable: false,
        writable: false,
    };
}

impl Default for PropertyDescriptor {
    fn default() -> Self {
        Self {
            configurable: true,
            writable: true,
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    handler: Option<EntryHandler>,
    descriptor: PropertyDescriptor,
}

/// `devicechange` notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceChangeEvent {
    /// Monotonic dispatch counter on the namespace
    pub sequence: u64,
}

struct MediaDevicesInner {
    slots: RwLock<HashMap<EntryPoint, Slot>>,
    events: broadcast::Sender<DeviceChangeEvent>,
    dispatched: AtomicU64,
    stand_in: bool,
}

/// The capture namespace (`navigator.mediaDevices`)
///
/// Cloning yields another handle to the same namespace.
#[derive(Clone)]
pub struct MediaDevices {
    inner: Arc<MediaDevicesInner>,
}

impl fmt::Debug for MediaDevices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.inner.slots.read();
        let installed: Vec<&str> = EntryPoint::ALL
            .iter()
            .filter(|e| slots.get(*e).is_some_and(|s| s.handler.is_some()))
            .map(EntryPoint::as_str)
            .collect();
        f.debug_struct("MediaDevices")
            .field("installed", &installed)
            .field("stand_in", &self.inner.stand_in)
            .finish()
    }
}

impl Default for MediaDevices {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaDevices {
    /// Namespace with empty, configurable and writable slots
    pub fn new() -> Self {
        Self::build(false)
    }

    /// Event-capable stand-in for hosts that have no capture namespace
    pub fn stand_in() -> Self {
        Self::build(true)
    }

    fn build(stand_in: bool) -> Self {
        let (events, _) = broadcast::channel(DEVICE_CHANGE_CAPACITY);
        let slots = EntryPoint::ALL
            .iter()
            .map(|entry| (*entry, Slot::default()))
            .collect();
        Self {
            inner: Arc::new(MediaDevicesInner {
                slots: RwLock::new(slots),
                events,
                dispatched: AtomicU64::new(0),
                stand_in,
            }),
        }
    }

    /// Whether this namespace was synthesized rather than provided by the host
    pub fn is_stand_in(&self) -> bool {
        self.inner.stand_in
    }

    /// Whether both handles refer to the same namespace
    pub fn same_namespace(&self, other: &MediaDevices) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Install a native implementation, ignoring descriptors (host setup)
    pub fn with_handler(self, handler: EntryHandler) -> Self {
        let entry = handler.entry_point();
        self.inner.slots.write().entry(entry).or_default().handler = Some(handler);
        self
    }

    /// Current descriptor of a slot
    pub fn descriptor(&self, entry: EntryPoint) -> PropertyDescriptor {
        self.inner
            .slots
            .read()
            .get(&entry)
            .map(|slot| slot.descriptor)
            .unwrap_or_default()
    }

    /// Change a slot's attributes (host setup only)
    pub fn set_descriptor(&self, entry: EntryPoint, descriptor: PropertyDescriptor) {
        self.inner.slots.write().entry(entry).or_default().descriptor = descriptor;
    }

    /// Current value of a slot
    pub fn handler(&self, entry: EntryPoint) -> Option<EntryHandler> {
        self.inner
            .slots
            .read()
            .get(&entry)
            .and_then(|slot| slot.handler.clone())
    }

    fn check_kind(entry: EntryPoint, handler: &Option<EntryHandler>) -> MockRtcResult<()> {
        match handler {
            Some(h) if h.entry_point() != entry => Err(MockRtcError::invalid_input(format!(
                "{} handler cannot be stored in {}",
                h.entry_point(),
                entry
            ))),
            _ => Ok(()),
        }
    }

    /// Redefine a slot. Requires a configurable slot.
    pub fn define_property(
        &self,
        entry: EntryPoint,
        handler: Option<EntryHandler>,
    ) -> MockRtcResult<()> {
        Self::check_kind(entry, &handler)?;
        let mut slots = self.inner.slots.write();
        let slot = slots.entry(entry).or_default();
        if !slot.descriptor.configurable {
            return Err(MockRtcError::InterceptionFailure {
                entry_point: entry.to_string(),
                reason: "property is not configurable".to_string(),
            });
        }
        slot.handler = handler;
        Ok(())
    }

    /// Assign a slot directly. Requires a writable slot.
    pub fn assign(&self, entry: EntryPoint, handler: Option<EntryHandler>) -> MockRtcResult<()> {
        Self::check_kind(entry, &handler)?;
        let mut slots = self.inner.slots.write();
        let slot = slots.entry(entry).or_default();
        if !slot.descriptor.writable {
            return Err(MockRtcError::InterceptionFailure {
                entry_point: entry.to_string(),
                reason: "property is read-only".to_string(),
            });
        }
        slot.handler = handler;
        Ok(())
    }

    /// Invoke `getUserMedia`
    pub async fn get_user_media(
        &self,
        constraints: MediaStreamConstraints,
    ) -> MockRtcResult<MediaStream> {
        match self.handler(EntryPoint::GetUserMedia) {
            Some(EntryHandler::GetUserMedia(f)) => f(constraints).await,
            _ => Err(Self::not_supported(EntryPoint::GetUserMedia)),
        }
    }

    /// Invoke `getSupportedConstraints`
    pub fn get_supported_constraints(&self) -> MockRtcResult<SupportedConstraints> {
        match self.handler(EntryPoint::GetSupportedConstraints) {
            Some(EntryHandler::GetSupportedConstraints(f)) => Ok(f()),
            _ => Err(Self::not_supported(EntryPoint::GetSupportedConstraints)),
        }
    }

    /// Invoke `enumerateDevices`
    pub async fn enumerate_devices(&self) -> MockRtcResult<Vec<MediaDeviceInfo>> {
        match self.handler(EntryPoint::EnumerateDevices) {
            Some(EntryHandler::EnumerateDevices(f)) => f().await,
            _ => Err(Self::not_supported(EntryPoint::EnumerateDevices)),
        }
    }

    fn not_supported(entry: EntryPoint) -> MockRtcError {
        MockRtcError::NotSupported {
            operation: entry.to_string(),
        }
    }

    /// Listen for `devicechange`
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceChangeEvent> {
        self.inner.events.subscribe()
    }

    /// Fire `devicechange`; returns the event sent
    pub fn dispatch_device_change(&self) -> DeviceChangeEvent {
        let sequence = self.inner.dispatched.fetch_add(1, Ordering::AcqRel) + 1;
        let event = DeviceChangeEvent { sequence };
        // no listeners is fine
        let listeners = self.inner.events.send(event.clone()).unwrap_or(0);
        debug!("📣 devicechange #{} to {} listener(s)", sequence, listeners);
        event
    }

    /// Number of `devicechange` events fired so far
    pub fn device_change_count(&self) -> u64 {
        self.inner.dispatched.load(Ordering::Acquire)
    }
}

/// Visible page area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Width in CSS pixels
    pub width: u32,
    /// Height in CSS pixels
    pub height: u32,
}

impl Viewport {
    /// Typical laptop window
    pub const DESKTOP: Self = Self {
        width: 1280,
        height: 800,
    };

    /// Typical phone held upright
    pub const PHONE_PORTRAIT: Self = Self {
        width: 390,
        height: 844,
    };

    /// Portrait iff taller than wide
    pub fn orientation(&self) -> Orientation {
        Orientation::of(self.width, self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::DESKTOP
    }
}

/// What a debug element shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// The drawing surface
    Canvas,
    /// A still image source
    Image,
    /// A video source
    Video,
}

/// Element attached to the document while debug mode is on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugElement {
    /// Element id
    pub id: String,
    /// What it shows
    pub kind: ElementKind,
    /// CSS border, if any
    pub border: Option<String>,
}

/// The page body debug artifacts are appended to
#[derive(Debug, Clone, Default)]
pub struct Document {
    elements: Arc<RwLock<Vec<DebugElement>>>,
}

impl Document {
    /// Empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element; `false` if one with the same id is attached
    pub fn append(&self, element: DebugElement) -> bool {
        let mut elements = self.elements.write();
        if elements.iter().any(|e| e.id == element.id) {
            return false;
        }
        elements.push(element);
        true
    }

    /// Detach an element by id
    pub fn remove(&self, id: &str) -> Option<DebugElement> {
        let mut elements = self.elements.write();
        let index = elements.iter().position(|e| e.id == id)?;
        Some(elements.remove(index))
    }

    /// Change an attached element's border
    pub fn set_border(&self, id: &str, border: Option<String>) -> bool {
        match self.elements.write().iter_mut().find(|e| e.id == id) {
            Some(element) => {
                element.border = border;
                true
            }
            None => false,
        }
    }

    /// Whether an element is attached
    pub fn contains(&self, id: &str) -> bool {
        self.elements.read().iter().any(|e| e.id == id)
    }

    /// Attached element by id
    pub fn get(&self, id: &str) -> Option<DebugElement> {
        self.elements.read().iter().find(|e| e.id == id).cloned()
    }

    /// Attached elements in document order
    pub fn elements(&self) -> Vec<DebugElement> {
        self.elements.read().clone()
    }

    /// Number of attached elements
    pub fn len(&self) -> usize {
        self.elements.read().len()
    }

    /// Whether nothing is attached
    pub fn is_empty(&self) -> bool {
        self.elements.read().is_empty()
    }
}

struct NavigatorInner {
    media_devices: RwLock<Option<MediaDevices>>,
    viewport: RwLock<Viewport>,
    refresh_rate: RwLock<Option<f64>>,
    document: Document,
}

/// The host environment a mock session runs in
#[derive(Clone)]
pub struct Navigator {
    inner: Arc<NavigatorInner>,
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("media_devices", &*self.inner.media_devices.read())
            .field("viewport", &*self.inner.viewport.read())
            .field("refresh_rate", &*self.inner.refresh_rate.read())
            .finish()
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_NAVIGATOR: OnceLock<Navigator> = OnceLock::new();

impl Navigator {
    /// Browser-like host: capture namespace present, 60 Hz display
    pub fn new() -> Self {
        Self::build(Some(MediaDevices::new()), Some(60.0))
    }

    /// Restrictive host: no capture namespace and no display refresh
    pub fn headless() -> Self {
        Self::build(None, None)
    }

    fn build(media_devices: Option<MediaDevices>, refresh_rate: Option<f64>) -> Self {
        Self {
            inner: Arc::new(NavigatorInner {
                media_devices: RwLock::new(media_devices),
                viewport: RwLock::new(Viewport::default()),
                refresh_rate: RwLock::new(refresh_rate),
                document: Document::new(),
            }),
        }
    }

    /// Process-wide host
    pub fn global() -> Navigator {
        GLOBAL_NAVIGATOR.get_or_init(Navigator::new).clone()
    }

    /// Builder-style viewport setter
    pub fn with_viewport(self, viewport: Viewport) -> Self {
        self.set_viewport(viewport);
        self
    }

    /// Capture namespace, if the host has one
    pub fn media_devices(&self) -> Option<MediaDevices> {
        self.inner.media_devices.read().clone()
    }

    /// Capture namespace, creating a stand-in if the host lacks one
    pub fn ensure_media_devices(&self) -> MediaDevices {
        let mut slot = self.inner.media_devices.write();
        match slot.as_ref() {
            Some(devices) => devices.clone(),
            None => {
                debug!("Host has no capture namespace; installing a stand-in");
                let devices = MediaDevices::stand_in();
                *slot = Some(devices.clone());
                devices
            }
        }
    }

    /// Current viewport
    pub fn viewport(&self) -> Viewport {
        *self.inner.viewport.read()
    }

    /// Resize or rotate the viewport
    pub fn set_viewport(&self, viewport: Viewport) {
        *self.inner.viewport.write() = viewport;
    }

    /// Orientation of the current viewport
    pub fn orientation(&self) -> Orientation {
        self.viewport().orientation()
    }

    /// Page document
    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    /// Display refresh rate, `None` when no per-frame primitive exists
    pub fn refresh_rate(&self) -> Option<f64> {
        *self.inner.refresh_rate.read()
    }

    /// Set or remove the per-frame primitive
    pub fn set_refresh_rate(&self, refresh_rate: Option<f64>) {
        *self.inner.refresh_rate.write() = refresh_rate;
    }

    /// Scheduler a render loop should use on this host
    pub fn frame_scheduler(&self) -> FrameScheduler {
        FrameScheduler::for_refresh_rate(self.refresh_rate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraints_handler(names: &[&str]) -> EntryHandler {
        let map: SupportedConstraints = names.iter().map(|n| (n.to_string(), true)).collect();
        EntryHandler::GetSupportedConstraints(Arc::new(move || map.clone()))
    }

    #[test]
    fn test_empty_slot_is_not_supported() {
        let devices = MediaDevices::new();
        assert!(matches!(
            devices.get_supported_constraints(),
            Err(MockRtcError::NotSupported { .. })
        ));
    }

    #[test]
    fn test_define_and_assign_respect_descriptor() {
        let devices = MediaDevices::new();
        let entry = EntryPoint::GetSupportedConstraints;

        devices
            .define_property(entry, Some(constraints_handler(&["width"])))
            .unwrap();
        assert!(devices.get_supported_constraints().unwrap()["width"]);

        devices.set_descriptor(
            entry,
            PropertyDescriptor {
                configurable: false,
                writable: true,
            },
        );
        assert!(devices.define_property(entry, None).is_err());
        devices.assign(entry, None).unwrap();
        assert!(devices.handler(entry).is_none());

        devices.set_descriptor(entry, PropertyDescriptor::FROZEN);
        assert!(matches!(
            devices.assign(entry, Some(constraints_handler(&[]))),
            Err(MockRtcError::InterceptionFailure { .. })
        ));
    }

    #[test]
    fn test_mismatched_handler_rejected() {
        let devices = MediaDevices::new();
        let result =
            devices.define_property(EntryPoint::GetUserMedia, Some(constraints_handler(&[])));
        assert!(matches!(result, Err(MockRtcError::InvalidInput { .. })));
    }

    #[test]
    fn test_headless_navigator_gets_stand_in() {
        let navigator = Navigator::headless();
        assert!(navigator.media_devices().is_none());

        let devices = navigator.ensure_media_devices();
        assert!(devices.is_stand_in());
        assert!(navigator
            .ensure_media_devices()
            .same_namespace(&devices));
        assert_eq!(navigator.frame_scheduler(), FrameScheduler::Interval);
    }

    #[test]
    fn test_document_elements() {
        let document = Document::new();
        let element = DebugElement {
            id: "c1".to_string(),
            kind: ElementKind::Canvas,
            border: Some("2px solid red".to_string()),
        };
        assert!(document.append(element.clone()));
        assert!(!document.append(element));
        assert!(document.set_border("c1", None));
        assert_eq!(document.get("c1").unwrap().border, None);
        assert!(document.remove("c1").is_some());
        assert!(document.is_empty());
    }

    #[tokio::test]
    async fn test_device_change_broadcast() {
        let devices = MediaDevices::new();
        let mut events = devices.subscribe();
        devices.dispatch_device_change();
        devices.dispatch_device_change();

        assert_eq!(events.recv().await.unwrap().sequence, 1);
        assert_eq!(events.recv().await.unwrap().sequence, 2);
        assert_eq!(devices.device_change_count(), 2);
    }

    #[test]
    fn test_viewport_orientation() {
        assert_eq!(Viewport::DESKTOP.orientation(), Orientation::Landscape);
        assert_eq!(Viewport::PHONE_PORTRAIT.orientation(), Orientation::Portrait);
    }
}
