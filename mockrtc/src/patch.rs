//! Entry point replacement with restore handles
//!
//! [`replace_entry_point`] swaps a slot on the capture namespace and hands
//! back a [`RestoreFn`] that puts the previous value back. Redefinition is
//! tried first, then plain assignment; hosts that allow neither get an
//! `InterceptionFailure`.

use crate::host::{EntryHandler, EntryPoint, MediaDevices};
use mockrtc_core::{MockRtcError, MockRtcResult};
use std::fmt;
use tracing::{debug, warn};

/// Undo for one replaced entry point
pub struct RestoreFn {
    entry: EntryPoint,
    action: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl RestoreFn {
    fn new(entry: EntryPoint, action: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            entry,
            action: Some(Box::new(action)),
        }
    }

    /// Restore that does nothing, recorded when interception was refused
    pub fn noop(entry: EntryPoint) -> Self {
        Self {
            entry,
            action: None,
        }
    }

    /// Entry point this restores
    pub fn entry_point(&self) -> EntryPoint {
        self.entry
    }

    /// Whether running it changes anything
    pub fn is_noop(&self) -> bool {
        self.action.is_none()
    }

    /// Put the previous value back
    pub fn restore(mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

impl fmt::Debug for RestoreFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestoreFn")
            .field("entry", &self.entry)
            .field("noop", &self.is_noop())
            .finish()
    }
}

fn write_slot(
    target: &MediaDevices,
    entry: EntryPoint,
    value: Option<EntryHandler>,
) -> MockRtcResult<()> {
    match target.define_property(entry, value.clone()) {
        Ok(()) => Ok(()),
        Err(MockRtcError::InterceptionFailure { .. }) => target.assign(entry, value),
        Err(e) => Err(e),
    }
}

/// Replace `entry` on `target`, returning how to undo it.
///
/// The restore writes back exactly what was there before, including an
/// empty slot, using the same define-then-assign fallback.
pub fn replace_entry_point(
    target: &MediaDevices,
    entry: EntryPoint,
    replacement: EntryHandler,
) -> MockRtcResult<RestoreFn> {
    if replacement.entry_point() != entry {
        return Err(MockRtcError::invalid_input(format!(
            "{} handler cannot replace {}",
            replacement.entry_point(),
            entry
        )));
    }

    let original = target.handler(entry);
    write_slot(target, entry, Some(replacement))?;
    debug!("Replaced {} (had original: {})", entry, original.is_some());

    let target = target.clone();
    Ok(RestoreFn::new(entry, move || {
        if let Err(e) = write_slot(&target, entry, original) {
            warn!("⚠️ Could not restore {}: {}", entry, e);
        }
    }))
}

/// Installs interceptions on a capture namespace
pub trait Interceptor: Send + Sync {
    /// Replace `entry` with `replacement`
    fn install(
        &self,
        target: &MediaDevices,
        entry: EntryPoint,
        replacement: EntryHandler,
    ) -> MockRtcResult<RestoreFn>;
}

/// Default [`Interceptor`] backed by [`replace_entry_point`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyPatcher;

impl Interceptor for PropertyPatcher {
    fn install(
        &self,
        target: &MediaDevices,
        entry: EntryPoint,
        replacement: EntryHandler,
    ) -> MockRtcResult<RestoreFn> {
        replace_entry_point(target, entry, replacement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::PropertyDescriptor;
    use mockrtc_core::SupportedConstraints;
    use std::sync::Arc;

    fn handler(name: &'static str) -> EntryHandler {
        EntryHandler::GetSupportedConstraints(Arc::new(move || {
            let mut map = SupportedConstraints::new();
            map.insert(name.to_string(), true);
            map
        }))
    }

    const ENTRY: EntryPoint = EntryPoint::GetSupportedConstraints;

    #[test]
    fn test_replace_and_restore_original() {
        let original = handler("original");
        let devices = MediaDevices::new().with_handler(original.clone());

        let restore = replace_entry_point(&devices, ENTRY, handler("mock")).unwrap();
        assert!(devices.get_supported_constraints().unwrap().contains_key("mock"));

        restore.restore();
        assert!(devices.handler(ENTRY).unwrap().same_handler(&original));
    }

    #[test]
    fn test_restore_to_empty_slot() {
        let devices = MediaDevices::new();
        let restore = replace_entry_point(&devices, ENTRY, handler("mock")).unwrap();
        restore.restore();
        assert!(devices.handler(ENTRY).is_none());
    }

    #[test]
    fn test_assignment_fallback() {
        let devices = MediaDevices::new();
        devices.set_descriptor(
            ENTRY,
            PropertyDescriptor {
                configurable: false,
                writable: true,
            },
        );
        let restore = PropertyPatcher.install(&devices, ENTRY, handler("mock")).unwrap();
        assert!(!restore.is_noop());
        assert!(devices.handler(ENTRY).is_some());
    }

    #[test]
    fn test_frozen_slot_fails() {
        let devices = MediaDevices::new();
        devices.set_descriptor(ENTRY, PropertyDescriptor::FROZEN);
        assert!(matches!(
            replace_entry_point(&devices, ENTRY, handler("mock")),
            Err(MockRtcError::InterceptionFailure { .. })
        ));
    }

    #[test]
    fn test_noop_restore() {
        let restore = RestoreFn::noop(ENTRY);
        assert!(restore.is_noop());
        assert_eq!(restore.entry_point(), ENTRY);
        restore.restore();
    }
}
