//! Synthetic event builders, plus a recording host for tests
//!
//! `RecordingHost` is compiled for unit tests and with the `testing`
//! feature.

use std::time::Instant;

use crate::events::{ElementId, EventKind, InputEvent, ModifierState};

#[cfg(any(test, feature = "testing"))]
mod recording;

#[cfg(any(test, feature = "testing"))]
pub use recording::RecordingHost;

/// Options for a fabricated pointer event
#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualPointerOptions {
    pub buttons: u16,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub target: Option<ElementId>,
}

impl VirtualPointerOptions {
    /// Primary button held
    pub fn left_button() -> Self {
        Self {
            buttons: 1,
            ..Default::default()
        }
    }

    pub fn on(mut self, target: ElementId) -> Self {
        self.target = Some(target);
        self
    }
}

/// Build a pointer event the way a real window would report it
pub fn virtual_pointer_event(
    kind: EventKind,
    x: f64,
    y: f64,
    options: VirtualPointerOptions,
    timestamp: Instant,
) -> InputEvent {
    let mut event = InputEvent::pointer(kind, x, y, timestamp)
        .with_buttons(options.buttons)
        .with_modifiers(ModifierState {
            shift: options.shift,
            ctrl: options.ctrl,
            alt: options.alt,
            meta: false,
        });
    event.target = options.target;
    event
}

/// Build a key event with the given modifiers held
pub fn virtual_key_event(
    kind: EventKind,
    key: &str,
    modifiers: ModifierState,
    timestamp: Instant,
) -> InputEvent {
    InputEvent::key(kind, key, timestamp).with_modifiers(modifiers)
}
