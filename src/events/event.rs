//! Normalized input events
//!
//! Raw window events arrive from the host already decoded into these types.
//! The engine never sees platform objects; targets are opaque [`ElementId`]s
//! that the host can resolve and compare.

use std::cell::Cell;
use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Opaque handle to a host element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}", self.0)
    }
}

/// Element a listener is restricted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A concrete element
    Element(ElementId),
    /// A selector resolved through the host when the event is filtered
    Selector(String),
}

impl From<ElementId> for Target {
    fn from(id: ElementId) -> Self {
        Target::Element(id)
    }
}

impl From<&str> for Target {
    fn from(selector: &str) -> Self {
        Target::Selector(selector.to_string())
    }
}

impl From<String> for Target {
    fn from(selector: String) -> Self {
        Target::Selector(selector)
    }
}

/// Kinds of events a listener can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    KeyPress,
    KeyRelease,
    PointerMove,
    PointerDown,
    PointerUp,
    Click,
    DoubleClick,
    ContextMenu,
    Enter,
    Leave,
    Wheel,
}

impl EventKind {
    /// Every listener kind, in declaration order
    pub const ALL: [EventKind; 11] = [
        EventKind::KeyPress,
        EventKind::KeyRelease,
        EventKind::PointerMove,
        EventKind::PointerDown,
        EventKind::PointerUp,
        EventKind::Click,
        EventKind::DoubleClick,
        EventKind::ContextMenu,
        EventKind::Enter,
        EventKind::Leave,
        EventKind::Wheel,
    ];

    /// The window-level subscription that feeds this kind
    pub fn native(self) -> NativeEventKind {
        match self {
            EventKind::KeyPress => NativeEventKind::KeyDown,
            EventKind::KeyRelease => NativeEventKind::KeyUp,
            EventKind::PointerMove => NativeEventKind::MouseMove,
            EventKind::PointerDown => NativeEventKind::MouseDown,
            EventKind::PointerUp => NativeEventKind::MouseUp,
            EventKind::Click => NativeEventKind::Click,
            EventKind::DoubleClick => NativeEventKind::DoubleClick,
            EventKind::ContextMenu => NativeEventKind::ContextMenu,
            EventKind::Enter => NativeEventKind::MouseEnter,
            EventKind::Leave => NativeEventKind::MouseLeave,
            EventKind::Wheel => NativeEventKind::Wheel,
        }
    }

    /// Whether this kind is driven by the keyboard
    pub fn is_keyboard(self) -> bool {
        matches!(self, EventKind::KeyPress | EventKind::KeyRelease)
    }

    /// High-frequency kinds where only the latest queued event matters
    pub fn is_coalescible(self) -> bool {
        matches!(self, EventKind::PointerMove | EventKind::Wheel)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.native().as_str())
    }
}

/// Window-level event names the host can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NativeEventKind {
    KeyDown,
    KeyUp,
    MouseMove,
    MouseDown,
    MouseUp,
    Click,
    DoubleClick,
    ContextMenu,
    MouseEnter,
    MouseLeave,
    Wheel,
    Blur,
    FocusIn,
    FocusOut,
}

impl NativeEventKind {
    /// Subscriptions kept alive while any keyboard listener exists
    pub const FOCUS_TRACKING: [NativeEventKind; 3] = [
        NativeEventKind::Blur,
        NativeEventKind::FocusIn,
        NativeEventKind::FocusOut,
    ];

    /// Platform event name
    pub fn as_str(self) -> &'static str {
        match self {
            NativeEventKind::KeyDown => "keydown",
            NativeEventKind::KeyUp => "keyup",
            NativeEventKind::MouseMove => "mousemove",
            NativeEventKind::MouseDown => "mousedown",
            NativeEventKind::MouseUp => "mouseup",
            NativeEventKind::Click => "click",
            NativeEventKind::DoubleClick => "dblclick",
            NativeEventKind::ContextMenu => "contextmenu",
            NativeEventKind::MouseEnter => "mouseenter",
            NativeEventKind::MouseLeave => "mouseleave",
            NativeEventKind::Wheel => "wheel",
            NativeEventKind::Blur => "blur",
            NativeEventKind::FocusIn => "focusin",
            NativeEventKind::FocusOut => "focusout",
        }
    }
}

impl fmt::Display for NativeEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Modifier keys a listener can require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    Shift,
    /// Control, or the platform Meta key
    Control,
    Alt,
}

/// Set of required modifiers; empty means "don't check"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierSet {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
}

impl ModifierSet {
    pub fn is_empty(&self) -> bool {
        !(self.shift || self.control || self.alt)
    }

    /// Exact match against the modifier state of an event.
    ///
    /// Meta counts as Control.
    pub fn matches(&self, state: &ModifierState) -> bool {
        if self.is_empty() {
            return true;
        }
        self.shift == state.shift && self.control == (state.ctrl || state.meta) && self.alt == state.alt
    }
}

impl FromIterator<Modifier> for ModifierSet {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        let mut set = ModifierSet::default();
        for modifier in iter {
            match modifier {
                Modifier::Shift => set.shift = true,
                Modifier::Control => set.control = true,
                Modifier::Alt => set.alt = true,
            }
        }
        set
    }
}

/// Modifier keys held while an event fired
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Pointer coordinates carried by mouse and wheel events
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerData {
    pub client_x: f64,
    pub client_y: f64,
    pub page_x: f64,
    pub page_y: f64,
    pub screen_x: f64,
    pub screen_y: f64,
    pub movement_x: f64,
    pub movement_y: f64,
    /// Button that changed state (0 = primary)
    pub button: i16,
    /// Bitmask of held buttons: 1 left, 2 right, 4 middle
    pub buttons: u16,
}

impl PointerData {
    /// Pointer data with every coordinate space set to the same point
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            client_x: x,
            client_y: y,
            page_x: x,
            page_y: y,
            screen_x: x,
            screen_y: y,
            ..Default::default()
        }
    }
}

/// Kind-specific event data
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Key {
        key: String,
        code: String,
        repeat: bool,
    },
    Pointer(PointerData),
    Wheel {
        pointer: PointerData,
        delta_x: f64,
        delta_y: f64,
        delta_z: f64,
    },
}

/// A normalized input event queued for dispatch
#[derive(Debug, Clone)]
pub struct InputEvent {
    pub kind: EventKind,
    pub timestamp: Instant,
    pub target: Option<ElementId>,
    pub modifiers: ModifierState,
    pub payload: EventPayload,
    default_prevented: Cell<bool>,
}

impl InputEvent {
    pub fn new(kind: EventKind, timestamp: Instant, payload: EventPayload) -> Self {
        Self {
            kind,
            timestamp,
            target: None,
            modifiers: ModifierState::default(),
            payload,
            default_prevented: Cell::new(false),
        }
    }

    /// Key event for `KeyPress` or `KeyRelease`
    pub fn key(kind: EventKind, key: impl Into<String>, timestamp: Instant) -> Self {
        let key = key.into();
        Self::new(
            kind,
            timestamp,
            EventPayload::Key {
                code: key.clone(),
                key,
                repeat: false,
            },
        )
    }

    /// Pointer event at client coordinates `(x, y)`
    pub fn pointer(kind: EventKind, x: f64, y: f64, timestamp: Instant) -> Self {
        let pointer = PointerData::at(x, y);
        let payload = if kind == EventKind::Wheel {
            EventPayload::Wheel {
                pointer,
                delta_x: 0.0,
                delta_y: 0.0,
                delta_z: 0.0,
            }
        } else {
            EventPayload::Pointer(pointer)
        };
        Self::new(kind, timestamp, payload)
    }

    pub fn with_target(mut self, target: ElementId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_modifiers(mut self, modifiers: ModifierState) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Set the held-button bitmask on a pointer or wheel event
    pub fn with_buttons(mut self, buttons: u16) -> Self {
        if let Some(pointer) = self.pointer_mut() {
            pointer.buttons = buttons;
        }
        self
    }

    /// Mark a key event as an auto-repeat
    pub fn with_repeat(mut self, value: bool) -> Self {
        if let EventPayload::Key { repeat, .. } = &mut self.payload {
            *repeat = value;
        }
        self
    }

    /// Logical key name for keyboard events
    pub fn key_name(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Key { key, .. } => Some(key),
            _ => None,
        }
    }

    pub fn is_repeat(&self) -> bool {
        matches!(self.payload, EventPayload::Key { repeat: true, .. })
    }

    pub fn pointer_data(&self) -> Option<&PointerData> {
        match &self.payload {
            EventPayload::Pointer(pointer) => Some(pointer),
            EventPayload::Wheel { pointer, .. } => Some(pointer),
            EventPayload::Key { .. } => None,
        }
    }

    fn pointer_mut(&mut self) -> Option<&mut PointerData> {
        match &mut self.payload {
            EventPayload::Pointer(pointer) => Some(pointer),
            EventPayload::Wheel { pointer, .. } => Some(pointer),
            EventPayload::Key { .. } => None,
        }
    }

    /// Client coordinates, if this is a pointer event
    pub fn position(&self) -> Option<(f64, f64)> {
        self.pointer_data().map(|p| (p.client_x, p.client_y))
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

/// Window events that only update input state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// The window lost focus
    Blur,
    /// Focus moved onto an element
    FocusIn(ElementId),
    /// Focus left an element
    FocusOut(ElementId),
}

impl WindowEvent {
    pub fn native(self) -> NativeEventKind {
        match self {
            WindowEvent::Blur => NativeEventKind::Blur,
            WindowEvent::FocusIn(_) => NativeEventKind::FocusIn,
            WindowEvent::FocusOut(_) => NativeEventKind::FocusOut,
        }
    }
}

/// Anything the host can deliver through a window subscription
#[derive(Debug, Clone)]
pub enum NativeEvent {
    Input(InputEvent),
    Window(WindowEvent),
}

impl NativeEvent {
    pub fn native_kind(&self) -> NativeEventKind {
        match self {
            NativeEvent::Input(event) => event.kind.native(),
            NativeEvent::Window(event) => event.native(),
        }
    }
}

impl From<InputEvent> for NativeEvent {
    fn from(event: InputEvent) -> Self {
        NativeEvent::Input(event)
    }
}

impl From<WindowEvent> for NativeEvent {
    fn from(event: WindowEvent) -> Self {
        NativeEvent::Window(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_matches_meta() {
        let required: ModifierSet = [Modifier::Control].into_iter().collect();
        let meta = ModifierState {
            meta: true,
            ..Default::default()
        };
        assert!(required.matches(&meta));
    }

    #[test]
    fn test_modifier_match_is_exact() {
        let required: ModifierSet = [Modifier::Control].into_iter().collect();
        let ctrl_shift = ModifierState {
            ctrl: true,
            shift: true,
            ..Default::default()
        };
        assert!(!required.matches(&ctrl_shift));
        assert!(!required.matches(&ModifierState::default()));
    }

    #[test]
    fn test_empty_modifier_set_skips_check() {
        let anything = ModifierState {
            alt: true,
            shift: true,
            ..Default::default()
        };
        assert!(ModifierSet::default().matches(&anything));
    }

    #[test]
    fn test_wheel_event_carries_pointer() {
        let event = InputEvent::pointer(EventKind::Wheel, 4.0, 8.0, Instant::now()).with_buttons(1);
        assert_eq!(event.position(), Some((4.0, 8.0)));
        assert_eq!(event.pointer_data().map(|p| p.buttons), Some(1));
    }

    #[test]
    fn test_prevent_default_through_shared_ref() {
        let event = InputEvent::key(EventKind::KeyPress, "a", Instant::now());
        let shared = &event;
        shared.prevent_default();
        assert!(event.is_default_prevented());
    }
}
