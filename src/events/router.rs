//! Window-level event router
//!
//! The router owns the single host subscription per native event kind. On
//! receipt it updates [`InputState`] and queues the event; it never calls a
//! listener itself.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::platform::InputHost;

use super::input_state::InputState;
use super::registry::ListenerRegistry;
use super::{EventKind, InputEvent, NativeEvent, NativeEventKind, WindowEvent};

/// Deferred check after focus leaves an editable element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum FocusRecheck {
    #[default]
    None,
    /// Waiting for the next tick to start the delay
    Requested,
    /// Check once a tick at or past this instant runs
    At(std::time::Instant),
}

#[derive(Debug, Default)]
pub struct EventRouter {
    attached: BTreeSet<NativeEventKind>,
    pending: IndexMap<EventKind, Vec<InputEvent>>,
    focus_recheck: FocusRecheck,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_attached(&self, kind: NativeEventKind) -> bool {
        self.attached.contains(&kind)
    }

    pub fn attached(&self) -> Vec<NativeEventKind> {
        self.attached.iter().copied().collect()
    }

    /// Subscribe once; repeated calls for the same kind are no-ops
    pub fn attach(&mut self, host: &mut dyn InputHost, kind: NativeEventKind) {
        if self.attached.insert(kind) {
            host.attach(kind);
            log::debug!("attached window listener for {}", kind);
        }
    }

    pub fn detach(&mut self, host: &mut dyn InputHost, kind: NativeEventKind) {
        if self.attached.remove(&kind) {
            host.detach(kind);
            log::debug!("detached window listener for {}", kind);
        }
    }

    /// Bring host subscriptions in line with the registry.
    ///
    /// A kind stays attached exactly while it has records; focus tracking
    /// stays attached while any keyboard record exists. Pending events of a
    /// detached kind are dropped.
    pub fn sync(&mut self, host: &mut dyn InputHost, registry: &ListenerRegistry) {
        for kind in EventKind::ALL {
            if registry.has_kind(kind) {
                self.attach(host, kind.native());
            } else {
                self.detach(host, kind.native());
                if self.pending.shift_remove(&kind).is_some() {
                    log::trace!("dropped pending {} events", kind);
                }
            }
        }

        let keyboard = registry.has_keyboard();
        for kind in NativeEventKind::FOCUS_TRACKING {
            if keyboard {
                self.attach(host, kind);
            } else {
                self.detach(host, kind);
            }
        }
        if !keyboard {
            self.focus_recheck = FocusRecheck::None;
        }
    }

    /// Detach everything and forget queued events
    pub fn detach_all(&mut self, host: &mut dyn InputHost) {
        let kinds: Vec<_> = self.attached.iter().copied().collect();
        for kind in kinds {
            self.detach(host, kind);
        }
        self.pending.clear();
        self.focus_recheck = FocusRecheck::None;
    }

    /// Handle one native event from the host
    pub fn receive(&mut self, host: &dyn InputHost, state: &mut InputState, event: NativeEvent) {
        let native = event.native_kind();
        if !self.is_attached(native) {
            log::trace!("ignoring {} without a subscription", native);
            return;
        }

        match event {
            NativeEvent::Input(event) => self.receive_input(host, state, event),
            NativeEvent::Window(event) => self.receive_window(host, state, event),
        }
    }

    fn receive_input(&mut self, host: &dyn InputHost, state: &mut InputState, event: InputEvent) {
        match event.kind {
            EventKind::KeyPress => {
                if let Some(key) = event.key_name() {
                    state.set_key(key, true);
                }
            }
            EventKind::KeyRelease => {
                if let Some(key) = event.key_name() {
                    state.set_key(key, false);
                }
            }
            EventKind::PointerDown | EventKind::PointerUp | EventKind::Click => {
                state.apply_pointer_event(&event, true);
            }
            EventKind::PointerMove => {
                state.apply_pointer_event(&event, false);
                if let Some((x, y)) = event.position() {
                    state.set_hovered(host.elements_at(x, y));
                }
            }
            _ => state.apply_pointer_event(&event, false),
        }

        self.pending.entry(event.kind).or_default().push(event);
    }

    fn receive_window(&mut self, host: &dyn InputHost, state: &mut InputState, event: WindowEvent) {
        match event {
            WindowEvent::Blur => {
                log::debug!("window lost focus, releasing all keys");
                state.reset_all_keys();
            }
            WindowEvent::FocusIn(element) => {
                if host.is_editable(element) {
                    state.set_focused(true);
                    self.focus_recheck = FocusRecheck::None;
                }
            }
            WindowEvent::FocusOut(element) => {
                if host.is_editable(element) {
                    self.focus_recheck = FocusRecheck::Requested;
                }
            }
        }
    }

    /// Run the deferred focus-out check.
    ///
    /// Focus counts as lost only if the element that holds focus now is not
    /// editable, so moving between two inputs never flickers.
    pub(crate) fn recheck_focus(
        &mut self,
        host: &dyn InputHost,
        state: &mut InputState,
        now: std::time::Instant,
        delay: std::time::Duration,
    ) {
        let due = match self.focus_recheck {
            FocusRecheck::None => return,
            FocusRecheck::Requested if delay.is_zero() => true,
            FocusRecheck::Requested => {
                self.focus_recheck = FocusRecheck::At(now + delay);
                false
            }
            FocusRecheck::At(deadline) => now >= deadline,
        };
        if !due {
            return;
        }

        self.focus_recheck = FocusRecheck::None;
        let still_editable = host
            .active_element()
            .map(|element| host.is_editable(element))
            .unwrap_or(false);
        if !still_editable {
            state.set_focused(false);
        }
    }

    /// Drain the queue, kinds in first-arrival order
    pub fn take_pending(&mut self) -> Vec<(EventKind, Vec<InputEvent>)> {
        self.pending.drain(..).filter(|(_, events)| !events.is_empty()).collect()
    }

    pub fn pending_count(&self, kind: EventKind) -> usize {
        self.pending.get(&kind).map(Vec::len).unwrap_or(0)
    }
}
