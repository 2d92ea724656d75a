//! Event service: construction, registration API and the frame tick
//!
//! One [`EventService`] owns the registry, router, input state and dispatch
//! loop for a window. Clones are cheap handles onto the same engine, so a
//! listener can capture the service and register or dispose other
//! listeners from inside a callback.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Instant;

use indexmap::IndexMap;

use crate::config::EngineConfig;
use crate::events::dispatcher::{coalesce, dispatch_events, DispatchContext, DEFAULT_LOW_POWER_FREQUENCY};
use crate::events::drag::{drag_configs, DragCallbacks, DragOptions, DragSession};
use crate::events::filter::{resolve_target, structural_match};
use crate::events::{
    DispatchLoop, ElementId, EventError, EventKind, EventRouter, FrameStats, InputEvent, InputState,
    ListenerConfig, ListenerId, ListenerOptions, ListenerRecord, ListenerRegistry, LoopState,
    ModifierState, MouseButtons, NativeEvent, PointerPosition, Target,
};
use crate::platform::InputHost;
use crate::testing::{virtual_key_event, virtual_pointer_event, VirtualPointerOptions};

struct Engine {
    host: Box<dyn InputHost>,
    registry: ListenerRegistry,
    router: EventRouter,
    input: InputState,
    dispatch: DispatchLoop,
    config: EngineConfig,
}

impl Engine {
    fn register(&mut self, config: ListenerConfig) -> Result<ListenerId, EventError> {
        let kind = config.kind.ok_or(EventError::MissingKind)?;

        let record = ListenerRecord::new(kind, config.key, config.options);
        if let Some(key) = &record.match_key {
            self.input.track_key(key);
        }
        let id = self.registry.register(record);
        log::debug!("registered listener for {} id={}", kind, id);

        self.sync();
        Ok(id)
    }

    fn unregister(&mut self, id: ListenerId) -> bool {
        let Some(record) = self.registry.remove(id) else {
            log::trace!("{}", EventError::UnknownListener(id));
            return false;
        };
        if let Some(key) = &record.match_key {
            if !self.registry.references_key(key) {
                self.input.untrack_key(key);
            }
        }
        log::debug!("removed listener id={}", id);

        self.sync();
        true
    }

    /// Subscriptions follow the registry; the loop runs while it is non-empty
    fn sync(&mut self) {
        self.router.sync(self.host.as_mut(), &self.registry);
        if self.registry.is_empty() {
            self.dispatch.stop(self.host.as_mut());
        } else {
            self.dispatch.start(self.host.as_mut());
        }
    }

    fn clear(&mut self) {
        let removed = self.registry.clear();
        self.input.clear_keys();
        self.input.clear_hovered();
        self.input.set_focused(false);
        self.router.detach_all(self.host.as_mut());
        self.dispatch.stop(self.host.as_mut());
        log::debug!("cleared {} listeners", removed.len());
    }
}

/// Pointer state snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerSnapshot {
    pub position: PointerPosition,
    pub buttons: MouseButtons,
}

/// Handle to the engine of one window
#[derive(Clone)]
pub struct EventService {
    inner: Rc<RefCell<Engine>>,
}

impl fmt::Debug for EventService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let engine = self.inner.borrow();
        f.debug_struct("EventService")
            .field("listeners", &engine.registry.len())
            .field("attached", &engine.router.attached())
            .field("loop", &engine.dispatch.state())
            .finish()
    }
}

impl EventService {
    /// Create a service listening on `host`
    pub fn init(host: impl InputHost + 'static, config: EngineConfig) -> Self {
        let mut dispatch = DispatchLoop::new();
        if config.low_power {
            dispatch.set_low_power(true, config.low_power_frequency);
        }
        log::info!("event service initialized");

        Self {
            inner: Rc::new(RefCell::new(Engine {
                host: Box::new(host),
                registry: ListenerRegistry::new(),
                router: EventRouter::new(),
                input: InputState::new(),
                dispatch,
                config,
            })),
        }
    }

    /// Remove every listener and release every host subscription
    pub fn dispose(&self) {
        self.inner.borrow_mut().clear();
        log::info!("event service disposed");
    }

    // ---- registration ----

    /// Register a raw config.
    ///
    /// A config without an event kind is logged and skipped.
    pub fn register(&self, config: ListenerConfig) -> Option<ListenerId> {
        self.try_register(config)
            .map_err(|e| log::error!("{}", e))
            .ok()
    }

    pub fn try_register(&self, config: ListenerConfig) -> Result<ListenerId, crate::Error> {
        self.inner
            .borrow_mut()
            .register(config)
            .map_err(|e| crate::Error::Registration(e.to_string()))
    }

    /// Remove a listener; unknown ids are a no-op returning false
    pub fn unregister(&self, id: ListenerId) -> bool {
        self.inner.borrow_mut().unregister(id)
    }

    /// Register several configs under one handle.
    ///
    /// A config without an event kind is logged and skipped; the others
    /// still register.
    pub fn register_all(&self, configs: impl IntoIterator<Item = ListenerConfig>) -> ListenerHandle {
        let mut engine = self.inner.borrow_mut();
        let ids = configs
            .into_iter()
            .filter_map(|config| match engine.register(config) {
                Ok(id) => Some(id),
                Err(e) => {
                    log::error!("{}", e);
                    None
                }
            })
            .collect();
        ListenerHandle {
            engine: Rc::downgrade(&self.inner),
            ids,
        }
    }

    pub fn on_key_press(&self, key: &str, options: ListenerOptions) -> ListenerHandle {
        self.register_all(vec![ListenerConfig::for_key(EventKind::KeyPress, key, options)])
    }

    pub fn on_key_release(&self, key: &str, options: ListenerOptions) -> ListenerHandle {
        self.register_all(vec![ListenerConfig::for_key(EventKind::KeyRelease, key, options)])
    }

    /// Key press listener matching every key
    pub fn on_any_key_press(&self, options: ListenerOptions) -> ListenerHandle {
        self.register_all(vec![ListenerConfig::new(EventKind::KeyPress, options)])
    }

    pub fn on_pointer_move(&self, options: ListenerOptions) -> ListenerHandle {
        self.register_all(vec![ListenerConfig::new(EventKind::PointerMove, options)])
    }

    pub fn on_pointer_down(&self, options: ListenerOptions) -> ListenerHandle {
        self.register_all(vec![ListenerConfig::new(EventKind::PointerDown, options)])
    }

    pub fn on_pointer_up(&self, options: ListenerOptions) -> ListenerHandle {
        self.register_all(vec![ListenerConfig::new(EventKind::PointerUp, options)])
    }

    pub fn on_click(&self, options: ListenerOptions) -> ListenerHandle {
        self.register_all(vec![ListenerConfig::new(EventKind::Click, options)])
    }

    pub fn on_double_click(&self, options: ListenerOptions) -> ListenerHandle {
        self.register_all(vec![ListenerConfig::new(EventKind::DoubleClick, options)])
    }

    pub fn on_context_menu(&self, options: ListenerOptions) -> ListenerHandle {
        self.register_all(vec![ListenerConfig::new(EventKind::ContextMenu, options)])
    }

    pub fn on_pointer_enter(&self, options: ListenerOptions) -> ListenerHandle {
        self.register_all(vec![ListenerConfig::new(EventKind::Enter, options)])
    }

    pub fn on_pointer_leave(&self, options: ListenerOptions) -> ListenerHandle {
        self.register_all(vec![ListenerConfig::new(EventKind::Leave, options)])
    }

    pub fn on_wheel(&self, options: ListenerOptions) -> ListenerHandle {
        self.register_all(vec![ListenerConfig::new(EventKind::Wheel, options)])
    }

    /// Drag gesture over pointer down, move and up.
    ///
    /// The returned handle disposes all three listeners together.
    pub fn on_drag(&self, callbacks: DragCallbacks, options: DragOptions) -> ListenerHandle {
        let session = Rc::new(RefCell::new(DragSession::default()));
        self.register_all(drag_configs(callbacks, options, session))
    }

    // ---- host input ----

    /// Feed one native event from the host
    pub fn handle_native(&self, event: impl Into<NativeEvent>) {
        let mut guard = self.inner.borrow_mut();
        let engine = &mut *guard;
        engine
            .router
            .receive(engine.host.as_ref(), &mut engine.input, event.into());
    }

    /// Run one frame: drain, coalesce and deliver queued events
    pub fn tick(&self, now: Instant) {
        let batches = {
            let mut guard = self.inner.borrow_mut();
            let engine = &mut *guard;
            if !engine.dispatch.is_running() {
                log::trace!("tick while idle ignored");
                return;
            }
            engine.dispatch.begin_tick(now);
            engine.router.recheck_focus(
                engine.host.as_ref(),
                &mut engine.input,
                now,
                engine.config.focus_recheck_delay(),
            );

            let mut batches = Vec::new();
            for (kind, events) in engine.router.take_pending() {
                let records = engine.registry.query_by_kind(kind);
                if records.is_empty() {
                    continue;
                }
                batches.push((coalesce(kind, events), records));
            }
            batches
        };

        let ctx = TickContext { engine: &self.inner };
        for (events, records) in &batches {
            dispatch_events(&ctx, events, records);
        }

        let mut guard = self.inner.borrow_mut();
        let engine = &mut *guard;
        engine.dispatch.schedule_next(engine.host.as_mut());
    }

    /// Fabricate a pointer event and route it like a native one
    pub fn dispatch_virtual_pointer(&self, kind: EventKind, x: f64, y: f64, options: VirtualPointerOptions) {
        log::debug!("virtual {} at ({}, {})", kind, x, y);
        self.handle_native(virtual_pointer_event(kind, x, y, options, Instant::now()));
    }

    /// Fabricate a key event and route it like a native one
    pub fn dispatch_virtual_key(&self, kind: EventKind, key: &str, modifiers: ModifierState) {
        self.handle_native(virtual_key_event(kind, key, modifiers, Instant::now()));
    }

    // ---- state ----

    pub fn current_key_state(&self) -> IndexMap<String, bool> {
        self.inner.borrow().input.keys()
    }

    pub fn current_pointer(&self) -> PointerSnapshot {
        let engine = self.inner.borrow();
        PointerSnapshot {
            position: engine.input.pointer(),
            buttons: engine.input.buttons(),
        }
    }

    pub fn is_input_focused(&self) -> bool {
        self.inner.borrow().input.is_focused()
    }

    pub fn hovered_elements(&self) -> Vec<ElementId> {
        self.inner.borrow().input.hovered().iter().copied().collect()
    }

    /// Whether the pointer is over `target` or one of its descendants
    pub fn is_hovering(&self, target: impl Into<Target>) -> bool {
        let engine = self.inner.borrow();
        let Some(element) = resolve_target(engine.host.as_ref(), &target.into()) else {
            return false;
        };
        engine
            .input
            .hovered()
            .iter()
            .any(|&hovered| hovered == element || engine.host.contains(element, hovered))
    }

    pub fn query_by_kind(&self, kind: EventKind) -> Vec<Rc<ListenerRecord>> {
        self.inner.borrow().registry.query_by_kind(kind)
    }

    /// Every live listener grouped by kind
    pub fn all_listeners(&self) -> Vec<(EventKind, Vec<Rc<ListenerRecord>>)> {
        self.inner.borrow().registry.grouped()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().registry.is_empty()
    }

    pub fn pending_count(&self, kind: EventKind) -> usize {
        self.inner.borrow().router.pending_count(kind)
    }

    pub fn is_attached(&self, kind: crate::events::NativeEventKind) -> bool {
        self.inner.borrow().router.is_attached(kind)
    }

    // ---- loop control ----

    /// Throttle ticks to `frequency` per second (30 when `None`)
    pub fn set_low_power_mode(&self, enable: bool, frequency: Option<u32>) {
        self.inner
            .borrow_mut()
            .dispatch
            .set_low_power(enable, frequency.unwrap_or(DEFAULT_LOW_POWER_FREQUENCY));
    }

    pub fn frame_stats(&self) -> FrameStats {
        self.inner.borrow().dispatch.stats()
    }

    pub fn loop_state(&self) -> LoopState {
        self.inner.borrow().dispatch.state()
    }

    /// Remove every listener, detach every subscription and stop the loop
    pub fn clear(&self) {
        self.inner.borrow_mut().clear();
    }
}

/// Engine access during dispatch; borrows only for the duration of a call
struct TickContext<'a> {
    engine: &'a Rc<RefCell<Engine>>,
}

impl DispatchContext for TickContext<'_> {
    fn matches(&self, record: &ListenerRecord, event: &InputEvent) -> bool {
        let engine = self.engine.borrow();
        structural_match(engine.host.as_ref(), &engine.input, record, event)
    }

    fn retire(&self, id: ListenerId) {
        self.engine.borrow_mut().unregister(id);
    }
}

/// Disposer for the listeners created by one registration call
#[derive(Clone)]
pub struct ListenerHandle {
    engine: Weak<RefCell<Engine>>,
    ids: Vec<ListenerId>,
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle").field("ids", &self.ids).finish()
    }
}

impl ListenerHandle {
    /// Ids of the underlying listeners
    pub fn ids(&self) -> &[ListenerId] {
        &self.ids
    }

    /// Underlying records that are still registered
    pub fn records(&self) -> Vec<Rc<ListenerRecord>> {
        let Some(engine) = self.engine.upgrade() else {
            return Vec::new();
        };
        let engine = engine.borrow();
        self.ids.iter().filter_map(|id| engine.registry.get(*id)).collect()
    }

    /// Whether any underlying listener is still registered
    pub fn is_active(&self) -> bool {
        let Some(engine) = self.engine.upgrade() else {
            return false;
        };
        let engine = engine.borrow();
        self.ids.iter().any(|id| engine.registry.contains(*id))
    }

    /// Remove every underlying listener; true if any was still registered
    pub fn dispose(&self) -> bool {
        let Some(engine) = self.engine.upgrade() else {
            return false;
        };
        let mut engine = engine.borrow_mut();
        let mut removed = false;
        for id in &self.ids {
            removed |= engine.unregister(*id);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NativeEventKind;
    use crate::testing::RecordingHost;
    use std::cell::Cell;

    fn service() -> (EventService, RecordingHost) {
        let host = RecordingHost::new();
        (EventService::init(host.clone(), EngineConfig::default()), host)
    }

    fn noop() -> ListenerOptions {
        ListenerOptions::new().callback(|_| Ok(()))
    }

    #[test]
    fn test_native_subscription_follows_registry() {
        let (service, host) = service();
        let first = service.on_click(noop());
        let second = service.on_click(noop());
        assert!(host.is_attached(NativeEventKind::Click));

        first.dispose();
        assert!(host.is_attached(NativeEventKind::Click));
        second.dispose();
        assert!(!host.is_attached(NativeEventKind::Click));
        assert!(host.attached().is_empty());
    }

    #[test]
    fn test_attach_is_idempotent() {
        let (service, host) = service();
        let _a = service.on_wheel(noop());
        let _b = service.on_wheel(noop());
        let attaches = host
            .attach_log()
            .into_iter()
            .filter(|(kind, added)| *kind == NativeEventKind::Wheel && *added)
            .count();
        assert_eq!(attaches, 1);
    }

    #[test]
    fn test_loop_runs_while_registry_non_empty() {
        let (service, host) = service();
        assert_eq!(service.loop_state(), LoopState::Idle);

        let handle = service.on_pointer_move(noop());
        assert_eq!(service.loop_state(), LoopState::Running);
        assert!(host.frame_scheduled());

        handle.dispose();
        assert_eq!(service.loop_state(), LoopState::Idle);
        assert!(!host.frame_scheduled());
        assert_eq!(host.cancelled_frames(), 1);
    }

    #[test]
    fn test_keyboard_listener_attaches_focus_tracking() {
        let (service, host) = service();
        let handle = service.on_key_press("a", noop());
        for kind in NativeEventKind::FOCUS_TRACKING {
            assert!(host.is_attached(kind));
        }
        handle.dispose();
        for kind in NativeEventKind::FOCUS_TRACKING {
            assert!(!host.is_attached(kind));
        }
    }

    #[test]
    fn test_missing_kind_is_skipped() {
        let (service, host) = service();
        let id = service.register(ListenerConfig {
            kind: None,
            key: None,
            options: noop(),
        });
        assert!(id.is_none());
        assert!(matches!(
            service.try_register(ListenerConfig::default()),
            Err(crate::Error::Registration(_))
        ));
        assert!(service.is_empty());
        assert!(host.attached().is_empty());
    }

    #[test]
    fn test_key_tracking_purged_with_last_listener() {
        let (service, _host) = service();
        let a = service.on_key_press("a", noop());
        let b = service.on_key_release("a", noop());
        assert_eq!(service.current_key_state().get("a"), Some(&false));

        a.dispose();
        assert!(service.current_key_state().contains_key("a"));
        b.dispose();
        assert!(!service.current_key_state().contains_key("a"));
    }

    #[test]
    fn test_dispose_from_inside_callback() {
        let (service, _host) = service();
        let hits = Rc::new(Cell::new(0));
        let slot: Rc<RefCell<Option<ListenerHandle>>> = Rc::new(RefCell::new(None));

        let counter = Rc::clone(&hits);
        let own = Rc::clone(&slot);
        let handle = service.on_click(ListenerOptions::new().callback(move |_| {
            counter.set(counter.get() + 1);
            if let Some(handle) = own.borrow().as_ref() {
                handle.dispose();
            }
            Ok(())
        }));
        *slot.borrow_mut() = Some(handle.clone());

        let t0 = Instant::now();
        service.handle_native(InputEvent::pointer(EventKind::Click, 0.0, 0.0, t0));
        service.tick(t0);
        service.handle_native(InputEvent::pointer(EventKind::Click, 0.0, 0.0, t0));
        service.tick(t0);

        assert_eq!(hits.get(), 1);
        assert!(!handle.is_active());
        assert_eq!(service.loop_state(), LoopState::Idle);
    }

    #[test]
    fn test_events_without_subscription_are_ignored() {
        let (service, _host) = service();
        let _keys = service.on_key_press("a", noop());
        service.handle_native(InputEvent::pointer(EventKind::Click, 0.0, 0.0, Instant::now()));
        assert_eq!(service.pending_count(EventKind::Click), 0);
    }

    #[test]
    fn test_clear_detaches_everything() {
        let (service, host) = service();
        let _a = service.on_key_press("x", noop());
        let _b = service.on_drag(DragCallbacks::on_move(|_| Ok(())), DragOptions::new());
        service.clear();
        assert!(service.is_empty());
        assert!(host.attached().is_empty());
        assert_eq!(service.loop_state(), LoopState::Idle);
        assert!(service.current_key_state().is_empty());
    }

    #[test]
    fn test_hover_tracking() {
        let (service, host) = service();
        let panel = host.add_element(None, "#panel");
        let button = host.add_element(Some(panel), "#button");
        host.set_bounds(panel, 0.0, 0.0, 100.0, 100.0);
        host.set_bounds(button, 10.0, 10.0, 10.0, 10.0);
        let _moves = service.on_pointer_move(noop());

        service.handle_native(InputEvent::pointer(EventKind::PointerMove, 15.0, 15.0, Instant::now()));
        assert_eq!(service.hovered_elements().len(), 2);
        assert!(service.is_hovering("#button"));

        service.handle_native(InputEvent::pointer(EventKind::PointerMove, 50.0, 50.0, Instant::now()));
        assert!(!service.is_hovering(button));
        assert!(service.is_hovering(panel));
    }
}
