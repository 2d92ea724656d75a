// Host window adapter for the input engine

use std::time::Duration;

use crate::events::{ElementId, NativeEventKind};

/// The window the engine listens on.
///
/// The host owns the real event loop: it forwards subscribed events to
/// [`EventService::handle_native`](crate::EventService::handle_native) and
/// calls [`EventService::tick`](crate::EventService::tick) when a requested
/// frame fires.
pub trait InputHost {
    /// Add the window-level subscription for `kind`
    fn attach(&mut self, kind: NativeEventKind);

    /// Remove the window-level subscription for `kind`
    fn detach(&mut self, kind: NativeEventKind);

    /// Schedule the next tick: on the next animation frame when `delay` is
    /// `None`, otherwise after the delay
    fn request_frame(&mut self, delay: Option<Duration>);

    /// Cancel any scheduled tick
    fn cancel_frame(&mut self);

    /// Whether `node` is `ancestor` or one of its descendants
    fn contains(&self, ancestor: ElementId, node: ElementId) -> bool;

    /// Resolve a selector to the first matching element
    fn query_selector(&self, selector: &str) -> Option<ElementId>;

    /// Whether the element accepts text input (input, textarea, select,
    /// contenteditable)
    fn is_editable(&self, element: ElementId) -> bool;

    /// Element currently holding focus
    fn active_element(&self) -> Option<ElementId>;

    /// Elements under a client point, top-most first
    fn elements_at(&self, _x: f64, _y: f64) -> Vec<ElementId> {
        Vec::new()
    }
}
