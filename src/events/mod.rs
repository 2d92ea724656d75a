//! Input event engine for the FCut front-end
//!
//! The engine provides:
//! - A listener registry with a lazily rebuilt per-kind index
//! - A window-level router that updates input state and queues events
//! - A per-frame dispatch loop that coalesces pointer moves and wheel events
//! - Throttle/debounce wrapping and target, modifier and focus filters
//! - Drag gestures composed from pointer down, move and up listeners

pub mod dispatcher;
pub mod drag;
pub mod event;
pub mod filter;
pub mod input_state;
pub mod listener;
pub mod registry;
pub mod router;
pub mod wrapper;

pub use dispatcher::{DispatchLoop, FrameStats, LoopState};
pub use drag::{DragCallbacks, DragInfo, DragOptions, DragSession, DragState};
pub use event::*;
pub use input_state::{InputState, MouseButtons, PointerPosition};
pub use listener::{ListenerConfig, ListenerId, ListenerOptions, ListenerRecord};
pub use registry::ListenerRegistry;
pub use router::EventRouter;
pub use wrapper::{callback, Cadence, Callback};

/// Failures inside the event engine.
///
/// None of these cross the public registration API; they are logged.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("listener config is missing an event kind")]
    MissingKind,

    #[error("no listener registered with id {0}")]
    UnknownListener(ListenerId),

    #[error("error executing callback id={id}: {message}")]
    Callback { id: ListenerId, message: String },
}
