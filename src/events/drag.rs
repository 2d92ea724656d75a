//! Drag gestures built from pointer down, move and up listeners

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use super::listener::{ListenerConfig, ListenerOptions};
use super::{EventKind, InputEvent, Target};

/// Callback receiving drag progress
pub type DragCallback = Rc<dyn Fn(&DragInfo) -> anyhow::Result<()>>;

/// Phase of a drag gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Start,
    Dragging,
    End,
}

/// Snapshot handed to drag callbacks
#[derive(Debug, Clone)]
pub struct DragInfo {
    pub state: DragState,
    pub start_x: f64,
    pub start_y: f64,
    pub current_x: f64,
    pub current_y: f64,
    /// Movement since the previous drag update
    pub delta_x: f64,
    pub delta_y: f64,
    /// Movement since the gesture started
    pub total_delta_x: f64,
    pub total_delta_y: f64,
    pub event: InputEvent,
}

/// Pointer positions of one in-progress drag
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragSession {
    pub dragging: bool,
    pub start: (f64, f64),
    pub last: (f64, f64),
    pub current: (f64, f64),
}

impl DragSession {
    pub fn begin(&mut self, x: f64, y: f64) {
        *self = DragSession {
            dragging: true,
            start: (x, y),
            last: (x, y),
            current: (x, y),
        };
    }

    /// Info for `event` relative to the previous update, without advancing
    pub fn info(&self, state: DragState, event: &InputEvent) -> DragInfo {
        let (x, y) = event.position().unwrap_or(self.current);
        DragInfo {
            state,
            start_x: self.start.0,
            start_y: self.start.1,
            current_x: x,
            current_y: y,
            delta_x: x - self.last.0,
            delta_y: y - self.last.1,
            total_delta_x: x - self.start.0,
            total_delta_y: y - self.start.1,
            event: event.clone(),
        }
    }

    pub fn advance(&mut self, x: f64, y: f64) {
        self.last = (x, y);
        self.current = (x, y);
    }

    /// Current position minus start
    pub fn delta(&self) -> (f64, f64) {
        (self.current.0 - self.start.0, self.current.1 - self.start.1)
    }

    pub fn reset(&mut self) {
        *self = DragSession::default();
    }
}

/// User callbacks of a drag registration
#[derive(Clone, Default)]
pub struct DragCallbacks {
    pub on_start: Option<DragCallback>,
    pub on_move: Option<DragCallback>,
    pub on_end: Option<DragCallback>,
}

impl fmt::Debug for DragCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DragCallbacks")
            .field("on_start", &self.on_start.is_some())
            .field("on_move", &self.on_move.is_some())
            .field("on_end", &self.on_end.is_some())
            .finish()
    }
}

impl DragCallbacks {
    pub fn on_move<F>(f: F) -> Self
    where
        F: Fn(&DragInfo) -> anyhow::Result<()> + 'static,
    {
        Self {
            on_move: Some(Rc::new(f)),
            ..Default::default()
        }
    }

    pub fn with_start<F>(mut self, f: F) -> Self
    where
        F: Fn(&DragInfo) -> anyhow::Result<()> + 'static,
    {
        self.on_start = Some(Rc::new(f));
        self
    }

    pub fn with_end<F>(mut self, f: F) -> Self
    where
        F: Fn(&DragInfo) -> anyhow::Result<()> + 'static,
    {
        self.on_end = Some(Rc::new(f));
        self
    }
}

/// Options of a drag registration
#[derive(Debug, Clone, Default)]
pub struct DragOptions {
    /// Where the gesture must start; move and up are tracked window-wide
    pub target: Option<Target>,
    /// Cadence of move updates
    pub throttle: Option<Duration>,
    pub debounce: Option<Duration>,
    pub prevent_default: bool,
}

impl DragOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(mut self, target: impl Into<Target>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn throttle(mut self, ms: u64) -> Self {
        self.throttle = Some(Duration::from_millis(ms));
        self
    }

    pub fn debounce(mut self, ms: u64) -> Self {
        self.debounce = Some(Duration::from_millis(ms));
        self
    }

    pub fn prevent_default(mut self, value: bool) -> Self {
        self.prevent_default = value;
        self
    }
}

/// The three underlying registrations of a drag, sharing one session
pub(crate) fn drag_configs(
    callbacks: DragCallbacks,
    options: DragOptions,
    session: Rc<RefCell<DragSession>>,
) -> [ListenerConfig; 3] {
    let DragCallbacks {
        on_start,
        on_move,
        on_end,
    } = callbacks;

    let down_session = Rc::clone(&session);
    let mut down_options = ListenerOptions::new()
        .prevent_default(options.prevent_default)
        .callback(move |event| {
            let left = event.pointer_data().map_or(false, |p| p.buttons & 1 == 1);
            if !left {
                log::debug!("pointer down without left button, drag not started");
                return Ok(());
            }
            let (x, y) = event.position().unwrap_or_default();
            down_session.borrow_mut().begin(x, y);
            log::debug!("drag started at ({}, {})", x, y);

            let info = down_session.borrow().info(DragState::Start, event);
            match &on_start {
                Some(cb) => cb(&info),
                None => Ok(()),
            }
        });
    down_options.target = options.target;

    let move_session = Rc::clone(&session);
    let mut move_options = ListenerOptions::new()
        .prevent_default(options.prevent_default)
        .callback(move |event| {
            let info = {
                let mut session = move_session.borrow_mut();
                if !session.dragging {
                    return Ok(());
                }
                let info = session.info(DragState::Dragging, event);
                session.advance(info.current_x, info.current_y);
                info
            };
            log::trace!(
                "drag moving to ({}, {}), delta ({}, {})",
                info.current_x,
                info.current_y,
                info.delta_x,
                info.delta_y
            );
            match &on_move {
                Some(cb) => cb(&info),
                None => Ok(()),
            }
        });
    move_options.throttle = options.throttle;
    move_options.debounce = options.debounce;

    let up_session = session;
    let up_options = ListenerOptions::new()
        .prevent_default(options.prevent_default)
        .callback(move |event| {
            let info = {
                let mut session = up_session.borrow_mut();
                if !session.dragging {
                    return Ok(());
                }
                let info = session.info(DragState::End, event);
                session.reset();
                info
            };
            log::debug!(
                "drag ended, total movement ({}, {})",
                info.total_delta_x,
                info.total_delta_y
            );
            match &on_end {
                Some(cb) => cb(&info),
                None => Ok(()),
            }
        });

    [
        ListenerConfig::new(EventKind::PointerDown, down_options),
        ListenerConfig::new(EventKind::PointerMove, move_options),
        ListenerConfig::new(EventKind::PointerUp, up_options),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_session_deltas() {
        let mut session = DragSession::default();
        session.begin(10.0, 10.0);

        let first = InputEvent::pointer(EventKind::PointerMove, 15.0, 12.0, Instant::now());
        let info = session.info(DragState::Dragging, &first);
        assert_eq!((info.delta_x, info.delta_y), (5.0, 2.0));
        session.advance(info.current_x, info.current_y);

        let second = InputEvent::pointer(EventKind::PointerMove, 18.0, 20.0, Instant::now());
        let info = session.info(DragState::Dragging, &second);
        assert_eq!((info.delta_x, info.delta_y), (3.0, 8.0));
        assert_eq!((info.total_delta_x, info.total_delta_y), (8.0, 10.0));

        session.advance(info.current_x, info.current_y);
        assert_eq!(session.delta(), (8.0, 10.0));
    }

    #[test]
    fn test_reset_stops_dragging() {
        let mut session = DragSession::default();
        session.begin(1.0, 1.0);
        session.reset();
        assert!(!session.dragging);
        assert_eq!(session, DragSession::default());
    }
}
