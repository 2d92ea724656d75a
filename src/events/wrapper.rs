//! Callback wrapping with throttle/debounce gates
//!
//! Both gates fire on the leading edge and drop the trailing edge.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use super::InputEvent;

/// Shared user callback
pub type Callback = Rc<dyn Fn(&InputEvent) -> anyhow::Result<()>>;

/// Build a [`Callback`] from a closure
pub fn callback<F>(f: F) -> Callback
where
    F: Fn(&InputEvent) -> anyhow::Result<()> + 'static,
{
    Rc::new(f)
}

/// Invocation cadence of a wrapped callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cadence {
    /// Every call goes through
    #[default]
    Immediate,
    /// At most one call per window, measured from the last call that fired
    Throttle(Duration),
    /// A call fires only after the previous call is at least one window old
    Debounce(Duration),
}

impl Cadence {
    /// Throttle wins when both are given; zero durations are ignored.
    pub fn from_options(throttle: Option<Duration>, debounce: Option<Duration>) -> Self {
        match (throttle, debounce) {
            (Some(t), _) if !t.is_zero() => Cadence::Throttle(t),
            (_, Some(d)) if !d.is_zero() => Cadence::Debounce(d),
            _ => Cadence::Immediate,
        }
    }
}

/// Leading-edge gate over event timestamps
#[derive(Debug, Default)]
pub struct CadenceGate {
    cadence: Cadence,
    last_fired: Cell<Option<Instant>>,
    last_call: Cell<Option<Instant>>,
}

impl CadenceGate {
    pub fn new(cadence: Cadence) -> Self {
        Self {
            cadence,
            last_fired: Cell::new(None),
            last_call: Cell::new(None),
        }
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Record a call at `now` and report whether it should fire
    pub fn admit(&self, now: Instant) -> bool {
        match self.cadence {
            Cadence::Immediate => true,
            Cadence::Throttle(window) => {
                let open = match self.last_fired.get() {
                    Some(last) => now.saturating_duration_since(last) >= window,
                    None => true,
                };
                if open {
                    self.last_fired.set(Some(now));
                }
                open
            }
            Cadence::Debounce(window) => {
                let open = match self.last_call.get() {
                    Some(last) => now.saturating_duration_since(last) >= window,
                    None => true,
                };
                self.last_call.set(Some(now));
                if open {
                    self.last_fired.set(Some(now));
                }
                open
            }
        }
    }
}

/// A user callback paired with its own gate.
///
/// Each registration wraps its callbacks afresh, so two records sharing one
/// closure never share throttle state.
pub struct WrappedCallback {
    callback: Callback,
    gate: CadenceGate,
}

impl fmt::Debug for WrappedCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedCallback")
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl WrappedCallback {
    pub fn new(callback: Callback, cadence: Cadence) -> Self {
        Self {
            callback,
            gate: CadenceGate::new(cadence),
        }
    }

    /// Call through the gate using the event timestamp.
    ///
    /// Returns `None` when the gate suppressed the call.
    pub fn call(&self, event: &InputEvent) -> Option<anyhow::Result<()>> {
        if !self.gate.admit(event.timestamp) {
            return None;
        }
        Some((self.callback)(event))
    }
}

/// Wrap every callback of a registration with the same cadence
pub fn wrap_callbacks(callbacks: &[Callback], cadence: Cadence) -> Vec<WrappedCallback> {
    callbacks
        .iter()
        .map(|cb| WrappedCallback::new(Rc::clone(cb), cadence))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_throttle_drops_calls_inside_window() {
        let gate = CadenceGate::new(Cadence::Throttle(ms(100)));
        let t0 = Instant::now();
        let fired: Vec<bool> = [0, 50, 200]
            .iter()
            .map(|&offset| gate.admit(t0 + ms(offset)))
            .collect();
        assert_eq!(fired, vec![true, false, true]);
    }

    #[test]
    fn test_debounce_extends_window_on_every_call() {
        let gate = CadenceGate::new(Cadence::Debounce(ms(100)));
        let t0 = Instant::now();
        assert!(gate.admit(t0));
        assert!(!gate.admit(t0 + ms(80)));
        // 80ms after the last call, though 160ms after the one that fired
        assert!(!gate.admit(t0 + ms(160)));
        assert!(gate.admit(t0 + ms(300)));
    }

    #[test]
    fn test_throttle_takes_precedence() {
        let cadence = Cadence::from_options(Some(ms(10)), Some(ms(50)));
        assert_eq!(cadence, Cadence::Throttle(ms(10)));
        assert_eq!(
            Cadence::from_options(Some(Duration::ZERO), Some(ms(50))),
            Cadence::Debounce(ms(50))
        );
        assert_eq!(Cadence::from_options(None, None), Cadence::Immediate);
    }

    #[test]
    fn test_wrapped_callbacks_do_not_share_gates() {
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let cb = callback(move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        let first = wrap_callbacks(&[Rc::clone(&cb)], Cadence::Throttle(ms(100)));
        let second = wrap_callbacks(&[cb], Cadence::Throttle(ms(100)));

        let event = InputEvent::key(EventKind::KeyPress, "a", Instant::now());
        assert!(first[0].call(&event).is_some());
        assert!(second[0].call(&event).is_some());
        assert!(first[0].call(&event).is_none());
        assert_eq!(hits.get(), 2);
    }
}
