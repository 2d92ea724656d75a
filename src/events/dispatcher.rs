//! Frame-driven dispatch loop
//!
//! Native events are only queued when they arrive. Once per frame the loop
//! drains the queue, coalesces high-frequency kinds down to their latest
//! event and runs matching listeners in registration order.

use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::platform::InputHost;

use super::listener::{ListenerId, ListenerRecord};
use super::{EventError, EventKind, InputEvent};

/// Default tick rate in low-power mode
pub const DEFAULT_LOW_POWER_FREQUENCY: u32 = 30;

/// Whether a frame callback is scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    #[default]
    Idle,
    Running,
}

/// Rolling one-second frame rate measurement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    last_frame: Option<Instant>,
    frame_count: u32,
    accumulated: Duration,
    /// Ticks counted over the last full second
    pub natural_frequency: u32,
    /// Rate the loop is actually running at
    pub update_frequency: u32,
}

impl FrameStats {
    /// Count one tick at `now`
    pub fn record(&mut self, now: Instant, low_power: Option<u32>) {
        let Some(last) = self.last_frame.replace(now) else {
            return;
        };
        self.accumulated += now.saturating_duration_since(last);
        self.frame_count += 1;

        if self.accumulated < Duration::from_secs(1) {
            return;
        }
        self.natural_frequency = self.frame_count;
        self.frame_count = 0;
        self.accumulated = Duration::ZERO;
        self.update_frequency = match low_power {
            Some(limit) => limit.min(self.natural_frequency),
            None => self.natural_frequency,
        };
    }

    pub fn reset(&mut self) {
        *self = FrameStats::default();
    }
}

/// Loop scheduling state
#[derive(Debug, Clone)]
pub struct DispatchLoop {
    state: LoopState,
    low_power: bool,
    low_power_frequency: u32,
    stats: FrameStats,
}

impl Default for DispatchLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::Idle,
            low_power: false,
            low_power_frequency: DEFAULT_LOW_POWER_FREQUENCY,
            stats: FrameStats::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn low_power(&self) -> Option<u32> {
        self.low_power.then_some(self.low_power_frequency)
    }

    /// Toggle low-power mode; a zero frequency keeps the previous one
    pub fn set_low_power(&mut self, enable: bool, frequency: u32) {
        self.low_power = enable;
        if frequency > 0 {
            self.low_power_frequency = frequency;
        }
        log::debug!(
            "low-power mode {}, {} updates/sec",
            if enable { "enabled" } else { "disabled" },
            self.low_power_frequency
        );
    }

    /// Idle -> Running, requesting the first frame
    pub fn start(&mut self, host: &mut dyn InputHost) {
        if self.state == LoopState::Running {
            return;
        }
        self.state = LoopState::Running;
        self.stats.reset();
        host.request_frame(None);
        log::debug!("dispatch loop started");
    }

    /// Running -> Idle, cancelling the scheduled frame
    pub fn stop(&mut self, host: &mut dyn InputHost) {
        if self.state == LoopState::Idle {
            return;
        }
        self.state = LoopState::Idle;
        host.cancel_frame();
        log::debug!("dispatch loop stopped");
    }

    /// Start of a tick: update frame statistics
    pub fn begin_tick(&mut self, now: Instant) {
        self.stats.record(now, self.low_power());
    }

    /// Delay before the next frame request
    pub fn next_delay(&self) -> Option<Duration> {
        self.low_power()
            .map(|frequency| Duration::from_secs_f64(1.0 / f64::from(frequency.max(1))))
    }

    /// End of a tick: request the next frame if still running
    pub fn schedule_next(&mut self, host: &mut dyn InputHost) {
        if self.state == LoopState::Running {
            host.request_frame(self.next_delay());
        }
    }
}

/// Keep only the latest event of a coalescible kind
pub fn coalesce(kind: EventKind, mut events: Vec<InputEvent>) -> Vec<InputEvent> {
    if kind.is_coalescible() && events.len() > 1 {
        let dropped = events.len() - 1;
        events.drain(..dropped);
        log::trace!("coalesced {} stale {} events", dropped, kind);
    }
    events
}

/// Engine access needed while running listeners.
///
/// Implementations must not hold engine borrows across calls, since
/// listeners are free to register or dispose other listeners.
pub trait DispatchContext {
    /// Filters that read engine or host state
    fn matches(&self, record: &ListenerRecord, event: &InputEvent) -> bool;

    /// Remove a one-shot record after it fired
    fn retire(&self, id: ListenerId);
}

/// Deliver `events` to the `records` snapshot taken at tick start.
///
/// Returns how many record invocations happened.
pub fn dispatch_events(
    ctx: &dyn DispatchContext,
    events: &[InputEvent],
    records: &[Rc<ListenerRecord>],
) -> usize {
    let mut delivered = 0;
    for event in events {
        for record in records {
            if record.is_spent() {
                continue;
            }
            if !ctx.matches(record, event) || !super::filter::predicate_matches(record, event) {
                continue;
            }
            if !record.claim() {
                continue;
            }
            if record.prevent_default {
                event.prevent_default();
            }

            for error in record.invoke(event) {
                let error = EventError::Callback {
                    id: record.id,
                    message: format!("{:#}", error),
                };
                log::error!("{}", error);
            }
            delivered += 1;

            if record.once {
                ctx.retire(record.id);
            }
        }
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::listener::ListenerOptions;
    use crate::testing::RecordingHost;
    use std::cell::{Cell, RefCell};

    struct AcceptAll {
        retired: RefCell<Vec<ListenerId>>,
    }

    impl DispatchContext for AcceptAll {
        fn matches(&self, record: &ListenerRecord, event: &InputEvent) -> bool {
            record.kind == event.kind
        }

        fn retire(&self, id: ListenerId) {
            self.retired.borrow_mut().push(id);
        }
    }

    fn moves(n: usize) -> Vec<InputEvent> {
        let t0 = Instant::now();
        (0..n)
            .map(|i| InputEvent::pointer(EventKind::PointerMove, i as f64, 0.0, t0))
            .collect()
    }

    #[test]
    fn test_coalesce_keeps_latest_move() {
        let kept = coalesce(EventKind::PointerMove, moves(5));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].position(), Some((4.0, 0.0)));
    }

    #[test]
    fn test_clicks_are_not_coalesced() {
        let t0 = Instant::now();
        let clicks: Vec<_> = (0..3)
            .map(|_| InputEvent::pointer(EventKind::Click, 0.0, 0.0, t0))
            .collect();
        assert_eq!(coalesce(EventKind::Click, clicks).len(), 3);
    }

    #[test]
    fn test_failing_callback_does_not_stop_siblings() {
        let ctx = AcceptAll {
            retired: RefCell::new(Vec::new()),
        };
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);

        let failing = Rc::new(ListenerRecord::new(
            EventKind::Click,
            None,
            ListenerOptions::new().callback(|_| anyhow::bail!("boom")),
        ));
        let healthy = Rc::new(ListenerRecord::new(
            EventKind::Click,
            None,
            ListenerOptions::new().callback(move |_| {
                counter.set(counter.get() + 1);
                Ok(())
            }),
        ));

        let t0 = Instant::now();
        let events = vec![
            InputEvent::pointer(EventKind::Click, 0.0, 0.0, t0),
            InputEvent::pointer(EventKind::Click, 0.0, 0.0, t0),
        ];
        let delivered = dispatch_events(&ctx, &events, &[failing, healthy]);
        assert_eq!(delivered, 4);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_once_record_fires_once_within_a_batch() {
        let ctx = AcceptAll {
            retired: RefCell::new(Vec::new()),
        };
        let record = Rc::new(ListenerRecord::new(
            EventKind::Click,
            None,
            ListenerOptions::new().once(true).callback(|_| Ok(())),
        ));
        let t0 = Instant::now();
        let events: Vec<_> = (0..3)
            .map(|_| InputEvent::pointer(EventKind::Click, 0.0, 0.0, t0))
            .collect();

        assert_eq!(dispatch_events(&ctx, &events, &[Rc::clone(&record)]), 1);
        assert_eq!(*ctx.retired.borrow(), vec![record.id]);
    }

    #[test]
    fn test_prevent_default_applied_before_callbacks() {
        let ctx = AcceptAll {
            retired: RefCell::new(Vec::new()),
        };
        let seen = Rc::new(Cell::new(false));
        let flag = Rc::clone(&seen);
        let record = Rc::new(ListenerRecord::new(
            EventKind::Wheel,
            None,
            ListenerOptions::new().prevent_default(true).callback(move |e| {
                flag.set(e.is_default_prevented());
                Ok(())
            }),
        ));
        let event = InputEvent::pointer(EventKind::Wheel, 0.0, 0.0, Instant::now());
        dispatch_events(&ctx, std::slice::from_ref(&event), &[record]);
        assert!(seen.get());
        assert!(event.is_default_prevented());
    }

    #[test]
    fn test_low_power_delays_next_frame() {
        let mut host = RecordingHost::new();
        let mut dispatch = DispatchLoop::new();
        dispatch.start(&mut host);
        dispatch.schedule_next(&mut host);
        dispatch.set_low_power(true, 0);
        dispatch.schedule_next(&mut host);

        let requests = host.frame_requests();
        assert_eq!(requests[0], None);
        assert_eq!(requests[1], None);
        assert_eq!(requests[2], Some(Duration::from_secs_f64(1.0 / 30.0)));
    }

    #[test]
    fn test_frame_stats_measure_one_second_windows() {
        let mut stats = FrameStats::default();
        let t0 = Instant::now();
        for i in 0..=60u64 {
            stats.record(t0 + Duration::from_micros(i * 16_667), Some(30));
        }
        assert_eq!(stats.natural_frequency, 60);
        assert_eq!(stats.update_frequency, 30);
    }
}
