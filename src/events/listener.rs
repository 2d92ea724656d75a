//! Listener records and their registration options

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::wrapper::{wrap_callbacks, Cadence, Callback, WrappedCallback};
use super::{EventKind, InputEvent, Modifier, ModifierSet, Target};

/// Predicate over a queued event
pub type EventFilter = Rc<dyn Fn(&InputEvent) -> bool>;

/// Unique identifier of a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Generate a new process-wide unique id
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Options shared by every registration function.
///
/// Keyboard-only options (`modifiers`, `ignore_when_input_focused`) are
/// ignored by pointer kinds.
#[derive(Clone, Default)]
pub struct ListenerOptions {
    pub callbacks: Vec<Callback>,
    pub modifiers: ModifierSet,
    pub target: Option<Target>,
    pub filter: Option<EventFilter>,
    pub throttle: Option<Duration>,
    pub debounce: Option<Duration>,
    pub prevent_default: bool,
    pub ignore_when_input_focused: bool,
    pub once: bool,
}

impl fmt::Debug for ListenerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerOptions")
            .field("callbacks", &format!("[{} callbacks]", self.callbacks.len()))
            .field("modifiers", &self.modifiers)
            .field("target", &self.target)
            .field("filter", &self.filter.is_some())
            .field("throttle", &self.throttle)
            .field("debounce", &self.debounce)
            .field("prevent_default", &self.prevent_default)
            .field("ignore_when_input_focused", &self.ignore_when_input_focused)
            .field("once", &self.once)
            .finish()
    }
}

impl ListenerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback; callbacks run in the order they were added
    pub fn callback<F>(mut self, f: F) -> Self
    where
        F: Fn(&InputEvent) -> anyhow::Result<()> + 'static,
    {
        self.callbacks.push(Rc::new(f));
        self
    }

    /// Append an already shared callback
    pub fn shared_callback(mut self, callback: Callback) -> Self {
        self.callbacks.push(callback);
        self
    }

    pub fn modifiers(mut self, modifiers: impl IntoIterator<Item = Modifier>) -> Self {
        self.modifiers = modifiers.into_iter().collect();
        self
    }

    pub fn target(mut self, target: impl Into<Target>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&InputEvent) -> bool + 'static,
    {
        self.filter = Some(Rc::new(f));
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

    pub fn ignore_when_input_focused(mut self, value: bool) -> Self {
        self.ignore_when_input_focused = value;
        self
    }

    pub fn once(mut self, value: bool) -> Self {
        self.once = value;
        self
    }
}

/// Raw registration request
#[derive(Debug, Clone, Default)]
pub struct ListenerConfig {
    /// Required; a config without a kind is rejected at registration
    pub kind: Option<EventKind>,
    /// Keyboard only: key to match, `None` for every key
    pub key: Option<String>,
    pub options: ListenerOptions,
}

impl ListenerConfig {
    pub fn new(kind: EventKind, options: ListenerOptions) -> Self {
        Self {
            kind: Some(kind),
            key: None,
            options,
        }
    }

    pub fn for_key(kind: EventKind, key: impl Into<String>, options: ListenerOptions) -> Self {
        Self {
            kind: Some(kind),
            key: Some(key.into()),
            options,
        }
    }
}

/// A registered interest in one event kind
pub struct ListenerRecord {
    pub id: ListenerId,
    pub kind: EventKind,
    pub match_key: Option<String>,
    pub modifiers: ModifierSet,
    pub target: Option<Target>,
    pub filter: Option<EventFilter>,
    pub cadence: Cadence,
    pub prevent_default: bool,
    pub ignore_when_input_focused: bool,
    pub once: bool,
    pub callbacks: Vec<Callback>,
    wrapped: Vec<WrappedCallback>,
    spent: Cell<bool>,
}

impl fmt::Debug for ListenerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRecord")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("match_key", &self.match_key)
            .field("modifiers", &self.modifiers)
            .field("target", &self.target)
            .field("cadence", &self.cadence)
            .field("once", &self.once)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl ListenerRecord {
    /// Build a record and wrap its callbacks once
    pub fn new(kind: EventKind, key: Option<String>, options: ListenerOptions) -> Self {
        let cadence = Cadence::from_options(options.throttle, options.debounce);
        let wrapped = wrap_callbacks(&options.callbacks, cadence);
        let keyboard = kind.is_keyboard();

        Self {
            id: ListenerId::new(),
            kind,
            match_key: if keyboard { key } else { None },
            modifiers: if keyboard {
                options.modifiers
            } else {
                ModifierSet::default()
            },
            target: options.target,
            filter: options.filter,
            cadence,
            prevent_default: options.prevent_default,
            ignore_when_input_focused: keyboard && options.ignore_when_input_focused,
            once: options.once,
            callbacks: options.callbacks,
            wrapped,
            spent: Cell::new(false),
        }
    }

    /// Whether a one-shot record already fired
    pub fn is_spent(&self) -> bool {
        self.spent.get()
    }

    /// Claim the single firing of a one-shot record.
    ///
    /// Always true for ordinary records.
    pub(crate) fn claim(&self) -> bool {
        if !self.once {
            return true;
        }
        !self.spent.replace(true)
    }

    /// Run the wrapped callbacks in order.
    ///
    /// Errors are collected so one failing callback doesn't stop its
    /// siblings.
    pub(crate) fn invoke(&self, event: &InputEvent) -> Vec<anyhow::Error> {
        let mut errors = Vec::new();
        for wrapped in &self.wrapped {
            if let Some(Err(e)) = wrapped.call(event) {
                errors.push(e);
            }
        }
        errors
    }
}
