//! Per-record event filters

use crate::platform::InputHost;

use super::input_state::InputState;
use super::listener::ListenerRecord;
use super::{EventKind, InputEvent, Target};

/// Resolve a listener target to a concrete element
pub fn resolve_target(host: &dyn InputHost, target: &Target) -> Option<super::ElementId> {
    match target {
        Target::Element(id) => Some(*id),
        Target::Selector(selector) => host.query_selector(selector),
    }
}

/// The event target must be the listener target or inside it
pub fn target_matches(host: &dyn InputHost, record: &ListenerRecord, event: &InputEvent) -> bool {
    let Some(target) = &record.target else {
        return true;
    };
    let (Some(element), Some(origin)) = (resolve_target(host, target), event.target) else {
        return false;
    };
    element == origin || host.contains(element, origin)
}

/// Key name, auto-repeat, modifier and focus checks
pub fn keyboard_matches(record: &ListenerRecord, event: &InputEvent, state: &InputState) -> bool {
    if !record.kind.is_keyboard() {
        return true;
    }
    if let Some(expected) = &record.match_key {
        if event.key_name() != Some(expected.as_str()) {
            return false;
        }
    }
    // Holding a key down doesn't re-fire press listeners
    if record.kind == EventKind::KeyPress && event.is_repeat() {
        return false;
    }
    if record.ignore_when_input_focused && state.is_focused() {
        return false;
    }
    record.modifiers.matches(&event.modifiers)
}

/// Every check that needs engine state; the user predicate runs separately
pub fn structural_match(
    host: &dyn InputHost,
    state: &InputState,
    record: &ListenerRecord,
    event: &InputEvent,
) -> bool {
    record.kind == event.kind && keyboard_matches(record, event, state) && target_matches(host, record, event)
}

/// Run the user predicate, if any
pub fn predicate_matches(record: &ListenerRecord, event: &InputEvent) -> bool {
    record.filter.as_ref().map_or(true, |filter| filter(event))
}
