//! Last-known keyboard and pointer state
//!
//! Only the router writes here; everything else reads snapshots.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use super::{ElementId, InputEvent, PointerData};

/// Pointer position in every coordinate space, plus the last movement delta
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerPosition {
    pub client_x: f64,
    pub client_y: f64,
    pub page_x: f64,
    pub page_y: f64,
    pub screen_x: f64,
    pub screen_y: f64,
    pub movement_x: f64,
    pub movement_y: f64,
}

/// Decoded mouse button bitmask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseButtons {
    pub left: bool,
    pub right: bool,
    pub middle: bool,
}

impl MouseButtons {
    pub fn from_bitmask(buttons: u16) -> Self {
        Self {
            left: buttons & 1 == 1,
            right: buttons & 2 == 2,
            middle: buttons & 4 == 4,
        }
    }
}

#[derive(Debug, Default)]
pub struct InputState {
    pointer: PointerPosition,
    buttons: MouseButtons,
    keys: IndexMap<String, bool>,
    input_focused: bool,
    hovered: BTreeSet<ElementId>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_pointer(&mut self, data: &PointerData) {
        self.pointer = PointerPosition {
            client_x: data.client_x,
            client_y: data.client_y,
            page_x: data.page_x,
            page_y: data.page_y,
            screen_x: data.screen_x,
            screen_y: data.screen_y,
            movement_x: data.movement_x,
            movement_y: data.movement_y,
        };
    }

    pub fn update_buttons(&mut self, data: &PointerData) {
        let previous_left = self.buttons.left;
        self.buttons = MouseButtons::from_bitmask(data.buttons);

        if previous_left != self.buttons.left {
            log::debug!(
                "left mouse button {} -> {}, buttons={}",
                if previous_left { "down" } else { "up" },
                if self.buttons.left { "down" } else { "up" },
                data.buttons
            );
        }
    }

    /// Apply an input event's pointer data, if it carries any
    pub fn apply_pointer_event(&mut self, event: &InputEvent, update_buttons: bool) {
        if let Some(data) = event.pointer_data() {
            self.update_pointer(data);
            if update_buttons {
                self.update_buttons(data);
            }
        }
    }

    pub fn pointer(&self) -> PointerPosition {
        self.pointer
    }

    pub fn buttons(&self) -> MouseButtons {
        self.buttons
    }

    /// Start tracking `key` as released if it isn't tracked yet
    pub fn track_key(&mut self, key: &str) {
        if !self.keys.contains_key(key) {
            self.keys.insert(key.to_string(), false);
        }
    }

    pub fn untrack_key(&mut self, key: &str) {
        self.keys.shift_remove(key);
    }

    /// Update a tracked key; untracked keys are ignored
    pub fn set_key(&mut self, key: &str, pressed: bool) {
        if let Some(state) = self.keys.get_mut(key) {
            *state = pressed;
        }
    }

    pub fn is_pressed(&self, key: &str) -> bool {
        self.keys.get(key).copied().unwrap_or(false)
    }

    pub fn keys(&self) -> IndexMap<String, bool> {
        self.keys.clone()
    }

    /// Release every tracked key
    pub fn reset_all_keys(&mut self) {
        for pressed in self.keys.values_mut() {
            *pressed = false;
        }
    }

    pub fn clear_keys(&mut self) {
        self.keys.clear();
    }

    pub fn set_focused(&mut self, focused: bool) {
        if self.input_focused != focused {
            log::debug!("input focus {}", if focused { "gained" } else { "lost" });
        }
        self.input_focused = focused;
    }

    pub fn is_focused(&self) -> bool {
        self.input_focused
    }

    pub fn set_hovered(&mut self, hovered: impl IntoIterator<Item = ElementId>) {
        self.hovered = hovered.into_iter().collect();
    }

    pub fn hovered(&self) -> &BTreeSet<ElementId> {
        &self.hovered
    }

    pub fn clear_hovered(&mut self) {
        self.hovered.clear();
    }
}
