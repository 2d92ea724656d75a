//! In-memory host recording every call the engine makes

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use std::time::Duration;

use crate::events::{ElementId, NativeEventKind};
use crate::platform::InputHost;

#[derive(Debug, Clone)]
struct ElementNode {
    parent: Option<ElementId>,
    selector: String,
    editable: bool,
    bounds: Option<(f64, f64, f64, f64)>,
}

#[derive(Debug, Default)]
struct HostState {
    attached: BTreeSet<NativeEventKind>,
    attach_log: Vec<(NativeEventKind, bool)>,
    frame_requests: Vec<Option<Duration>>,
    frame_scheduled: bool,
    cancelled_frames: usize,
    elements: HashMap<ElementId, ElementNode>,
    order: Vec<ElementId>,
    active: Option<ElementId>,
    next_element: u64,
}

/// In-memory host that records every call the engine makes.
///
/// Clones share state, so a test can keep one clone for inspection after
/// handing another to the service.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    state: Rc<RefCell<HostState>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element under `parent`, addressable by `selector`
    pub fn add_element(&self, parent: Option<ElementId>, selector: &str) -> ElementId {
        self.insert(parent, selector, false)
    }

    /// Add a text-editable element
    pub fn add_editable(&self, parent: Option<ElementId>, selector: &str) -> ElementId {
        self.insert(parent, selector, true)
    }

    fn insert(&self, parent: Option<ElementId>, selector: &str, editable: bool) -> ElementId {
        let mut state = self.state.borrow_mut();
        state.next_element += 1;
        let id = ElementId(state.next_element);
        state.elements.insert(
            id,
            ElementNode {
                parent,
                selector: selector.to_string(),
                editable,
                bounds: None,
            },
        );
        state.order.push(id);
        id
    }

    /// Give an element a hit-test rectangle
    pub fn set_bounds(&self, element: ElementId, x: f64, y: f64, width: f64, height: f64) {
        if let Some(node) = self.state.borrow_mut().elements.get_mut(&element) {
            node.bounds = Some((x, y, width, height));
        }
    }

    pub fn set_active(&self, element: Option<ElementId>) {
        self.state.borrow_mut().active = element;
    }

    pub fn is_attached(&self, kind: NativeEventKind) -> bool {
        self.state.borrow().attached.contains(&kind)
    }

    pub fn attached(&self) -> Vec<NativeEventKind> {
        self.state.borrow().attached.iter().copied().collect()
    }

    /// Every attach (`true`) and detach (`false`) call in order
    pub fn attach_log(&self) -> Vec<(NativeEventKind, bool)> {
        self.state.borrow().attach_log.clone()
    }

    pub fn frame_requests(&self) -> Vec<Option<Duration>> {
        self.state.borrow().frame_requests.clone()
    }

    pub fn frame_scheduled(&self) -> bool {
        self.state.borrow().frame_scheduled
    }

    pub fn cancelled_frames(&self) -> usize {
        self.state.borrow().cancelled_frames
    }
}

impl InputHost for RecordingHost {
    fn attach(&mut self, kind: NativeEventKind) {
        let mut state = self.state.borrow_mut();
        state.attached.insert(kind);
        state.attach_log.push((kind, true));
    }

    fn detach(&mut self, kind: NativeEventKind) {
        let mut state = self.state.borrow_mut();
        state.attached.remove(&kind);
        state.attach_log.push((kind, false));
    }

    fn request_frame(&mut self, delay: Option<Duration>) {
        let mut state = self.state.borrow_mut();
        state.frame_requests.push(delay);
        state.frame_scheduled = true;
    }

    fn cancel_frame(&mut self) {
        let mut state = self.state.borrow_mut();
        state.frame_scheduled = false;
        state.cancelled_frames += 1;
    }

    fn contains(&self, ancestor: ElementId, node: ElementId) -> bool {
        let state = self.state.borrow();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = state.elements.get(&id).and_then(|n| n.parent);
        }
        false
    }

    fn query_selector(&self, selector: &str) -> Option<ElementId> {
        let state = self.state.borrow();
        state
            .order
            .iter()
            .copied()
            .find(|id| state.elements.get(id).map_or(false, |n| n.selector == selector))
    }

    fn is_editable(&self, element: ElementId) -> bool {
        self.state
            .borrow()
            .elements
            .get(&element)
            .map_or(false, |n| n.editable)
    }

    fn active_element(&self) -> Option<ElementId> {
        self.state.borrow().active
    }

    fn elements_at(&self, x: f64, y: f64) -> Vec<ElementId> {
        let state = self.state.borrow();
        state
            .order
            .iter()
            .rev()
            .copied()
            .filter(|id| {
                state.elements.get(id).and_then(|n| n.bounds).map_or(false, |(bx, by, w, h)| {
                    x >= bx && x < bx + w && y >= by && y < by + h
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_host_tree() {
        let host = RecordingHost::new();
        let root = host.add_element(None, "#root");
        let child = host.add_element(Some(root), "#child");
        let input = host.add_editable(Some(child), "#name");

        assert!(host.contains(root, input));
        assert!(!host.contains(input, root));
        assert_eq!(host.query_selector("#child"), Some(child));
        assert!(host.is_editable(input));
        assert!(!host.is_editable(child));
    }

    #[test]
    fn test_elements_at_uses_bounds() {
        let host = RecordingHost::new();
        let root = host.add_element(None, "#root");
        let inner = host.add_element(Some(root), "#inner");
        host.set_bounds(root, 0.0, 0.0, 100.0, 100.0);
        host.set_bounds(inner, 10.0, 10.0, 20.0, 20.0);

        assert_eq!(host.elements_at(15.0, 15.0), vec![inner, root]);
        assert_eq!(host.elements_at(50.0, 50.0), vec![root]);
    }
}
