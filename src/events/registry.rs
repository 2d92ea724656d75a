//! Listener registry
//!
//! Records are stored by id in registration order. A per-kind index is
//! derived from that storage and rebuilt lazily: every mutation marks it
//! dirty, and the next read rebuilds it before answering.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use super::listener::{ListenerId, ListenerRecord};
use super::EventKind;

/// Map of event kind to the records registered for it
type KindIndex = HashMap<EventKind, Vec<Rc<ListenerRecord>>>;

#[derive(Debug, Default)]
pub struct ListenerRegistry {
    records: IndexMap<ListenerId, Rc<ListenerRecord>>,
    index: RefCell<KindIndex>,
    dirty: Cell<bool>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            records: IndexMap::new(),
            index: RefCell::new(HashMap::new()),
            dirty: Cell::new(true),
        }
    }

    /// Store a record and return its id
    pub fn register(&mut self, record: ListenerRecord) -> ListenerId {
        let id = record.id;
        self.records.insert(id, Rc::new(record));
        self.dirty.set(true);
        id
    }

    /// Remove a record, returning it if it was present
    pub fn remove(&mut self, id: ListenerId) -> Option<Rc<ListenerRecord>> {
        // shift_remove keeps the remaining records in registration order
        let removed = self.records.shift_remove(&id);
        if removed.is_some() {
            self.dirty.set(true);
        }
        removed
    }

    pub fn unregister(&mut self, id: ListenerId) -> bool {
        self.remove(id).is_some()
    }

    pub fn get(&self, id: ListenerId) -> Option<Rc<ListenerRecord>> {
        self.records.get(&id).cloned()
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.records.contains_key(&id)
    }

    /// Records for `kind` in registration order
    pub fn query_by_kind(&self, kind: EventKind) -> Vec<Rc<ListenerRecord>> {
        self.ensure_index();
        self.index.borrow().get(&kind).cloned().unwrap_or_default()
    }

    /// Whether at least one record of `kind` is registered
    pub fn has_kind(&self, kind: EventKind) -> bool {
        self.ensure_index();
        self.index.borrow().contains_key(&kind)
    }

    /// Whether any keyboard record still names `key`
    pub fn references_key(&self, key: &str) -> bool {
        self.records
            .values()
            .any(|r| r.kind.is_keyboard() && r.match_key.as_deref() == Some(key))
    }

    pub fn has_keyboard(&self) -> bool {
        self.has_kind(EventKind::KeyPress) || self.has_kind(EventKind::KeyRelease)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Snapshot of every kind with its records, in [`EventKind::ALL`] order
    pub fn grouped(&self) -> Vec<(EventKind, Vec<Rc<ListenerRecord>>)> {
        self.ensure_index();
        let index = self.index.borrow();
        EventKind::ALL
            .iter()
            .filter_map(|kind| index.get(kind).map(|records| (*kind, records.clone())))
            .collect()
    }

    /// Drop every record, returning them in registration order
    pub fn clear(&mut self) -> Vec<Rc<ListenerRecord>> {
        self.dirty.set(true);
        self.records.drain(..).map(|(_, record)| record).collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    fn ensure_index(&self) {
        if !self.dirty.get() {
            return;
        }
        let mut index = self.index.borrow_mut();
        index.clear();
        for record in self.records.values() {
            index.entry(record.kind).or_default().push(Rc::clone(record));
        }
        self.dirty.set(false);
        log::trace!("rebuilt listener index over {} records", self.records.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::listener::ListenerOptions;

    fn record(kind: EventKind) -> ListenerRecord {
        ListenerRecord::new(kind, None, ListenerOptions::new().callback(|_| Ok(())))
    }

    #[test]
    fn test_ids_are_unique() {
        let mut registry = ListenerRegistry::new();
        let mut ids: Vec<_> = (0..50).map(|_| registry.register(record(EventKind::Click))).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_query_preserves_registration_order() {
        let mut registry = ListenerRegistry::new();
        let a = registry.register(record(EventKind::Click));
        let _ = registry.register(record(EventKind::PointerMove));
        let b = registry.register(record(EventKind::Click));
        let c = registry.register(record(EventKind::Click));
        registry.unregister(b);

        let ids: Vec<_> = registry
            .query_by_kind(EventKind::Click)
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn test_reads_rebuild_dirty_index() {
        let mut registry = ListenerRegistry::new();
        let id = registry.register(record(EventKind::Wheel));
        assert!(registry.is_dirty());
        assert!(registry.has_kind(EventKind::Wheel));
        assert!(!registry.is_dirty());

        registry.unregister(id);
        assert!(registry.is_dirty());
        assert!(registry.query_by_kind(EventKind::Wheel).is_empty());
        assert!(!registry.has_kind(EventKind::Wheel));
    }

    #[test]
    fn test_unregister_missing_id_is_noop() {
        let mut registry = ListenerRegistry::new();
        let id = registry.register(record(EventKind::Click));
        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_references_key() {
        let mut registry = ListenerRegistry::new();
        let id = registry.register(ListenerRecord::new(
            EventKind::KeyPress,
            Some("Escape".to_string()),
            ListenerOptions::new(),
        ));
        assert!(registry.references_key("Escape"));
        assert!(!registry.references_key("a"));
        registry.unregister(id);
        assert!(!registry.references_key("Escape"));
    }
}
