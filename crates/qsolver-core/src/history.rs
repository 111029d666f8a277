//! Newest-first collection of history items with a selection cursor

use crate::item::{HistoryItem, Round};

/// Ordered history, index 0 is the most recent exchange.
///
/// The active index always addresses an item, or is 0 when empty.
#[derive(Debug, Clone, Default)]
pub struct History {
    items: Vec<HistoryItem>,
    active: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&HistoryItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Select an item; out-of-range indices are ignored
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.items.len() {
            self.active = index;
            true
        } else {
            false
        }
    }

    /// Remove an item and keep the previously adjacent item selected.
    ///
    /// Returns the removed item, or `None` when `index` is out of range.
    pub fn delete(&mut self, index: usize) -> Option<HistoryItem> {
        if index >= self.items.len() {
            return None;
        }

        let removed = self.items.remove(index);
        if self.items.is_empty() {
            self.active = 0;
        } else if index <= self.active {
            self.active = self.active.saturating_sub(1);
        }
        Some(removed)
    }

    /// Rounds of the selected item, empty when there is none
    pub fn current_rounds(&self) -> &[Round] {
        self.items
            .get(self.active)
            .map(HistoryItem::rounds)
            .unwrap_or_default()
    }

    /// The most recent item, which is the one streams write into
    pub fn head(&self) -> Option<&HistoryItem> {
        self.items.first()
    }

    pub(crate) fn head_mut(&mut self) -> Option<&mut HistoryItem> {
        self.items.first_mut()
    }

    /// Insert a new most-recent item and select it
    pub(crate) fn push_front(&mut self, item: HistoryItem) {
        self.items.insert(0, item);
        self.active = 0;
    }

    /// Replace the most recent item (or insert one if empty) and select it
    pub(crate) fn replace_head(&mut self, item: HistoryItem) {
        match self.items.first_mut() {
            Some(head) => *head = item,
            None => self.items.push(item),
        }
        self.active = 0;
    }

    /// Select the head item
    pub(crate) fn select_head(&mut self) {
        self.active = 0;
    }
}
