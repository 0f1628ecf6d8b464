//! Ordered unique set of cell identifiers.

use std::collections::HashSet;

use crate::resolver::CellId;

/// Cells in the order they were first visited, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    order: Vec<CellId>,
    index: HashSet<CellId>,
}

impl SelectionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `cell_id` unless already present. Returns true if inserted.
    pub fn insert(&mut self, cell_id: CellId) -> bool {
        if !self.index.insert(cell_id.clone()) {
            return false;
        }
        self.order.push(cell_id);
        true
    }

    /// Whether `cell_id` is in the set.
    pub fn contains(&self, cell_id: &CellId) -> bool {
        self.index.contains(cell_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// First cell inserted.
    pub fn first(&self) -> Option<&CellId> {
        self.order.first()
    }

    /// Remove every cell.
    pub fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }

    /// Cells in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &CellId> {
        self.order.iter()
    }

    pub fn as_slice(&self) -> &[CellId] {
        &self.order
    }

    pub fn to_vec(&self) -> Vec<CellId> {
        self.order.clone()
    }
}
