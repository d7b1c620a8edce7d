//! Bounded linear undo/redo history.
//!
//! History is a single list of snapshots with an index pointer. Entries
//! before the index are undo targets (oldest first); entries from the index
//! on are redo targets. Undoing swaps the live state into the slot it leaves,
//! so redo can restore it exactly.

use crate::document::{PageDocument, PageSettings};
use crate::ids::StepId;
use crate::step::EditorStep;
use std::collections::VecDeque;

/// Maximum number of undo states to keep.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// A deep copy of the editable state.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub name: String,
    pub description: String,
    pub is_published: bool,
    pub steps: Vec<EditorStep>,
    pub settings: PageSettings,
    pub current_step_id: Option<StepId>,
}

impl Snapshot {
    /// Capture the editable parts of a document.
    pub fn capture(doc: &PageDocument, current_step_id: Option<&StepId>) -> Self {
        Self {
            name: doc.name.clone(),
            description: doc.description.clone(),
            is_published: doc.is_published,
            steps: doc.steps.clone(),
            settings: doc.settings.clone(),
            current_step_id: current_step_id.cloned(),
        }
    }

    /// Write the snapshot back into a document, returning the current step.
    pub fn restore(self, doc: &mut PageDocument) -> Option<StepId> {
        doc.name = self.name;
        doc.description = self.description;
        doc.is_published = self.is_published;
        doc.steps = self.steps;
        doc.settings = self.settings;
        self.current_step_id
    }
}

/// Undo/redo log.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Snapshot>,
    index: usize,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// History keeping at most `limit` undo states (minimum 1).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            index: 0,
            limit: limit.max(1),
        }
    }

    /// Record the state as it was before a mutation.
    ///
    /// Drops the redo branch and evicts the oldest entry beyond the limit.
    pub fn commit(&mut self, before: Snapshot) {
        self.entries.truncate(self.index);
        self.entries.push_back(before);
        self.index += 1;
        while self.entries.len() > self.limit {
            self.entries.pop_front();
            self.index -= 1;
        }
    }

    /// Step back. `current` is kept for redo.
    ///
    /// Returns `None` when already at the oldest entry.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        Some(std::mem::replace(&mut self.entries[self.index], current))
    }

    /// Step forward. `current` is kept for undo.
    ///
    /// Returns `None` when already at the newest entry.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        if self.index >= self.entries.len() {
            return None;
        }
        let target = std::mem::replace(&mut self.entries[self.index], current);
        self.index += 1;
        Some(target)
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        self.index < self.entries.len()
    }

    /// Number of undo steps available.
    pub fn undo_depth(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = 0;
    }
}
