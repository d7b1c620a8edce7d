//! Single-element selection and properties panel visibility.

use crate::document::PageDocument;
use crate::error::{EditorError, EditorResult};
use crate::ids::ElementId;

/// Selection state. Multi-select is not supported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    /// Nothing selected, panel closed.
    #[default]
    Idle,
    /// One element selected, panel open on it.
    Selected(ElementId),
}

/// Tracks which element the properties panel targets.
///
/// Read-only with respect to the page: it never mutates the document.
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    state: Selection,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &Selection {
        &self.state
    }

    /// The selected element id, if any.
    pub fn selected(&self) -> Option<&ElementId> {
        match &self.state {
            Selection::Selected(id) => Some(id),
            Selection::Idle => None,
        }
    }

    pub fn is_selected(&self, id: &ElementId) -> bool {
        self.selected() == Some(id)
    }

    /// The properties panel is open exactly while something is selected.
    pub fn is_panel_open(&self) -> bool {
        matches!(self.state, Selection::Selected(_))
    }

    /// Select an element, switching directly from any previous target.
    pub fn select(&mut self, id: &ElementId, doc: &PageDocument) -> EditorResult<()> {
        if doc.element(id).is_none() {
            return Err(EditorError::ElementNotFound(id.clone()));
        }
        self.state = Selection::Selected(id.clone());
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.state = Selection::Idle;
    }

    /// Closing the panel drops the selection.
    pub fn close_panel(&mut self) {
        self.deselect();
    }

    /// Called when an element leaves the page.
    pub fn on_element_removed(&mut self, id: &ElementId) {
        if self.is_selected(id) {
            self.deselect();
        }
    }

    /// Clear a selection that no longer resolves. Returns true if it was cleared.
    pub fn reconcile(&mut self, doc: &PageDocument) -> bool {
        match &self.state {
            Selection::Selected(id) if doc.element(id).is_none() => {
                self.deselect();
                true
            }
            _ => false,
        }
    }
}
