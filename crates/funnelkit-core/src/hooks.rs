//! Tracking hooks for the analytics and webhook layer.
//!
//! The editor only announces named action points; subscribers decide what
//! to do with them. Nothing here talks to the network.

use crate::ids::{ElementId, StepId};
use std::fmt;

/// Action points other layers can subscribe to.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    ElementAdded {
        step_id: StepId,
        element_id: ElementId,
        block_type: String,
    },
    ElementDeleted {
        step_id: StepId,
        element_id: ElementId,
    },
    Published {
        page_id: String,
    },
    /// A call-to-action button was clicked in preview.
    CtaInteraction {
        step_id: StepId,
        element_id: ElementId,
        label: String,
    },
}

/// Receives editor events.
pub trait EventHandler {
    fn handle_event(&mut self, event: &EditorEvent);
}

impl<F> EventHandler for F
where
    F: FnMut(&EditorEvent),
{
    fn handle_event(&mut self, event: &EditorEvent) {
        self(event)
    }
}

/// Registered subscribers of one editor session.
#[derive(Default)]
pub struct EventHooks {
    handlers: Vec<Box<dyn EventHandler + Send>>,
}

impl fmt::Debug for EventHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHooks")
            .field("handlers", &format!("<{} handlers>", self.handlers.len()))
            .finish()
    }
}

impl EventHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a handler to receive events.
    pub fn subscribe(&mut self, handler: impl EventHandler + Send + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Deliver an event to every handler in subscription order.
    pub fn emit(&mut self, event: &EditorEvent) {
        for handler in &mut self.handlers {
            handler.handle_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
