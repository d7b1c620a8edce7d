//! Identifiers for steps and elements.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Borrow the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of an element. Unique across the whole page, not just its step.
    ElementId
);

string_id!(
    /// Identifier of a step.
    StepId
);

/// Generate a fresh page id.
pub fn new_page_id() -> String {
    Uuid::new_v4().to_string()
}

/// Hands out ids that never collide with any id seen during the session.
///
/// Ids of deleted elements stay reserved so history snapshots can never
/// refer to a recycled id.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    used: HashSet<String>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an id that came from outside (a hydrated document).
    pub fn observe(&mut self, id: &str) {
        self.used.insert(id.to_string());
    }

    /// Whether the id was ever seen or handed out.
    pub fn is_used(&self, id: &str) -> bool {
        self.used.contains(id)
    }

    pub fn next_element_id(&mut self) -> ElementId {
        ElementId(self.fresh())
    }

    pub fn next_step_id(&mut self) -> StepId {
        StepId(self.fresh())
    }

    fn fresh(&mut self) -> String {
        loop {
            let candidate = Uuid::new_v4().to_string();
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_never_repeats() {
        let mut ids = IdAllocator::new();
        let mut seen = HashSet::new();
        for _ in 0..500 {
            assert!(seen.insert(ids.next_element_id()));
        }
    }

    #[test]
    fn test_observed_ids_are_reserved() {
        let mut ids = IdAllocator::new();
        ids.observe("hero-heading");
        assert!(ids.is_used("hero-heading"));
        assert!(!ids.is_used("other"));
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = ElementId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
