//! Steps: ordered groups of elements forming one screen of the funnel.

use crate::element::EditorElement;
use crate::ids::{ElementId, StepId};
use crate::registry::{self, PatchOutcome};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Per-step behavior flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StepSettings {
    /// Show the funnel progress bar on this step.
    pub show_progress: bool,
    /// Let the visitor go back to the previous step.
    pub allow_return: bool,
    /// Scoring and routing data for quiz steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_data: Option<Value>,
    /// Keys written by newer editors, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StepSettings {
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> PatchOutcome {
        registry::patch_record(self, registry::STEP_SETTINGS_SCHEMA, patch, None)
    }
}

/// One screen of the funnel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorStep {
    pub(crate) id: StepId,
    pub name: String,
    /// Elements in paint order (back to front).
    #[serde(default)]
    pub elements: Vec<EditorElement>,
    #[serde(default)]
    pub settings: StepSettings,
}

impl EditorStep {
    pub fn new(id: StepId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            elements: Vec::new(),
            settings: StepSettings::default(),
        }
    }

    pub fn id(&self) -> &StepId {
        &self.id
    }

    /// Paint-order index of an element.
    pub fn index_of(&self, id: &ElementId) -> Option<usize> {
        self.elements.iter().position(|e| &e.id == id)
    }

    pub fn element(&self, id: &ElementId) -> Option<&EditorElement> {
        self.elements.iter().find(|e| &e.id == id)
    }

    pub fn element_mut(&mut self, id: &ElementId) -> Option<&mut EditorElement> {
        self.elements.iter_mut().find(|e| &e.id == id)
    }

    /// Insert at `index`, clamped to the end.
    pub fn insert(&mut self, index: Option<usize>, element: EditorElement) -> usize {
        let index = index.unwrap_or(self.elements.len()).min(self.elements.len());
        self.elements.insert(index, element);
        index
    }

    pub fn remove(&mut self, id: &ElementId) -> Option<EditorElement> {
        let index = self.index_of(id)?;
        Some(self.elements.remove(index))
    }

    /// Move an element to `new_index` (clamped). Returns false if the element is absent.
    pub fn reorder(&mut self, id: &ElementId, new_index: usize) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let element = self.elements.remove(index);
        let new_index = new_index.min(self.elements.len());
        self.elements.insert(new_index, element);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::BlockType;
    use serde_json::json;

    fn element(id: &str) -> EditorElement {
        EditorElement::new(ElementId::from(id), BlockType::Text)
    }

    fn order(step: &EditorStep) -> Vec<&str> {
        step.elements.iter().map(|e| e.id().as_str()).collect()
    }

    #[test]
    fn test_insert_clamps_index() {
        let mut step = EditorStep::new(StepId::from("s"), "Quiz");
        step.insert(None, element("a"));
        step.insert(Some(0), element("b"));
        step.insert(Some(99), element("c"));
        assert_eq!(order(&step), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_reorder() {
        let mut step = EditorStep::new(StepId::from("s"), "Quiz");
        for id in ["a", "b", "c"] {
            step.insert(None, element(id));
        }
        assert!(step.reorder(&ElementId::from("a"), 2));
        assert_eq!(order(&step), vec!["b", "c", "a"]);
        assert!(step.reorder(&ElementId::from("a"), 0));
        assert_eq!(order(&step), vec!["a", "b", "c"]);
        assert!(!step.reorder(&ElementId::from("zz"), 0));
    }

    #[test]
    fn test_settings_keep_unknown_keys() {
        let settings: StepSettings = serde_json::from_value(json!({
            "showProgress": true,
            "timer": 30
        }))
        .unwrap();
        assert!(settings.show_progress);
        assert!(!settings.allow_return);
        assert_eq!(settings.extra.get("timer"), Some(&json!(30)));

        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value["timer"], json!(30));
    }

    #[test]
    fn test_settings_patch() {
        let mut settings = StepSettings::default();
        let patch = json!({"allowReturn": true, "questionData": {"weights": [1, 2]}});
        let outcome = settings.apply_patch(patch.as_object().unwrap());
        assert!(outcome.rejected.is_empty());
        assert!(settings.allow_return);
        assert_eq!(settings.question_data, Some(json!({"weights": [1, 2]})));

        let bad = json!({"showProgress": "yes"});
        let outcome = settings.apply_patch(bad.as_object().unwrap());
        assert_eq!(outcome.rejected.len(), 1);
        assert!(!settings.show_progress);
    }
}
