//! Page documents: the persisted part of an editing session.

use crate::element::{BlockContent, EditorElement};
use crate::ids::{self, ElementId, IdAllocator, StepId};
use crate::registry::{self, BlockType, PatchOutcome};
use crate::snap::GRID_SIZE;
use crate::step::EditorStep;
use chrono::{DateTime, Utc};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashSet;

/// Canvas theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Page-level editor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageSettings {
    /// Grid spacing in canvas units.
    pub grid_size: f64,
    /// Snap moved elements to the grid.
    pub snap_to_grid: bool,
    pub show_grid: bool,
    pub theme: Theme,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            grid_size: GRID_SIZE,
            snap_to_grid: false,
            show_grid: true,
            theme: Theme::default(),
        }
    }
}

impl PageSettings {
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> PatchOutcome {
        let defaults = registry::to_map(&Self::default());
        registry::patch_record(self, registry::PAGE_SETTINGS_SCHEMA, patch, Some(&defaults))
    }
}

/// A funnel page: ordered steps plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDocument {
    /// Unique page identifier.
    pub id: String,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "Utc::now")]
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub is_published: bool,
    /// Steps in funnel order.
    #[serde(default)]
    pub steps: Vec<EditorStep>,
    #[serde(default)]
    pub settings: PageSettings,
}

fn default_name() -> String {
    "Untitled".to_string()
}

impl Default for PageDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PageDocument {
    /// Create a new empty page.
    pub fn new() -> Self {
        Self::with_id(ids::new_page_id())
    }

    /// Create an empty page with the given id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: default_name(),
            description: String::new(),
            last_modified: Utc::now(),
            is_published: false,
            steps: Vec::new(),
            settings: PageSettings::default(),
        }
    }

    /// The built-in quiz → result → offer funnel.
    pub fn template(id: impl Into<String>) -> Self {
        let mut doc = Self::with_id(id);
        doc.name = "Novo funil".to_string();
        doc.description = "Quiz, resultado e oferta".to_string();

        let mut ids = IdAllocator::new();
        let mut element = |block_type: BlockType, y: f64, content: Value| {
            let mut el = EditorElement::new(ids.next_element_id(), block_type);
            el.position = Point::new(0.0, y);
            if let Value::Object(patch) = content {
                el.content.apply_patch(&patch);
            }
            el
        };

        let mut quiz = EditorStep::new(StepId::from("quiz"), "Quiz");
        quiz.settings.show_progress = true;
        quiz.elements = vec![
            element(
                BlockType::Heading,
                0.0,
                json!({"text": "Descubra o plano ideal para você", "level": "h1"}),
            ),
            element(
                BlockType::Options,
                80.0,
                json!({"question": "Qual é o seu objetivo principal?"}),
            ),
        ];

        let mut result = EditorStep::new(StepId::from("result"), "Resultado");
        result.settings.allow_return = true;
        result.elements = vec![
            element(BlockType::Heading, 0.0, json!({"text": "Seu resultado"})),
            element(
                BlockType::Text,
                60.0,
                json!({"text": "Com base nas suas respostas, preparamos uma recomendação."}),
            ),
            element(BlockType::Button, 140.0, json!({"text": "Ver oferta"})),
        ];

        let mut offer = EditorStep::new(StepId::from("offer"), "Oferta");
        offer.elements = vec![
            element(BlockType::Heading, 0.0, json!({"text": "Oferta especial", "level": "h1"})),
            element(BlockType::Image, 80.0, json!({"alt": "Produto"})),
            element(BlockType::Button, 420.0, json!({"text": "Comprar", "action": "url"})),
        ];

        doc.steps = vec![quiz, result, offer];
        doc
    }

    /// Update the modification timestamp.
    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }

    pub fn step(&self, id: &StepId) -> Option<&EditorStep> {
        self.steps.iter().find(|s| &s.id == id)
    }

    pub fn step_mut(&mut self, id: &StepId) -> Option<&mut EditorStep> {
        self.steps.iter_mut().find(|s| &s.id == id)
    }

    pub fn step_index(&self, id: &StepId) -> Option<usize> {
        self.steps.iter().position(|s| &s.id == id)
    }

    /// Find an element anywhere on the page, with the id of its step.
    pub fn find_element(&self, id: &ElementId) -> Option<(&StepId, &EditorElement)> {
        self.steps
            .iter()
            .find_map(|s| s.element(id).map(|e| (&s.id, e)))
    }

    pub fn element(&self, id: &ElementId) -> Option<&EditorElement> {
        self.find_element(id).map(|(_, e)| e)
    }

    pub fn element_mut(&mut self, id: &ElementId) -> Option<&mut EditorElement> {
        self.steps.iter_mut().find_map(|s| s.element_mut(id))
    }

    /// Id of the step containing an element.
    pub fn step_of(&self, id: &ElementId) -> Option<StepId> {
        self.find_element(id).map(|(step_id, _)| step_id.clone())
    }

    /// Whether any step or element uses this id.
    pub fn contains_id(&self, id: &str) -> bool {
        self.steps.iter().any(|s| {
            s.id.as_str() == id || s.elements.iter().any(|e| e.id.as_str() == id)
        })
    }

    /// Every step and element id, in document order.
    pub fn all_ids(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().flat_map(|s| {
            std::iter::once(s.id.as_str()).chain(s.elements.iter().map(|e| e.id.as_str()))
        })
    }

    /// Ids used more than once across steps and elements.
    pub fn duplicate_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for id in self.all_ids() {
            if !seen.insert(id) && !duplicates.iter().any(|d: &String| d == id) {
                duplicates.push(id.to_string());
            }
        }
        duplicates
    }

    /// Give every repeated step or element id after its first use a fresh id.
    ///
    /// Returns `(old, new)` pairs in document order.
    pub fn reassign_duplicate_ids(&mut self) -> Vec<(String, String)> {
        let mut ids = IdAllocator::new();
        for id in self.all_ids() {
            ids.observe(id);
        }
        let mut seen = HashSet::new();
        let mut reassigned = Vec::new();
        for step in &mut self.steps {
            if !seen.insert(step.id.to_string()) {
                let fresh = ids.next_step_id();
                reassigned.push((step.id.to_string(), fresh.to_string()));
                step.id = fresh;
            }
            for element in &mut step.elements {
                if !seen.insert(element.id.to_string()) {
                    let fresh = ids.next_element_id();
                    reassigned.push((element.id.to_string(), fresh.to_string()));
                    element.id = fresh;
                }
            }
        }
        reassigned
    }

    /// Total number of elements across all steps.
    pub fn element_count(&self) -> usize {
        self.steps.iter().map(EditorStep::len).sum()
    }

    /// All button elements that act as calls to action.
    pub fn call_to_actions(&self) -> impl Iterator<Item = &EditorElement> {
        self.steps
            .iter()
            .flat_map(|s| s.elements.iter())
            .filter(|e| matches!(e.content, BlockContent::Button(_)))
    }

    /// Summary entry for the page index.
    pub fn summary(&self) -> PageSummary {
        PageSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            last_modified: self.last_modified,
            is_published: self.is_published,
            views: None,
            conversions: None,
        }
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Index entry describing a page without its steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversions: Option<u64>,
}
