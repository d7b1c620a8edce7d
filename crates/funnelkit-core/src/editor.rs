//! The editing session: one page, its history, selection and hooks.

use crate::command::{Applied, Command, CommandContext};
use crate::document::PageDocument;
use crate::element::{BlockContent, EditorElement, ElementStyle};
use crate::error::{EditorError, EditorResult, FieldRejection};
use crate::hooks::{EditorEvent, EventHandler, EventHooks};
use crate::history::{DEFAULT_HISTORY_LIMIT, History, Snapshot};
use crate::ids::{ElementId, IdAllocator, StepId};
use crate::registry;
use crate::selection::SelectionController;
use crate::step::EditorStep;
use crate::storage::{AutoSaveManager, DEFAULT_AUTOSAVE_INTERVAL_SECS, StorageError, StorageResult};
use kurbo::Point;
use serde_json::{Map, Value};
use std::time::Duration;

/// Session settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorConfig {
    /// Maximum number of undo states.
    pub history_limit: usize,
    /// Minimum time between two automatic saves.
    pub autosave_interval: Duration,
    /// Save after mutations when an autosave manager is attached.
    pub autosave_enabled: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            autosave_interval: Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS),
            autosave_enabled: true,
        }
    }
}

/// What the renderer needs to draw one element.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderItem {
    pub element_id: ElementId,
    /// Wire type name, also for unknown types.
    pub block_type: String,
    /// Registry label, or the raw type name for placeholders.
    pub label: String,
    /// Draw as a neutral placeholder.
    pub placeholder: bool,
    pub content: Map<String, Value>,
    pub style: ElementStyle,
    pub position: Point,
    pub locked: bool,
    pub selected: bool,
}

/// A live editing session over one page.
#[derive(Debug)]
pub struct Editor {
    document: PageDocument,
    current_step_id: Option<StepId>,
    selection: SelectionController,
    history: History,
    ids: IdAllocator,
    hooks: EventHooks,
    config: EditorConfig,
    autosave: Option<AutoSaveManager>,
    autosave_error: Option<StorageError>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    /// Session over a new empty page.
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    pub fn with_config(config: EditorConfig) -> Self {
        Self::with_document_and_config(PageDocument::new(), config)
    }

    /// Session over an existing page. The first step becomes current.
    pub fn with_document(document: PageDocument) -> Self {
        Self::with_document_and_config(document, EditorConfig::default())
    }

    /// Repeated ids are renamed after their first use so every command
    /// resolves to exactly one step or element.
    pub fn with_document_and_config(mut document: PageDocument, config: EditorConfig) -> Self {
        for (old, new) in document.reassign_duplicate_ids() {
            log::warn!("Page {}: duplicate id {} renamed to {}", document.id, old, new);
        }
        let mut ids = IdAllocator::new();
        for id in document.all_ids() {
            ids.observe(id);
        }

        Self {
            current_step_id: document.steps.first().map(|s| s.id().clone()),
            selection: SelectionController::new(),
            history: History::with_limit(config.history_limit),
            ids,
            hooks: EventHooks::new(),
            autosave: None,
            autosave_error: None,
            config,
            document,
        }
    }

    pub fn document(&self) -> &PageDocument {
        &self.document
    }

    pub fn into_document(self) -> PageDocument {
        self.document
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn current_step_id(&self) -> Option<&StepId> {
        self.current_step_id.as_ref()
    }

    pub fn current_step(&self) -> Option<&EditorStep> {
        self.current_step_id
            .as_ref()
            .and_then(|id| self.document.step(id))
    }

    /// Switch the step shown on the canvas. Not recorded in history.
    pub fn set_current_step(&mut self, id: &StepId) -> EditorResult<()> {
        if self.document.step(id).is_none() {
            return Err(EditorError::StepNotFound(id.clone()));
        }
        self.current_step_id = Some(id.clone());
        Ok(())
    }

    pub fn element(&self, id: &ElementId) -> EditorResult<&EditorElement> {
        self.document
            .element(id)
            .ok_or_else(|| EditorError::ElementNotFound(id.clone()))
    }

    pub fn find_element(&self, id: &ElementId) -> Option<(&StepId, &EditorElement)> {
        self.document.find_element(id)
    }

    /// Select an element and open the properties panel on it.
    ///
    /// Selecting an element of another step makes that step current.
    pub fn select(&mut self, id: &ElementId) -> EditorResult<()> {
        self.selection.select(id, &self.document)?;
        self.current_step_id = self.document.step_of(id);
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.selection.deselect();
    }

    pub fn selected_element(&self) -> Option<&EditorElement> {
        self.selection
            .selected()
            .and_then(|id| self.document.element(id))
    }

    /// Register a tracking hook.
    pub fn subscribe(&mut self, handler: impl EventHandler + Send + 'static) {
        self.hooks.subscribe(handler);
    }

    /// Apply one edit.
    ///
    /// The command runs on a copy of the page. Only when it succeeds is the
    /// previous state pushed to history and the copy made live, so a failed
    /// command leaves both page and history untouched.
    pub fn apply(&mut self, command: Command) -> EditorResult<Applied> {
        let name = command.name();
        let mut working = self.document.clone();
        let mut current_step = self.current_step_id.clone();
        let mut ctx = CommandContext::new(&mut working, &mut current_step, &mut self.ids);

        let applied = match command.execute(&mut ctx) {
            Ok(applied) => applied,
            Err(e) => {
                log::debug!("{} rejected: {}", name, e);
                return Err(e);
            }
        };
        let events = std::mem::take(&mut ctx.events);
        if !applied.is_change() {
            return Ok(applied);
        }

        let before = Snapshot::capture(&self.document, self.current_step_id.as_ref());
        self.history.commit(before);
        working.touch();
        self.document = working;
        self.current_step_id = current_step;
        for event in &events {
            if let EditorEvent::ElementDeleted { element_id, .. } = event {
                self.selection.on_element_removed(element_id);
            }
            self.hooks.emit(event);
        }
        log::debug!(
            "{} applied ({} fields rejected, history {})",
            name,
            applied.rejected.len(),
            self.history.undo_depth()
        );
        self.after_change();
        Ok(applied)
    }

    /// Revert the last change. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        if !self.history.can_undo() {
            return false;
        }
        let current = Snapshot::capture(&self.document, self.current_step_id.as_ref());
        match self.history.undo(current) {
            Some(previous) => {
                self.restore(previous);
                true
            }
            None => false,
        }
    }

    /// Re-apply the last undone change. Returns false when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        if !self.history.can_redo() {
            return false;
        }
        let current = Snapshot::capture(&self.document, self.current_step_id.as_ref());
        match self.history.redo(current) {
            Some(next) => {
                self.restore(next);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.current_step_id = snapshot.restore(&mut self.document);
        let current_exists = self
            .current_step_id
            .as_ref()
            .is_some_and(|id| self.document.step(id).is_some());
        if !current_exists {
            self.current_step_id = self.document.steps.first().map(|s| s.id().clone());
        }
        self.document.touch();
        self.selection.reconcile(&self.document);
        self.after_change();
    }

    /// Visible elements of the current step in paint order.
    pub fn render_list(&self) -> Vec<RenderItem> {
        self.current_step()
            .map(|step| self.render_items(step))
            .unwrap_or_default()
    }

    /// Visible elements of any step in paint order.
    pub fn render_step(&self, id: &StepId) -> EditorResult<Vec<RenderItem>> {
        let step = self
            .document
            .step(id)
            .ok_or_else(|| EditorError::StepNotFound(id.clone()))?;
        Ok(self.render_items(step))
    }

    fn render_items(&self, step: &EditorStep) -> Vec<RenderItem> {
        step.elements
            .iter()
            .filter(|e| e.visible)
            .map(|e| {
                let label = match e.block_type() {
                    Some(block_type) => registry::spec(block_type).label.to_string(),
                    None => e.content.type_name().to_string(),
                };
                RenderItem {
                    element_id: e.id().clone(),
                    block_type: e.content.type_name().to_string(),
                    label,
                    placeholder: e.is_placeholder(),
                    content: e.content.to_map(),
                    style: e.style.clone(),
                    position: e.position,
                    locked: e.locked,
                    selected: self.selection.is_selected(e.id()),
                }
            })
            .collect()
    }

    /// Report a click on a call-to-action button in preview.
    pub fn record_cta_interaction(&mut self, id: &ElementId) -> EditorResult<()> {
        let (step_id, element) = self
            .document
            .find_element(id)
            .ok_or_else(|| EditorError::ElementNotFound(id.clone()))?;
        let BlockContent::Button(button) = &element.content else {
            return Err(EditorError::InvalidFieldValue(vec![FieldRejection::new(
                "type",
                "only buttons are calls to action",
            )]));
        };
        let event = EditorEvent::CtaInteraction {
            step_id: step_id.clone(),
            element_id: id.clone(),
            label: button.text.clone(),
        };
        self.hooks.emit(&event);
        Ok(())
    }

    /// Attach a manager that persists the page after mutations.
    pub fn attach_autosave(&mut self, manager: AutoSaveManager) {
        self.autosave = Some(manager.with_interval(self.config.autosave_interval));
    }

    pub fn autosave(&self) -> Option<&AutoSaveManager> {
        self.autosave.as_ref()
    }

    /// Save immediately through the attached manager.
    pub fn save_now(&mut self) -> StorageResult<()> {
        match &mut self.autosave {
            Some(manager) => manager.save(&self.document),
            None => Err(StorageError::Other("no autosave manager attached".to_string())),
        }
    }

    /// The last autosave failure, if any. Cleared by this call.
    pub fn take_autosave_error(&mut self) -> Option<StorageError> {
        self.autosave_error.take()
    }

    fn after_change(&mut self) {
        let Some(manager) = &mut self.autosave else {
            return;
        };
        manager.mark_dirty();
        if !self.config.autosave_enabled {
            return;
        }
        match manager.maybe_save(&self.document) {
            Ok(_) => {}
            Err(e) => {
                log::warn!("Autosave of page {} failed: {}", self.document.id, e);
                self.autosave_error = Some(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::BlockType;
    use crate::storage::{PageStore, Storage};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn offer_button(editor: &Editor) -> ElementId {
        editor.document().steps[2].elements[2].id().clone()
    }

    fn text_of(editor: &Editor, id: &ElementId) -> Value {
        editor.element(id).unwrap().content.get("text").unwrap()
    }

    #[test]
    fn test_button_text_undo_redo() {
        let mut editor = Editor::with_document(PageDocument::template("p"));
        let button = offer_button(&editor);
        assert_eq!(text_of(&editor, &button), json!("Comprar"));

        editor
            .apply(Command::update_content(button.clone(), json!({"text": "Comprar Agora"})))
            .unwrap();
        assert_eq!(text_of(&editor, &button), json!("Comprar Agora"));

        assert!(editor.undo());
        assert_eq!(text_of(&editor, &button), json!("Comprar"));
        assert!(editor.redo());
        assert_eq!(text_of(&editor, &button), json!("Comprar Agora"));
    }

    #[test]
    fn test_style_patches_merge() {
        let mut editor = Editor::with_document(PageDocument::template("p"));
        let button = offer_button(&editor);
        editor
            .apply(Command::update_style(button.clone(), json!({"color": "#111111"})))
            .unwrap();
        editor
            .apply(Command::update_style(button.clone(), json!({"fontSize": 24})))
            .unwrap();

        let style = &editor.element(&button).unwrap().style;
        assert_eq!(style.color.as_deref(), Some("#111111"));
        assert_eq!(style.font_size, Some(24.0));
    }

    #[test]
    fn test_partial_rejection_is_reported() {
        let mut editor = Editor::with_document(PageDocument::template("p"));
        let button = offer_button(&editor);
        let applied = editor
            .apply(Command::update_style(
                button.clone(),
                json!({"fontSize": 500, "color": "#000000"}),
            ))
            .unwrap();
        assert_eq!(applied.rejected.len(), 1);
        assert_eq!(applied.rejected[0].field, "fontSize");
        let style = &editor.element(&button).unwrap().style;
        assert_eq!(style.color.as_deref(), Some("#000000"));
        assert_ne!(style.font_size, Some(500.0));
    }

    #[test]
    fn test_failed_command_leaves_state_and_history() {
        let mut editor = Editor::with_document(PageDocument::template("p"));
        let button = offer_button(&editor);
        let before = editor.document().clone();

        let err = editor
            .apply(Command::update_style(button.clone(), json!({"opacity": 3})))
            .unwrap_err();
        assert!(matches!(err, EditorError::InvalidFieldValue(_)));
        assert_eq!(editor.document(), &before);
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_locked_element_rejects_edits() {
        let mut editor = Editor::with_document(PageDocument::template("p"));
        let button = offer_button(&editor);
        editor
            .apply(Command::SetElementLocked {
                element_id: button.clone(),
                locked: true,
            })
            .unwrap();
        let depth = editor.history().undo_depth();

        let err = editor
            .apply(Command::MoveElement {
                element_id: button.clone(),
                position: Point::new(100.0, 100.0),
            })
            .unwrap_err();
        assert_eq!(err, EditorError::LockedElement(button.clone()));
        assert_eq!(editor.history().undo_depth(), depth);

        let style_before = editor.element(&button).unwrap().style.clone();
        let err = editor
            .apply(Command::update_style(button.clone(), json!({"borderRadius": 20})))
            .unwrap_err();
        assert_eq!(err, EditorError::LockedElement(button.clone()));
        assert_eq!(editor.element(&button).unwrap().style, style_before);
        assert_eq!(editor.history().undo_depth(), depth);

        // Still selectable and removable.
        editor.select(&button).unwrap();
        editor
            .apply(Command::RemoveElement {
                element_id: button.clone(),
            })
            .unwrap();
        assert!(editor.element(&button).is_err());
    }

    #[test]
    fn test_ids_never_reused_after_delete() {
        let mut editor = Editor::with_document(PageDocument::template("p"));
        let step = StepId::from("quiz");
        let mut seen = Vec::new();
        for _ in 0..5 {
            let applied = editor
                .apply(Command::add_element(step.clone(), BlockType::Text))
                .unwrap();
            let id = applied.element_id().unwrap().clone();
            editor
                .apply(Command::RemoveElement {
                    element_id: id.clone(),
                })
                .unwrap();
            assert!(!seen.contains(&id));
            seen.push(id);
        }
        assert!(editor.document().duplicate_ids().is_empty());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut editor = Editor::with_document(PageDocument::template("p"));
        let button = offer_button(&editor);
        for i in 0..25 {
            editor
                .apply(Command::MoveElement {
                    element_id: button.clone(),
                    position: Point::new(i as f64 + 1.0, 0.0),
                })
                .unwrap();
        }
        assert_eq!(editor.history().len(), DEFAULT_HISTORY_LIMIT);

        let mut undone = 0;
        while editor.undo() {
            undone += 1;
        }
        assert_eq!(undone, DEFAULT_HISTORY_LIMIT);
        assert_eq!(editor.element(&button).unwrap().position, Point::new(5.0, 0.0));
    }

    #[test]
    fn test_undo_redo_are_inverse() {
        let mut editor = Editor::with_document(PageDocument::template("p"));
        let original = editor.document().steps.clone();

        editor
            .apply(Command::AddStep {
                name: "Obrigado".into(),
                at_index: None,
            })
            .unwrap();
        editor
            .apply(Command::DuplicateStep {
                step_id: StepId::from("offer"),
            })
            .unwrap();
        let edited = editor.document().steps.clone();

        assert!(editor.undo());
        assert!(editor.undo());
        assert_eq!(editor.document().steps, original);
        assert!(!editor.undo());

        assert!(editor.redo());
        assert!(editor.redo());
        assert_eq!(editor.document().steps, edited);
        assert!(!editor.redo());
    }

    #[test]
    fn test_new_command_drops_redo() {
        let mut editor = Editor::with_document(PageDocument::template("p"));
        let button = offer_button(&editor);
        editor
            .apply(Command::update_content(button.clone(), json!({"text": "A"})))
            .unwrap();
        editor.undo();
        assert!(editor.can_redo());
        editor
            .apply(Command::update_content(button.clone(), json!({"text": "B"})))
            .unwrap();
        assert!(!editor.can_redo());
    }

    #[test]
    fn test_removing_selected_element_clears_selection() {
        let mut editor = Editor::with_document(PageDocument::template("p"));
        let button = offer_button(&editor);
        editor.select(&button).unwrap();
        assert_eq!(editor.current_step_id(), Some(&StepId::from("offer")));
        assert!(editor.selection().is_panel_open());

        editor
            .apply(Command::RemoveStep {
                step_id: StepId::from("offer"),
            })
            .unwrap();
        assert!(!editor.selection().is_panel_open());
        assert_eq!(editor.current_step_id(), Some(&StepId::from("result")));

        editor.undo();
        assert_eq!(editor.current_step_id(), Some(&StepId::from("offer")));
        assert!(editor.selected_element().is_none());
    }

    #[test]
    fn test_removing_other_element_keeps_selection() {
        let mut editor = Editor::with_document(PageDocument::template("p"));
        let button = offer_button(&editor);
        let image = editor.document().steps[2].elements[1].id().clone();
        editor.select(&button).unwrap();

        editor
            .apply(Command::RemoveElement {
                element_id: image,
            })
            .unwrap();
        assert!(editor.selection().is_selected(&button));

        editor
            .apply(Command::RemoveElement {
                element_id: button.clone(),
            })
            .unwrap();
        assert!(editor.selected_element().is_none());
    }

    #[test]
    fn test_duplicate_ids_renamed_on_open() {
        let mut doc = PageDocument::template("p");
        let heading = doc.steps[0].elements[0].clone();
        doc.steps[1].elements.push(heading.clone());

        let mut editor = Editor::with_document(doc);
        assert!(editor.document().duplicate_ids().is_empty());
        editor
            .apply(Command::RemoveElement {
                element_id: heading.id().clone(),
            })
            .unwrap();
        assert!(editor.find_element(heading.id()).is_none());
    }

    #[test]
    fn test_empty_page_first_step_becomes_current() {
        let mut editor = Editor::new();
        assert!(editor.current_step().is_none());
        assert!(editor.render_list().is_empty());

        let applied = editor
            .apply(Command::AddStep {
                name: "Início".into(),
                at_index: None,
            })
            .unwrap();
        let step_id = applied.step_id().unwrap().clone();
        assert_eq!(editor.current_step_id(), Some(&step_id));

        editor
            .apply(Command::RemoveStep {
                step_id: step_id.clone(),
            })
            .unwrap();
        assert_eq!(editor.current_step_id(), None);
    }

    #[test]
    fn test_set_current_step() {
        let mut editor = Editor::with_document(PageDocument::template("p"));
        editor.set_current_step(&StepId::from("result")).unwrap();
        assert_eq!(editor.current_step().unwrap().name, "Resultado");
        assert!(editor.set_current_step(&StepId::from("nope")).is_err());
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_render_list_skips_hidden_and_flags_placeholders() {
        let mut doc = PageDocument::template("p");
        doc.steps[0].elements[1].content = BlockContent::Unknown {
            kind: "countdown".into(),
            fields: Map::new(),
        };
        let mut editor = Editor::with_document(doc);
        let heading = editor.document().steps[0].elements[0].id().clone();

        let items = editor.render_list();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].block_type, "heading");
        assert!(!items[0].placeholder);
        assert!(items[1].placeholder);
        assert_eq!(items[1].label, "countdown");

        editor
            .apply(Command::SetElementVisible {
                element_id: heading,
                visible: false,
            })
            .unwrap();
        assert_eq!(editor.render_list().len(), 1);
    }

    #[test]
    fn test_hooks_receive_events() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut editor = Editor::with_document(PageDocument::template("p"));
        let sink = Arc::clone(&events);
        editor.subscribe(move |event: &EditorEvent| sink.lock().unwrap().push(event.clone()));

        let added = editor
            .apply(Command::add_element("result", BlockType::Button))
            .unwrap();
        let id = added.element_id().unwrap().clone();
        editor.record_cta_interaction(&id).unwrap();
        editor
            .apply(Command::RemoveElement {
                element_id: id.clone(),
            })
            .unwrap();
        editor.apply(Command::SetPublished { published: true }).unwrap();
        let _ = editor.apply(Command::RemoveElement { element_id: id.clone() });

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 4);
        assert!(matches!(
            &events[0],
            EditorEvent::ElementAdded { block_type, .. } if block_type == "button"
        ));
        assert!(matches!(
            &events[1],
            EditorEvent::CtaInteraction { label, .. } if label == "Clique aqui"
        ));
        assert!(matches!(
            &events[2],
            EditorEvent::ElementDeleted { element_id, .. } if element_id == &id
        ));
        assert!(matches!(&events[3], EditorEvent::Published { page_id } if page_id == "p"));
    }

    #[test]
    fn test_cta_interaction_requires_button() {
        let mut editor = Editor::with_document(PageDocument::template("p"));
        let heading = editor.document().steps[0].elements[0].id().clone();
        assert!(editor.record_cta_interaction(&heading).is_err());
        assert!(editor.record_cta_interaction(&ElementId::from("ghost")).is_err());
    }

    #[test]
    fn test_autosave_after_change() {
        let store = PageStore::in_memory();
        let mut editor = Editor::with_document(PageDocument::template("p"));
        editor.attach_autosave(AutoSaveManager::new(store.clone()));

        editor
            .apply(Command::RenamePage {
                name: "Oferta".into(),
                description: None,
            })
            .unwrap();
        assert_eq!(store.load("p").unwrap().name, "Oferta");
        assert!(editor.take_autosave_error().is_none());
    }

    struct FullStorage;

    impl Storage for FullStorage {
        fn read(&self, _: &str) -> StorageResult<Option<String>> {
            Ok(None)
        }
        fn write(&self, _: &str, _: &str) -> StorageResult<()> {
            Err(StorageError::Io("quota exceeded".into()))
        }
        fn remove(&self, _: &str) -> StorageResult<()> {
            Ok(())
        }
        fn keys(&self) -> StorageResult<Vec<String>> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_autosave_failure_is_kept_for_ui() {
        let mut editor = Editor::with_document(PageDocument::template("p"));
        editor.attach_autosave(AutoSaveManager::new(PageStore::new(Arc::new(FullStorage))));

        editor
            .apply(Command::RenamePage {
                name: "Oferta".into(),
                description: None,
            })
            .unwrap();
        assert_eq!(editor.document().name, "Oferta");
        assert!(matches!(editor.take_autosave_error(), Some(StorageError::Io(_))));
        assert!(editor.take_autosave_error().is_none());
        assert!(editor.autosave().unwrap().is_dirty());
    }

    #[test]
    fn test_history_limit_from_config() {
        let config = EditorConfig {
            history_limit: 2,
            ..EditorConfig::default()
        };
        let mut editor = Editor::with_document_and_config(PageDocument::template("p"), config);
        for name in ["a", "b", "c"] {
            editor
                .apply(Command::RenamePage {
                    name: name.into(),
                    description: None,
                })
                .unwrap();
        }
        assert!(editor.undo());
        assert!(editor.undo());
        assert!(!editor.undo());
        assert_eq!(editor.document().name, "a");
    }
}
