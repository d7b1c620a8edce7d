//! The edit protocol: every change to a page is a [`Command`].
//!
//! Commands run against a working copy of the document (see
//! [`crate::editor::Editor::apply`]), so a command that fails leaves the live
//! page untouched.

use crate::document::PageDocument;
use crate::element::EditorElement;
use crate::error::{EditorError, EditorResult, FieldRejection};
use crate::hooks::EditorEvent;
use crate::ids::{ElementId, IdAllocator, StepId};
use crate::registry::{BlockType, PatchOutcome};
use crate::snap;
use crate::step::EditorStep;
use kurbo::{Point, Size};
use serde_json::{Map, Value, json};

/// A single user-level edit.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Insert a new element of a registered type into a step.
    AddElement {
        step_id: StepId,
        block_type: BlockType,
        /// Position in the step's element list; appended when `None`.
        at_index: Option<usize>,
        /// Initial content overrides, validated like an update.
        content: Option<Map<String, Value>>,
        /// Initial style overrides on top of the type's default style.
        style: Option<Map<String, Value>>,
        position: Option<Point>,
    },
    RemoveElement {
        element_id: ElementId,
    },
    /// Shallow-merge a partial content patch.
    UpdateContent {
        element_id: ElementId,
        patch: Map<String, Value>,
    },
    /// Shallow-merge a partial style patch.
    UpdateStyle {
        element_id: ElementId,
        patch: Map<String, Value>,
    },
    MoveElement {
        element_id: ElementId,
        position: Point,
    },
    ResizeElement {
        element_id: ElementId,
        size: Size,
    },
    ReorderElement {
        step_id: StepId,
        element_id: ElementId,
        new_index: usize,
    },
    DuplicateElement {
        element_id: ElementId,
    },
    SetElementVisible {
        element_id: ElementId,
        visible: bool,
    },
    SetElementLocked {
        element_id: ElementId,
        locked: bool,
    },
    AddStep {
        name: String,
        at_index: Option<usize>,
    },
    RemoveStep {
        step_id: StepId,
    },
    ReorderStep {
        step_id: StepId,
        new_index: usize,
    },
    RenameStep {
        step_id: StepId,
        name: String,
    },
    UpdateStepSettings {
        step_id: StepId,
        patch: Map<String, Value>,
    },
    DuplicateStep {
        step_id: StepId,
    },
    RenamePage {
        name: String,
        description: Option<String>,
    },
    UpdateSettings {
        patch: Map<String, Value>,
    },
    SetPublished {
        published: bool,
    },
}

impl Command {
    /// Append a default element of `block_type` to a step.
    pub fn add_element(step_id: impl Into<StepId>, block_type: BlockType) -> Self {
        Self::AddElement {
            step_id: step_id.into(),
            block_type,
            at_index: None,
            content: None,
            style: None,
            position: None,
        }
    }

    /// Content update from a JSON object literal. Non-objects become an empty patch.
    pub fn update_content(element_id: impl Into<ElementId>, patch: Value) -> Self {
        Self::UpdateContent {
            element_id: element_id.into(),
            patch: into_map(patch),
        }
    }

    /// Style update from a JSON object literal. Non-objects become an empty patch.
    pub fn update_style(element_id: impl Into<ElementId>, patch: Value) -> Self {
        Self::UpdateStyle {
            element_id: element_id.into(),
            patch: into_map(patch),
        }
    }

    /// Command name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddElement { .. } => "AddElement",
            Self::RemoveElement { .. } => "RemoveElement",
            Self::UpdateContent { .. } => "UpdateContent",
            Self::UpdateStyle { .. } => "UpdateStyle",
            Self::MoveElement { .. } => "MoveElement",
            Self::ResizeElement { .. } => "ResizeElement",
            Self::ReorderElement { .. } => "ReorderElement",
            Self::DuplicateElement { .. } => "DuplicateElement",
            Self::SetElementVisible { .. } => "SetElementVisible",
            Self::SetElementLocked { .. } => "SetElementLocked",
            Self::AddStep { .. } => "AddStep",
            Self::RemoveStep { .. } => "RemoveStep",
            Self::ReorderStep { .. } => "ReorderStep",
            Self::RenameStep { .. } => "RenameStep",
            Self::UpdateStepSettings { .. } => "UpdateStepSettings",
            Self::DuplicateStep { .. } => "DuplicateStep",
            Self::RenamePage { .. } => "RenamePage",
            Self::UpdateSettings { .. } => "UpdateSettings",
            Self::SetPublished { .. } => "SetPublished",
        }
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Id of an entity a command created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Created {
    Element(ElementId),
    Step(StepId),
}

/// What a successful command did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Applied {
    pub created: Option<Created>,
    /// Patch fields that were skipped while the rest was applied.
    pub rejected: Vec<FieldRejection>,
    changed: bool,
}

impl Applied {
    fn changed() -> Self {
        Self {
            changed: true,
            ..Self::default()
        }
    }

    fn unchanged() -> Self {
        Self::default()
    }

    fn with_created(created: Created) -> Self {
        Self {
            created: Some(created),
            ..Self::changed()
        }
    }

    /// Whether the document changed. Unchanged commands leave no history entry.
    pub fn is_change(&self) -> bool {
        self.changed
    }

    pub fn element_id(&self) -> Option<&ElementId> {
        match &self.created {
            Some(Created::Element(id)) => Some(id),
            _ => None,
        }
    }

    pub fn step_id(&self) -> Option<&StepId> {
        match &self.created {
            Some(Created::Step(id)) => Some(id),
            _ => None,
        }
    }
}

/// Everything a command may touch while it runs.
pub(crate) struct CommandContext<'a> {
    pub document: &'a mut PageDocument,
    pub current_step: &'a mut Option<StepId>,
    pub ids: &'a mut IdAllocator,
    pub events: Vec<EditorEvent>,
}

impl<'a> CommandContext<'a> {
    pub fn new(
        document: &'a mut PageDocument,
        current_step: &'a mut Option<StepId>,
        ids: &'a mut IdAllocator,
    ) -> Self {
        Self {
            document,
            current_step,
            ids,
            events: Vec::new(),
        }
    }

    fn element_mut(&mut self, id: &ElementId) -> EditorResult<&mut EditorElement> {
        self.document
            .element_mut(id)
            .ok_or_else(|| EditorError::ElementNotFound(id.clone()))
    }

    /// Element that accepts edits to its content, style or geometry.
    fn unlocked_mut(&mut self, id: &ElementId) -> EditorResult<&mut EditorElement> {
        let element = self.element_mut(id)?;
        if element.locked {
            return Err(EditorError::LockedElement(id.clone()));
        }
        Ok(element)
    }

    fn step_mut(&mut self, id: &StepId) -> EditorResult<&mut EditorStep> {
        self.document
            .step_mut(id)
            .ok_or_else(|| EditorError::StepNotFound(id.clone()))
    }

    fn fresh_element_id(&mut self) -> EditorResult<ElementId> {
        let id = self.ids.next_element_id();
        if self.document.contains_id(id.as_str()) {
            return Err(EditorError::DuplicateId(id.to_string()));
        }
        Ok(id)
    }

    fn fresh_step_id(&mut self) -> EditorResult<StepId> {
        let id = self.ids.next_step_id();
        if self.document.contains_id(id.as_str()) {
            return Err(EditorError::DuplicateId(id.to_string()));
        }
        Ok(id)
    }

    fn snap(&self, position: Point) -> Point {
        let settings = &self.document.settings;
        if settings.snap_to_grid {
            snap::snap_to_grid(position, settings.grid_size).point
        } else {
            position
        }
    }
}

/// Turn a patch outcome into a command result.
///
/// A non-empty patch where nothing was accepted is an error.
fn outcome_to_result(outcome: PatchOutcome) -> EditorResult<Applied> {
    if outcome.applied == 0 {
        return Err(EditorError::InvalidFieldValue(outcome.rejected));
    }
    Ok(Applied {
        rejected: outcome.rejected,
        ..Applied::changed()
    })
}

fn check_position(position: Point) -> EditorResult<()> {
    if position.is_finite() {
        Ok(())
    } else {
        Err(EditorError::InvalidFieldValue(vec![FieldRejection::new(
            "position",
            "coordinates must be finite",
        )]))
    }
}

impl Command {
    /// Run the command against the context's document.
    pub(crate) fn execute(self, ctx: &mut CommandContext<'_>) -> EditorResult<Applied> {
        match self {
            Self::AddElement {
                step_id,
                block_type,
                at_index,
                content,
                style,
                position,
            } => {
                if ctx.document.step(&step_id).is_none() {
                    return Err(EditorError::StepNotFound(step_id));
                }
                let id = ctx.fresh_element_id()?;
                let mut element = EditorElement::new(id.clone(), block_type);
                let mut rejected = Vec::new();
                if let Some(patch) = content {
                    rejected.extend(element.content.apply_patch(&patch).rejected);
                }
                if let Some(patch) = style {
                    rejected.extend(element.style.apply_patch(&patch).rejected);
                }
                if let Some(position) = position {
                    check_position(position)?;
                    element.position = ctx.snap(position);
                }

                ctx.step_mut(&step_id)?.insert(at_index, element);
                if ctx.current_step.is_none() {
                    *ctx.current_step = Some(step_id.clone());
                }
                ctx.events.push(EditorEvent::ElementAdded {
                    step_id,
                    element_id: id.clone(),
                    block_type: block_type.name().to_string(),
                });
                Ok(Applied {
                    rejected,
                    ..Applied::with_created(Created::Element(id))
                })
            }

            Self::RemoveElement { element_id } => {
                let step_id = ctx
                    .document
                    .step_of(&element_id)
                    .ok_or_else(|| EditorError::ElementNotFound(element_id.clone()))?;
                ctx.step_mut(&step_id)?.remove(&element_id);
                ctx.events.push(EditorEvent::ElementDeleted {
                    step_id,
                    element_id,
                });
                Ok(Applied::changed())
            }

            Self::UpdateContent { element_id, patch } => {
                let element = ctx.unlocked_mut(&element_id)?;
                if patch.is_empty() {
                    return Ok(Applied::unchanged());
                }
                outcome_to_result(element.content.apply_patch(&patch))
            }

            Self::UpdateStyle { element_id, patch } => {
                let element = ctx.unlocked_mut(&element_id)?;
                if patch.is_empty() {
                    return Ok(Applied::unchanged());
                }
                outcome_to_result(element.style.apply_patch(&patch))
            }

            Self::MoveElement {
                element_id,
                position,
            } => {
                check_position(position)?;
                let position = ctx.snap(position);
                let element = ctx.unlocked_mut(&element_id)?;
                if element.position == position {
                    return Ok(Applied::unchanged());
                }
                element.position = position;
                Ok(Applied::changed())
            }

            Self::ResizeElement { element_id, size } => {
                if !size.is_finite() {
                    return Err(EditorError::InvalidFieldValue(vec![FieldRejection::new(
                        "size",
                        "dimensions must be finite",
                    )]));
                }
                let element = ctx.unlocked_mut(&element_id)?;
                let patch = into_map(json!({ "width": size.width, "height": size.height }));
                let mut style = element.style.clone();
                let outcome = style.apply_patch(&patch);
                // Both dimensions or neither.
                if !outcome.rejected.is_empty() {
                    return Err(EditorError::InvalidFieldValue(outcome.rejected));
                }
                if style == element.style {
                    return Ok(Applied::unchanged());
                }
                element.style = style;
                Ok(Applied::changed())
            }

            Self::ReorderElement {
                step_id,
                element_id,
                new_index,
            } => {
                let step = ctx.step_mut(&step_id)?;
                let from = step
                    .index_of(&element_id)
                    .ok_or_else(|| EditorError::ElementNotFound(element_id.clone()))?;
                step.reorder(&element_id, new_index);
                if step.index_of(&element_id) == Some(from) {
                    return Ok(Applied::unchanged());
                }
                Ok(Applied::changed())
            }

            Self::DuplicateElement { element_id } => {
                let step_id = ctx
                    .document
                    .step_of(&element_id)
                    .ok_or_else(|| EditorError::ElementNotFound(element_id.clone()))?;
                let id = ctx.fresh_element_id()?;
                let step = ctx.step_mut(&step_id)?;
                let index = step
                    .index_of(&element_id)
                    .ok_or_else(|| EditorError::ElementNotFound(element_id.clone()))?;
                let copy = step.elements[index].duplicate_with_id(id.clone());
                let block_type = copy.content.type_name().to_string();
                step.insert(Some(index + 1), copy);
                ctx.events.push(EditorEvent::ElementAdded {
                    step_id,
                    element_id: id.clone(),
                    block_type,
                });
                Ok(Applied::with_created(Created::Element(id)))
            }

            Self::SetElementVisible {
                element_id,
                visible,
            } => {
                let element = ctx.element_mut(&element_id)?;
                if element.visible == visible {
                    return Ok(Applied::unchanged());
                }
                element.visible = visible;
                Ok(Applied::changed())
            }

            Self::SetElementLocked { element_id, locked } => {
                let element = ctx.element_mut(&element_id)?;
                if element.locked == locked {
                    return Ok(Applied::unchanged());
                }
                element.locked = locked;
                Ok(Applied::changed())
            }

            Self::AddStep { name, at_index } => {
                let id = ctx.fresh_step_id()?;
                let steps = &mut ctx.document.steps;
                let index = at_index.unwrap_or(steps.len()).min(steps.len());
                steps.insert(index, EditorStep::new(id.clone(), name));
                if ctx.current_step.is_none() {
                    *ctx.current_step = Some(id.clone());
                }
                Ok(Applied::with_created(Created::Step(id)))
            }

            Self::RemoveStep { step_id } => {
                let index = ctx
                    .document
                    .step_index(&step_id)
                    .ok_or_else(|| EditorError::StepNotFound(step_id.clone()))?;
                let removed = ctx.document.steps.remove(index);
                for element in &removed.elements {
                    ctx.events.push(EditorEvent::ElementDeleted {
                        step_id: step_id.clone(),
                        element_id: element.id.clone(),
                    });
                }
                if ctx.current_step.as_ref() == Some(&step_id) {
                    // Fall back to the previous step, else the new first one.
                    let steps = &ctx.document.steps;
                    *ctx.current_step = index
                        .checked_sub(1)
                        .and_then(|i| steps.get(i))
                        .or_else(|| steps.first())
                        .map(|s| s.id.clone());
                }
                Ok(Applied::changed())
            }

            Self::ReorderStep { step_id, new_index } => {
                let from = ctx
                    .document
                    .step_index(&step_id)
                    .ok_or_else(|| EditorError::StepNotFound(step_id.clone()))?;
                let steps = &mut ctx.document.steps;
                let to = new_index.min(steps.len() - 1);
                if to == from {
                    return Ok(Applied::unchanged());
                }
                let step = steps.remove(from);
                steps.insert(to, step);
                Ok(Applied::changed())
            }

            Self::RenameStep { step_id, name } => {
                let step = ctx.step_mut(&step_id)?;
                if step.name == name {
                    return Ok(Applied::unchanged());
                }
                step.name = name;
                Ok(Applied::changed())
            }

            Self::UpdateStepSettings { step_id, patch } => {
                let step = ctx.step_mut(&step_id)?;
                if patch.is_empty() {
                    return Ok(Applied::unchanged());
                }
                outcome_to_result(step.settings.apply_patch(&patch))
            }

            Self::DuplicateStep { step_id } => {
                let index = ctx
                    .document
                    .step_index(&step_id)
                    .ok_or_else(|| EditorError::StepNotFound(step_id.clone()))?;
                let source = ctx.document.steps[index].clone();
                let id = ctx.fresh_step_id()?;
                let mut copy = EditorStep::new(id.clone(), format!("{} (Cópia)", source.name));
                copy.settings = source.settings;
                for element in &source.elements {
                    let element_id = ctx.fresh_element_id()?;
                    copy.elements.push(element.duplicate_with_id(element_id.clone()));
                    ctx.events.push(EditorEvent::ElementAdded {
                        step_id: id.clone(),
                        element_id,
                        block_type: element.content.type_name().to_string(),
                    });
                }
                ctx.document.steps.insert(index + 1, copy);
                Ok(Applied::with_created(Created::Step(id)))
            }

            Self::RenamePage { name, description } => {
                let doc = &mut *ctx.document;
                let description = description.unwrap_or_else(|| doc.description.clone());
                if doc.name == name && doc.description == description {
                    return Ok(Applied::unchanged());
                }
                doc.name = name;
                doc.description = description;
                Ok(Applied::changed())
            }

            Self::UpdateSettings { patch } => {
                if patch.is_empty() {
                    return Ok(Applied::unchanged());
                }
                outcome_to_result(ctx.document.settings.apply_patch(&patch))
            }

            Self::SetPublished { published } => {
                if ctx.document.is_published == published {
                    return Ok(Applied::unchanged());
                }
                ctx.document.is_published = published;
                if published {
                    ctx.events.push(EditorEvent::Published {
                        page_id: ctx.document.id.clone(),
                    });
                }
                Ok(Applied::changed())
            }
        }
    }
}
