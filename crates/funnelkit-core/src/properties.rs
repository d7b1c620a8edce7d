//! Properties panel: editable field descriptors for the selected element.

use crate::command::{Applied, Command};
use crate::editor::Editor;
use crate::element::EditorElement;
use crate::error::EditorResult;
use crate::ids::ElementId;
use crate::registry::{self, FieldKind, FieldSpec};
use serde_json::{Map, Value};

/// Which record of the element a field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyTarget {
    Content,
    Style,
}

/// One row of the properties panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyField {
    pub target: PropertyTarget,
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    /// Current value, `Null` when unset.
    pub value: Value,
    /// The element is locked; the field is shown read-only.
    pub locked: bool,
}

fn describe<'a>(
    target: PropertyTarget,
    schema: &'static [FieldSpec],
    values: &'a Map<String, Value>,
    locked: bool,
) -> impl Iterator<Item = PropertyField> + 'a {
    schema.iter().map(move |field| PropertyField {
        target,
        name: field.name,
        label: field.label,
        kind: field.kind,
        value: values.get(field.name).cloned().unwrap_or(Value::Null),
        locked,
    })
}

/// Content fields followed by style fields, in schema order.
pub fn fields(element: &EditorElement) -> Vec<PropertyField> {
    let content = element.content.to_map();
    let style = element.style.to_map();
    describe(PropertyTarget::Content, element.content.schema(), &content, element.locked)
        .chain(describe(PropertyTarget::Style, registry::STYLE_SCHEMA, &style, element.locked))
        .collect()
}

/// Fields of the selected element, or `None` when the panel shows its empty state.
pub fn panel(editor: &Editor) -> Option<Vec<PropertyField>> {
    editor.selected_element().map(fields)
}

/// Write one field through the edit protocol.
pub fn set_field(
    editor: &mut Editor,
    id: &ElementId,
    target: PropertyTarget,
    name: &str,
    value: Value,
) -> EditorResult<Applied> {
    let mut patch = Map::new();
    patch.insert(name.to_string(), value);
    let command = match target {
        PropertyTarget::Content => Command::UpdateContent {
            element_id: id.clone(),
            patch,
        },
        PropertyTarget::Style => Command::UpdateStyle {
            element_id: id.clone(),
            patch,
        },
    };
    editor.apply(command)
}
