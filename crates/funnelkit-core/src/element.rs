//! Page elements: typed content records, style and placement.

use crate::error::FieldRejection;
use crate::ids::ElementId;
use crate::registry::{self, BlockType, FieldSpec, PatchOutcome};
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Heading level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingLevel {
    H1,
    #[default]
    H2,
    H3,
    H4,
    H5,
    H6,
}

/// What a button does when clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ButtonAction {
    /// Advance to the next step of the funnel.
    #[default]
    NextStep,
    /// Open the button's `url`.
    Url,
    /// Submit the lead-capture form of the step.
    Submit,
}

/// Kind of a form input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    #[default]
    Email,
    Phone,
    Number,
}

/// One answer of a quiz question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub label: String,
    /// Value reported to the result logic; defaults to the label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Choice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            value: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadingContent {
    pub text: String,
    pub level: HeadingLevel,
}

impl Default for HeadingContent {
    fn default() -> Self {
        Self {
            text: "Título".to_string(),
            level: HeadingLevel::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextContent {
    /// Rich text (inline HTML subset, rendered by the page renderer).
    pub text: String,
}

impl Default for TextContent {
    fn default() -> Self {
        Self {
            text: "Digite seu texto aqui".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageContent {
    pub src: String,
    pub alt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoContent {
    pub url: String,
    pub autoplay: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonContent {
    pub text: String,
    pub action: ButtonAction,
    pub url: String,
}

impl Default for ButtonContent {
    fn default() -> Self {
        Self {
            text: "Clique aqui".to_string(),
            action: ButtonAction::default(),
            url: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacerContent {
    pub height: f64,
}

impl Default for SpacerContent {
    fn default() -> Self {
        Self { height: 32.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsContent {
    pub question: String,
    pub choices: Vec<Choice>,
    pub multiple: bool,
}

impl Default for OptionsContent {
    fn default() -> Self {
        Self {
            question: "Qual é a sua resposta?".to_string(),
            choices: vec![Choice::new("a", "Opção A"), Choice::new("b", "Opção B")],
            multiple: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DividerContent {
    pub thickness: f64,
}

impl Default for DividerContent {
    fn default() -> Self {
        Self { thickness: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InputContent {
    pub label: String,
    pub placeholder: String,
    pub input_type: InputType,
    pub required: bool,
}

impl Default for InputContent {
    fn default() -> Self {
        Self {
            label: "Seu e-mail".to_string(),
            placeholder: "voce@exemplo.com".to_string(),
            input_type: InputType::default(),
            required: true,
        }
    }
}

/// Element content, one variant per block type.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockContent {
    Heading(HeadingContent),
    Text(TextContent),
    Image(ImageContent),
    Video(VideoContent),
    Button(ButtonContent),
    Spacer(SpacerContent),
    Options(OptionsContent),
    Divider(DividerContent),
    Input(InputContent),
    /// A type this registry does not know. Rendered as a placeholder; the
    /// original fields are kept so the document round-trips unchanged.
    Unknown {
        kind: String,
        fields: Map<String, Value>,
    },
}

impl BlockContent {
    /// Registry default content for a block type.
    pub fn default_for(block_type: BlockType) -> Self {
        match block_type {
            BlockType::Heading => Self::Heading(HeadingContent::default()),
            BlockType::Text => Self::Text(TextContent::default()),
            BlockType::Image => Self::Image(ImageContent::default()),
            BlockType::Video => Self::Video(VideoContent::default()),
            BlockType::Button => Self::Button(ButtonContent::default()),
            BlockType::Spacer => Self::Spacer(SpacerContent::default()),
            BlockType::Options => Self::Options(OptionsContent::default()),
            BlockType::Divider => Self::Divider(DividerContent::default()),
            BlockType::Input => Self::Input(InputContent::default()),
        }
    }

    /// Build content from a persisted type name and field map.
    ///
    /// Missing fields keep their registry defaults. Fields that fail
    /// validation are dropped and returned as drift.
    pub fn from_parts(type_name: &str, fields: Map<String, Value>) -> (Self, Vec<FieldRejection>) {
        match BlockType::from_name(type_name) {
            Some(block_type) => {
                let mut content = Self::default_for(block_type);
                let outcome = content.apply_patch(&fields);
                (content, outcome.rejected)
            }
            None => (
                Self::Unknown {
                    kind: type_name.to_string(),
                    fields,
                },
                Vec::new(),
            ),
        }
    }

    /// The block type, or `None` for placeholder content.
    pub fn block_type(&self) -> Option<BlockType> {
        match self {
            Self::Heading(_) => Some(BlockType::Heading),
            Self::Text(_) => Some(BlockType::Text),
            Self::Image(_) => Some(BlockType::Image),
            Self::Video(_) => Some(BlockType::Video),
            Self::Button(_) => Some(BlockType::Button),
            Self::Spacer(_) => Some(BlockType::Spacer),
            Self::Options(_) => Some(BlockType::Options),
            Self::Divider(_) => Some(BlockType::Divider),
            Self::Input(_) => Some(BlockType::Input),
            Self::Unknown { .. } => None,
        }
    }

    /// Wire name of the type.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Unknown { kind, .. } => kind,
            _ => self.block_type().map(|t| t.name()).unwrap_or_default(),
        }
    }

    /// Content schema from the registry.
    pub fn schema(&self) -> &'static [FieldSpec] {
        registry::content_schema(self.block_type())
    }

    /// Content as a JSON field map (the shape the renderer receives).
    pub fn to_map(&self) -> Map<String, Value> {
        match self {
            Self::Heading(c) => registry::to_map(c),
            Self::Text(c) => registry::to_map(c),
            Self::Image(c) => registry::to_map(c),
            Self::Video(c) => registry::to_map(c),
            Self::Button(c) => registry::to_map(c),
            Self::Spacer(c) => registry::to_map(c),
            Self::Options(c) => registry::to_map(c),
            Self::Divider(c) => registry::to_map(c),
            Self::Input(c) => registry::to_map(c),
            Self::Unknown { fields, .. } => fields.clone(),
        }
    }

    /// Read a single field.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.to_map().remove(key)
    }

    /// Shallow-merge a partial patch, validating each key against the schema.
    ///
    /// `null` resets a field to its registry default.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> PatchOutcome {
        let schema = self.schema();
        let defaults = self
            .block_type()
            .map(|t| Self::default_for(t).to_map())
            .unwrap_or_default();
        match self {
            Self::Heading(c) => registry::patch_record(c, schema, patch, Some(&defaults)),
            Self::Text(c) => registry::patch_record(c, schema, patch, Some(&defaults)),
            Self::Image(c) => registry::patch_record(c, schema, patch, Some(&defaults)),
            Self::Video(c) => registry::patch_record(c, schema, patch, Some(&defaults)),
            Self::Button(c) => registry::patch_record(c, schema, patch, Some(&defaults)),
            Self::Spacer(c) => registry::patch_record(c, schema, patch, Some(&defaults)),
            Self::Options(c) => registry::patch_record(c, schema, patch, Some(&defaults)),
            Self::Divider(c) => registry::patch_record(c, schema, patch, Some(&defaults)),
            Self::Input(c) => registry::patch_record(c, schema, patch, Some(&defaults)),
            Self::Unknown { fields, .. } => registry::merge_patch(fields, schema, patch, None),
        }
    }
}

/// Visual properties of an element. Every field is optional; unset fields
/// fall back to the renderer's theme.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Free-form CSS appended by the renderer. Not validated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_css: Option<String>,
}

impl ElementStyle {
    /// Shallow-merge a partial patch. `null` clears a field.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> PatchOutcome {
        registry::patch_record(self, registry::STYLE_SCHEMA, patch, None)
    }

    /// Style as a JSON field map; unset fields are omitted.
    pub fn to_map(&self) -> Map<String, Value> {
        registry::to_map(self)
    }

    /// Explicit size, when both dimensions are set.
    pub fn size(&self) -> Option<Size> {
        Some(Size::new(self.width?, self.height?))
    }
}

/// A single editable block on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawElement", into = "RawElement")]
pub struct EditorElement {
    pub(crate) id: ElementId,
    pub content: BlockContent,
    pub style: ElementStyle,
    /// Canvas coordinates of the top-left corner.
    pub position: Point,
    pub visible: bool,
    /// Locked elements reject content, style, move and resize edits.
    pub locked: bool,
}

impl EditorElement {
    /// Create an element populated from the registry defaults.
    pub fn new(id: ElementId, block_type: BlockType) -> Self {
        Self {
            id,
            content: BlockContent::default_for(block_type),
            style: registry::default_style(block_type),
            position: Point::ZERO,
            visible: true,
            locked: false,
        }
    }

    pub fn id(&self) -> &ElementId {
        &self.id
    }

    pub fn block_type(&self) -> Option<BlockType> {
        self.content.block_type()
    }

    /// True when the type is not in the registry.
    pub fn is_placeholder(&self) -> bool {
        self.block_type().is_none()
    }

    /// Deep copy with a new id.
    pub fn duplicate_with_id(&self, id: ElementId) -> Self {
        Self {
            id,
            ..self.clone()
        }
    }
}

/// Wire representation of an element.
#[derive(Serialize, Deserialize)]
struct RawElement {
    id: ElementId,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    style: Option<Map<String, Value>>,
    #[serde(default = "origin")]
    position: Point,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default)]
    locked: bool,
}

fn origin() -> Point {
    Point::ZERO
}

fn default_true() -> bool {
    true
}

impl From<RawElement> for EditorElement {
    fn from(raw: RawElement) -> Self {
        let (content, content_drift) = BlockContent::from_parts(&raw.kind, raw.content);
        for rejection in &content_drift {
            log::warn!("Element {}: dropped content field {}", raw.id, rejection);
        }

        let style = match (raw.style, content.block_type()) {
            (Some(fields), _) => {
                let mut style = ElementStyle::default();
                let outcome = style.apply_patch(&fields);
                for rejection in &outcome.rejected {
                    log::warn!("Element {}: dropped style field {}", raw.id, rejection);
                }
                style
            }
            (None, Some(block_type)) => registry::default_style(block_type),
            (None, None) => ElementStyle::default(),
        };

        Self {
            id: raw.id,
            content,
            style,
            position: raw.position,
            visible: raw.visible,
            locked: raw.locked,
        }
    }
}

impl From<EditorElement> for RawElement {
    fn from(element: EditorElement) -> Self {
        Self {
            kind: element.content.type_name().to_string(),
            content: element.content.to_map(),
            style: Some(element.style.to_map()),
            id: element.id,
            position: element.position,
            visible: element.visible,
            locked: element.locked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("patch must be an object"),
        }
    }

    #[test]
    fn test_new_element_uses_registry_defaults() {
        let el = EditorElement::new(ElementId::from("b1"), BlockType::Button);
        assert_eq!(el.content.get("text"), Some(json!("Clique aqui")));
        assert_eq!(el.content.get("action"), Some(json!("next-step")));
        assert_eq!(el.style.background_color.as_deref(), Some("#2563eb"));
        assert!(el.visible);
        assert!(!el.locked);
    }

    #[test]
    fn test_content_patch_merges_fields() {
        let mut content = BlockContent::default_for(BlockType::Heading);
        content.apply_patch(&patch(json!({"text": "Oferta"})));
        content.apply_patch(&patch(json!({"level": "h1"})));
        assert_eq!(content.get("text"), Some(json!("Oferta")));
        assert_eq!(content.get("level"), Some(json!("h1")));
    }

    #[test]
    fn test_content_patch_rejects_only_bad_field() {
        let mut content = BlockContent::default_for(BlockType::Heading);
        let outcome = content.apply_patch(&patch(json!({"text": "Novo", "level": "h9"})));
        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].field, "level");
        assert_eq!(content.get("text"), Some(json!("Novo")));
        assert_eq!(content.get("level"), Some(json!("h2")));
    }

    #[test]
    fn test_content_patch_rejects_unknown_key() {
        let mut content = BlockContent::default_for(BlockType::Text);
        let outcome = content.apply_patch(&patch(json!({"src": "https://x.y/z.png"})));
        assert_eq!(outcome.applied, 0);
        assert_eq!(outcome.rejected[0].field, "src");
    }

    #[test]
    fn test_null_resets_content_to_default() {
        let mut content = BlockContent::default_for(BlockType::Spacer);
        content.apply_patch(&patch(json!({"height": 120})));
        assert_eq!(content.get("height"), Some(json!(120.0)));
        content.apply_patch(&patch(json!({"height": null})));
        assert_eq!(content.get("height"), Some(json!(32.0)));
    }

    #[test]
    fn test_style_patch_merges_and_clears() {
        let mut style = ElementStyle::default();
        style.apply_patch(&patch(json!({"color": "#ff0000"})));
        style.apply_patch(&patch(json!({"fontSize": 24})));
        assert_eq!(style.color.as_deref(), Some("#ff0000"));
        assert_eq!(style.font_size, Some(24.0));

        style.apply_patch(&patch(json!({"color": null})));
        assert_eq!(style.color, None);
        assert_eq!(style.font_size, Some(24.0));
    }

    #[test]
    fn test_style_font_size_out_of_range() {
        let mut style = ElementStyle::default();
        let outcome = style.apply_patch(&patch(json!({"fontSize": 100, "opacity": 0.4})));
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].field, "fontSize");
        assert_eq!(style.font_size, None);
        assert_eq!(style.opacity, Some(0.4));
    }

    #[test]
    fn test_element_wire_shape() {
        let mut el = EditorElement::new(ElementId::from("h1"), BlockType::Heading);
        el.position = Point::new(10.0, 20.0);
        let value = serde_json::to_value(&el).unwrap();
        assert_eq!(value["id"], json!("h1"));
        assert_eq!(value["type"], json!("heading"));
        assert_eq!(value["content"]["text"], json!("Título"));
        assert_eq!(value["style"]["fontSize"], json!(32.0));
        assert_eq!(value["position"], json!({"x": 10.0, "y": 20.0}));

        let back: EditorElement = serde_json::from_value(value).unwrap();
        assert_eq!(back, el);
    }

    #[test]
    fn test_unknown_type_loads_as_placeholder() {
        let value = json!({
            "id": "c1",
            "type": "countdown",
            "content": {"deadline": "2026-12-01", "text": "Acaba em"}
        });
        let el: EditorElement = serde_json::from_value(value).unwrap();
        assert!(el.is_placeholder());
        assert_eq!(el.content.type_name(), "countdown");
        assert_eq!(el.content.schema(), registry::PLACEHOLDER_SCHEMA);

        let again = serde_json::to_value(&el).unwrap();
        assert_eq!(again["type"], json!("countdown"));
        assert_eq!(again["content"]["deadline"], json!("2026-12-01"));
    }

    #[test]
    fn test_missing_content_fields_backfilled() {
        let value = json!({"id": "i1", "type": "input", "content": {"label": "Nome"}});
        let el: EditorElement = serde_json::from_value(value).unwrap();
        assert_eq!(el.content.get("label"), Some(json!("Nome")));
        assert_eq!(el.content.get("inputType"), Some(json!("email")));
        assert_eq!(el.content.get("required"), Some(json!(true)));
        assert_eq!(el.style, registry::default_style(BlockType::Input));
    }

    #[test]
    fn test_invalid_persisted_field_dropped() {
        let value = json!({
            "id": "s1",
            "type": "spacer",
            "content": {"height": 9000},
            "style": {"opacity": 0.5, "fontSize": 500}
        });
        let el: EditorElement = serde_json::from_value(value).unwrap();
        assert_eq!(el.content.get("height"), Some(json!(32.0)));
        assert_eq!(el.style.opacity, Some(0.5));
        assert_eq!(el.style.font_size, None);
    }
}
