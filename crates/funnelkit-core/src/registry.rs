//! Element registry: the closed set of block types with their schemas and defaults.
//!
//! Every table here is an exhaustive `match` over [`BlockType`], so adding a
//! block type without a schema or defaults does not compile.

use crate::element::{Choice, ElementStyle};
use crate::error::FieldRejection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Block types an element can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Heading,
    Text,
    Image,
    Video,
    Button,
    Spacer,
    /// Quiz question with a list of choices.
    Options,
    Divider,
    /// Lead-capture form field.
    Input,
}

impl BlockType {
    /// Name used on the wire (`type` field of a persisted element).
    pub fn name(&self) -> &'static str {
        match self {
            BlockType::Heading => "heading",
            BlockType::Text => "text",
            BlockType::Image => "image",
            BlockType::Video => "video",
            BlockType::Button => "button",
            BlockType::Spacer => "spacer",
            BlockType::Options => "options",
            BlockType::Divider => "divider",
            BlockType::Input => "input",
        }
    }

    /// Parse a wire name. Returns `None` for unknown types.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|t| t.name() == name)
    }

    /// Get all block types in palette order.
    pub fn all() -> &'static [BlockType] {
        &[
            BlockType::Heading,
            BlockType::Text,
            BlockType::Image,
            BlockType::Video,
            BlockType::Button,
            BlockType::Spacer,
            BlockType::Options,
            BlockType::Divider,
            BlockType::Input,
        ]
    }
}

/// Kind of an editable field, with bounds where applicable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Text,
    RichText,
    /// Absolute http(s)/mailto/tel/data URL, a site-relative path, or empty.
    Url,
    /// `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa` or `transparent`.
    Color,
    Enum(&'static [&'static str]),
    Number { min: f64, max: f64 },
    ChoiceList,
    Boolean,
    /// Arbitrary JSON, stored as-is.
    Json,
}

/// A named field in a schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Key in the content/style map.
    pub name: &'static str,
    /// Label shown by the properties panel.
    pub label: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self { name, label, kind }
    }

    /// Check a value against this field's kind and bounds.
    pub fn validate(&self, value: &Value) -> Result<(), FieldRejection> {
        let reject = |reason: String| -> Result<(), FieldRejection> {
            Err(FieldRejection::new(self.name, reason))
        };
        match self.kind {
            FieldKind::Text | FieldKind::RichText => match value {
                Value::String(_) => Ok(()),
                _ => reject("expected a string".into()),
            },
            FieldKind::Url => match value.as_str() {
                Some(s) if is_valid_url(s) => Ok(()),
                Some(s) => reject(format!("invalid URL '{}'", s)),
                None => reject("expected a URL string".into()),
            },
            FieldKind::Color => match value.as_str() {
                Some(s) if is_valid_color(s) => Ok(()),
                Some(s) => reject(format!("invalid color '{}'", s)),
                None => reject("expected a color string".into()),
            },
            FieldKind::Enum(options) => match value.as_str() {
                Some(s) if options.contains(&s) => Ok(()),
                Some(s) => reject(format!("'{}' is not one of {}", s, options.join(", "))),
                None => reject("expected a string".into()),
            },
            FieldKind::Number { min, max } => match value.as_f64() {
                Some(n) if n.is_finite() && n >= min && n <= max => Ok(()),
                Some(_) => reject(format!("must be between {} and {}", min, max)),
                None => reject("expected a number".into()),
            },
            FieldKind::ChoiceList => validate_choices(value).or_else(reject),
            FieldKind::Boolean => match value {
                Value::Bool(_) => Ok(()),
                _ => reject("expected a boolean".into()),
            },
            FieldKind::Json => Ok(()),
        }
    }
}

fn validate_choices(value: &Value) -> Result<(), String> {
    let choices: Vec<Choice> = serde_json::from_value(value.clone())
        .map_err(|e| format!("expected a list of choices: {}", e))?;
    let mut ids = std::collections::HashSet::new();
    for choice in &choices {
        if choice.id.is_empty() {
            return Err("choice id must not be empty".into());
        }
        if !ids.insert(choice.id.as_str()) {
            return Err(format!("duplicate choice id '{}'", choice.id));
        }
    }
    Ok(())
}

fn is_valid_url(s: &str) -> bool {
    if s.is_empty() || s.starts_with('/') || s.starts_with('#') {
        return true;
    }
    match url::Url::parse(s) {
        Ok(url) => matches!(url.scheme(), "http" | "https" | "mailto" | "tel" | "data"),
        Err(_) => false,
    }
}

fn is_valid_color(s: &str) -> bool {
    if s == "transparent" {
        return true;
    }
    match s.strip_prefix('#') {
        Some(hex) => {
            matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

/// Result of merging a partial patch into a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchOutcome {
    /// Number of fields written.
    pub applied: usize,
    /// Fields left untouched because they failed validation.
    pub rejected: Vec<FieldRejection>,
}

/// Validate `patch` against `schema` and shallow-merge accepted fields into `target`.
///
/// A `null` value restores the key from `defaults`, or removes it when no
/// default exists. Keys outside the schema are rejected.
pub fn merge_patch(
    target: &mut Map<String, Value>,
    schema: &'static [FieldSpec],
    patch: &Map<String, Value>,
    defaults: Option<&Map<String, Value>>,
) -> PatchOutcome {
    let mut outcome = PatchOutcome::default();
    for (key, value) in patch {
        let Some(field) = find_field(schema, key) else {
            outcome
                .rejected
                .push(FieldRejection::new(key.as_str(), "unknown field"));
            continue;
        };
        if value.is_null() {
            match defaults.and_then(|d| d.get(key)) {
                Some(default) => target.insert(key.clone(), default.clone()),
                None => target.remove(key),
            };
            outcome.applied += 1;
            continue;
        }
        match field.validate(value) {
            Ok(()) => {
                target.insert(key.clone(), value.clone());
                outcome.applied += 1;
            }
            Err(rejection) => outcome.rejected.push(rejection),
        }
    }
    outcome
}

/// Serialize a record into its JSON field map.
pub(crate) fn to_map<T: Serialize>(record: &T) -> Map<String, Value> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Apply a validated partial patch to a typed record.
///
/// The record is only replaced when at least one field was accepted and the
/// merged map still deserializes.
pub(crate) fn patch_record<T: Serialize + DeserializeOwned>(
    record: &mut T,
    schema: &'static [FieldSpec],
    patch: &Map<String, Value>,
    defaults: Option<&Map<String, Value>>,
) -> PatchOutcome {
    let mut map = to_map(record);
    let mut outcome = merge_patch(&mut map, schema, patch, defaults);
    if outcome.applied == 0 {
        return outcome;
    }
    match serde_json::from_value(Value::Object(map)) {
        Ok(updated) => *record = updated,
        Err(e) => {
            outcome.rejected.extend(
                patch
                    .keys()
                    .map(|key| FieldRejection::new(key.as_str(), e.to_string())),
            );
            outcome.applied = 0;
        }
    }
    outcome
}

/// Find a field by name.
pub fn find_field(schema: &'static [FieldSpec], name: &str) -> Option<&'static FieldSpec> {
    schema.iter().find(|f| f.name == name)
}

const HEADING_LEVELS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];
const BUTTON_ACTIONS: &[&str] = &["next-step", "url", "submit"];
const INPUT_TYPES: &[&str] = &["text", "email", "phone", "number"];
const FONT_WEIGHTS: &[&str] = &["normal", "medium", "semibold", "bold"];
const TEXT_ALIGNS: &[&str] = &["left", "center", "right", "justify"];
const THEMES: &[&str] = &["light", "dark"];

pub const FONT_SIZE_MIN: f64 = 10.0;
pub const FONT_SIZE_MAX: f64 = 72.0;
/// Upper bound for element width and height.
pub const MAX_DIMENSION: f64 = 4000.0;

const HEADING_SCHEMA: &[FieldSpec] = &[
    FieldSpec::new("text", "Text", FieldKind::Text),
    FieldSpec::new("level", "Level", FieldKind::Enum(HEADING_LEVELS)),
];

const TEXT_SCHEMA: &[FieldSpec] = &[FieldSpec::new("text", "Text", FieldKind::RichText)];

const IMAGE_SCHEMA: &[FieldSpec] = &[
    FieldSpec::new("src", "Image URL", FieldKind::Url),
    FieldSpec::new("alt", "Alt text", FieldKind::Text),
];

const VIDEO_SCHEMA: &[FieldSpec] = &[
    FieldSpec::new("url", "Video URL", FieldKind::Url),
    FieldSpec::new("autoplay", "Autoplay", FieldKind::Boolean),
];

const BUTTON_SCHEMA: &[FieldSpec] = &[
    FieldSpec::new("text", "Label", FieldKind::Text),
    FieldSpec::new("action", "Action", FieldKind::Enum(BUTTON_ACTIONS)),
    FieldSpec::new("url", "Link", FieldKind::Url),
];

const SPACER_SCHEMA: &[FieldSpec] = &[FieldSpec::new(
    "height",
    "Height",
    FieldKind::Number { min: 0.0, max: 400.0 },
)];

const OPTIONS_SCHEMA: &[FieldSpec] = &[
    FieldSpec::new("question", "Question", FieldKind::Text),
    FieldSpec::new("choices", "Choices", FieldKind::ChoiceList),
    FieldSpec::new("multiple", "Allow multiple", FieldKind::Boolean),
];

const DIVIDER_SCHEMA: &[FieldSpec] = &[FieldSpec::new(
    "thickness",
    "Thickness",
    FieldKind::Number { min: 1.0, max: 20.0 },
)];

const INPUT_SCHEMA: &[FieldSpec] = &[
    FieldSpec::new("label", "Label", FieldKind::Text),
    FieldSpec::new("placeholder", "Placeholder", FieldKind::Text),
    FieldSpec::new("inputType", "Input type", FieldKind::Enum(INPUT_TYPES)),
    FieldSpec::new("required", "Required", FieldKind::Boolean),
];

/// Schema used for elements whose type is not in the registry.
pub const PLACEHOLDER_SCHEMA: &[FieldSpec] = &[FieldSpec::new("text", "Text", FieldKind::Text)];

/// Style fields shared by every block type.
pub const STYLE_SCHEMA: &[FieldSpec] = &[
    FieldSpec::new("color", "Text color", FieldKind::Color),
    FieldSpec::new("backgroundColor", "Background", FieldKind::Color),
    FieldSpec::new(
        "fontSize",
        "Font size",
        FieldKind::Number {
            min: FONT_SIZE_MIN,
            max: FONT_SIZE_MAX,
        },
    ),
    FieldSpec::new("fontWeight", "Font weight", FieldKind::Enum(FONT_WEIGHTS)),
    FieldSpec::new("textAlign", "Alignment", FieldKind::Enum(TEXT_ALIGNS)),
    FieldSpec::new("padding", "Padding", FieldKind::Number { min: 0.0, max: 200.0 }),
    FieldSpec::new("margin", "Margin", FieldKind::Number { min: 0.0, max: 200.0 }),
    FieldSpec::new(
        "borderRadius",
        "Corner radius",
        FieldKind::Number { min: 0.0, max: 100.0 },
    ),
    FieldSpec::new("opacity", "Opacity", FieldKind::Number { min: 0.0, max: 1.0 }),
    FieldSpec::new(
        "width",
        "Width",
        FieldKind::Number {
            min: 0.0,
            max: MAX_DIMENSION,
        },
    ),
    FieldSpec::new(
        "height",
        "Height",
        FieldKind::Number {
            min: 0.0,
            max: MAX_DIMENSION,
        },
    ),
    FieldSpec::new("customCss", "Custom CSS", FieldKind::Text),
];

/// Page-level settings.
pub const PAGE_SETTINGS_SCHEMA: &[FieldSpec] = &[
    FieldSpec::new("gridSize", "Grid size", FieldKind::Number { min: 1.0, max: 200.0 }),
    FieldSpec::new("snapToGrid", "Snap to grid", FieldKind::Boolean),
    FieldSpec::new("showGrid", "Show grid", FieldKind::Boolean),
    FieldSpec::new("theme", "Theme", FieldKind::Enum(THEMES)),
];

/// Step-level settings.
pub const STEP_SETTINGS_SCHEMA: &[FieldSpec] = &[
    FieldSpec::new("showProgress", "Show progress", FieldKind::Boolean),
    FieldSpec::new("allowReturn", "Allow going back", FieldKind::Boolean),
    FieldSpec::new("questionData", "Question data", FieldKind::Json),
];

/// Registry entry for a block type.
#[derive(Debug, Clone, Copy)]
pub struct BlockSpec {
    pub block_type: BlockType,
    /// Palette label.
    pub label: &'static str,
    pub content_schema: &'static [FieldSpec],
}

/// Look up the registry entry for a block type.
pub fn spec(block_type: BlockType) -> BlockSpec {
    let (label, content_schema) = match block_type {
        BlockType::Heading => ("Heading", HEADING_SCHEMA),
        BlockType::Text => ("Text", TEXT_SCHEMA),
        BlockType::Image => ("Image", IMAGE_SCHEMA),
        BlockType::Video => ("Video", VIDEO_SCHEMA),
        BlockType::Button => ("Button", BUTTON_SCHEMA),
        BlockType::Spacer => ("Spacer", SPACER_SCHEMA),
        BlockType::Options => ("Question", OPTIONS_SCHEMA),
        BlockType::Divider => ("Divider", DIVIDER_SCHEMA),
        BlockType::Input => ("Form field", INPUT_SCHEMA),
    };
    BlockSpec {
        block_type,
        label,
        content_schema,
    }
}

/// Content schema for a block type, or the placeholder schema when unknown.
pub fn content_schema(block_type: Option<BlockType>) -> &'static [FieldSpec] {
    match block_type {
        Some(t) => spec(t).content_schema,
        None => PLACEHOLDER_SCHEMA,
    }
}

/// Default style applied to a freshly created element.
pub fn default_style(block_type: BlockType) -> ElementStyle {
    let color = |c: &str| Some(c.to_string());
    match block_type {
        BlockType::Heading => ElementStyle {
            color: color("#111827"),
            font_size: Some(32.0),
            font_weight: Some("bold".into()),
            text_align: Some("center".into()),
            ..Default::default()
        },
        BlockType::Text => ElementStyle {
            color: color("#374151"),
            font_size: Some(16.0),
            text_align: Some("left".into()),
            ..Default::default()
        },
        BlockType::Image => ElementStyle {
            width: Some(320.0),
            border_radius: Some(8.0),
            ..Default::default()
        },
        BlockType::Video => ElementStyle {
            width: Some(560.0),
            height: Some(315.0),
            ..Default::default()
        },
        BlockType::Button => ElementStyle {
            color: color("#ffffff"),
            background_color: color("#2563eb"),
            font_size: Some(18.0),
            font_weight: Some("semibold".into()),
            text_align: Some("center".into()),
            padding: Some(12.0),
            border_radius: Some(8.0),
            ..Default::default()
        },
        BlockType::Spacer => ElementStyle::default(),
        BlockType::Options => ElementStyle {
            font_size: Some(16.0),
            ..Default::default()
        },
        BlockType::Divider => ElementStyle {
            color: color("#e5e7eb"),
            margin: Some(16.0),
            ..Default::default()
        },
        BlockType::Input => ElementStyle {
            font_size: Some(16.0),
            padding: Some(10.0),
            border_radius: Some(6.0),
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_type_names_round_trip() {
        for &t in BlockType::all() {
            assert_eq!(BlockType::from_name(t.name()), Some(t));
            let wire = serde_json::to_value(t).unwrap();
            assert_eq!(wire, json!(t.name()));
        }
        assert_eq!(BlockType::from_name("carousel"), None);
    }

    #[test]
    fn test_font_size_bounds() {
        let field = find_field(STYLE_SCHEMA, "fontSize").unwrap();
        assert!(field.validate(&json!(10)).is_ok());
        assert!(field.validate(&json!(72.0)).is_ok());
        assert!(field.validate(&json!(9.5)).is_err());
        assert!(field.validate(&json!(73)).is_err());
        assert!(field.validate(&json!("16px")).is_err());
    }

    #[test]
    fn test_opacity_bounds() {
        let field = find_field(STYLE_SCHEMA, "opacity").unwrap();
        assert!(field.validate(&json!(0.5)).is_ok());
        let err = field.validate(&json!(1.5)).unwrap_err();
        assert_eq!(err.field, "opacity");
    }

    #[test]
    fn test_url_validation() {
        let field = find_field(IMAGE_SCHEMA, "src").unwrap();
        assert!(field.validate(&json!("")).is_ok());
        assert!(field.validate(&json!("https://cdn.example.com/a.png")).is_ok());
        assert!(field.validate(&json!("/uploads/a.png")).is_ok());
        assert!(field.validate(&json!("javascript:alert(1)")).is_err());
        assert!(field.validate(&json!("not a url")).is_err());
    }

    #[test]
    fn test_color_validation() {
        let field = find_field(STYLE_SCHEMA, "color").unwrap();
        assert!(field.validate(&json!("#fff")).is_ok());
        assert!(field.validate(&json!("#2563eb")).is_ok());
        assert!(field.validate(&json!("#2563ebcc")).is_ok());
        assert!(field.validate(&json!("transparent")).is_ok());
        assert!(field.validate(&json!("#12345")).is_err());
        assert!(field.validate(&json!("blue")).is_err());
    }

    #[test]
    fn test_enum_validation() {
        let field = find_field(HEADING_SCHEMA, "level").unwrap();
        assert!(field.validate(&json!("h1")).is_ok());
        assert!(field.validate(&json!("h7")).is_err());
    }

    #[test]
    fn test_choice_list_rejects_duplicate_ids() {
        let field = find_field(OPTIONS_SCHEMA, "choices").unwrap();
        let ok = json!([{"id": "a", "label": "Sim"}, {"id": "b", "label": "Não"}]);
        let dup = json!([{"id": "a", "label": "Sim"}, {"id": "a", "label": "Não"}]);
        assert!(field.validate(&ok).is_ok());
        assert!(field.validate(&dup).is_err());
        assert!(field.validate(&json!("Sim")).is_err());
    }

    #[test]
    fn test_every_type_has_schema() {
        for &t in BlockType::all() {
            assert!(!spec(t).content_schema.is_empty());
        }
        assert_eq!(content_schema(None), PLACEHOLDER_SCHEMA);
    }
}
