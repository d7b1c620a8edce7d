//! The page catalog: page documents plus a summary index, laid out on a
//! key-value [`Storage`] backend.

use super::{Storage, StorageError, StorageResult};
use crate::document::{PageDocument, PageSummary};
use crate::ids;
use crate::registry::BlockType;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Prefix of page document keys.
pub const PAGE_KEY_PREFIX: &str = "funnelkit:page:";

/// Key of the summary index.
pub const INDEX_KEY: &str = "funnelkit:index";

/// Storage key of a page document.
pub fn page_key(id: &str) -> String {
    format!("{PAGE_KEY_PREFIX}{id}")
}

type Index = BTreeMap<String, PageSummary>;

/// A difference between a stored document and the current schema.
///
/// Drift is backfilled from defaults on load and only reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaDrift {
    MissingField { path: String },
    UnknownBlockType { path: String, kind: String },
    DuplicateId { id: String, replacement: String },
}

impl fmt::Display for SchemaDrift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { path } => write!(f, "missing {path}, using default"),
            Self::UnknownBlockType { path, kind } => {
                write!(f, "unknown block type '{kind}' at {path}, rendered as placeholder")
            }
            Self::DuplicateId { id, replacement } => {
                write!(f, "duplicate id '{id}', later use renamed to '{replacement}'")
            }
        }
    }
}

const PAGE_FIELDS: &[&str] = &[
    "name",
    "description",
    "lastModified",
    "isPublished",
    "steps",
    "settings",
];
const PAGE_SETTINGS_FIELDS: &[&str] = &["gridSize", "snapToGrid", "showGrid", "theme"];
const STEP_FIELDS: &[&str] = &["elements", "settings"];
const ELEMENT_FIELDS: &[&str] = &["position", "style"];

fn missing(
    object: &serde_json::Map<String, Value>,
    fields: &[&str],
    prefix: &str,
    out: &mut Vec<SchemaDrift>,
) {
    for field in fields {
        if !object.contains_key(*field) {
            out.push(SchemaDrift::MissingField {
                path: format!("{prefix}{field}"),
            });
        }
    }
}

/// Compare a raw page document against the current schema.
pub fn detect_drift(raw: &Value) -> Vec<SchemaDrift> {
    let mut drift = Vec::new();
    let Some(page) = raw.as_object() else {
        return drift;
    };
    missing(page, PAGE_FIELDS, "", &mut drift);
    if let Some(settings) = page.get("settings").and_then(Value::as_object) {
        missing(settings, PAGE_SETTINGS_FIELDS, "settings.", &mut drift);
    }

    let steps = page.get("steps").and_then(Value::as_array);
    for (i, step) in steps.into_iter().flatten().enumerate() {
        let Some(step) = step.as_object() else { continue };
        let step_path = format!("steps[{i}].");
        missing(step, STEP_FIELDS, &step_path, &mut drift);

        let elements = step.get("elements").and_then(Value::as_array);
        for (j, element) in elements.into_iter().flatten().enumerate() {
            let Some(element) = element.as_object() else { continue };
            let element_path = format!("{step_path}elements[{j}]");
            missing(element, ELEMENT_FIELDS, &format!("{element_path}."), &mut drift);
            let kind = element.get("type").and_then(Value::as_str);
            if let Some(kind) = kind.filter(|k| BlockType::from_name(k).is_none()) {
                drift.push(SchemaDrift::UnknownBlockType {
                    path: element_path,
                    kind: kind.to_string(),
                });
            }
        }
    }
    drift
}

/// Check the shape of an imported page before it is deserialized.
fn validate_import_shape(raw: &Value) -> Result<(), String> {
    let page = raw.as_object().ok_or("top level must be an object")?;
    let steps = page
        .get("steps")
        .ok_or("missing steps")?
        .as_array()
        .ok_or("steps must be an array")?;
    for (i, step) in steps.iter().enumerate() {
        let step = step
            .as_object()
            .ok_or_else(|| format!("steps[{i}] must be an object"))?;
        if !step.get("id").is_some_and(Value::is_string) {
            return Err(format!("steps[{i}].id must be a string"));
        }
        let Some(elements) = step.get("elements") else {
            continue;
        };
        let elements = elements
            .as_array()
            .ok_or_else(|| format!("steps[{i}].elements must be an array"))?;
        for (j, element) in elements.iter().enumerate() {
            let path = format!("steps[{i}].elements[{j}]");
            let element = element
                .as_object()
                .ok_or_else(|| format!("{path} must be an object"))?;
            for field in ["id", "type"] {
                if !element.get(field).is_some_and(Value::is_string) {
                    return Err(format!("{path}.{field} must be a string"));
                }
            }
        }
    }
    Ok(())
}

/// Page catalog over a storage backend.
#[derive(Clone)]
pub struct PageStore {
    storage: Arc<dyn Storage>,
}

impl fmt::Debug for PageStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageStore").finish_non_exhaustive()
    }
}

impl PageStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Catalog backed by a fresh [`super::MemoryStorage`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(super::MemoryStorage::new()))
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Write a page and refresh its index entry.
    ///
    /// `lastModified` is written as-is; the editor stamps it on mutation.
    pub fn save(&self, doc: &PageDocument) -> StorageResult<()> {
        self.storage.write(&page_key(&doc.id), &doc.to_json()?)?;

        let mut index = self.read_index()?;
        let mut summary = doc.summary();
        if let Some(previous) = index.get(&doc.id) {
            summary.views = previous.views;
            summary.conversions = previous.conversions;
        }
        index.insert(doc.id.clone(), summary);
        self.write_index(&index)?;
        log::debug!("Saved page {}", doc.id);
        Ok(())
    }

    /// Load a page, backfilling missing fields from defaults.
    pub fn load(&self, id: &str) -> StorageResult<PageDocument> {
        self.load_with_drift(id).map(|(doc, _)| doc)
    }

    /// Load a page and report how it differed from the current schema.
    pub fn load_with_drift(&self, id: &str) -> StorageResult<(PageDocument, Vec<SchemaDrift>)> {
        let json = self
            .storage
            .read(&page_key(id))?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        let mut raw: Value = serde_json::from_str(&json)?;

        let mut drift = detect_drift(&raw);
        if let Value::Object(page) = &mut raw {
            page.entry("id").or_insert_with(|| Value::String(id.to_string()));
        }
        let mut doc: PageDocument = serde_json::from_value(raw)?;
        drift.extend(
            doc.reassign_duplicate_ids()
                .into_iter()
                .map(|(id, replacement)| SchemaDrift::DuplicateId { id, replacement }),
        );
        for entry in &drift {
            log::warn!("Page {}: {}", id, entry);
        }
        Ok((doc, drift))
    }

    /// Replace a page with the built-in funnel template.
    pub fn reset(&self, id: &str) -> StorageResult<PageDocument> {
        let doc = PageDocument::template(id);
        self.save(&doc)?;
        log::info!("Reset page {} to template", id);
        Ok(doc)
    }

    /// Create a page from the template under a fresh id.
    pub fn create(&self, name: &str) -> StorageResult<PageDocument> {
        let mut doc = PageDocument::template(ids::new_page_id());
        doc.name = name.to_string();
        self.save(&doc)?;
        log::info!("Created page {} ({})", doc.id, doc.name);
        Ok(doc)
    }

    /// Copy a page under a fresh id. The copy is unpublished.
    pub fn duplicate(&self, id: &str) -> StorageResult<PageDocument> {
        let source = self.load(id)?;
        let mut copy = source.clone();
        copy.id = ids::new_page_id();
        copy.name = format!("{} (Cópia)", source.name);
        copy.is_published = false;
        copy.touch();
        self.save(&copy)?;
        log::info!("Duplicated page {} as {}", id, copy.id);
        Ok(copy)
    }

    /// Validate and add an exported page to the catalog under a fresh id.
    pub fn import_json(&self, json: &str) -> StorageResult<PageDocument> {
        let raw: Value = serde_json::from_str(json)
            .map_err(|e| StorageError::ImportValidation(format!("not valid JSON: {e}")))?;
        validate_import_shape(&raw).map_err(StorageError::ImportValidation)?;

        let mut doc: PageDocument = match raw {
            Value::Object(mut page) => {
                page.entry("id").or_insert_with(|| Value::String(String::new()));
                serde_json::from_value(Value::Object(page))
                    .map_err(|e| StorageError::ImportValidation(e.to_string()))?
            }
            _ => return Err(StorageError::ImportValidation("top level must be an object".into())),
        };

        let duplicates = doc.duplicate_ids();
        if !duplicates.is_empty() {
            return Err(StorageError::ImportValidation(format!(
                "duplicate ids: {}",
                duplicates.join(", ")
            )));
        }

        doc.id = ids::new_page_id();
        doc.name = format!("{} (Importado)", doc.name);
        doc.is_published = false;
        doc.touch();
        self.save(&doc)?;
        log::info!("Imported page {} ({})", doc.id, doc.name);
        Ok(doc)
    }

    /// Pretty JSON of a page, in the import format.
    pub fn export(&self, doc: &PageDocument) -> StorageResult<String> {
        Ok(doc.to_json()?)
    }

    /// Remove a page and its index entry.
    pub fn delete(&self, id: &str) -> StorageResult<()> {
        let key = page_key(id);
        if !self.storage.exists(&key)? {
            return Err(StorageError::NotFound(id.to_string()));
        }
        self.storage.remove(&key)?;
        let mut index = self.read_index()?;
        if index.remove(id).is_some() {
            self.write_index(&index)?;
        }
        log::info!("Deleted page {}", id);
        Ok(())
    }

    /// Page summaries, most recently modified first.
    pub fn list(&self) -> StorageResult<Vec<PageSummary>> {
        let mut pages: Vec<_> = self.read_index()?.into_values().collect();
        pages.sort_by(|a, b| {
            b.last_modified
                .cmp(&a.last_modified)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(pages)
    }

    /// Regenerate the index from the stored pages. Returns the page count.
    pub fn rebuild_index(&self) -> StorageResult<usize> {
        let index = self.rebuild()?;
        Ok(index.len())
    }

    /// Store view and conversion counters on a page's index entry.
    pub fn record_stats(&self, id: &str, views: u64, conversions: u64) -> StorageResult<()> {
        let mut index = self.read_index()?;
        let entry = index
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        entry.views = Some(views);
        entry.conversions = Some(conversions);
        self.write_index(&index)
    }

    fn read_index(&self) -> StorageResult<Index> {
        let Some(json) = self.storage.read(INDEX_KEY)? else {
            return Ok(Index::new());
        };
        match serde_json::from_str(&json) {
            Ok(index) => Ok(index),
            Err(e) => {
                log::warn!("Page index is unreadable ({}), rebuilding", e);
                self.rebuild()
            }
        }
    }

    fn write_index(&self, index: &Index) -> StorageResult<()> {
        self.storage
            .write(INDEX_KEY, &serde_json::to_string_pretty(index)?)
    }

    fn rebuild(&self) -> StorageResult<Index> {
        let previous: Index = self
            .storage
            .read(INDEX_KEY)?
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default();

        let mut index = Index::new();
        for key in self.storage.keys()? {
            let Some(id) = key.strip_prefix(PAGE_KEY_PREFIX) else {
                continue;
            };
            match self.load(id) {
                Ok(doc) => {
                    let mut summary = doc.summary();
                    if let Some(old) = previous.get(id) {
                        summary.views = old.views;
                        summary.conversions = old.conversions;
                    }
                    index.insert(id.to_string(), summary);
                }
                Err(e) => log::warn!("Skipping page {} while rebuilding index: {}", id, e),
            }
        }
        self.write_index(&index)?;
        log::info!("Rebuilt page index with {} entries", index.len());
        Ok(index)
    }
}
