//! Funnelkit Core Library
//!
//! Platform-agnostic page model, edit protocol and persistence for the
//! Funnelkit marketing-funnel page editor.

pub mod command;
pub mod document;
pub mod editor;
pub mod element;
pub mod error;
pub mod history;
pub mod hooks;
pub mod ids;
pub mod properties;
pub mod registry;
pub mod selection;
pub mod snap;
pub mod step;
pub mod storage;

pub use command::{Applied, Command, Created};
pub use document::{PageDocument, PageSettings, PageSummary, Theme};
pub use editor::{Editor, EditorConfig, RenderItem};
pub use element::{BlockContent, EditorElement, ElementStyle};
pub use error::{EditorError, EditorResult, FieldRejection};
pub use history::{History, Snapshot};
pub use hooks::{EditorEvent, EventHandler, EventHooks};
pub use ids::{ElementId, StepId};
pub use properties::{PropertyField, PropertyTarget};
pub use registry::{BlockType, FieldKind, FieldSpec};
pub use selection::{Selection, SelectionController};
pub use snap::{GRID_SIZE, SnapResult, snap_to_grid};
pub use step::{EditorStep, StepSettings};
pub use storage::{AutoSaveManager, PageStore, Storage, StorageError, StorageResult};
