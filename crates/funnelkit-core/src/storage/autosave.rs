//! Auto-save functionality for page persistence.
//!
//! Provides throttled saving of the page being edited to prevent data loss.

use super::{PageStore, StorageResult};
use crate::document::PageDocument;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Default auto-save interval in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 2;

/// Key holding the id of the last saved page.
pub const LAST_PAGE_KEY: &str = "funnelkit:last";

/// Manages automatic page persistence.
#[derive(Debug)]
pub struct AutoSaveManager {
    store: PageStore,
    /// Minimum time between two automatic saves.
    interval: Duration,
    last_save: Option<Instant>,
    /// Whether the page has unsaved changes.
    dirty: bool,
}

impl AutoSaveManager {
    /// Create a new auto-save manager writing into `store`.
    pub fn new(store: PageStore) -> Self {
        Self {
            store,
            interval: Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS),
            last_save: None,
            dirty: false,
        }
    }

    /// Builder-style interval override.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the auto-save interval.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Get the auto-save interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Mark the page as having unsaved changes.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Check if the page has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Check if enough time has passed for an auto-save.
    pub fn should_save(&self) -> bool {
        if !self.dirty {
            return false;
        }

        match self.last_save {
            Some(last) => last.elapsed() >= self.interval,
            None => true,
        }
    }

    /// Save the page if needed (dirty + interval elapsed).
    /// Returns true if a save was performed.
    pub fn maybe_save(&mut self, doc: &PageDocument) -> StorageResult<bool> {
        if !self.should_save() {
            return Ok(false);
        }

        self.save(doc)?;
        Ok(true)
    }

    /// Force save the page immediately.
    ///
    /// On failure the page stays dirty so the next attempt retries.
    pub fn save(&mut self, doc: &PageDocument) -> StorageResult<()> {
        self.store.save(doc)?;
        self.store.storage().write(LAST_PAGE_KEY, &doc.id)?;

        self.last_save = Some(Instant::now());
        self.dirty = false;
        Ok(())
    }

    /// Load the last saved page, if any.
    pub fn load_last(&mut self) -> Option<PageDocument> {
        let id = self.store.storage().read(LAST_PAGE_KEY).ok().flatten()?;
        match self.store.load(&id) {
            Ok(doc) => {
                self.dirty = false;
                self.last_save = Some(Instant::now());
                Some(doc)
            }
            Err(e) => {
                log::warn!("Last page {} could not be restored: {}", id, e);
                None
            }
        }
    }

    /// Get the page catalog.
    pub fn store(&self) -> &PageStore {
        &self.store
    }
}
