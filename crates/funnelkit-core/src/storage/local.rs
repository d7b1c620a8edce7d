//! Browser localStorage backend for WebAssembly.

use super::{Storage, StorageError, StorageResult};
use wasm_bindgen::JsValue;

fn js_error(context: &str, e: JsValue) -> StorageError {
    StorageError::Other(format!("{}: {:?}", context, e))
}

/// localStorage-based storage for WebAssembly.
///
/// Note: This is intentionally not Send/Sync since WASM is single-threaded.
pub struct LocalStorage {
    inner: web_sys::Storage,
}

impl LocalStorage {
    /// Open the window's localStorage.
    pub fn new() -> StorageResult<Self> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Other("No window object".to_string()))?;
        let inner = window
            .local_storage()
            .map_err(|e| js_error("localStorage error", e))?
            .ok_or_else(|| StorageError::Other("localStorage not available".to_string()))?;
        Ok(Self { inner })
    }
}

impl Storage for LocalStorage {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner
            .get_item(key)
            .map_err(|e| js_error("Failed to read", e))
    }

    fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        // Quota errors surface here.
        self.inner
            .set_item(key, value)
            .map_err(|e| js_error("Failed to write", e))
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.inner
            .remove_item(key)
            .map_err(|e| js_error("Failed to delete", e))
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let len = self
            .inner
            .length()
            .map_err(|e| js_error("Failed to list keys", e))?;
        let mut keys = Vec::with_capacity(len as usize);
        for index in 0..len {
            if let Some(key) = self
                .inner
                .key(index)
                .map_err(|e| js_error("Failed to list keys", e))?
            {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}
