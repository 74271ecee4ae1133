//! Browser `localStorage`

use wasm_bindgen::JsValue;

use super::{CartStorage, StorageError};

/// Storage backed by the window's `localStorage`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    storage: web_sys::Storage,
}

impl LocalStorage {
    /// Open the current window's `localStorage`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] if there is no window or storage
    /// access is denied (private browsing, sandboxed frames).
    pub fn open() -> Result<Self, StorageError> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("window is unavailable".to_string()))?;

        let storage = window
            .local_storage()
            .map_err(|error| unavailable(&error, "localStorage access was denied"))?
            .ok_or_else(|| StorageError::Unavailable("localStorage is unavailable".to_string()))?;

        Ok(Self { storage })
    }
}

impl CartStorage for LocalStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage
            .get_item(key)
            .map_err(|error| unavailable(&error, "failed to read localStorage"))
    }

    // Browsers raise a QuotaExceededError DOMException here; its size is not exposed.
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage
            .set_item(key, value)
            .map_err(|error| unavailable(&error, "failed to write localStorage"))
    }
}

fn unavailable(error: &JsValue, fallback: &str) -> StorageError {
    StorageError::Unavailable(error.as_string().unwrap_or_else(|| fallback.to_string()))
}
