//! Durable key-value storage for the cart.
//!
//! The cart is stored as a single JSON record, `{ "products": [...] }`, under
//! [`CART_STORAGE_KEY`]. Backends only deal in raw strings so the same record
//! can live in a browser's `localStorage`, a file, or memory.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::CartLineItem;

mod file;
#[cfg(target_arch = "wasm32")]
mod local;
mod memory;

pub use file::FileStorage;
#[cfg(target_arch = "wasm32")]
pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Key the cart record is stored under.
pub const CART_STORAGE_KEY: &str = "cart-storage";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored record could not be encoded or decoded.
    #[error("cart record is not valid: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing would exceed the backend's capacity.
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded {
        /// Total bytes the store would hold after the write
        needed: usize,

        /// Configured capacity in bytes
        quota: usize,
    },

    /// The backend cannot be reached at all.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Raw string key-value storage.
pub trait CartStorage {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend could not be read.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend rejected the write.
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Stored shape of the cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCart {
    /// Line items in insertion order
    #[serde(default)]
    pub products: Vec<CartLineItem>,
}

impl PersistedCart {
    /// Read and decode the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend failed or the record is not valid JSON.
    pub fn load<S: CartStorage + ?Sized>(
        storage: &S,
        key: &str,
    ) -> Result<Option<Self>, StorageError> {
        storage
            .read(key)?
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(StorageError::from)
    }

    /// Encode and store this record under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if encoding failed or the backend rejected the write.
    pub fn save<S: CartStorage + ?Sized>(
        &self,
        storage: &mut S,
        key: &str,
    ) -> Result<(), StorageError> {
        let raw = serde_json::to_string(self)?;

        storage.write(key, &raw)
    }
}
