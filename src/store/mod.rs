//! Persistence boundary
//!
//! The original storefront kept every collection as a JSON blob in browser
//! local storage. [`BlobStore`] keeps that shape: a keyed string store with
//! no partial updates, swappable for a real database without touching the
//! services above it.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Result, StorefrontError};

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Collection keys used by the services.
pub mod keys {
    pub const VOUCHERS: &str = "vouchers";
    pub const ORDERS: &str = "orders";
    pub const REVIEWS: &str = "reviews";
}

pub trait BlobStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&self, key: &str, value: &str) -> Result<()>;
}

/// A typed collection stored as one JSON array under a single key.
pub struct Collection<T> {
    store: Arc<dyn BlobStore>,
    key: &'static str,
    _marker: PhantomData<T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key,
            _marker: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> Collection<T> {
    pub fn new(store: Arc<dyn BlobStore>, key: &'static str) -> Self {
        Self {
            store,
            key,
            _marker: PhantomData,
        }
    }

    /// A missing blob reads as an empty collection.
    pub fn get_all(&self) -> Result<Vec<T>> {
        match self.store.load(self.key)? {
            Some(raw) => {
                serde_json::from_str(&raw).map_err(|e| StorefrontError::Storage(e.to_string()))
            }
            None => Ok(Vec::new()),
        }
    }

    pub fn set_all(&self, items: &[T]) -> Result<()> {
        let raw =
            serde_json::to_string(items).map_err(|e| StorefrontError::Storage(e.to_string()))?;
        self.store.save(self.key, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_reads_as_empty() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        let vouchers: Collection<String> = Collection::new(store, "nothing");
        assert!(vouchers.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_set_then_get_round_trips() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        let names: Collection<String> = Collection::new(store, keys::VOUCHERS);
        names.set_all(&["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(names.get_all().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_corrupt_blob_is_a_storage_error() {
        let store = Arc::new(MemoryStore::new());
        store.save(keys::ORDERS, "not json").unwrap();
        let orders: Collection<u32> = Collection::new(store, keys::ORDERS);
        assert!(matches!(
            orders.get_all(),
            Err(StorefrontError::Storage(_))
        ));
    }
}
