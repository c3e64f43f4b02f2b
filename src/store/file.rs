//! JSON-file blob store, one file per collection key

use std::io::ErrorKind;
use std::path::PathBuf;

use super::BlobStore;
use crate::{Result, StorefrontError};

pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| StorefrontError::Storage(e.to_string()))?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl BlobStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorefrontError::Storage(e.to_string())),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        std::fs::write(self.path(key), value).map_err(|e| StorefrontError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        assert_eq!(store.load("vouchers").unwrap(), None);
        store.save("vouchers", "[]").unwrap();
        assert_eq!(store.load("vouchers").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_reopen_sees_previous_writes() {
        let dir = tempfile::tempdir().unwrap();
        JsonFileStore::new(dir.path())
            .unwrap()
            .save("orders", "[1,2]")
            .unwrap();
        let reopened = JsonFileStore::new(dir.path()).unwrap();
        assert_eq!(reopened.load("orders").unwrap().as_deref(), Some("[1,2]"));
    }
}
