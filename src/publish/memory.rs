//! In-process content store.

use crate::error::{Error, Result};
use crate::model::ContentId;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::ContentStore;

/// An object held by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Name the object was stored under
    pub name: String,
    /// Stored bytes (JSON is stored serialized)
    pub data: Vec<u8>,
}

/// Content store kept in memory, addressed by SHA-256 of the content.
///
/// Used for dry runs and tests. Storing the same bytes twice yields the same
/// id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<ContentId, StoredObject>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> Result<MutexGuard<'_, HashMap<ContentId, StoredObject>>> {
        self.objects
            .lock()
            .map_err(|_| Error::Store("memory store lock poisoned".into()))
    }

    fn insert(&self, name: &str, data: Vec<u8>) -> Result<ContentId> {
        let id = ContentId::new(format!("sha256-{}", hex::encode(Sha256::digest(&data))));
        self.objects()?.insert(
            id.clone(),
            StoredObject {
                name: name.to_string(),
                data,
            },
        );
        Ok(id)
    }

    /// Stored bytes for an id.
    pub fn get(&self, id: &ContentId) -> Option<Vec<u8>> {
        self.objects().ok()?.get(id).map(|o| o.data.clone())
    }

    /// Stored JSON for an id.
    pub fn get_json(&self, id: &ContentId) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.get(id)?).ok()
    }

    /// Name an object was stored under.
    pub fn name_of(&self, id: &ContentId) -> Option<String> {
        self.objects().ok()?.get(id).map(|o| o.name.clone())
    }

    /// Number of distinct objects.
    pub fn len(&self) -> usize {
        self.objects().map(|o| o.len()).unwrap_or(0)
    }

    /// Whether nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn put_bytes(&self, payload: &[u8], name: &str) -> Result<ContentId> {
        self.insert(name, payload.to_vec())
    }

    async fn put_json(&self, value: &serde_json::Value, name: Option<&str>) -> Result<ContentId> {
        let data = serde_json::to_vec(value)?;
        self.insert(name.unwrap_or("data.json"), data)
    }
}
