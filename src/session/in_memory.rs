use crate::error::Result;
use crate::session::SessionStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory session store implementation
///
/// Stores session entries in a HashMap. Suitable for development and
/// testing, but not for production (entries are lost on restart and not
/// shared across instances).
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    entries: Arc<RwLock<HashMap<(String, String), Vec<u8>>>>,
}

impl InMemorySessionStore {
    /// Create a new in-memory session store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, across all sessions.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn entry_key(session_id: &str, key: &str) -> (String, String) {
    (session_id.to_string(), key.to_string())
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.read().await;
        Ok(entries.get(&entry_key(session_id, key)).cloned())
    }

    async fn set(&self, session_id: &str, key: &str, value: Vec<u8>) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(entry_key(session_id, key), value);
        Ok(())
    }

    async fn delete(&self, session_id: &str, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(&entry_key(session_id, key));
        Ok(())
    }

    async fn set_if_absent(&self, session_id: &str, key: &str, value: Vec<u8>) -> Result<bool> {
        // Check and insert under the same write lock, so concurrent callers
        // cannot both claim the key.
        let mut entries = self.entries.write().await;
        match entries.entry(entry_key(session_id, key)) {
            std::collections::hash_map::Entry::Occupied(_) => Ok(false),
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(true)
            }
        }
    }
}
