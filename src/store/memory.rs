//! In-memory snapshot store for development and testing.
//!
//! For production use, back the snapshot with Redis or another persistent
//! key-value store.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::store::{SnapshotStore, StoreError, StoreResult};
use crate::types::Contact;

/// In-memory [`SnapshotStore`] over namespaced string keys.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&self, key: String, value: String) -> StoreResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        entries.insert(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }

    /// Read one entry back, for tests and debugging.
    pub fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotStore for MemoryStore {
    fn clear_all(&self) -> StoreResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        entries.clear();
        Ok(())
    }

    fn put_self_identity(&self, username: &str) -> StoreResult<()> {
        self.put("self".to_string(), username.to_string())
    }

    fn put_remark_mapping(&self, remark: &str, username: &str) -> StoreResult<()> {
        self.put(format!("remark:{}", remark), username.to_string())?;
        self.put(format!("remark_of:{}", username), remark.to_string())
    }

    fn remove_remark_mapping(&self, remark: &str, username: &str) -> StoreResult<()> {
        self.remove(&format!("remark:{}", remark))?;
        self.remove(&format!("remark_of:{}", username))
    }

    fn put_nickname(&self, username: &str, nickname: &str) -> StoreResult<()> {
        self.put(format!("nickname:{}", username), nickname.to_string())
    }

    fn put_room_display_names(
        &self,
        room_username: &str,
        names: &[(String, String)],
    ) -> StoreResult<()> {
        for (member, display_name) in names {
            self.put(
                format!("room:{}:{}", room_username, member),
                display_name.clone(),
            )?;
        }
        Ok(())
    }

    fn put_contact_record(&self, contact: &Contact) -> StoreResult<()> {
        let value = serde_json::to_string(contact)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.put(
            format!("{}:{}", contact.bucket(), contact.username()),
            value,
        )
    }

    fn put_session_cookies(&self, cookies: &[(String, String)]) -> StoreResult<()> {
        for (name, value) in cookies {
            self.put(format!("cookie:{}", name), value.clone())?;
        }
        Ok(())
    }
}
