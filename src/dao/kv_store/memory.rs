//! In-process store used when no database is configured and by the test suites.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::{BoxFuture, ready};

use crate::dao::{
    kv_store::KeyValueStore,
    storage::{StorageError, StorageResult},
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum StoredValue {
    Text(String),
    Hash(BTreeMap<String, String>),
    Set(BTreeSet<String>),
}

impl StoredValue {
    fn kind(&self) -> &'static str {
        match self {
            StoredValue::Text(_) => "string",
            StoredValue::Hash(_) => "hash",
            StoredValue::Set(_) => "set",
        }
    }
}

fn wrong_kind(key: &str, expected: &'static str, found: &StoredValue) -> StorageError {
    StorageError::WrongKind {
        key: key.to_owned(),
        expected,
        found: found.kind(),
    }
}

/// Key/value store backed by a concurrent hash map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, StoredValue>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no key is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get_sync(&self, key: &str) -> StorageResult<Option<String>> {
        match self.entries.get(key).as_deref() {
            None => Ok(None),
            Some(StoredValue::Text(value)) => Ok(Some(value.clone())),
            Some(other) => Err(wrong_kind(key, "string", other)),
        }
    }

    fn set_sync(&self, key: String, value: String) {
        self.entries.insert(key, StoredValue::Text(value));
    }

    fn hget_sync(&self, key: &str, field: &str) -> StorageResult<Option<String>> {
        match self.entries.get(key).as_deref() {
            None => Ok(None),
            Some(StoredValue::Hash(map)) => Ok(map.get(field).cloned()),
            Some(other) => Err(wrong_kind(key, "hash", other)),
        }
    }

    fn hset_sync(&self, key: String, field: String, value: String) -> StorageResult<()> {
        match self.entries.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(StoredValue::Hash(BTreeMap::from([(field, value)])));
                Ok(())
            }
            Entry::Occupied(mut slot) => {
                let key = slot.key().clone();
                match slot.get_mut() {
                    StoredValue::Hash(map) => {
                        map.insert(field, value);
                        Ok(())
                    }
                    other => Err(wrong_kind(&key, "hash", other)),
                }
            }
        }
    }

    fn hdel_sync(&self, key: String, field: &str) -> StorageResult<bool> {
        match self.entries.entry(key) {
            Entry::Vacant(_) => Ok(false),
            Entry::Occupied(mut slot) => {
                let key = slot.key().clone();
                let removed = match slot.get_mut() {
                    StoredValue::Hash(map) => map.remove(field).is_some(),
                    other => return Err(wrong_kind(&key, "hash", other)),
                };
                if matches!(slot.get(), StoredValue::Hash(map) if map.is_empty()) {
                    slot.remove();
                }
                Ok(removed)
            }
        }
    }

    fn hgetall_sync(&self, key: &str) -> StorageResult<BTreeMap<String, String>> {
        match self.entries.get(key).as_deref() {
            None => Ok(BTreeMap::new()),
            Some(StoredValue::Hash(map)) => Ok(map.clone()),
            Some(other) => Err(wrong_kind(key, "hash", other)),
        }
    }

    fn sadd_sync(&self, key: String, member: String) -> StorageResult<bool> {
        match self.entries.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(StoredValue::Set(BTreeSet::from([member])));
                Ok(true)
            }
            Entry::Occupied(mut slot) => {
                let key = slot.key().clone();
                match slot.get_mut() {
                    StoredValue::Set(set) => Ok(set.insert(member)),
                    other => Err(wrong_kind(&key, "set", other)),
                }
            }
        }
    }

    fn srem_sync(&self, key: String, member: &str) -> StorageResult<bool> {
        match self.entries.entry(key) {
            Entry::Vacant(_) => Ok(false),
            Entry::Occupied(mut slot) => {
                let key = slot.key().clone();
                let removed = match slot.get_mut() {
                    StoredValue::Set(set) => set.remove(member),
                    other => return Err(wrong_kind(&key, "set", other)),
                };
                if matches!(slot.get(), StoredValue::Set(set) if set.is_empty()) {
                    slot.remove();
                }
                Ok(removed)
            }
        }
    }

    fn smembers_sync(&self, key: &str) -> StorageResult<BTreeSet<String>> {
        match self.entries.get(key).as_deref() {
            None => Ok(BTreeSet::new()),
            Some(StoredValue::Set(set)) => Ok(set.clone()),
            Some(other) => Err(wrong_kind(key, "set", other)),
        }
    }

    fn scan_prefix_sync(&self, prefix: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: String) -> BoxFuture<'static, StorageResult<Option<String>>> {
        Box::pin(ready(self.get_sync(&key)))
    }

    fn set(&self, key: String, value: String) -> BoxFuture<'static, StorageResult<()>> {
        self.set_sync(key, value);
        Box::pin(ready(Ok(())))
    }

    fn delete(&self, key: String) -> BoxFuture<'static, StorageResult<bool>> {
        Box::pin(ready(Ok(self.entries.remove(&key).is_some())))
    }

    fn hget(
        &self,
        key: String,
        field: String,
    ) -> BoxFuture<'static, StorageResult<Option<String>>> {
        Box::pin(ready(self.hget_sync(&key, &field)))
    }

    fn hset(
        &self,
        key: String,
        field: String,
        value: String,
    ) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(self.hset_sync(key, field, value)))
    }

    fn hdel(&self, key: String, field: String) -> BoxFuture<'static, StorageResult<bool>> {
        Box::pin(ready(self.hdel_sync(key, &field)))
    }

    fn hgetall(&self, key: String) -> BoxFuture<'static, StorageResult<BTreeMap<String, String>>> {
        Box::pin(ready(self.hgetall_sync(&key)))
    }

    fn sadd(&self, key: String, member: String) -> BoxFuture<'static, StorageResult<bool>> {
        Box::pin(ready(self.sadd_sync(key, member)))
    }

    fn srem(&self, key: String, member: String) -> BoxFuture<'static, StorageResult<bool>> {
        Box::pin(ready(self.srem_sync(key, &member)))
    }

    fn smembers(&self, key: String) -> BoxFuture<'static, StorageResult<BTreeSet<String>>> {
        Box::pin(ready(self.smembers_sync(&key)))
    }

    fn scan_prefix(&self, prefix: String) -> BoxFuture<'static, StorageResult<Vec<String>>> {
        Box::pin(ready(Ok(self.scan_prefix_sync(&prefix))))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(Ok(())))
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(Ok(())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn string_values_round_trip_and_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a".into()).await.unwrap(), None);

        store.set("a".into(), "1".into()).await.unwrap();
        assert_eq!(store.get("a".into()).await.unwrap().as_deref(), Some("1"));

        assert!(store.delete("a".into()).await.unwrap());
        assert!(!store.delete("a".into()).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn hash_fields_are_independent() {
        let store = MemoryStore::new();
        store
            .hset("h".into(), "1".into(), "link-1".into())
            .await
            .unwrap();
        store
            .hset("h".into(), "2".into(), "link-2".into())
            .await
            .unwrap();

        assert_eq!(
            store.hget("h".into(), "2".into()).await.unwrap().as_deref(),
            Some("link-2")
        );
        assert_eq!(store.hgetall("h".into()).await.unwrap().len(), 2);

        assert!(store.hdel("h".into(), "1".into()).await.unwrap());
        assert!(store.hdel("h".into(), "2".into()).await.unwrap());
        assert!(store.is_empty(), "empty hashes are dropped");
    }

    #[tokio::test]
    async fn set_members_deduplicate() {
        let store = MemoryStore::new();
        assert!(store.sadd("s".into(), "3".into()).await.unwrap());
        assert!(!store.sadd("s".into(), "3".into()).await.unwrap());
        assert!(store.sadd("s".into(), "5".into()).await.unwrap());

        let members = store.smembers("s".into()).await.unwrap();
        assert_eq!(members.len(), 2);

        assert!(store.srem("s".into(), "3".into()).await.unwrap());
        assert!(!store.srem("s".into(), "3".into()).await.unwrap());
    }

    #[tokio::test]
    async fn mismatched_shape_is_reported() {
        let store = MemoryStore::new();
        store.set("k".into(), "text".into()).await.unwrap();

        let err = store.sadd("k".into(), "1".into()).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::WrongKind {
                expected: "set",
                found: "string",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn scan_prefix_only_returns_matching_keys() {
        let store = MemoryStore::new();
        store.set("group:1:a".into(), "x".into()).await.unwrap();
        store.set("group:12:a".into(), "x".into()).await.unwrap();

        let keys = store.scan_prefix("group:1:".into()).await.unwrap();
        assert_eq!(keys, vec!["group:1:a".to_string()]);
    }
}
