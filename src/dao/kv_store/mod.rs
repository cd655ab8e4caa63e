/// CouchDB backend.
#[cfg(feature = "couch-store")]
pub mod couchdb;
/// In-process backend.
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::collections::{BTreeMap, BTreeSet};

use futures::future::BoxFuture;

use crate::dao::storage::StorageResult;

/// Abstraction over the persistence layer: string values, hashes and sets
/// addressed by string keys.
///
/// Every single-key operation must be atomic on its own; callers needing
/// multi-key atomicity serialise through the per-group lock.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: String) -> BoxFuture<'static, StorageResult<Option<String>>>;
    fn set(&self, key: String, value: String) -> BoxFuture<'static, StorageResult<()>>;
    /// Remove a key of any shape, returning whether it existed.
    fn delete(&self, key: String) -> BoxFuture<'static, StorageResult<bool>>;

    fn hget(&self, key: String, field: String)
    -> BoxFuture<'static, StorageResult<Option<String>>>;
    fn hset(&self, key: String, field: String, value: String)
    -> BoxFuture<'static, StorageResult<()>>;
    fn hdel(&self, key: String, field: String) -> BoxFuture<'static, StorageResult<bool>>;
    fn hgetall(&self, key: String) -> BoxFuture<'static, StorageResult<BTreeMap<String, String>>>;

    /// Add a member to a set, returning `true` when it was not present yet.
    fn sadd(&self, key: String, member: String) -> BoxFuture<'static, StorageResult<bool>>;
    fn srem(&self, key: String, member: String) -> BoxFuture<'static, StorageResult<bool>>;
    fn smembers(&self, key: String) -> BoxFuture<'static, StorageResult<BTreeSet<String>>>;

    /// List every key starting with `prefix`, in backend order.
    fn scan_prefix(&self, prefix: String) -> BoxFuture<'static, StorageResult<Vec<String>>>;

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
