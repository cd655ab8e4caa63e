use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database,
    bson::{Document, doc},
};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{HASH_PATH, MongoKeyDocument, MongoValue, SET_PATH, hash_field_path, key_filter},
};
use crate::dao::{kv_store::KeyValueStore, storage::StorageResult};

const KEY_COLLECTION_NAME: &str = "kv_entries";

/// Key/value store keeping one document per key in a single collection.
#[derive(Clone)]
pub struct MongoKvStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoKvStore {
    /// Establish a connection to MongoDB.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        Ok(Self { inner })
    }

    async fn collection(&self) -> Collection<MongoKeyDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoKeyDocument>(KEY_COLLECTION_NAME)
    }

    async fn read_value(&self, key: &str) -> MongoResult<Option<MongoValue>> {
        let collection = self.collection().await;
        let document = collection
            .find_one(key_filter(key))
            .await
            .map_err(|source| MongoDaoError::Read {
                key: key.to_owned(),
                source,
            })?;
        Ok(document.map(|doc| doc.value))
    }

    async fn set_text(&self, key: String, value: String) -> MongoResult<()> {
        let collection = self.collection().await;
        let document = MongoKeyDocument {
            id: key.clone(),
            value: MongoValue::Text(value),
        };
        collection
            .replace_one(key_filter(&key), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Write { key, source })?;
        Ok(())
    }

    async fn delete_key(&self, key: String) -> MongoResult<bool> {
        let collection = self.collection().await;
        let result = collection
            .delete_one(key_filter(&key))
            .await
            .map_err(|source| MongoDaoError::Delete { key, source })?;
        Ok(result.deleted_count > 0)
    }

    /// Apply an update operator document, returning whether anything changed.
    async fn update(&self, key: &str, update: Document, upsert: bool) -> MongoResult<bool> {
        let collection = self.collection().await;
        let result = collection
            .update_one(key_filter(key), update)
            .upsert(upsert)
            .await
            .map_err(|source| MongoDaoError::Write {
                key: key.to_owned(),
                source,
            })?;
        Ok(result.modified_count > 0 || result.upserted_id.is_some())
    }

    /// Delete the document matching `filter`; used to drop emptied containers.
    async fn drop_if_empty(&self, key: &str, filter: Document) -> MongoResult<()> {
        let collection = self.collection().await;
        collection
            .delete_one(filter)
            .await
            .map_err(|source| MongoDaoError::Delete {
                key: key.to_owned(),
                source,
            })?;
        Ok(())
    }

    async fn list_keys(&self, prefix: String) -> MongoResult<Vec<String>> {
        let collection = self.collection().await.clone_with_type::<Document>();
        let pattern = format!("^{}", regex::escape(&prefix));
        let documents: Vec<Document> = collection
            .find(doc! { "_id": { "$regex": pattern } })
            .projection(doc! { "_id": 1 })
            .await
            .map_err(|source| MongoDaoError::Scan {
                prefix: prefix.clone(),
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Scan {
                prefix: prefix.clone(),
                source,
            })?;

        Ok(documents
            .iter()
            .filter_map(|doc| doc.get_str("_id").ok().map(str::to_owned))
            .collect())
    }
}

impl KeyValueStore for MongoKvStore {
    fn get(&self, key: String) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .read_value(&key)
                .await?
                .map(|value| value.into_text(&key))
                .transpose()
        })
    }

    fn set(&self, key: String, value: String) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.set_text(key, value).await.map_err(Into::into) })
    }

    fn delete(&self, key: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_key(key).await.map_err(Into::into) })
    }

    fn hget(
        &self,
        key: String,
        field: String,
    ) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let store = self.clone();
        Box::pin(async move {
            match store.read_value(&key).await? {
                Some(value) => Ok(value.into_hash(&key)?.remove(&field)),
                None => Ok(None),
            }
        })
    }

    fn hset(
        &self,
        key: String,
        field: String,
        value: String,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update(
                    &key,
                    doc! { "$set": { hash_field_path(&field): value } },
                    true,
                )
                .await?;
            Ok(())
        })
    }

    fn hdel(&self, key: String, field: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let removed = store
                .update(
                    &key,
                    doc! { "$unset": { hash_field_path(&field): "" } },
                    false,
                )
                .await?;
            if removed {
                store
                    .drop_if_empty(&key, doc! { "_id": key.as_str(), HASH_PATH: {} })
                    .await?;
            }
            Ok(removed)
        })
    }

    fn hgetall(&self, key: String) -> BoxFuture<'static, StorageResult<BTreeMap<String, String>>> {
        let store = self.clone();
        Box::pin(async move {
            match store.read_value(&key).await? {
                Some(value) => value.into_hash(&key),
                None => Ok(BTreeMap::new()),
            }
        })
    }

    fn sadd(&self, key: String, member: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update(&key, doc! { "$addToSet": { SET_PATH: member } }, true)
                .await
                .map_err(Into::into)
        })
    }

    fn srem(&self, key: String, member: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let removed = store
                .update(&key, doc! { "$pull": { SET_PATH: member } }, false)
                .await?;
            if removed {
                store
                    .drop_if_empty(&key, doc! { "_id": key.as_str(), SET_PATH: { "$size": 0 } })
                    .await?;
            }
            Ok(removed)
        })
    }

    fn smembers(&self, key: String) -> BoxFuture<'static, StorageResult<BTreeSet<String>>> {
        let store = self.clone();
        Box::pin(async move {
            match store.read_value(&key).await? {
                Some(value) => value.into_set(&key),
                None => Ok(BTreeSet::new()),
            }
        })
    }

    fn scan_prefix(&self, prefix: String) -> BoxFuture<'static, StorageResult<Vec<String>>> {
        let store = self.clone();
        Box::pin(async move { store.list_keys(prefix).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
