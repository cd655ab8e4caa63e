use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::dao::{
    kv_store::KeyValueStore,
    storage::{StorageError, StorageResult},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, Change, CouchKeyDocument, CouchValue, END_SUFFIX, RevisionOnly,
    },
};

/// Key/value store mapping each key onto one CouchDB document.
#[derive(Clone)]
pub struct CouchKvStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
    conflict_retries: u32,
}

impl CouchKvStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .credentials
            .map(|(user, pass)| (Arc::<str>::from(user), Arc::<str>::from(pass)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
            conflict_retries: config.conflict_retries.max(1),
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        self.authorize(self.client.request(method, url))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = format!("{}/{}", self.base_url, self.database);

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(CouchDaoError::unreachable(&database))?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorize(self.client.put(&url))
                    .send()
                    .await
                    .map_err(CouchDaoError::unreachable(&database))?;
                let status = create.status();
                // 412 means another instance created it in the meantime.
                if status.is_success() || status == StatusCode::PRECONDITION_FAILED {
                    Ok(())
                } else {
                    Err(CouchDaoError::Status {
                        target: database,
                        status,
                    })
                }
            }
            other => Err(CouchDaoError::Status {
                target: database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(CouchDaoError::unreachable(doc_id))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(CouchDaoError::decode(doc_id))
            }
            other => Err(CouchDaoError::Status {
                target: doc_id.to_string(),
                status: other,
            }),
        }
    }

    /// Write a document; `Ok(false)` signals a revision conflict.
    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<bool>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(CouchDaoError::unreachable(doc_id))?;

        match response.status() {
            StatusCode::CONFLICT => Ok(false),
            status if status.is_success() => Ok(true),
            other => Err(CouchDaoError::Status {
                target: doc_id.to_string(),
                status: other,
            }),
        }
    }

    /// Delete a document at the given revision; `Ok(false)` signals a conflict.
    async fn delete_document(&self, doc_id: &str, rev: &str) -> CouchResult<bool> {
        let response = self
            .request(Method::DELETE, doc_id)
            .query(&[("rev", rev)])
            .send()
            .await
            .map_err(CouchDaoError::unreachable(doc_id))?;

        match response.status() {
            StatusCode::CONFLICT => Ok(false),
            StatusCode::NOT_FOUND => Ok(true),
            status if status.is_success() => Ok(true),
            other => Err(CouchDaoError::Status {
                target: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn read_value(&self, key: &str) -> CouchResult<Option<CouchValue>> {
        Ok(self
            .get_document::<CouchKeyDocument>(key)
            .await?
            .map(|doc| doc.value))
    }

    /// Read-modify-write loop replayed on revision conflicts.
    async fn modify<T, F>(&self, key: &str, mut apply: F) -> StorageResult<T>
    where
        F: FnMut(Option<CouchValue>) -> StorageResult<(Change, T)>,
    {
        for attempt in 1..=self.conflict_retries {
            let existing = self.get_document::<CouchKeyDocument>(key).await?;
            let (rev, value) = match existing {
                Some(doc) => (doc.rev, Some(doc.value)),
                None => (None, None),
            };

            let (change, output) = apply(value)?;
            let committed = match change {
                Change::Keep => true,
                Change::Write(value) => {
                    let document = CouchKeyDocument {
                        id: key.to_owned(),
                        rev,
                        value,
                    };
                    self.put_document(key, &document).await?
                }
                Change::Remove => match rev {
                    Some(rev) => self.delete_document(key, &rev).await?,
                    None => true,
                },
            };

            if committed {
                return Ok(output);
            }
            debug!(key, attempt, "CouchDB revision conflict; retrying");
        }

        Err(CouchDaoError::ConflictRetriesExhausted {
            key: key.to_owned(),
            attempts: self.conflict_retries,
        }
        .into())
    }

    async fn delete_key(&self, key: &str) -> StorageResult<bool> {
        for _ in 0..self.conflict_retries {
            let Some(RevisionOnly { rev }) = self.get_document::<RevisionOnly>(key).await? else {
                return Ok(false);
            };
            if self.delete_document(key, &rev).await? {
                return Ok(true);
            }
        }

        Err(CouchDaoError::ConflictRetriesExhausted {
            key: key.to_owned(),
            attempts: self.conflict_retries,
        }
        .into())
    }

    async fn list_keys(&self, prefix: &str) -> CouchResult<Vec<String>> {
        const ALL_DOCS: &str = "_all_docs";
        let query = [
            ("startkey", format!("\"{}\"", prefix)),
            ("endkey", format!("\"{}{}\"", prefix, END_SUFFIX)),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(CouchDaoError::unreachable(ALL_DOCS))?;

        if !response.status().is_success() {
            return Err(CouchDaoError::Status {
                target: ALL_DOCS.to_string(),
                status: response.status(),
            });
        }

        let payload = response
            .json::<AllDocsResponse>()
            .await
            .map_err(CouchDaoError::decode(ALL_DOCS))?;

        Ok(payload.rows.into_iter().map(|row| row.id).collect())
    }
}

impl KeyValueStore for CouchKvStore {
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
        Box::pin(async move {
            store
                .modify(&key, |_| Ok((Change::Write(CouchValue::Text(value.clone())), ())))
                .await
        })
    }

    fn delete(&self, key: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_key(&key).await })
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
            let doc_key = key.clone();
            store
                .modify(&doc_key, |existing| {
                    let mut map = match existing {
                        Some(current) => current.into_hash(&key)?,
                        None => BTreeMap::new(),
                    };
                    map.insert(field.clone(), value.clone());
                    Ok((Change::Write(CouchValue::Hash(map)), ()))
                })
                .await
        })
    }

    fn hdel(&self, key: String, field: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_key = key.clone();
            store
                .modify(&doc_key, |existing| {
                    let Some(current) = existing else {
                        return Ok((Change::Keep, false));
                    };
                    let mut map = current.into_hash(&key)?;
                    if map.remove(&field).is_none() {
                        return Ok((Change::Keep, false));
                    }
                    let change = if map.is_empty() {
                        Change::Remove
                    } else {
                        Change::Write(CouchValue::Hash(map))
                    };
                    Ok((change, true))
                })
                .await
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
            let doc_key = key.clone();
            store
                .modify(&doc_key, |existing| {
                    let mut set = match existing {
                        Some(current) => current.into_set(&key)?,
                        None => BTreeSet::new(),
                    };
                    if !set.insert(member.clone()) {
                        return Ok((Change::Keep, false));
                    }
                    Ok((Change::Write(CouchValue::Set(set)), true))
                })
                .await
        })
    }

    fn srem(&self, key: String, member: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_key = key.clone();
            store
                .modify(&doc_key, |existing| {
                    let Some(current) = existing else {
                        return Ok((Change::Keep, false));
                    };
                    let mut set = current.into_set(&key)?;
                    if !set.remove(&member) {
                        return Ok((Change::Keep, false));
                    }
                    let change = if set.is_empty() {
                        Change::Remove
                    } else {
                        Change::Write(CouchValue::Set(set))
                    };
                    Ok((change, true))
                })
                .await
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
        Box::pin(async move { store.list_keys(&prefix).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = format!("{}/{}", store.base_url, store.database);
            let response = store
                .authorize(store.client.get(&url))
                .send()
                .await
                .map_err(CouchDaoError::unreachable(&url))?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(StorageError::from(CouchDaoError::Status {
                    target: url,
                    status: response.status(),
                }))
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
