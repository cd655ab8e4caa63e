//! Typed access to everything persisted for a group.
//!
//! This is the only place that knows the key layout from [`crate::dao::keys`]
//! and how values are encoded; services never touch the raw store.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    time::Duration,
};

use futures::{
    StreamExt, TryStreamExt,
    stream::{self, BoxStream},
};
use tracing::{debug, error, warn};

use crate::{
    dao::{
        keys::GroupKeys,
        kv_store::KeyValueStore,
        storage::{StorageError, StorageResult},
    },
    state::game::{GroupId, UserId},
};

/// Typed operations over the per-group schema.
#[derive(Clone)]
pub struct GameStateManager {
    store: Arc<dyn KeyValueStore>,
    delete_attempts: u32,
    delete_retry_delay: Duration,
}

impl GameStateManager {
    /// View over `store`.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        delete_attempts: u32,
        delete_retry_delay: Duration,
    ) -> Self {
        Self {
            store,
            delete_attempts: delete_attempts.max(1),
            delete_retry_delay,
        }
    }

    /// Current counter, `None` while the group is uninitialized.
    pub async fn get_current_number(&self, group_id: GroupId) -> StorageResult<Option<u64>> {
        let key = GroupKeys::new(group_id).current_number();
        match self.store.get(key.clone()).await? {
            Some(raw) => parse_number(&key, &raw).map(Some),
            None => Ok(None),
        }
    }

    /// Move the counter to `number`.
    pub async fn set_current_number(&self, group_id: GroupId, number: u64) -> StorageResult<()> {
        let key = GroupKeys::new(group_id).current_number();
        self.store.set(key, number.to_string()).await
    }

    /// Drop the counter.
    pub async fn clear_current_number(&self, group_id: GroupId) -> StorageResult<()> {
        let key = GroupKeys::new(group_id).current_number();
        self.store.delete(key).await.map(|_| ())
    }

    /// Channel of the group, if initialized.
    pub async fn get_channel_id(&self, group_id: GroupId) -> StorageResult<Option<String>> {
        self.store.get(GroupKeys::new(group_id).channel_id()).await
    }

    /// Attach the proof channel.
    pub async fn set_channel_id(&self, group_id: GroupId, channel_id: &str) -> StorageResult<()> {
        self.store
            .set(GroupKeys::new(group_id).channel_id(), channel_id.to_owned())
            .await
    }

    /// Proof link of `number`; its presence means the number was already found.
    pub async fn get_submission_link(
        &self,
        group_id: GroupId,
        number: u64,
    ) -> StorageResult<Option<String>> {
        self.store
            .hget(
                GroupKeys::new(group_id).message_history(),
                number.to_string(),
            )
            .await
    }

    /// Record the proof link of `number`.
    pub async fn set_submission_link(
        &self,
        group_id: GroupId,
        number: u64,
        link: &str,
    ) -> StorageResult<()> {
        self.store
            .hset(
                GroupKeys::new(group_id).message_history(),
                number.to_string(),
                link.to_owned(),
            )
            .await
    }

    /// Forget the proof link of `number`.
    pub async fn remove_submission_link(
        &self,
        group_id: GroupId,
        number: u64,
    ) -> StorageResult<()> {
        self.store
            .hdel(
                GroupKeys::new(group_id).message_history(),
                number.to_string(),
            )
            .await
            .map(|_| ())
    }

    /// Every recorded number with its proof link, in ascending order.
    pub async fn get_submission_history(
        &self,
        group_id: GroupId,
    ) -> StorageResult<BTreeMap<u64, String>> {
        let key = GroupKeys::new(group_id).message_history();
        self.store
            .hgetall(key.clone())
            .await?
            .into_iter()
            .map(|(field, link)| Ok((parse_number(&key, &field)?, link)))
            .collect()
    }

    /// Record `number` against `user_id`; returns `false` when it was already there.
    pub async fn add_user_submission(
        &self,
        group_id: GroupId,
        user_id: UserId,
        number: u64,
    ) -> StorageResult<bool> {
        self.store
            .sadd(
                GroupKeys::new(group_id).user_submissions(user_id),
                number.to_string(),
            )
            .await
    }

    /// Remove `number` from the finds of `user_id`.
    pub async fn remove_user_submission(
        &self,
        group_id: GroupId,
        user_id: UserId,
        number: u64,
    ) -> StorageResult<()> {
        self.store
            .srem(
                GroupKeys::new(group_id).user_submissions(user_id),
                number.to_string(),
            )
            .await
            .map(|_| ())
    }

    /// Numbers found by `user_id`, ascending.
    pub async fn get_user_submissions(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> StorageResult<BTreeSet<u64>> {
        let key = GroupKeys::new(group_id).user_submissions(user_id);
        let members = self.store.smembers(key.clone()).await?;
        parse_members(&key, members)
    }

    /// Stream every `(user, numbers)` pair of the group, in store order.
    ///
    /// Each call performs one fresh scan; the stream ends after the last user.
    pub fn iterate_all_user_submissions(
        &self,
        group_id: GroupId,
    ) -> BoxStream<'static, StorageResult<(UserId, BTreeSet<u64>)>> {
        let keys = GroupKeys::new(group_id);
        let store = self.store.clone();

        stream::once(store.scan_prefix(keys.user_submissions_prefix()))
            .map_ok(move |found| {
                stream::iter(found.into_iter().filter_map(move |key| {
                    keys.parse_user_submissions(&key)
                        .map(|user_id| Ok::<_, StorageError>((user_id, key)))
                }))
            })
            .try_flatten()
            .and_then(move |(user_id, key)| {
                let members = store.smembers(key.clone());
                async move { Ok((user_id, parse_members(&key, members.await?)?)) }
            })
            .boxed()
    }

    /// Remove every key belonging to the group.
    ///
    /// Each key is retried with a doubling delay. Keys that still fail are
    /// logged and the last failure is returned; calling again finishes the job.
    pub async fn delete_group(&self, group_id: GroupId) -> StorageResult<()> {
        let keys = self
            .store
            .scan_prefix(GroupKeys::new(group_id).prefix())
            .await?;
        debug!(group_id, count = keys.len(), "deleting group keys");

        let mut last_failure = None;
        for key in keys {
            if let Err(err) = self.delete_with_retry(&key).await {
                error!(group_id, key = %key, error = %err, "failed to delete group key");
                last_failure = Some(err);
            }
        }

        match last_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn delete_with_retry(&self, key: &str) -> StorageResult<()> {
        let mut delay = self.delete_retry_delay;
        let mut attempt = 1;
        loop {
            match self.store.delete(key.to_owned()).await {
                Ok(_) => return Ok(()),
                Err(err) if attempt >= self.delete_attempts => return Err(err),
                Err(err) => {
                    warn!(key, attempt, error = %err, "key deletion failed; retrying");
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
            }
        }
    }
}

fn parse_number(key: &str, raw: &str) -> StorageResult<u64> {
    raw.trim().parse().map_err(|_| StorageError::Corrupt {
        key: key.to_owned(),
        value: raw.to_owned(),
    })
}

fn parse_members(key: &str, members: BTreeSet<String>) -> StorageResult<BTreeSet<u64>> {
    members
        .iter()
        .map(|member| parse_number(key, member))
        .collect()
}
