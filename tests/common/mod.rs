#![allow(dead_code)]

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicI64, AtomicU32, Ordering},
    },
    time::Duration,
};

use futures::future::{BoxFuture, ready};
use number_hunt_back::{
    config::AppConfig,
    dao::{
        kv_store::{KeyValueStore, memory::MemoryStore},
        storage::{StorageError, StorageResult},
    },
    services::lifecycle_service,
    state::{
        AppState, SharedState,
        game::{GroupId, MediaRef, UserId},
    },
    transport::{Transport, TransportError, TransportResult},
};

pub const GROUP: GroupId = -1001;
pub const CHANNEL: &str = "@hunt_channel";
pub const ADMIN: UserId = 1;

pub fn media(message_id: i64) -> MediaRef {
    MediaRef {
        chat_id: GROUP,
        message_id,
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        post_timeout: Duration::from_millis(200),
        delete_retry_delay: Duration::from_millis(1),
        ..AppConfig::default()
    }
}

/// Recorded channel post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub channel_id: String,
    pub media: MediaRef,
    pub caption: String,
}

#[derive(Default)]
struct FakeInner {
    admins: Mutex<HashSet<(GroupId, UserId)>>,
    writable: Mutex<HashSet<String>>,
    usernames: Mutex<HashMap<UserId, String>>,
    posts: Mutex<Vec<Post>>,
    failing_posts: AtomicU32,
    post_delay: Mutex<Duration>,
    probe_delay: Mutex<Duration>,
    next_message_id: AtomicI64,
}

/// Scripted chat platform.
#[derive(Clone, Default)]
pub struct FakeTransport {
    inner: Arc<FakeInner>,
}

impl FakeTransport {
    pub fn new() -> Self {
        let transport = Self::default();
        transport.allow_channel(CHANNEL);
        transport.add_admin(GROUP, ADMIN);
        transport
    }

    pub fn allow_channel(&self, channel: &str) {
        self.inner
            .writable
            .lock()
            .unwrap()
            .insert(channel.to_owned());
    }

    pub fn add_admin(&self, group_id: GroupId, user_id: UserId) {
        self.inner
            .admins
            .lock()
            .unwrap()
            .insert((group_id, user_id));
    }

    pub fn set_username(&self, user_id: UserId, name: &str) {
        self.inner
            .usernames
            .lock()
            .unwrap()
            .insert(user_id, name.to_owned());
    }

    /// Make the next `count` posts fail.
    pub fn fail_next_posts(&self, count: u32) {
        self.inner.failing_posts.store(count, Ordering::SeqCst);
    }

    pub fn set_post_delay(&self, delay: Duration) {
        *self.inner.post_delay.lock().unwrap() = delay;
    }

    pub fn set_probe_delay(&self, delay: Duration) {
        *self.inner.probe_delay.lock().unwrap() = delay;
    }

    pub fn posts(&self) -> Vec<Post> {
        self.inner.posts.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    fn post_media(
        &self,
        channel_id: String,
        media: MediaRef,
        caption: String,
    ) -> BoxFuture<'static, TransportResult<String>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let delay = *inner.post_delay.lock().unwrap();
            tokio::time::sleep(delay).await;

            let failing = inner
                .failing_posts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            if failing {
                return Err(TransportError::Rejected {
                    method: "copyMessage",
                    description: "Bad Request: message to copy not found".into(),
                });
            }

            let message_id = inner.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
            let link = format!(
                "https://t.me/{}/{message_id}",
                channel_id.trim_start_matches('@')
            );
            inner.posts.lock().unwrap().push(Post {
                channel_id,
                media,
                caption,
            });
            Ok(link)
        })
    }

    fn probe_channel_admin(&self, channel_id: String) -> BoxFuture<'static, TransportResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let delay = *inner.probe_delay.lock().unwrap();
            tokio::time::sleep(delay).await;
            Ok(inner.writable.lock().unwrap().contains(&channel_id))
        })
    }

    fn is_group_admin(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> BoxFuture<'static, TransportResult<bool>> {
        let is_admin = self
            .inner
            .admins
            .lock()
            .unwrap()
            .contains(&(group_id, user_id));
        Box::pin(ready(Ok(is_admin)))
    }

    fn resolve_username(&self, user_id: UserId) -> BoxFuture<'static, TransportResult<String>> {
        let name = self.inner.usernames.lock().unwrap().get(&user_id).cloned();
        Box::pin(ready(name.ok_or_else(|| TransportError::Rejected {
            method: "getChat",
            description: "Bad Request: chat not found".into(),
        })))
    }
}

/// Store operations that [`FlakyStore`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Set,
    Delete,
    Hset,
    Sadd,
}

/// [`MemoryStore`] wrapper failing selected operations a given number of times.
#[derive(Clone, Default)]
pub struct FlakyStore {
    store: MemoryStore,
    failures: Arc<Mutex<HashMap<Op, Plan>>>,
}

#[derive(Debug, Clone, Copy)]
struct Plan {
    skip: u32,
    fail: u32,
}

impl FlakyStore {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            failures: Arc::default(),
        }
    }

    /// Fail the next `times` calls of `op`.
    pub fn fail(&self, op: Op, times: u32) {
        self.fail_after(op, 0, times);
    }

    /// Let `skip` calls of `op` through, then fail the following `times`.
    pub fn fail_after(&self, op: Op, skip: u32, times: u32) {
        self.failures
            .lock()
            .unwrap()
            .insert(op, Plan { skip, fail: times });
    }

    fn injected(&self, op: Op) -> Option<StorageError> {
        let mut failures = self.failures.lock().unwrap();
        let plan = failures.get_mut(&op)?;
        if plan.skip > 0 {
            plan.skip -= 1;
            return None;
        }
        if plan.fail == 0 {
            return None;
        }
        plan.fail -= 1;
        Some(StorageError::unavailable(
            format!("injected {op:?} failure"),
            io::Error::other("connection reset"),
        ))
    }

    fn guard<T: Send + 'static>(
        &self,
        op: Op,
        call: impl FnOnce() -> BoxFuture<'static, StorageResult<T>>,
    ) -> BoxFuture<'static, StorageResult<T>> {
        match self.injected(op) {
            Some(err) => Box::pin(ready(Err(err))),
            None => call(),
        }
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: String) -> BoxFuture<'static, StorageResult<Option<String>>> {
        self.store.get(key)
    }

    fn set(&self, key: String, value: String) -> BoxFuture<'static, StorageResult<()>> {
        self.guard(Op::Set, || self.store.set(key, value))
    }

    fn delete(&self, key: String) -> BoxFuture<'static, StorageResult<bool>> {
        self.guard(Op::Delete, || self.store.delete(key))
    }

    fn hget(
        &self,
        key: String,
        field: String,
    ) -> BoxFuture<'static, StorageResult<Option<String>>> {
        self.store.hget(key, field)
    }

    fn hset(
        &self,
        key: String,
        field: String,
        value: String,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.guard(Op::Hset, || self.store.hset(key, field, value))
    }

    fn hdel(&self, key: String, field: String) -> BoxFuture<'static, StorageResult<bool>> {
        self.store.hdel(key, field)
    }

    fn hgetall(&self, key: String) -> BoxFuture<'static, StorageResult<BTreeMap<String, String>>> {
        self.store.hgetall(key)
    }

    fn sadd(&self, key: String, member: String) -> BoxFuture<'static, StorageResult<bool>> {
        self.guard(Op::Sadd, || self.store.sadd(key, member))
    }

    fn srem(&self, key: String, member: String) -> BoxFuture<'static, StorageResult<bool>> {
        self.store.srem(key, member)
    }

    fn smembers(&self, key: String) -> BoxFuture<'static, StorageResult<BTreeSet<String>>> {
        self.store.smembers(key)
    }

    fn scan_prefix(&self, prefix: String) -> BoxFuture<'static, StorageResult<Vec<String>>> {
        self.store.scan_prefix(prefix)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.store.health_check()
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.store.try_reconnect()
    }
}

/// Everything a test needs to drive the core.
pub struct Harness {
    pub state: SharedState,
    pub transport: FakeTransport,
    pub store: FlakyStore,
    pub memory: MemoryStore,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let memory = MemoryStore::new();
        let store = FlakyStore::new(memory.clone());
        let transport = FakeTransport::new();
        let state = AppState::new(Arc::new(transport.clone()), config);
        state.install_store(Arc::new(store.clone())).await;

        Self {
            state,
            transport,
            store,
            memory,
        }
    }

    /// Run the setup conversation for [`GROUP`] with [`CHANNEL`].
    pub async fn initialized() -> Self {
        let harness = Self::new().await;
        harness.init(GROUP).await;
        harness
    }

    pub async fn init(&self, group_id: GroupId) {
        lifecycle_service::begin_init(&self.state, group_id, ADMIN)
            .await
            .expect("begin_init");
        lifecycle_service::complete_init(&self.state, group_id, CHANNEL)
            .await
            .expect("complete_init");
    }
}
