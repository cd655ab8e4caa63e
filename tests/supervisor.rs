mod common;

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use common::{FakeTransport, test_config};
use number_hunt_back::{
    dao::{
        kv_store::{KeyValueStore, memory::MemoryStore},
        storage::StorageError,
    },
    services::storage_supervisor,
    state::AppState,
};

#[tokio::test]
async fn supervisor_leaves_degraded_mode_once_connected() {
    let state = AppState::new(Arc::new(FakeTransport::new()), test_config());
    assert!(state.is_degraded().await);
    assert!(state.game_state().await.is_err());

    let mut degraded = state.degraded_watcher();
    let connects = Arc::new(AtomicU32::new(0));
    let counter = connects.clone();
    let supervisor = tokio::spawn(storage_supervisor::run(state.clone(), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, StorageError>(Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>) }
    }));

    tokio::time::timeout(Duration::from_secs(2), degraded.wait_for(|flag| !flag))
        .await
        .expect("store installed in time")
        .unwrap();

    assert!(!state.is_degraded().await);
    assert!(state.game_state().await.is_ok());
    assert_eq!(connects.load(Ordering::SeqCst), 1);
    supervisor.abort();
}
