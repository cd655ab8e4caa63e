//! Number Hunt Back binary entrypoint wiring the REST surface, the chat transport and the store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use number_hunt_back::{
    config::AppConfig,
    dao::kv_store::{KeyValueStore, memory::MemoryStore},
    routes,
    services::storage_supervisor,
    state::AppState,
    transport::{
        Transport,
        bot_api::{BotApiConfig, BotApiTransport},
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let bot_config = BotApiConfig::from_env().context("reading bot configuration")?;
    let transport: Arc<dyn Transport> =
        Arc::new(BotApiTransport::new(bot_config).context("building bot API client")?);

    let app_state = AppState::new(transport, config);

    let backend = env::var("STORE_BACKEND").unwrap_or_else(|_| "memory".into());
    match backend.as_str() {
        "memory" => {
            warn!("using in-memory store; data is lost on restart");
            let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
            app_state.install_store(store).await;
        }
        #[cfg(feature = "mongo-store")]
        "mongo" => {
            tokio::spawn(storage_supervisor::run(app_state.clone(), connect_mongo));
        }
        #[cfg(feature = "couch-store")]
        "couch" => {
            tokio::spawn(storage_supervisor::run(app_state.clone(), connect_couch));
        }
        other => bail!("unsupported STORE_BACKEND `{other}`"),
    }

    let app = routes::app(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, %backend, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

#[cfg(feature = "mongo-store")]
async fn connect_mongo()
-> Result<Arc<dyn KeyValueStore>, number_hunt_back::dao::storage::StorageError> {
    use number_hunt_back::dao::kv_store::mongodb::{MongoConfig, MongoKvStore};

    let config = MongoConfig::from_env().await?;
    let store = MongoKvStore::connect(config).await?;
    Ok(Arc::new(store))
}

#[cfg(feature = "couch-store")]
async fn connect_couch()
-> Result<Arc<dyn KeyValueStore>, number_hunt_back::dao::storage::StorageError> {
    use number_hunt_back::dao::kv_store::couchdb::{CouchConfig, CouchKvStore};

    let config = CouchConfig::from_env()?;
    let store = CouchKvStore::connect(config).await?;
    Ok(Arc::new(store))
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
