//! Pomora Back binary entrypoint wiring the timer engine, report scheduler, session store and HTTP layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pomora_back::{
    config::AppConfig,
    dao::session_store::{MemorySessionStore, SessionStore},
    routes,
    services::{report_scheduler::ReportScheduler, storage_supervisor, timer_engine::TimerEngine},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(AppConfig::load());
    spawn_session_store(app_state.clone()).await;

    let timer = TimerEngine::new(app_state.clone());
    let reports = ReportScheduler::new(app_state.clone());
    timer.start();
    reports.start();

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let served = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum");

    reports.stop().await;
    timer.stop().await;
    served
}

/// Install the document store behind the supervisor, or the in-memory store when no database is configured.
async fn spawn_session_store(state: SharedState) {
    match env::var("MONGO_URI") {
        #[cfg(feature = "mongo-store")]
        Ok(uri) => {
            let db_name = env::var("MONGO_DB").ok();
            let store_config = state.config().store;
            tokio::spawn(storage_supervisor::run(state, move || {
                connect_mongo(uri.clone(), db_name.clone(), store_config)
            }));
        }
        #[cfg(not(feature = "mongo-store"))]
        Ok(_) => {
            warn!("MONGO_URI set but the mongo-store feature is disabled; using the in-memory store");
            install_memory_store(&state).await;
        }
        Err(_) => {
            warn!("MONGO_URI not set; statistics will not survive a restart");
            install_memory_store(&state).await;
        }
    }
}

async fn install_memory_store(state: &SharedState) {
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    state.install_session_store(store).await;
}

#[cfg(feature = "mongo-store")]
async fn connect_mongo(
    uri: String,
    db_name: Option<String>,
    store_config: pomora_back::config::StoreConfig,
) -> Result<Arc<dyn SessionStore>, pomora_back::dao::storage::StorageError> {
    use pomora_back::dao::session_store::mongodb::{MongoConfig, MongoSessionStore};

    let config = MongoConfig::from_uri(&uri, db_name.as_deref(), &store_config).await?;
    let store = MongoSessionStore::connect(config).await?;
    Ok(Arc::new(store))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
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
