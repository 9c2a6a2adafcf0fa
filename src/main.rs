use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use quiz_portal::{
    config::{get_config, init_config},
    routes,
    services::storage::FileStore,
    AppState,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quiz_portal=info,tower_http=info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    init_tracing();
    let config = get_config();

    let storage = Arc::new(FileStore::open(&config.storage_path)?);
    let app_state = AppState::new(config, storage.clone())?;

    {
        let sessions = app_state.sessions.clone();
        let tick = Duration::from_millis(config.session_tick_ms.max(100));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Err(e) = sessions.tick_all() {
                    tracing::error!(error = ?e, "Session sweeper error");
                }
            }
        });
    }

    let sessions = app_state.sessions.clone();
    let app = routes::router(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Waiting for pending answer submissions");
    sessions.settle().await;
    storage.flush()?;
    Ok(())
}
