mod config;
mod editor;
mod enhance;
mod errors;
mod export;
mod models;
mod render;
mod routes;
mod sections;
mod state;
mod storage;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::enhance::OpenRouterClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{DocumentStore, MemoryDocumentStore, PgDocumentStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume API v{}", env!("CARGO_PKG_VERSION"));

    // Document storage: PostgreSQL when configured, in-memory otherwise
    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => Arc::new(PgDocumentStore::connect(url).await?),
        None => {
            info!("DATABASE_URL not set; résumés are kept in memory");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    // Initialize enhancement client
    let enhancer = OpenRouterClient::new(
        config.openrouter_api_url.clone(),
        config.openrouter_api_key.clone(),
        config.enhance_model.clone(),
    )?;
    info!("Enhancement client initialized (model: {})", enhancer.model());

    info!(
        "Save quiet period {:?}, export supersample x{}",
        config.save_quiet_period, config.export_supersample
    );

    let state = AppState::new(config.clone(), store, Arc::new(enhancer));
    state.start_idle_sweep();
    info!("Idle sessions expire after {:?}", config.session_idle_timeout);

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the host platform's domains

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
