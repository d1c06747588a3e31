mod assessment;
mod config;
mod document;
mod errors;
mod llm_client;
mod routes;
mod session;
mod state;

#[cfg(test)]
mod testing;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, StoreBackend};
use crate::llm_client::{GenerativeModel, LlmClient};
use crate::routes::build_router;
use crate::session::{MemoryStore, RedisStore, SessionStore};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Ascend API v{}", env!("CARGO_PKG_VERSION"));

    // Session store
    let store: Arc<dyn SessionStore> = match config.store_backend {
        StoreBackend::Redis => {
            Arc::new(RedisStore::connect(&config.redis_url, config.session_ttl_seconds).await?)
        }
        StoreBackend::Memory => {
            info!("In-memory session store (state is lost on restart)");
            Arc::new(MemoryStore::new())
        }
    };

    // Initialize LLM client
    let llm = LlmClient::new(&config)?;
    info!(
        "LLM client initialized (model: {}, attempts: {})",
        llm.model(),
        config.llm_max_attempts
    );
    let model: Arc<dyn GenerativeModel> = Arc::new(llm);

    let state = AppState::new(store, model, config.clone());

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS origins to the deployed frontend

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
