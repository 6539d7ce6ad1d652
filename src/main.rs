// Define data modules
mod config; // Environment-driven settings
mod error; // Error taxonomy and HTTP mapping
mod logic; // Range overlap, index order, merge
mod models; // Data structures (Event, payloads, Db, etc.)
mod routes_events; // HTTP handlers for event APIs
mod store; // Persistent storage (JSON file or in-memory)
mod validation; // Request checks before persistence

use std::sync::Arc;

use axum::Router;
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, StoreBackend};
use crate::store::{EventStore, JsonFileStore, MemoryStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn build_store(config: &Config) -> Arc<dyn EventStore> {
    match config.store {
        StoreBackend::File => {
            let store = JsonFileStore::new(&config.data_path);
            info!(path = %store.path().display(), "using JSON file store");
            Arc::new(store)
        }
        StoreBackend::Memory => {
            info!("using in-memory store, events are lost on exit");
            Arc::new(MemoryStore::new())
        }
    }
}

fn build_app(config: &Config, state: AppState) -> Router {
    Router::new()
        .nest("/api", routes_events::router())
        .fallback_service(ServeDir::new(&config.static_dir))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(error::panic_response))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = Config::load()?;
    let state = AppState {
        store: build_store(&config),
    };
    let app = build_app(&config, state);

    let listener = tokio::net::TcpListener::bind(config.listen_target()).await?;
    let addr = listener.local_addr()?;

    info!("Server running at http://{}", addr);
    info!("Static files: {}", config.static_dir.display());
    info!("API base:     http://{}/api", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
