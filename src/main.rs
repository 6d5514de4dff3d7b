mod aggregator;
mod config;
mod routes;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::services::ServeDir;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::aggregator::Aggregator;
use crate::config::Config;
use crate::routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "swipe_news=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load("sources.toml")?;
    info!("Loaded {} sources from configuration", config.sources.len());

    // Create app state
    let state = Arc::new(AppState {
        aggregator: Arc::new(Aggregator::new(&config)),
    });

    // Build router
    let app = Router::new()
        .route("/", get(routes::index))
        .route("/api/news", get(routes::news))
        .route("/health", get(routes::health))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    info!("Server starting on http://localhost:3000");

    axum::serve(listener, app).await?;

    Ok(())
}
