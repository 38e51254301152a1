//! nano-trigger-gateway
//!
//! Gateway service for the GET Nano device-control API: local trigger
//! endpoints, upstream status proxying, and a client-owned auto-trigger
//! interval loop.

mod api;
mod client;
mod config;
mod error;
mod models;
mod trigger;

use std::net::SocketAddr;
use std::sync::Arc;

use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::AppState;
use crate::client::NanoClient;
use crate::trigger::AutoTrigger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nano_trigger_gateway=info,tower_http=debug".into()),
        )
        .init();

    tracing::info!("Starting nano-trigger-gateway...");

    // Load configuration
    let config = Arc::new(config::Config::load()?);
    tracing::info!("Configuration loaded (upstream: {})", config.upstream.base_url);

    // Shared upstream client and loop controller
    let client = Arc::new(NanoClient::new(&config.upstream.base_url, &config.trigger));
    let auto_trigger = Arc::new(AutoTrigger::new(client.clone()));

    let state = AppState {
        client,
        auto_trigger,
        config: config.clone(),
    };

    // Build application router
    let cors = CorsLayer::permissive();

    let app = api::routes().with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
