//! Launchpad Server - consortium catalog item view
//!
//! REST API over the shared catalog database and partner Z39.50 catalogs.

use anyhow::Context;
use axum::{routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use launchpad_server::{api, config::AppConfig, repository::Repository, services::Services, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("launchpad_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Launchpad Server v{}", env!("CARGO_PKG_VERSION"));

    // The catalog database is read-only to this service: no migrations
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to catalog database")?;

    tracing::info!("Connected to catalog database");

    for server in &config.z3950.servers {
        tracing::info!(
            "Partner catalog {} at {}:{}/{} ({:?}, {})",
            server.library,
            server.address,
            server.port,
            server.database,
            server.dialect,
            server.syntax.name()
        );
    }

    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    let repository = Repository::new(pool, config.catalog.index_codes.clone());
    let services = Services::new(repository, &config);

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = create_router(state);

    let addr = SocketAddr::new(
        server_host.parse().context("Invalid host address")?,
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Items
        .route("/items/:bib_id", get(api::items::get_item))
        .route("/bibs/:bib_id", get(api::items::get_bib))
        // Lookups
        .route("/lookup/:scheme/:number", get(api::items::lookup_standard_number))
        .route("/partners/:library/:key", get(api::items::lookup_partner_key))
        // Z39.50
        .route("/z3950/:library/:scheme/:number", get(api::z3950::remote_holdings))
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
