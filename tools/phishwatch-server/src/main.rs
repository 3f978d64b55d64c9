mod config;
mod error;
mod routes;
mod state;

use std::path::Path;
use std::sync::Arc;

use phishwatch_core::allowlist::MarketingAllowlist;
use phishwatch_core::resolver::Resolver;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() {
    // Logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Config (panics on malformed values, fail-fast)
    let config = Config::from_env();
    let port = config.port;

    // One allowlist snapshot for the life of the process
    let allowlist = Arc::new(MarketingAllowlist::load_or_empty(
        config.allowlist_path.as_deref().map(Path::new),
    ));

    // One shared HTTP client behind the resolver
    let resolver = Resolver::new(config.resolver_config(), allowlist)
        .expect("failed to build resolver HTTP client");

    info!(
        max_concurrent = config.max_concurrent_resolves,
        queue_ms = config.resolve_queue.as_millis() as u64,
        timeout_ms = config.resolver_timeout.as_millis() as u64,
        "resolver ready"
    );

    let cors_permissive = config.cors_permissive;
    let state = AppState::new(config, resolver);

    // Router
    let mut app = routes::router()
        .with_state(state)
        .layer(TraceLayer::new_for_http());
    if cors_permissive {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = format!("0.0.0.0:{port}");
    info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app).await.expect("server error");
}
