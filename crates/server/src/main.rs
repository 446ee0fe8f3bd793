//! Order Portal - Back-office API server.
//!
//! Serves the portal JSON API and runs the query-expiration scheduler in the
//! background. The scheduler is stopped gracefully after the HTTP server
//! drains: no new sweeps are scheduled and the in-flight one finishes.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use order_portal_server::config::ServerConfig;
use order_portal_server::db::{
    self, OrderStore, PgOrderStore, PgQueryStore, PgUserStore, QueryStore, UserStore,
};
use order_portal_server::routes;
use order_portal_server::services::{DisabledMailer, ExpiryScheduler, Mailer, SmtpMailer};
use order_portal_server::state::AppState;

#[tokio::main]
async fn main() {
    // Load configuration from environment
    let config = ServerConfig::from_env().expect("Failed to load configuration");

    // Initialize tracing with EnvFilter.
    // Defaults to info level for our crate if RUST_LOG is not set.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "order_portal_server=info,tower_http=debug".into());

    // JSON format for structured log shipping, text format locally
    let is_json = std::env::var("LOG_JSON").is_ok();
    let json_layer = is_json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!is_json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();

    // Initialize database connection pool and bring the schema up to date
    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    // Store and transport seams
    let orders: Arc<dyn OrderStore> = Arc::new(PgOrderStore::new(pool.clone()));
    let queries: Arc<dyn QueryStore> = Arc::new(PgQueryStore::new(pool.clone()));
    let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
    let mailer: Arc<dyn Mailer> = match &config.email {
        Some(email) => Arc::new(SmtpMailer::new(email).expect("Failed to create SMTP transport")),
        None => Arc::new(DisabledMailer),
    };

    // Start the expiry scheduler: first sweep immediately, then recurring
    let scheduler = Arc::new(ExpiryScheduler::new(
        queries.clone(),
        users.clone(),
        mailer.clone(),
    ));
    let scheduler_handle = scheduler.start();

    // Build application state
    let state = AppState::new(config.clone(), pool, orders, queries, users, mailer);

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = config.socket_addr();
    tracing::info!("order portal listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // Let the in-flight sweep finish before the process exits
    scheduler_handle.shutdown().await;
}

/// Build the CORS layer: the configured client origin, or none.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match &config.client_url {
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(origin) => layer.allow_origin(origin),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring unparseable CLIENT_URL");
                layer
            }
        },
        None => layer,
    }
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
