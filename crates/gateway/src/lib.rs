//! HTTP gateway for Promptwright.
//!
//! Serves the landing page, a health check and `POST /ask`, which runs one
//! orchestrator turn against the session named by the caller's cookie.
//!
//! Built on Axum.

pub mod ask;
pub mod cookie;
pub mod frontend;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use promptwright_core::session::SessionStore;
use promptwright_orchestrator::Orchestrator;
use promptwright_sessions::InMemorySessionStore;

/// Shared application state for the gateway.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub sessions: Arc<dyn SessionStore>,
    pub cookie_name: String,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, sessions: Arc<dyn SessionStore>) -> Self {
        let defaults = promptwright_config::AppConfig::default();
        Self {
            orchestrator,
            sessions,
            cookie_name: defaults.session.cookie_name,
            max_body_bytes: defaults.gateway.max_body_bytes,
        }
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }
}

pub type SharedState = Arc<AppState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let body_limit = state.max_body_bytes;
    Router::new()
        .route("/health", get(health_handler))
        .route("/ask", post(ask::ask_handler))
        .with_state(state)
        .merge(frontend::frontend_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Whether `host` only accepts connections from this machine.
fn is_loopback(host: &str) -> bool {
    host.eq_ignore_ascii_case("localhost")
        || host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

/// Start the gateway HTTP server.
///
/// Builds the provider, orchestrator and session store once from `config`
/// and serves until Ctrl-C.
pub async fn start(config: promptwright_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let host = config.gateway.host.clone();
    let port = config.gateway.port;

    if !is_loopback(&host) && !config.gateway.allow_public_bind {
        return Err(format!(
            "refusing to bind to {host}: set gateway.allow_public_bind = true to expose the server"
        )
        .into());
    }

    let provider = promptwright_providers::build_from_config(&config)?;
    let orchestrator = Arc::new(Orchestrator::from_config(provider, &config));

    let store = Arc::new(InMemorySessionStore::from_config(&config.session));
    if config.session.idle_ttl_minutes > 0 {
        spawn_session_janitor(store.clone());
    }

    let state = Arc::new(
        AppState::new(orchestrator, store)
            .with_cookie_name(&config.session.cookie_name)
            .with_max_body_bytes(config.gateway.max_body_bytes),
    );
    let app = build_router(state);

    let addr = format!("{host}:{port}");
    info!(
        addr = %addr,
        model = %config.default_model,
        failure_policy = ?config.session.failure_policy,
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

/// Periodically drop idle sessions nobody is asking for.
fn spawn_session_janitor(store: Arc<InMemorySessionStore>) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(60));
        loop {
            tick.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => debug!(purged, "Purged idle sessions"),
                Err(e) => warn!(error = %e, "Session purge failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    provider: ProviderHealth,
}

#[derive(Serialize)]
struct ProviderHealth {
    name: String,
    model: String,
    reachable: bool,
}

/// Liveness plus upstream reachability. Always 200 while the process serves.
async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let orchestrator = &state.orchestrator;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        provider: ProviderHealth {
            name: orchestrator.provider_name().to_string(),
            model: orchestrator.model().to_string(),
            reachable: orchestrator.provider_reachable().await,
        },
    })
}
