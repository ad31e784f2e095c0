use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::DefaultBodyLimit,
        routing::get,
    },
    tower_http::cors::{Any, CorsLayer},
    tracing::info,
};

use {
    crate::relay_routes::{relay_handler, usage_handler},
    hookbridge_config::RelayConfig,
};

/// Upper bound on the inbound request body (uploads included).
pub const MAX_INBOUND_BODY_BYTES: usize = 64 * 1024 * 1024;

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    /// One client for both remote fetches and webhook dispatch.
    pub client: reqwest::Client,
}

impl AppState {
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config: Arc::new(config),
            client: reqwest::Client::new(),
        }
    }
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the relay router (shared between production startup and tests).
pub fn build_relay_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(usage_handler).post(relay_handler))
        .layer(DefaultBodyLimit::max(MAX_INBOUND_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn run_gateway(bind: &str, port: u16, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let app = build_relay_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
