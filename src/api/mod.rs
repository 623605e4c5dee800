//! REST control API for the health-monitoring daemon
//!
//! ## Endpoints
//!
//! - `GET /health` - Liveness of the daemon itself
//! - `POST /healthcheck/dns` - Create a DNS probe (periodic or one-off)
//! - `POST /healthcheck/tcp` - Create a TCP probe (periodic or one-off)
//! - `POST /healthcheck/http` - Create an HTTP probe (periodic or one-off)
//! - `GET /healthcheck` - List registered probes
//! - `GET /healthcheck/{name}` - Show one registered probe
//! - `DELETE /healthcheck/{name}` - Remove a registered probe
//! - `POST /healthcheck/{name}/run` - Execute a registered probe now

#[cfg(feature = "api")]
pub mod error;
#[cfg(feature = "api")]
pub mod middleware;
#[cfg(feature = "api")]
pub mod routes;
#[cfg(feature = "api")]
pub mod state;
#[cfg(feature = "api")]
pub mod types;

#[cfg(feature = "api")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "api")]
pub use state::ApiState;
#[cfg(feature = "api")]
pub use types::{BasicResponse, HealthResponse};

#[cfg(feature = "api")]
use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
#[cfg(feature = "api")]
use tracing::info;

use crate::config::ApiSettings;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:9013")
    pub bind_addr: SocketAddr,

    /// Optional authentication token
    pub auth_token: Option<String>,

    /// Enable permissive CORS
    pub enable_cors: bool,
}

impl From<&ApiSettings> for ApiConfig {
    fn from(settings: &ApiSettings) -> Self {
        Self {
            bind_addr: SocketAddr::new(settings.host, settings.port),
            auth_token: settings.token.clone(),
            enable_cors: settings.cors,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::from(&ApiSettings::default())
    }
}

/// Build the router with all routes and layers
#[cfg(feature = "api")]
pub fn router(config: &ApiConfig, state: ApiState) -> Router {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/healthcheck", get(routes::checks::list_checks))
        .route("/healthcheck/dns", post(routes::checks::create_dns_check))
        .route("/healthcheck/tcp", post(routes::checks::create_tcp_check))
        .route("/healthcheck/http", post(routes::checks::create_http_check))
        .route(
            "/healthcheck/:name",
            get(routes::checks::get_check).delete(routes::checks::remove_check),
        )
        .route("/healthcheck/:name/run", post(routes::checks::run_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    if let Some(token) = config.auth_token.clone() {
        app = app.layer(axum::middleware::from_fn_with_state(
            token,
            middleware::auth::auth_middleware,
        ));
    }

    app
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
#[cfg(feature = "api")]
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind_addr);

    let app = router(&config, state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
