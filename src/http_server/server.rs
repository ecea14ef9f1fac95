//! # HTTP Server
//!
//! Router assembly for the poll API and the realtime WebSocket endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::poll::{PollError, PollResult, TallyStore};
use crate::realtime::BroadcastHub;

use super::config::HttpServerConfig;
use super::poll_routes::poll_routes;
use super::realtime_routes::realtime_routes;

/// State shared by every handler
pub struct AppState {
    pub store: Arc<TallyStore>,
    pub hub: Arc<BroadcastHub>,
    /// Expected admin bearer token; None disables the admin surface
    pub admin_token: Option<String>,
}

/// HTTP server for the poll engine
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a server over the given store and hub
    pub fn new(config: HttpServerConfig, store: Arc<TallyStore>, hub: Arc<BroadcastHub>) -> Self {
        let state = Arc::new(AppState {
            store,
            hub,
            admin_token: config.admin_token.clone(),
        });
        let router = Self::build_router(&config, state);
        Self { config, router }
    }

    /// Build the combined router
    fn build_router(config: &HttpServerConfig, state: Arc<AppState>) -> Router {
        let cors = if config.cors_origins.is_empty() {
            // No origins configured: permissive for development
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            use tower_http::cors::AllowOrigin;
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            // Poll REST operations under /api
            .nest("/api", poll_routes(Arc::clone(&state)))
            // WebSocket endpoint under /api/realtime
            .nest("/api/realtime", realtime_routes(state))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind and serve until the process stops
    pub async fn start(self) -> PollResult<()> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|e| PollError::InvalidArgument(format!("invalid bind address: {}", e)))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| PollError::Internal(format!("bind {}: {}", addr, e)))?;

        info!(%addr, "poll server listening");

        axum::serve(listener, self.router)
            .await
            .map_err(|e| PollError::Internal(format!("serve: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_server(config: HttpServerConfig) -> HttpServer {
        HttpServer::new(
            config,
            Arc::new(TallyStore::new()),
            Arc::new(BroadcastHub::new()),
        )
    }

    #[test]
    fn test_server_socket_addr() {
        let server = test_server(HttpServerConfig::with_port(8080));
        assert_eq!(server.socket_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_router_builds() {
        let server = test_server(HttpServerConfig::default());
        let _router = server.router();
    }

    #[test]
    fn test_router_builds_with_permissive_cors() {
        let config = HttpServerConfig {
            cors_origins: Vec::new(),
            ..Default::default()
        };
        let _router = test_server(config).router();
    }
}
