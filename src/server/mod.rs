//! Read API over the draw store.
//!
//! Every response uses the `{ success, data, error: { code, message } }`
//! envelope.

mod handlers;
mod types;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::error::{AppError, Result};
use crate::models::{Config, ServerConfig};
use crate::pipeline::SyncCoordinator;
use crate::storage::DrawStore;

use handlers::{game_types, health, heatmap, results, sync_status, trigger_sync};
use types::RouterState;

pub struct HttpServer {
    state: RouterState,
    addr: SocketAddr,
}

impl HttpServer {
    pub fn new(
        store: Arc<dyn DrawStore>,
        coordinator: Arc<SyncCoordinator>,
        config: &Config,
    ) -> Self {
        Self {
            state: RouterState {
                store,
                coordinator,
                query: config.query.clone(),
                schedule: config.schedule.clone(),
            },
            addr: socket_addr(&config.server),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until ctrl-c.
    pub async fn serve(self) -> Result<()> {
        let app = build_router(self.state);
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        log::info!("HTTP server listening on {}", self.addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(AppError::server)
    }
}

fn socket_addr(config: &ServerConfig) -> SocketAddr {
    let ip: IpAddr = config.host.parse().unwrap_or_else(|_| {
        log::warn!("Invalid server.host '{}'; using 127.0.0.1", config.host);
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    });
    SocketAddr::new(ip, config.port)
}

fn build_router(state: RouterState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/results", get(results))
        .route("/heatmap", get(heatmap))
        .route("/game-types", get(game_types))
        .route("/sync/status", get(sync_status))
        .route("/sync", post(trigger_sync))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down HTTP server");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr_from_config() {
        let config = ServerConfig {
            host: "0.0.0.0".into(),
            port: 9000,
        };
        assert_eq!(socket_addr(&config).to_string(), "0.0.0.0:9000");
    }

    #[test]
    fn test_invalid_host_falls_back_to_localhost() {
        let config = ServerConfig {
            host: "not a host".into(),
            port: 8080,
        };
        assert_eq!(socket_addr(&config).to_string(), "127.0.0.1:8080");
    }
}
