//! Warden API server.
//!
//! An axum front end over [`warden_auth::AuthService`]:
//!
//! - **Routes**: register, login, token refresh and logout, plus role-gated
//!   example paths
//! - **Middleware**: bearer-token extraction and the [`RoleGateLayer`]
//! - **Config**: layered defaults, file and `WARDEN__*` environment
//! - **Errors**: [`ApiError`] and its JSON envelope
//!
//! [`RoleGateLayer`]: middleware::RoleGateLayer

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod middleware;
pub mod request;
pub mod response;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;

use anyhow::Context;
use axum::Router;
use config::SessionBackend;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use warden_auth::{AuthService, MemorySessionStore, RedisSessionStore, RedisStoreConfig, SessionStore};

/// Server builder for constructing and running the API server.
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Create a new server with the given configuration.
    ///
    /// Connects to the session store, so a Redis backend must be reachable.
    pub async fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let store = build_session_store(&config).await?;
        let auth = AuthService::builder(config.auth.clone())
            .session_store(store)
            .retry(config.session_store.retry_policy())
            .build()
            .context("Failed to build auth service")?;

        Ok(Self {
            state: AppState::new(Arc::new(auth)),
            config,
        })
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        routes::create_router(self.state.clone(), self.config.server.request_timeout())
    }

    /// Run the server, binding to the configured address.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        let sweeper = self.spawn_sweeper();
        info!(%addr, "Server listening");

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await;

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }
        result.context("Server error")
    }

    /// Get the server's socket address.
    pub fn addr(&self) -> SocketAddr {
        self.config.socket_addr()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    fn spawn_sweeper(&self) -> Option<JoinHandle<()>> {
        let interval = self.config.session_store.sweep_interval()?;
        info!(interval_secs = interval.as_secs(), "Starting session sweeper");
        Some(self.state.auth.spawn_sweeper(interval))
    }
}

async fn build_session_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn SessionStore>> {
    let store_config = &config.session_store;
    match store_config.backend {
        SessionBackend::Memory => {
            info!(backend = "memory", "Using in-process session store");
            Ok(Arc::new(MemorySessionStore::new()))
        }
        SessionBackend::Redis => {
            let url = store_config
                .redis_url
                .clone()
                .context("session_store.redis_url is required for the redis backend")?;
            let mut redis_config = RedisStoreConfig::new(url);
            redis_config.key_prefix = store_config.key_prefix.clone();
            redis_config.op_timeout = store_config.op_timeout();

            let store = RedisSessionStore::connect(&redis_config)
                .await
                .context("Failed to connect to redis session store")?;
            info!(backend = "redis", prefix = %redis_config.key_prefix, "Using redis session store");
            Ok(Arc::new(store))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
