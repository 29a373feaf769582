//! Timer server implementation
//!
//! Ties the store, the tick scheduler and the HTTP router together.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::Router;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::ConfigError;
use crate::storage::SharedTimerStore;
use crate::ticker::TickScheduler;

use super::api::create_router;
use super::config::ServerConfig;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Timer store
    pub store: SharedTimerStore,

    /// Server start time
    pub start_time: Instant,

    /// Configuration
    pub config: ServerConfig,
}

// ============================================================================
// Timer Server
// ============================================================================

/// HTTP server plus the tick loop that drives the store
pub struct TimerServer {
    config: ServerConfig,
    tick_period: Duration,
    state: AppState,
}

impl TimerServer {
    /// Create a new server over an opened store
    pub fn new(
        config: ServerConfig,
        store: SharedTimerStore,
        tick_period: Duration,
    ) -> Result<Self, ServerError> {
        config.validate()?;
        if tick_period.is_zero() {
            return Err(ServerError::Config(ConfigError::InvalidValue {
                field: "ticker.interval_ms".to_string(),
                reason: "must be greater than 0".to_string(),
            }));
        }

        let state = AppState {
            store,
            start_time: Instant::now(),
            config: config.clone(),
        };

        Ok(Self {
            config,
            tick_period,
            state,
        })
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if let Some(dir) = &self.config.static_dir {
            router = router.fallback_service(ServeDir::new(dir));
        }

        // Add CORS layer if enabled
        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        // Add tracing layer if enabled
        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Serve until `shutdown_signal` resolves, then stop the tick loop
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.bind_address;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        tracing::info!(
            %addr,
            backend = self.state.store.backend(),
            "Starting timer server (with graceful shutdown)"
        );

        let ticker = TickScheduler::new(self.state.store.clone(), self.tick_period).start();

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await;

        ticker.shutdown().await;
        served.map_err(ServerError::Serve)?;

        tracing::info!("Timer server shutdown complete");
        Ok(())
    }

    /// Get server info
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            bind_address: self.config.bind_address,
            backend: self.state.store.backend(),
            tick_period: self.tick_period,
            cors_enabled: self.config.enable_cors,
            request_logging_enabled: self.config.enable_request_logging,
            static_dir: self.config.static_dir.clone(),
        }
    }
}

/// Server information
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub bind_address: SocketAddr,
    pub backend: &'static str,
    pub tick_period: Duration,
    pub cors_enabled: bool,
    pub request_logging_enabled: bool,
    pub static_dir: Option<String>,
}

impl ServerInfo {
    /// Format as display string
    pub fn display(&self) -> String {
        format!(
            "Chronometer Server\n\
             {:-<40}\n\
             Bind Address: {}\n\
             Storage: {}\n\
             Tick Period: {}ms\n\
             CORS: {}\n\
             Request Logging: {}\n\
             Static Files: {}",
            "",
            self.bind_address,
            self.backend,
            self.tick_period.as_millis(),
            if self.cors_enabled { "enabled" } else { "disabled" },
            if self.request_logging_enabled { "enabled" } else { "disabled" },
            self.static_dir.as_deref().unwrap_or("none"),
        )
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Failed to bind to address
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Server error
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================
