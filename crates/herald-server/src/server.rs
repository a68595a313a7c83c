//! `HeraldServer`: axum HTTP + WebSocket gateway.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::health::{self, HealthResponse};
use crate::hub::Hub;
use crate::registry::CommandRegistry;
use crate::shutdown::Shutdown;
use crate::websocket::session::{SessionOptions, run_ws_session};

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Command dispatcher and its hub.
    pub dispatcher: Dispatcher,
    /// Per-connection tunables.
    pub options: SessionOptions,
    /// Largest accepted frame in bytes.
    pub max_frame_bytes: usize,
    /// Shutdown signal.
    pub shutdown: Shutdown,
    /// When the server started.
    pub start_time: Instant,
}

/// The Herald server.
pub struct HeraldServer {
    config: ServerConfig,
    dispatcher: Dispatcher,
    shutdown: Shutdown,
    start_time: Instant,
}

impl HeraldServer {
    /// Create a server around a command registry and a fresh hub.
    pub fn new(config: ServerConfig, registry: CommandRegistry) -> Self {
        Self {
            config,
            dispatcher: Dispatcher::new(Arc::new(registry), Arc::new(Hub::new())),
            shutdown: Shutdown::new(),
            start_time: Instant::now(),
        }
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            dispatcher: self.dispatcher.clone(),
            options: SessionOptions::from(&self.config),
            max_frame_bytes: self.config.max_frame_bytes,
            shutdown: self.shutdown.clone(),
            start_time: self.start_time,
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/ws", get(ws_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the configured address and serve until shutdown is triggered.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.shutdown.token();

        info!(%addr, "herald listening");
        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = served {
                error!(error = %e, "server terminated with error");
            }
        });
        Ok((addr, handle))
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Get the shared registries.
    pub fn hub(&self) -> &Arc<Hub> {
        self.dispatcher.hub()
    }

    /// Get the shutdown signal.
    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let hub = state.dispatcher.hub();
    Json(health::health_check(
        state.start_time,
        hub.session_count(),
        hub.topic_count(),
    ))
}

/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.max_message_size(state.max_frame_bytes)
        .max_frame_size(state.max_frame_bytes)
        .on_upgrade(move |socket| {
            run_ws_session(
                socket,
                state.dispatcher,
                state.options,
                state.shutdown.token(),
            )
        })
}
