// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP server lifecycle -- binds the listener, serves the Divide & Draw
// routes, and shuts down gracefully on request.
//
// # Routes
//
//   - GET  /          liveness message
//   - POST /convert   photo to line sketch
//   - POST /evaluate  accuracy of a user drawing against a reference
//   - POST /enhance   generative polishing of a merged drawing
//
// Every route answers cross-origin requests from any origin with any method
// and header.  Request bodies are capped at `AppConfig::max_request_bytes`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use divdraw_core::config::AppConfig;
use divdraw_core::error::{DivDrawError, Result};
use divdraw_core::types::ServerStatus;

use crate::enhance::{self, GenerativeBackend};
use crate::handlers;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Per-request context shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn GenerativeBackend>,
}

impl AppState {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self { backend }
    }

    /// Build the state described by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(enhance::backend_from_config(&config.enhance)?))
    }
}

/// Assemble the application router.
pub fn router(state: AppState, max_request_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/convert", post(handlers::convert))
        .route("/evaluate", post(handlers::evaluate))
        .route("/enhance", post(handlers::enhance))
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// SketchServer
// ---------------------------------------------------------------------------

/// The Divide & Draw HTTP server.
///
/// Created in `Stopped` state; [`start`](Self::start) binds and spawns the
/// serve task, [`stop`](Self::stop) signals a graceful shutdown and waits for
/// in-flight requests to finish.
pub struct SketchServer {
    /// Address requested in configuration (port 0 picks a free port).
    bind_addr: SocketAddr,
    /// Body size cap applied to every route.
    max_request_bytes: usize,
    /// Handler context.
    state: AppState,
    /// Current lifecycle state of the server.
    status: ServerStatus,
    /// Address actually bound while running.
    local_addr: Option<SocketAddr>,
    /// Notification handle used to signal a graceful shutdown.
    shutdown_signal: Arc<Notify>,
    /// Handle to the Tokio task running `axum::serve`.
    task_handle: Option<JoinHandle<std::io::Result<()>>>,
}

impl SketchServer {
    /// Create a server from configuration, selecting the generative backend
    /// from `config.enhance`.
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self::with_state(config, AppState::from_config(config)?))
    }

    /// Create a server with an explicit handler context.
    pub fn with_state(config: &AppConfig, state: AppState) -> Self {
        Self {
            bind_addr: config.bind_addr(),
            max_request_bytes: config.max_request_bytes,
            state,
            status: ServerStatus::Stopped,
            local_addr: None,
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
        }
    }

    /// Return the current server status.
    pub fn status(&self) -> ServerStatus {
        self.status
    }

    /// Address the listener is bound to, while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Bind the listener and start serving in a background task.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is already in use or the listener
    /// cannot be created.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if let (ServerStatus::Running, Some(addr)) = (self.status, self.local_addr) {
            debug!(%addr, "Server already running");
            return Ok(addr);
        }

        self.status = ServerStatus::Starting;

        let listener = match TcpListener::bind(self.bind_addr).await {
            Ok(listener) => listener,
            Err(err) => {
                self.status = ServerStatus::Stopped;
                return Err(DivDrawError::Server(format!("bind {}: {err}", self.bind_addr)));
            }
        };
        let addr = listener.local_addr()?;

        let app = router(self.state.clone(), self.max_request_bytes);
        let shutdown = Arc::clone(&self.shutdown_signal);
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.notified().await })
                .await
        });

        self.task_handle = Some(handle);
        self.local_addr = Some(addr);
        self.status = ServerStatus::Running;
        info!(%addr, "Divide & Draw server listening");
        Ok(addr)
    }

    /// Gracefully stop the server and wait for the serve task to exit.
    pub async fn stop(&mut self) -> Result<()> {
        if self.status != ServerStatus::Running {
            return Ok(());
        }

        info!(addr = ?self.local_addr, "Stopping server");
        self.shutdown_signal.notify_one();

        if let Some(handle) = self.task_handle.take() {
            handle
                .await
                .map_err(|err| DivDrawError::Server(format!("task join: {err}")))??;
        }

        self.local_addr = None;
        self.status = ServerStatus::Stopped;
        info!("Server stopped");
        Ok(())
    }
}
