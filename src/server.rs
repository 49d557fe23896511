//! HTTP listener and WebSocket upgrade entry point
//!
//! This module wires the session core into an Axum router:
//! - the WebSocket endpoint validates method and origin, then hands the upgraded
//!   connection to a [`ConnectionSession`]
//! - the landing endpoint answers `GET` with a fixed body
//! - [`spawn`] and [`serve`] run the router on a TCP listener with graceful shutdown

use axum::{
    Router,
    extract::{ State, ws::{ WebSocketUpgrade, rejection::WebSocketUpgradeRejection } },
    response::{ IntoResponse, Response },
    routing::{ any, get },
};
use http::{ HeaderMap, Method, StatusCode, Uri, header };
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::config::ServerOptions;
use crate::errors::Error;
use crate::origin::OriginValidator;
use crate::session::{ ConnectionSession, SessionConfig };
use crate::text::MessageCounter;

/// Body returned by the landing endpoint
pub const LANDING_BODY: &str = "WebSockets!\n";

/// Shared application state for the router
#[derive(Clone)]
struct AppState {
    validator: Arc<OriginValidator>,
    counter: Arc<MessageCounter>,
    session_config: SessionConfig,
    max_message_size: usize,
}

/// Build the router with a fresh message counter
pub fn router(options: &ServerOptions) -> Router {
    router_with_counter(options, Arc::new(MessageCounter::new()))
}

/// Build the router around an existing message counter
pub fn router_with_counter(options: &ServerOptions, counter: Arc<MessageCounter>) -> Router {
    let state = AppState {
        validator: Arc::new(OriginValidator::from_options(options)),
        counter,
        session_config: SessionConfig::from_options(options),
        max_message_size: options.max_message_size,
    };

    Router::new()
        .route(&options.landing_path, get(landing_handler))
        .route(&options.websocket_path, any(ws_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn landing_handler() -> &'static str {
    LANDING_BODY
}

/// WebSocket upgrade handler
///
/// Rejections happen before any session state is allocated: non-GET requests get
/// 405, malformed upgrades get the extractor's own rejection, and disallowed
/// origins get 403.
async fn ws_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>
) -> Response {
    if method != Method::GET {
        return (StatusCode::METHOD_NOT_ALLOWED, "method not allowed").into_response();
    }

    let ws = match upgrade {
        Ok(ws) => ws,
        Err(rejection) => {
            tracing::warn!("upgrade error: {}", rejection);
            return rejection.into_response();
        }
    };

    let origin = headers.get(header::ORIGIN).and_then(|value| value.to_str().ok());
    if !state.validator.check(origin, uri.path()) {
        return (StatusCode::FORBIDDEN, "origin not allowed").into_response();
    }

    let AppState { counter, session_config, max_message_size, .. } = state;
    ws.max_message_size(max_message_size)
        .max_frame_size(max_message_size)
        .on_failed_upgrade(|e| tracing::warn!("upgrade error: {}", e))
        .on_upgrade(move |socket| async move {
            let session = ConnectionSession::new(socket, session_config, counter);
            let id = session.id();
            tracing::info!("New WebSocket client connected: {}", id);
            let reason = session.run().await;
            tracing::info!("WebSocket client {} disconnected: {:?}", id, reason);
        })
}

/// Handle for a running server, used for shutdown
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join_handle: JoinHandle<Result<(), Error>>,
}

impl ServerHandle {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for the server task to finish
    pub async fn shutdown(mut self) -> Result<(), Error> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.join_handle.await.map_err(|e| Error::transport(format!("server task failed: {}", e)))?
    }
}

/// Bind the listener and run the server in a background task
pub async fn spawn(options: ServerOptions) -> Result<ServerHandle, Error> {
    options.validate()?;
    let listener = TcpListener::bind(options.bind_address).await?;
    let local_addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let join_handle = tokio::spawn(
        serve_listener(listener, options, async {
            let _ = shutdown_rx.await;
        })
    );

    Ok(ServerHandle {
        local_addr,
        shutdown_tx: Some(shutdown_tx),
        join_handle,
    })
}

/// Run the server until Ctrl-C
pub async fn serve(options: ServerOptions) -> Result<(), Error> {
    options.validate()?;
    let listener = TcpListener::bind(options.bind_address).await?;
    serve_listener(listener, options, shutdown_signal()).await
}

/// Serve the router on an already-bound listener until `signal` resolves
pub async fn serve_listener<F>(
    listener: TcpListener,
    options: ServerOptions,
    signal: F
) -> Result<(), Error>
    where F: Future<Output = ()> + Send + 'static
{
    let app = router(&options);
    let local_addr = listener.local_addr()?;
    tracing::info!("WebSocket server started at ws://{}{}", local_addr, options.websocket_path);

    axum::serve(listener, app).with_graceful_shutdown(signal).await?;

    tracing::info!("WebSocket server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("WebSocket server shutting down");
}
