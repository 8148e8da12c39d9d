//! Ingest WebSocket server.
//!
//! Listens on a TCP port, upgrades HTTP GET `/ws` to WebSocket, and runs
//! one [`Session`] per connection. Sessions are independent; any number
//! may be active at once.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::accept_hdr_async_with_config;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use mcft_protocol::constants::{DEFAULT_PORT, WS_MAX_MESSAGE_SIZE, WS_PATH};

use crate::ServerError;
use crate::context::Services;
use crate::session::Session;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port to listen on (0 = OS-assigned).
    pub port: u16,
    /// Largest accepted WebSocket message and frame.
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_message_size: WS_MAX_MESSAGE_SIZE,
        }
    }
}

pub struct IngestServer {
    config: ServerConfig,
    services: Arc<Services>,
    cancel: CancellationToken,
    local_addr: Mutex<Option<SocketAddr>>,
    active: Arc<AtomicUsize>,
}

impl IngestServer {
    pub fn new(config: ServerConfig, services: Services) -> Arc<Self> {
        Arc::new(Self {
            config,
            services: Arc::new(services),
            cancel: CancellationToken::new(),
            local_addr: Mutex::new(None),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Returns the local address the server is listening on.
    ///
    /// Only available after [`run`](Self::run) binds the socket.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().await
    }

    /// Returns the listening port (0 if not yet bound).
    pub async fn port(&self) -> u16 {
        self.local_addr.lock().await.map(|a| a.port()).unwrap_or(0)
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    /// Number of sessions currently running.
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Stops accepting connections and ends idle sessions.
    ///
    /// Sessions are cancelled between requests, so each still finalizes
    /// its open file.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Runs the server until cancellation.
    pub async fn run(self: &Arc<Self>) -> Result<(), ServerError> {
        let listener = {
            let mut bound = self.local_addr.lock().await;
            if bound.is_some() {
                return Err(ServerError::AlreadyRunning);
            }
            let addr: SocketAddr = ([0, 0, 0, 0], self.config.port).into();
            let listener = TcpListener::bind(addr).await?;
            *bound = Some(listener.local_addr()?);
            listener
        };
        tracing::info!("ingest server listening on {}{WS_PATH}", listener.local_addr()?);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!(active = self.active_sessions(), "server shutting down");
                    break Ok(());
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let server = Arc::clone(self);
                            let span = tracing::info_span!("session", %peer_addr);
                            tokio::spawn(
                                async move {
                                    if let Err(e) = server.handle_connection(stream).await {
                                        tracing::warn!("connection error: {e}");
                                    }
                                }
                                .instrument(span),
                            );
                        }
                        Err(e) => {
                            tracing::error!("accept error: {e}");
                        }
                    }
                }
            }
        }
    }

    /// Upgrades one TCP connection and runs its session.
    async fn handle_connection(&self, stream: TcpStream) -> Result<(), ServerError> {
        let mut ws_config = WebSocketConfig::default();
        ws_config.max_message_size = Some(self.config.max_message_size);
        ws_config.max_frame_size = Some(self.config.max_message_size);
        let ws_stream = accept_hdr_async_with_config(stream, check_path, Some(ws_config)).await?;
        tracing::debug!("WebSocket connection established");

        let _active = ActiveGuard::enter(&self.active);
        let session = Session::new(
            ws_stream,
            Arc::clone(&self.services),
            self.cancel.child_token(),
        );
        let report = session.run().await;

        match &report.result {
            Ok(end) => tracing::info!(?end, teardown = ?report.teardown, "session closed"),
            Err(e) => tracing::warn!(
                kind = ?e.kind(),
                teardown = ?report.teardown,
                "session failed: {e}"
            ),
        }
        Ok(())
    }
}

/// Handshake callback: only `/ws` is upgraded.
fn check_path(request: &Request, response: Response) -> Result<Response, ErrorResponse> {
    if request.uri().path() == WS_PATH {
        return Ok(response);
    }
    tracing::debug!(path = %request.uri().path(), "rejecting upgrade");
    let body = format!("no WebSocket endpoint at {}", request.uri().path());
    let mut rejection = ErrorResponse::new(Some(body));
    *rejection.status_mut() = StatusCode::NOT_FOUND;
    Err(rejection)
}

/// Counts a session as active for as long as it is held.
struct ActiveGuard<'a>(&'a AtomicUsize);

impl<'a> ActiveGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
