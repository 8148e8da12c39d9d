//! mcft ingest server.
//!
//! Accepts WebSocket connections on `/ws` and runs one transfer
//! [`Session`] per connection: authenticate, stream one file in blocks,
//! compare checksums. When a session ends, however it ends, the open file
//! is closed and its metadata finalized (size, checksum, dedup against
//! existing content, conversion request).

mod connection;
mod context;
mod conversion;
mod directory;
mod finalize;
mod locks;
mod server;
mod session;

pub use connection::Connection;
pub use context::Services;
pub use conversion::{ConversionKind, UNKNOWN_MIME_TYPE, mime_type_for};
pub use directory::DirectoryResolver;
pub use finalize::Teardown;
pub use locks::ProjectLocks;
pub use server::{IngestServer, ServerConfig};
pub use session::{Session, SessionEnd, SessionReport, SessionState};

use mcft_store::StoreError;
use mcft_transfer::TransferError;

/// Errors produced by the listener.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("server already running")]
    AlreadyRunning,
}

/// Errors that end a transfer session.
///
/// The display text is what the client receives in the error status.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("already authenticated")]
    AlreadyAuthenticated,

    #[error("invalid api token")]
    InvalidToken,

    #[error("user {user_id} has no access to project {project_id}")]
    AccessDenied { user_id: i64, project_id: i64 },

    #[error("bad protocol sequence: {0}")]
    BadProtocolSequence(&'static str),

    #[error("unknown request type: {0}")]
    UnknownRequestType(i64),

    #[error("connection closed")]
    Disconnected,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of a [`SessionError`], for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    Authorization,
    ProtocolSequence,
    UnknownRequest,
    Storage,
    Transport,
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAuthenticated | Self::InvalidToken => ErrorKind::Authentication,
            Self::AccessDenied { .. } => ErrorKind::Authorization,
            Self::AlreadyAuthenticated | Self::BadProtocolSequence(_) => {
                ErrorKind::ProtocolSequence
            }
            Self::UnknownRequestType(_) => ErrorKind::UnknownRequest,
            Self::Store(_) | Self::Transfer(_) => ErrorKind::Storage,
            Self::Disconnected | Self::WebSocket(_) | Self::Json(_) => ErrorKind::Transport,
        }
    }

    /// Whether the client can still be told about the failure.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Self::Disconnected | Self::WebSocket(_))
    }
}
