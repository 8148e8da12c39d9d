//! Wire protocol for mcft uploads.
//!
//! Every logical request is two JSON messages: an [`Envelope`] naming the
//! request type, then the payload for that type. The server answers most
//! steps with a [`StatusResponse`].

pub mod constants;
pub mod envelope;
pub mod messages;

pub use constants::RequestType;
pub use envelope::{Envelope, StatusResponse};
pub use messages::{
    AuthenticateRequest, FileBlockRequest, FinishUploadRequest, UploadFileRequest,
};

/// Errors produced while decoding protocol messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown request type: {0}")]
    UnknownRequestType(i64),
}
