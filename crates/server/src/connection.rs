//! JSON message framing over a WebSocket stream.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_tungstenite::tungstenite::error::ProtocolError as WsProtocolError;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};

use crate::SessionError;

/// One client connection. Each text or binary frame carries one JSON value.
pub struct Connection<S> {
    stream: S,
}

impl<S> Connection<S>
where
    S: Stream<Item = Result<WsMessage, WsError>> + Sink<WsMessage, Error = WsError> + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Reads the next JSON value, skipping control frames.
    pub async fn read_json<T: DeserializeOwned>(&mut self) -> Result<T, SessionError> {
        loop {
            match self.stream.next().await {
                Some(Ok(WsMessage::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(WsMessage::Binary(data))) => return Ok(serde_json::from_slice(&data)?),
                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
                Some(Ok(WsMessage::Close(_))) | None => return Err(SessionError::Disconnected),
                Some(Err(e)) if is_disconnect(&e) => return Err(SessionError::Disconnected),
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Writes `value` as a single text frame.
    pub async fn write_json<T: Serialize>(&mut self, value: &T) -> Result<(), SessionError> {
        let json = serde_json::to_string(value)?;
        self.stream.send(WsMessage::Text(json.into())).await?;
        Ok(())
    }

    /// Sends a close frame. Errors are ignored; the peer may already be gone.
    pub async fn close(&mut self) {
        let _ = self.stream.close().await;
    }
}

/// Peer went away, with or without a closing handshake.
fn is_disconnect(error: &WsError) -> bool {
    match error {
        WsError::ConnectionClosed | WsError::AlreadyClosed => true,
        WsError::Protocol(WsProtocolError::ResetWithoutClosingHandshake) => true,
        WsError::Io(e) => matches!(
            e.kind(),
            std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::UnexpectedEof
        ),
        _ => false,
    }
}
