use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Default TCP port the ingest server listens on.
pub const DEFAULT_PORT: u16 = 1323;

/// HTTP path that is upgraded to a WebSocket.
pub const WS_PATH: &str = "/ws";

/// Maximum message size in bytes (64 MiB).
///
/// The reference client sends 32 MiB blocks; base64 inflates them by a
/// third, so the limit has to sit comfortably above 43 MiB.
pub const WS_MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Block size used by the reference upload client.
pub const CLIENT_BLOCK_SIZE: usize = 32 * 1024 * 1024;

/// Status text sent after every successful non-terminal step.
pub const STATUS_CONTINUE: &str = "continue";

/// Status text sent when the client checksum matches the server digest.
pub const STATUS_CHECKSUMS_MATCHED: &str = "checksums matched!";

/// Request type codes carried in the envelope.
///
/// The numbering is part of the wire format: codes are positional and
/// must never be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum RequestType {
    Authenticate = 0,
    Download = 1,
    FileInfo = 2,
    FinishUpload = 3,
    ListDirectory = 4,
    PauseUpload = 5,
    FileBlock = 6,
    ServerInfo = 7,
    UploadFile = 8,
    ServerConnect = 9,
}

impl RequestType {
    /// All known request types in code order.
    pub const ALL: [RequestType; 10] = [
        RequestType::Authenticate,
        RequestType::Download,
        RequestType::FileInfo,
        RequestType::FinishUpload,
        RequestType::ListDirectory,
        RequestType::PauseUpload,
        RequestType::FileBlock,
        RequestType::ServerInfo,
        RequestType::UploadFile,
        RequestType::ServerConnect,
    ];

    /// Numeric wire code.
    pub const fn code(self) -> i64 {
        self as i64
    }

    /// Looks up a request type by wire code.
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.code() == code)
    }

    /// Human-readable name, used in logs and `for_request_type`.
    pub const fn name(self) -> &'static str {
        match self {
            RequestType::Authenticate => "authenticate",
            RequestType::Download => "download",
            RequestType::FileInfo => "file_info",
            RequestType::FinishUpload => "finish_upload",
            RequestType::ListDirectory => "list_directory",
            RequestType::PauseUpload => "pause_upload",
            RequestType::FileBlock => "file_block",
            RequestType::ServerInfo => "server_info",
            RequestType::UploadFile => "upload_file",
            RequestType::ServerConnect => "server_connect",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for RequestType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.code())
    }
}

impl<'de> Deserialize<'de> for RequestType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i64::deserialize(deserializer)?;
        RequestType::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown request type: {code}")))
    }
}
