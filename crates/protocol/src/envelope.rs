use serde::{Deserialize, Serialize};

use crate::ProtocolError;
use crate::constants::{RequestType, STATUS_CHECKSUMS_MATCHED, STATUS_CONTINUE};

/// First half of every request: names the payload that follows.
///
/// The code is kept raw so that unrecognized values can still be decoded
/// and reported back to the client instead of failing the JSON parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub request_type: i64,
}

impl Envelope {
    /// Creates an envelope for a known request type.
    pub fn new(request_type: RequestType) -> Self {
        Self {
            request_type: request_type.code(),
        }
    }

    /// Resolves the raw code to a [`RequestType`].
    pub fn request_type(&self) -> Result<RequestType, ProtocolError> {
        RequestType::from_code(self.request_type)
            .ok_or(ProtocolError::UnknownRequestType(self.request_type))
    }
}

/// Server reply written after each protocol step.
///
/// `IsError` keeps its capitalized key: the reference client decodes the
/// field by its exported struct name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub for_request_type: String,
    pub status: String,
    #[serde(rename = "IsError", alias = "is_error", default)]
    pub is_error: bool,
    #[serde(default)]
    pub version: String,
}

impl StatusResponse {
    fn with(status: impl Into<String>, is_error: bool) -> Self {
        Self {
            path: String::new(),
            for_request_type: String::new(),
            status: status.into(),
            is_error,
            version: String::new(),
        }
    }

    /// The "keep going" reply sent after a successful step.
    pub fn proceed() -> Self {
        Self::with(STATUS_CONTINUE, false)
    }

    /// An error reply; the session closes after sending it.
    pub fn error(message: impl Into<String>) -> Self {
        Self::with(message, true)
    }

    /// Result of comparing the client checksum with the server digest.
    pub fn checksum_result(computed: &str, expected: &str) -> Self {
        if computed == expected {
            Self::with(STATUS_CHECKSUMS_MATCHED, false)
        } else {
            Self::error(format!(
                "checksums didn't match got ({computed}), expected ({expected})"
            ))
        }
    }

    /// Tags the reply with the request it answers.
    pub fn for_request(mut self, request_type: RequestType) -> Self {
        self.for_request_type = request_type.name().to_string();
        self
    }
}
