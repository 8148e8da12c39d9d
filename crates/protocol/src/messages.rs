use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// First request on every connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticateRequest {
    pub apitoken: String,
    pub project_id: i64,
    #[serde(default)]
    pub version: String,
}

/// Starts a transfer to a logical path inside the authenticated project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadFileRequest {
    pub path: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub version: String,
}

/// Appends bytes to the open file.
///
/// `block` is base64 in JSON, as the reference client encodes byte slices. The
/// remaining fields are sent by the reference client but not interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileBlockRequest {
    #[serde(default)]
    pub path: String,
    #[serde(with = "base64_bytes")]
    pub block: Vec<u8>,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub content_length: i64,
    #[serde(default)]
    pub upload_offset: i64,
    #[serde(default)]
    pub checksum: String,
    #[serde(rename = "check_algorithm", default)]
    pub checksum_algorithm: String,
    #[serde(default)]
    pub version: String,
}

impl FileBlockRequest {
    /// Creates a block request carrying only data.
    pub fn new(block: Vec<u8>) -> Self {
        Self {
            path: String::new(),
            block,
            content_type: String::new(),
            content_length: 0,
            upload_offset: 0,
            checksum: String::new(),
            checksum_algorithm: String::new(),
            version: String::new(),
        }
    }
}

/// Ends the transfer with the client's own checksum of the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishUploadRequest {
    #[serde(default)]
    pub path: String,
    pub file_checksum: String,
    #[serde(default)]
    pub version: String,
}

/// Base64 (standard alphabet, padded) serde module for byte blocks.
///
/// A nil block from the reference client arrives as `null` and decodes empty.
mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        STANDARD.encode(data).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => STANDARD.decode(&s).map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}
