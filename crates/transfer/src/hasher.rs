use md5::{Digest, Md5};

/// Name of the digest used for file checksums.
///
/// MD5 is what the reference client computes, so finish-time comparisons
/// only work with the same algorithm.
pub const CHECKSUM_ALGORITHM: &str = "md5";

/// Computes the checksum of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Running digest over the bytes of one upload, in write order.
#[derive(Clone, Default)]
pub struct ContentHasher {
    hasher: Md5,
    bytes: u64,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds the next block into the digest.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.bytes += data.len() as u64;
    }

    /// Number of bytes folded in so far.
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes
    }

    /// Hex digest of everything seen so far. Does not reset the state.
    pub fn hex_digest(&self) -> String {
        hex::encode(self.hasher.clone().finalize())
    }
}
