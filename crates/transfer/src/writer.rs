use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::TransferError;
use crate::hasher::ContentHasher;

/// Sequential writer for the physical bytes of one upload.
///
/// Every byte that reaches the file is also folded into the running
/// checksum, in the same order, so the final digest always describes
/// what is on disk.
pub struct BlockWriter {
    file: tokio::fs::File,
    path: PathBuf,
    hasher: ContentHasher,
}

/// What is left of a [`BlockWriter`] once its handle is closed.
#[derive(Clone)]
pub struct FinishedWrite {
    pub path: PathBuf,
    pub hasher: ContentHasher,
}

impl FinishedWrite {
    /// Final hex checksum of the bytes written.
    pub fn checksum(&self) -> String {
        self.hasher.hex_digest()
    }
}

impl BlockWriter {
    /// Creates (or truncates) the file at `path`, creating parent
    /// directories as needed.
    pub async fn create(path: PathBuf) -> Result<Self, TransferError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::File::create(&path).await?;
        Ok(Self {
            file,
            path,
            hasher: ContentHasher::new(),
        })
    }

    /// Appends `block` to the file.
    ///
    /// A write that stops short is an error. Each chunk is flushed before
    /// it is hashed, so the checksum only ever covers bytes the file
    /// accepted.
    pub async fn write_block(&mut self, block: &[u8]) -> Result<(), TransferError> {
        let mut written = 0;
        while written < block.len() {
            let n = self.file.write(&block[written..]).await?;
            if n == 0 {
                return Err(TransferError::ShortWrite {
                    written,
                    expected: block.len(),
                });
            }
            // Buffered write errors only surface here.
            self.file.flush().await?;
            self.hasher.update(&block[written..written + n]);
            written += n;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes accepted so far.
    pub fn bytes_written(&self) -> u64 {
        self.hasher.bytes_hashed()
    }

    /// Checksum of the bytes accepted so far.
    pub fn checksum(&self) -> String {
        self.hasher.hex_digest()
    }

    /// Flushes and closes the handle.
    ///
    /// Close errors are logged, not returned: the bytes already written
    /// stay where they are and the caller still needs the checksum.
    pub async fn finish(mut self) -> FinishedWrite {
        if let Err(e) = self.file.flush().await {
            tracing::warn!(path = %self.path.display(), "flush on close failed: {e}");
        }
        drop(self.file);
        FinishedWrite {
            path: self.path,
            hasher: self.hasher,
        }
    }
}
