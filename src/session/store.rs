//! Binary blob storage
//!
//! The engine hands finished media and still frames to a [`BinaryStore`] and
//! keeps the URL it gets back. Failures surface as I/O errors; retrying is
//! the caller's business.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait BinaryStore: Send + Sync {
    /// Persist `bytes` under `filename` and return a stable URL
    async fn save(&self, bytes: &[u8], filename: &str) -> io::Result<String>;
}

/// Stores blobs as files in one directory
pub struct FsBinaryStore {
    root: PathBuf,
}

impl FsBinaryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BinaryStore for FsBinaryStore {
    async fn save(&self, bytes: &[u8], filename: &str) -> io::Result<String> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename == ".." {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid blob name: {:?}", filename),
            ));
        }

        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(filename);
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!("Stored {} bytes at {:?}", bytes.len(), path);
        Ok(format!(
            "file://{}/{}",
            self.root.to_string_lossy(),
            urlencoding::encode(filename)
        ))
    }
}
