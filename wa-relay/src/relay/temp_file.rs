//! Request-scoped staging of uploaded files.
//!
//! [`TempUpload`] owns the on-disk copy of an uploaded file. The file is
//! removed when the value is closed or dropped, so it cannot outlive the
//! request that created it.

use std::io;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use futures::{Stream, StreamExt};
use tempfile::TempPath;
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// An uploaded file staged on local disk.
#[derive(Debug)]
pub struct TempUpload {
    path: TempPath,
    file_name: String,
    mime_type: String,
    size: u64,
}

impl TempUpload {
    /// Stage a new upload in `dir`, writing chunks as they arrive.
    ///
    /// On any error the partially written file is removed before returning.
    pub async fn stage<S, E>(
        dir: &Path,
        file_name: String,
        mime_type: String,
        chunks: S,
    ) -> Result<Self, StageError<E>>
    where
        S: Stream<Item = Result<Bytes, E>>,
    {
        let mut chunks = std::pin::pin!(chunks);

        fs::create_dir_all(dir).await.map_err(StageError::Io)?;

        let named = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(dir)
            .map_err(StageError::Io)?;
        let (std_file, path) = named.into_parts();

        // Declared before the handle so an early return closes the file
        // before the path guard removes it.
        let mut upload = TempUpload {
            path,
            file_name,
            mime_type,
            size: 0,
        };
        let mut file = File::from_std(std_file);

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(StageError::Source)?;
            file.write_all(&chunk).await.map_err(StageError::Io)?;
            upload.size += chunk.len() as u64;
        }
        file.flush().await.map_err(StageError::Io)?;
        drop(file);

        debug!(
            path = %upload.path.display(),
            file_name = %upload.file_name,
            size_bytes = upload.size,
            "upload_staged"
        );

        Ok(upload)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Original filename as sent by the client.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Open the staged file for reading from the start.
    pub async fn open(&self) -> io::Result<File> {
        File::open(&self.path).await
    }

    /// Remove the staged file, logging instead of failing if removal errors.
    ///
    /// Dropping a `TempUpload` also removes the file; this only makes the
    /// removal explicit and observable on the normal path.
    pub fn close(self) -> PathBuf {
        let path = self.path.to_path_buf();
        match self.path.close() {
            Ok(()) => debug!(path = %path.display(), "upload_cleaned_up"),
            Err(e) => warn!(path = %path.display(), error = %e, "upload_cleanup_failed"),
        }
        path
    }
}

/// Failure while staging an upload.
#[derive(Debug, Error)]
pub enum StageError<E> {
    #[error("failed to write upload to disk: {0}")]
    Io(io::Error),

    #[error("failed to read upload: {0}")]
    Source(E),
}
