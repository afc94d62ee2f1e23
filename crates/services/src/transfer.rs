use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::cloud_storage::{DriveBackend, NewEntry};
use crate::entry::{FileId, FolderId};
use crate::error::{BackendError, StorageError, StorageResult};
use crate::resolver::NameResolver;
use crate::retry::{RetryPolicy, retry_idempotent};

/// Where upload content comes from.
#[derive(Debug, Clone)]
pub enum TransferSource {
    Path(PathBuf),
    Buffer(Vec<u8>),
}

impl TransferSource {
    async fn into_bytes(self) -> StorageResult<Vec<u8>> {
        match self {
            TransferSource::Path(path) => Ok(tokio::fs::read(&path).await?),
            TransferSource::Buffer(bytes) => Ok(bytes),
        }
    }

    fn describe(&self) -> String {
        match self {
            TransferSource::Path(path) => path.display().to_string(),
            TransferSource::Buffer(bytes) => format!("<{} byte buffer>", bytes.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferMode {
    Create,
    /// Overwrite the content of an existing file, keeping its ID.
    Replace(FileId),
}

#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub source: TransferSource,
    pub target_name: String,
    pub folder_id: FolderId,
    pub mode: TransferMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    Requesting,
    Complete,
    Failed,
}

/// Ranged download of one object into memory.
pub struct ChunkedDownload<'a> {
    backend: &'a dyn DriveBackend,
    retry: &'a RetryPolicy,
    file_id: FileId,
    chunk_size: u64,
    buffer: Vec<u8>,
    total: Option<u64>,
    state: DownloadState,
}

impl<'a> ChunkedDownload<'a> {
    pub fn new(
        backend: &'a dyn DriveBackend,
        retry: &'a RetryPolicy,
        file_id: FileId,
        chunk_size: u64,
    ) -> Self {
        Self {
            backend,
            retry,
            file_id,
            chunk_size: chunk_size.max(1),
            buffer: Vec::new(),
            total: None,
            state: DownloadState::Requesting,
        }
    }

    pub fn state(&self) -> DownloadState {
        self.state
    }

    pub fn received(&self) -> u64 {
        self.buffer.len() as u64
    }

    /// Requests the next chunk. A failure discards everything received so
    /// far and leaves the download in `Failed`.
    pub async fn next_chunk(&mut self) -> StorageResult<DownloadState> {
        if self.state != DownloadState::Requesting {
            return Ok(self.state);
        }

        let offset = self.received();
        let result = retry_idempotent(self.retry, "get_content", || {
            self.backend
                .get_content_chunk(&self.file_id, offset, self.chunk_size)
        })
        .await;

        let chunk = match result {
            Ok(chunk) => chunk,
            Err(e) => return Err(self.fail(e)),
        };

        let received = chunk.data.len() as u64;
        self.buffer.extend_from_slice(&chunk.data);
        if chunk.total_size.is_some() {
            self.total = chunk.total_size;
        }

        let done = match self.total {
            Some(total) => self.received() >= total,
            None => received < self.chunk_size,
        };
        if done {
            self.state = DownloadState::Complete;
        } else if received == 0 {
            return Err(self.fail(
                BackendError::Malformed(format!(
                    "empty chunk at offset {} of {}",
                    offset, self.file_id
                ))
                .into(),
            ));
        }

        debug!(file_id = %self.file_id, offset, received, total = ?self.total, "Received chunk");
        Ok(self.state)
    }

    /// The full content, once the download is complete.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        (self.state == DownloadState::Complete).then_some(self.buffer)
    }

    fn fail(&mut self, err: StorageError) -> StorageError {
        self.state = DownloadState::Failed;
        self.buffer = Vec::new();
        err
    }
}

/// Moves bytes between the local machine and Drive folders.
#[derive(Clone)]
pub struct ObjectTransfer {
    backend: Arc<dyn DriveBackend>,
    resolver: NameResolver,
    retry: RetryPolicy,
    chunk_size: u64,
}

impl ObjectTransfer {
    pub fn new(
        backend: Arc<dyn DriveBackend>,
        resolver: NameResolver,
        retry: RetryPolicy,
        chunk_size: u64,
    ) -> Self {
        Self {
            backend,
            resolver,
            retry,
            chunk_size,
        }
    }

    /// Decides between replacing an existing file named `target_name` (the
    /// first one listed) and creating a new one.
    pub async fn plan(
        &self,
        source: TransferSource,
        target_name: &str,
        folder_id: &FolderId,
    ) -> StorageResult<TransferRequest> {
        let existing = self.resolver.resolve_file(target_name, folder_id).await?;
        let mode = match existing.into_iter().next() {
            Some(entry) => TransferMode::Replace(entry.id),
            None => TransferMode::Create,
        };
        Ok(TransferRequest {
            source,
            target_name: target_name.to_string(),
            folder_id: folder_id.clone(),
            mode,
        })
    }

    /// Sends the content. Write calls are not retried.
    pub async fn execute(&self, request: TransferRequest) -> StorageResult<FileId> {
        let TransferRequest {
            source,
            target_name,
            folder_id,
            mode,
        } = request;
        let origin = source.describe();
        let content = source.into_bytes().await?;
        let size = content.len();

        let id = match mode {
            TransferMode::Replace(existing) => self.backend.update_entry(&existing, content).await?,
            TransferMode::Create => FileId::new(
                self.backend
                    .create_entry(&NewEntry::file(&target_name, &folder_id), Some(content))
                    .await?,
            ),
        };

        info!(from = %origin, to = %target_name, folder = %folder_id, %id, size, "Uploaded file");
        Ok(id)
    }

    /// Create-or-replace upload of `source` as `target_name` in `folder_id`.
    pub async fn upload(
        &self,
        source: TransferSource,
        target_name: &str,
        folder_id: &FolderId,
    ) -> StorageResult<FileId> {
        let request = self.plan(source, target_name, folder_id).await?;
        self.execute(request).await
    }

    pub async fn download_bytes(&self, file_id: &FileId) -> StorageResult<Vec<u8>> {
        let mut download = ChunkedDownload::new(
            self.backend.as_ref(),
            &self.retry,
            file_id.clone(),
            self.chunk_size,
        );
        while download.next_chunk().await? == DownloadState::Requesting {}

        download.into_bytes().ok_or_else(|| {
            BackendError::Malformed(format!("download of {} did not complete", file_id)).into()
        })
    }

    /// Downloads `file_id` and writes it to `destination`. Nothing is written
    /// unless the whole object was received.
    pub async fn download(&self, file_id: &FileId, destination: &Path) -> StorageResult<u64> {
        let bytes = self.download_bytes(file_id).await?;
        let written = write_atomically(destination, bytes).await?;
        info!(%file_id, destination = %destination.display(), bytes = written, "Downloaded file");
        Ok(written)
    }
}

/// Writes through a temporary file in the destination directory, then
/// renames it into place.
async fn write_atomically(destination: &Path, bytes: Vec<u8>) -> StorageResult<u64> {
    let destination = destination.to_path_buf();
    let written = tokio::task::spawn_blocking(move || -> std::io::Result<u64> {
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut file = tempfile::NamedTempFile::new_in(&dir)?;
        file.write_all(&bytes)?;
        file.as_file().sync_all()?;
        file.persist(&destination).map_err(|e| e.error)?;
        Ok(bytes.len() as u64)
    })
    .await
    .map_err(std::io::Error::other)??;
    Ok(written)
}
