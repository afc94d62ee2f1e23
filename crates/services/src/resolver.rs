use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::{debug, warn};

use crate::cloud_storage::{DriveBackend, DriveEntry, EntryQuery};
use crate::entry::{FileEntry, FileId, Folder, FolderId};
use crate::error::{StorageError, StorageResult};
use crate::retry::{RetryPolicy, retry_idempotent};

/// Position in a paginated listing.
enum Cursor {
    First,
    Next(String),
    Exhausted,
}

/// Maps human-readable folder and file names to Drive IDs by listing and
/// exact-name matching.
#[derive(Clone)]
pub struct NameResolver {
    backend: Arc<dyn DriveBackend>,
    retry: RetryPolicy,
}

impl NameResolver {
    pub fn new(backend: Arc<dyn DriveBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    /// Lazy sequence of listing pages. Each response's continuation token
    /// feeds the next request; the stream ends when the backend returns no
    /// token. Every call starts again from the first page.
    pub fn pages(&self, query: EntryQuery) -> BoxStream<'static, StorageResult<Vec<DriveEntry>>> {
        let backend = self.backend.clone();
        let retry = self.retry.clone();
        stream::try_unfold(Cursor::First, move |cursor| {
            fetch_page(backend.clone(), retry.clone(), query.clone(), cursor)
        })
        .boxed()
    }

    /// Every entry matching `query`, across all pages.
    pub async fn list_all(&self, query: EntryQuery) -> StorageResult<Vec<DriveEntry>> {
        self.pages(query).try_concat().await
    }

    /// Resolves a bucket name to a folder ID. When several folders share the
    /// name, the last one listed wins.
    pub async fn resolve_folder(&self, folder_name: &str) -> StorageResult<FolderId> {
        let mut pages = self.pages(EntryQuery::AllFolders);
        let mut found = None;
        let mut matches = 0usize;

        while let Some(entries) = pages.try_next().await? {
            for entry in entries.into_iter().filter(|e| e.name == folder_name) {
                matches += 1;
                found = Some(FolderId::new(entry.id));
            }
        }

        if matches > 1 {
            warn!(folder = folder_name, matches, chosen = ?found, "Folder name is not unique, using the last match");
        }
        let id = found.ok_or_else(|| StorageError::folder_not_found(folder_name))?;
        debug!(folder = folder_name, %id, "Resolved folder");
        Ok(id)
    }

    /// All files directly under `folder_id` named `file_name`, in listing
    /// order. An empty result is not an error.
    pub async fn resolve_file(
        &self,
        file_name: &str,
        folder_id: &FolderId,
    ) -> StorageResult<Vec<FileEntry>> {
        let mut pages = self.pages(EntryQuery::FilesIn(folder_id.clone()));
        let mut matches = Vec::new();

        while let Some(entries) = pages.try_next().await? {
            matches.extend(
                entries
                    .into_iter()
                    .filter(|e| e.name == file_name)
                    .map(|e| FileEntry {
                        id: FileId::new(e.id),
                        name: e.name,
                        parent: folder_id.clone(),
                    }),
            );
        }

        debug!(file = file_name, folder = %folder_id, matches = matches.len(), "Resolved file");
        Ok(matches)
    }

    /// Folders named `folder_name` directly under `parent_id`.
    pub async fn resolve_child_folders(
        &self,
        folder_name: &str,
        parent_id: &FolderId,
    ) -> StorageResult<Vec<Folder>> {
        let entries = self
            .list_all(EntryQuery::FoldersIn(parent_id.clone()))
            .await?;
        Ok(entries
            .into_iter()
            .filter(|e| e.name == folder_name)
            .map(|e| Folder {
                id: FolderId::new(e.id),
                name: e.name,
            })
            .collect())
    }
}

async fn fetch_page(
    backend: Arc<dyn DriveBackend>,
    retry: RetryPolicy,
    query: EntryQuery,
    cursor: Cursor,
) -> StorageResult<Option<(Vec<DriveEntry>, Cursor)>> {
    let page_token = match cursor {
        Cursor::Exhausted => return Ok(None),
        Cursor::First => None,
        Cursor::Next(token) => Some(token),
    };

    let page = retry_idempotent(&retry, "list_entries", || {
        backend.list_entries(&query, page_token.as_deref())
    })
    .await?;

    let next = match page.next_page_token {
        Some(token) if !token.is_empty() => Cursor::Next(token),
        _ => Cursor::Exhausted,
    };
    Ok(Some((page.entries, next)))
}

/// Narrows a resolution result to exactly one file.
pub fn single_match(name: &str, mut matches: Vec<FileEntry>) -> StorageResult<FileEntry> {
    match matches.len() {
        0 => Err(StorageError::file_not_found(name)),
        1 => Ok(matches.remove(0)),
        count => Err(StorageError::Ambiguous {
            name: name.to_string(),
            count,
        }),
    }
}
