pub mod google_drive;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entry::{FileId, FolderId};
use crate::error::StorageResult;

pub use google_drive::GoogleDriveService;

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// A file or folder record returned by a listing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl DriveEntry {
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntryPage {
    pub entries: Vec<DriveEntry>,
    pub next_page_token: Option<String>,
}

/// Which entries a listing call should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryQuery {
    /// Every folder visible to the account.
    AllFolders,
    /// Files (not folders) directly under a parent.
    FilesIn(FolderId),
    /// Folders directly under a parent.
    FoldersIn(FolderId),
}

impl EntryQuery {
    /// Renders the query in Drive's `q` search syntax. Trashed entries are
    /// never returned.
    pub fn to_drive_query(&self) -> String {
        match self {
            EntryQuery::AllFolders => {
                format!("mimeType = '{}' and trashed = false", FOLDER_MIME_TYPE)
            }
            EntryQuery::FilesIn(parent) => format!(
                "mimeType != '{}' and '{}' in parents and trashed = false",
                FOLDER_MIME_TYPE,
                escape(parent.as_str())
            ),
            EntryQuery::FoldersIn(parent) => format!(
                "mimeType = '{}' and '{}' in parents and trashed = false",
                FOLDER_MIME_TYPE,
                escape(parent.as_str())
            ),
        }
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Metadata for an entry about to be created.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    pub name: String,
    pub parents: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl NewEntry {
    pub fn file(name: &str, parent: &FolderId) -> Self {
        Self {
            name: name.to_string(),
            parents: vec![parent.to_string()],
            mime_type: None,
        }
    }

    pub fn folder(name: &str, parent: &FolderId) -> Self {
        Self {
            name: name.to_string(),
            parents: vec![parent.to_string()],
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
        }
    }
}

/// One ranged slice of an object's content.
#[derive(Debug, Clone, Default)]
pub struct ContentChunk {
    pub data: Vec<u8>,
    /// Full object size, when the backend reported it.
    pub total_size: Option<u64>,
}

/// The listing and content API of a cloud drive.
#[async_trait]
pub trait DriveBackend: Send + Sync {
    fn provider_name(&self) -> &str;

    async fn list_entries(
        &self,
        query: &EntryQuery,
        page_token: Option<&str>,
    ) -> StorageResult<EntryPage>;

    /// Creates an entry. Folders are created without content.
    async fn create_entry(
        &self,
        metadata: &NewEntry,
        content: Option<Vec<u8>>,
    ) -> StorageResult<String>;

    /// Replaces the content of an existing file, keeping its ID.
    async fn update_entry(&self, id: &FileId, content: Vec<u8>) -> StorageResult<FileId>;

    async fn get_content_chunk(
        &self,
        id: &FileId,
        offset: u64,
        len: u64,
    ) -> StorageResult<ContentChunk>;
}
