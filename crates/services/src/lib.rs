pub mod auth;
pub mod cloud_storage;
pub mod codec;
pub mod entry;
pub mod error;
pub mod resolver;
pub mod retry;
pub mod session;
pub mod storage;
pub mod transfer;

pub use auth::{AccessToken, AuthError, CredentialProvider};
pub use cloud_storage::{DriveBackend, GoogleDriveService};
pub use codec::{CsvTableCodec, Table, TableCodec};
pub use entry::{FileEntry, FileId, Folder, FolderId};
pub use error::{BackendError, EntryKind, StorageError, StorageResult};
pub use resolver::NameResolver;
pub use session::DriveSession;
pub use storage::DriveStorage;
pub use transfer::ObjectTransfer;
