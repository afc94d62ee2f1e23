use std::path::{Path, PathBuf};
use std::sync::Arc;

use drivebucket_config::{ModelFormat, Settings};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::cloud_storage::{DriveBackend, NewEntry};
use crate::codec::{self, CsvTableCodec, Table, TableCodec};
use crate::entry::{FileEntry, FileId, FolderId};
use crate::error::{StorageError, StorageResult};
use crate::resolver::{NameResolver, single_match};
use crate::retry::RetryPolicy;
use crate::transfer::{ObjectTransfer, TransferSource};

/// S3-style operations over Drive folders ("buckets") and files ("keys").
#[derive(Clone)]
pub struct DriveStorage {
    backend: Arc<dyn DriveBackend>,
    resolver: NameResolver,
    transfer: ObjectTransfer,
    tables: Arc<dyn TableCodec>,
    model_format: ModelFormat,
    staging_path: PathBuf,
}

impl DriveStorage {
    pub fn new(backend: Arc<dyn DriveBackend>, settings: &Settings) -> Self {
        let retry = RetryPolicy::from(&settings.retry);
        let resolver = NameResolver::new(backend.clone(), retry.clone());
        let transfer = ObjectTransfer::new(
            backend.clone(),
            resolver.clone(),
            retry,
            settings.drive.chunk_size,
        );
        Self {
            backend,
            resolver,
            transfer,
            tables: Arc::new(CsvTableCodec::from_settings(&settings.storage)),
            model_format: settings.storage.model_format,
            staging_path: PathBuf::from(&settings.storage.staging_path),
        }
    }

    pub fn with_table_codec(mut self, tables: Arc<dyn TableCodec>) -> Self {
        self.tables = tables;
        self
    }

    pub fn resolver(&self) -> &NameResolver {
        &self.resolver
    }

    pub fn transfer(&self) -> &ObjectTransfer {
        &self.transfer
    }

    pub async fn get_bucket(&self, bucket: &str) -> StorageResult<FolderId> {
        self.resolver.resolve_folder(bucket).await
    }

    /// Every file named `key` in `bucket`.
    pub async fn get_file_objects(&self, key: &str, bucket: &str) -> StorageResult<Vec<FileEntry>> {
        let folder = self.resolver.resolve_folder(bucket).await?;
        self.resolver.resolve_file(key, &folder).await
    }

    /// A missing bucket or key is `false`; only backend and credential
    /// failures are errors.
    pub async fn key_exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let folder = match self.resolver.resolve_folder(bucket).await {
            Ok(folder) => folder,
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(e),
        };
        let matches = self.resolver.resolve_file(key, &folder).await?;
        Ok(!matches.is_empty())
    }

    /// Uploads a local file as `remote_name` in `bucket`, replacing an
    /// existing file of that name. The local file is removed only after the
    /// upload succeeded.
    pub async fn upload_file(
        &self,
        local_path: &Path,
        remote_name: &str,
        bucket: &str,
        delete_local: bool,
    ) -> StorageResult<FileId> {
        info!(from = %local_path.display(), to = remote_name, bucket, "Uploading file");
        let folder = self.resolver.resolve_folder(bucket).await?;
        let id = self
            .transfer
            .upload(
                TransferSource::Path(local_path.to_path_buf()),
                remote_name,
                &folder,
            )
            .await?;

        if delete_local {
            tokio::fs::remove_file(local_path).await?;
            info!(path = %local_path.display(), "Removed local file after upload");
        }
        Ok(id)
    }

    /// Writes `table` as CSV to `local_temp_path` and uploads it. The
    /// staging file is removed after a successful upload.
    pub async fn upload_table(
        &self,
        table: &Table,
        local_temp_path: &Path,
        remote_name: &str,
        bucket: &str,
    ) -> StorageResult<FileId> {
        let bytes = self
            .tables
            .serialize(table)
            .map_err(StorageError::Serialization)?;
        tokio::fs::write(local_temp_path, bytes).await?;
        self.upload_file(local_temp_path, remote_name, bucket, true)
            .await
    }

    pub async fn read_object(&self, key: &str, bucket: &str) -> StorageResult<Vec<u8>> {
        let entry = self.resolve_single(key, bucket).await?;
        self.transfer.download_bytes(&entry.id).await
    }

    pub async fn read_text(&self, key: &str, bucket: &str) -> StorageResult<String> {
        let bytes = self.read_object(key, bucket).await?;
        String::from_utf8(bytes).map_err(|e| StorageError::Parse(e.into()))
    }

    pub async fn read_table(&self, remote_name: &str, bucket: &str) -> StorageResult<Table> {
        let bytes = self.read_object(remote_name, bucket).await?;
        let table = self.tables.parse(&bytes).map_err(StorageError::Parse)?;
        info!(key = remote_name, bucket, rows = table.len(), "Read table");
        Ok(table)
    }

    pub async fn download_file(
        &self,
        key: &str,
        bucket: &str,
        destination: &Path,
    ) -> StorageResult<u64> {
        let entry = self.resolve_single(key, bucket).await?;
        self.transfer.download(&entry.id, destination).await
    }

    /// Downloads `model_dir/model_name` (or `model_name`) through the staging
    /// path and deserializes it in the configured model format.
    pub async fn load_model<M: DeserializeOwned>(
        &self,
        model_name: &str,
        bucket: &str,
        model_dir: Option<&str>,
    ) -> StorageResult<M> {
        let key = model_key(model_name, model_dir);
        let entry = self.resolve_single(&key, bucket).await?;
        self.transfer.download(&entry.id, &self.staging_path).await?;

        let bytes = tokio::fs::read(&self.staging_path).await?;
        let model = codec::decode_model(self.model_format, &bytes)
            .map_err(StorageError::Deserialization)?;
        info!(key = %key, bucket, file_id = %entry.id, "Loaded model");
        Ok(model)
    }

    pub async fn save_model<M: Serialize>(
        &self,
        model: &M,
        model_name: &str,
        bucket: &str,
        model_dir: Option<&str>,
    ) -> StorageResult<FileId> {
        let key = model_key(model_name, model_dir);
        let bytes = codec::encode_model(self.model_format, model)
            .map_err(StorageError::Serialization)?;
        let folder = self.resolver.resolve_folder(bucket).await?;
        self.transfer
            .upload(TransferSource::Buffer(bytes), &key, &folder)
            .await
    }

    /// Creates `folder_name` under the `parent_bucket` folder unless a folder
    /// of that name already exists there. Returns the folder's ID either way.
    pub async fn create_folder(
        &self,
        folder_name: &str,
        parent_bucket: &str,
    ) -> StorageResult<FolderId> {
        let parent = self.resolver.resolve_folder(parent_bucket).await?;
        let existing = self
            .resolver
            .resolve_child_folders(folder_name, &parent)
            .await?;

        if let Some(folder) = existing.into_iter().next() {
            info!(folder = folder_name, parent = parent_bucket, id = %folder.id, "Folder already exists");
            return Ok(folder.id);
        }

        let id = FolderId::new(
            self.backend
                .create_entry(&NewEntry::folder(folder_name, &parent), None)
                .await?,
        );
        info!(folder = folder_name, parent = parent_bucket, %id, "Created folder");
        Ok(id)
    }

    async fn resolve_single(&self, key: &str, bucket: &str) -> StorageResult<FileEntry> {
        let folder = self.resolver.resolve_folder(bucket).await?;
        let matches = self.resolver.resolve_file(key, &folder).await?;
        single_match(key, matches)
    }
}

fn model_key(model_name: &str, model_dir: Option<&str>) -> String {
    match model_dir {
        Some(dir) if !dir.is_empty() => format!("{}/{}", dir.trim_end_matches('/'), model_name),
        _ => model_name.to_string(),
    }
}
