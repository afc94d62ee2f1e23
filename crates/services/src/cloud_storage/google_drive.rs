use std::sync::Arc;

use async_trait::async_trait;
use drivebucket_config::DriveSettings;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::Deserialize;
use tracing::debug;

use super::{ContentChunk, DriveBackend, DriveEntry, EntryPage, EntryQuery, NewEntry};
use crate::auth::CredentialProvider;
use crate::entry::FileId;
use crate::error::{BackendError, StorageResult};

const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType)";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveEntry>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

/// Drive v3 REST client.
pub struct GoogleDriveService {
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
    api_base_url: String,
    upload_base_url: String,
    page_size: u32,
}

impl GoogleDriveService {
    pub fn new(
        client: Client,
        credentials: Arc<dyn CredentialProvider>,
        settings: &DriveSettings,
    ) -> Self {
        Self {
            client,
            credentials,
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            upload_base_url: settings.upload_base_url.trim_end_matches('/').to_string(),
            page_size: settings.page_size,
        }
    }

    async fn authorized(&self, request: RequestBuilder) -> StorageResult<RequestBuilder> {
        let token = self.credentials.token().await?;
        Ok(request.bearer_auth(token.secret()))
    }

    fn file_url(&self, base: &str, id: &FileId) -> String {
        format!("{}/files/{}", base, urlencoding::encode(id.as_str()))
    }
}

#[async_trait]
impl DriveBackend for GoogleDriveService {
    fn provider_name(&self) -> &str {
        "google_drive"
    }

    async fn list_entries(
        &self,
        query: &EntryQuery,
        page_token: Option<&str>,
    ) -> StorageResult<EntryPage> {
        let q = query.to_drive_query();
        let page_size = self.page_size.to_string();
        let mut request = self
            .client
            .get(format!("{}/files", self.api_base_url))
            .query(&[
                ("q", q.as_str()),
                ("spaces", "drive"),
                ("fields", LIST_FIELDS),
                ("pageSize", page_size.as_str()),
            ]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let resp = self
            .authorized(request)
            .await?
            .send()
            .await
            .map_err(BackendError::from)?;
        let list: FileList = ensure_success(resp, "list_entries")
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Malformed(format!("file list: {}", e)))?;

        debug!(query = %q, entries = list.files.len(), has_more = list.next_page_token.is_some(), "Listed page");
        Ok(EntryPage {
            entries: list.files,
            next_page_token: list.next_page_token,
        })
    }

    async fn create_entry(
        &self,
        metadata: &NewEntry,
        content: Option<Vec<u8>>,
    ) -> StorageResult<String> {
        let request = match content {
            None => self
                .client
                .post(format!("{}/files", self.api_base_url))
                .query(&[("fields", "id")])
                .json(metadata),
            Some(content) => {
                let boundary = uuid::Uuid::new_v4().simple().to_string();
                let json = serde_json::to_vec(metadata)
                    .map_err(|e| BackendError::Malformed(format!("entry metadata: {}", e)))?;
                self.client
                    .post(format!("{}/files", self.upload_base_url))
                    .query(&[("uploadType", "multipart"), ("fields", "id")])
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/related; boundary={}", boundary),
                    )
                    .body(multipart_related(&boundary, &json, &content))
            }
        };

        let resp = self
            .authorized(request)
            .await?
            .send()
            .await
            .map_err(BackendError::from)?;
        let created: CreatedFile = ensure_success(resp, "create_entry")
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Malformed(format!("created entry: {}", e)))?;

        debug!(id = %created.id, name = %metadata.name, "Created entry");
        Ok(created.id)
    }

    async fn update_entry(&self, id: &FileId, content: Vec<u8>) -> StorageResult<FileId> {
        let request = self
            .client
            .patch(self.file_url(&self.upload_base_url, id))
            .query(&[("uploadType", "media"), ("fields", "id")])
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(content);

        let resp = self
            .authorized(request)
            .await?
            .send()
            .await
            .map_err(BackendError::from)?;
        let updated: CreatedFile = ensure_success(resp, "update_entry")
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Malformed(format!("updated entry: {}", e)))?;

        debug!(id = %updated.id, "Updated entry content");
        Ok(FileId::new(updated.id))
    }

    async fn get_content_chunk(
        &self,
        id: &FileId,
        offset: u64,
        len: u64,
    ) -> StorageResult<ContentChunk> {
        let last = offset + len.max(1) - 1;
        let request = self
            .client
            .get(self.file_url(&self.api_base_url, id))
            .query(&[("alt", "media")])
            .header(header::RANGE, format!("bytes={}-{}", offset, last));

        let resp = self
            .authorized(request)
            .await?
            .send()
            .await
            .map_err(BackendError::from)?;

        let status = resp.status();
        let total_size = resp
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(content_range_total);

        match status {
            StatusCode::PARTIAL_CONTENT => {
                let data = resp.bytes().await.map_err(BackendError::from)?.to_vec();
                Ok(ContentChunk { data, total_size })
            }
            // Range ignored: the body is the whole object.
            StatusCode::OK if offset == 0 => {
                let data = resp.bytes().await.map_err(BackendError::from)?.to_vec();
                let total_size = Some(data.len() as u64);
                Ok(ContentChunk { data, total_size })
            }
            StatusCode::OK => Err(BackendError::Malformed(format!(
                "range starting at {} was ignored by the server",
                offset
            ))
            .into()),
            StatusCode::RANGE_NOT_SATISFIABLE => Ok(ContentChunk {
                data: Vec::new(),
                total_size: total_size.or(Some(offset)),
            }),
            _ => Err(ensure_success(resp, "get_content").await.err().unwrap_or_else(|| {
                BackendError::Malformed(format!("unexpected status {}", status))
            })
            .into()),
        }
    }
}

async fn ensure_success(resp: Response, operation: &'static str) -> Result<Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(BackendError::Status {
        operation,
        status: status.as_u16(),
        message,
    })
}

/// Total size from a `Content-Range` value such as `bytes 0-99/1234` or
/// `bytes */1234`. An unknown total (`*`) yields `None`.
pub fn content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().strip_prefix("bytes")?.trim().split_once('/')?;
    total.trim().parse().ok()
}

/// Body of a Drive multipart upload: JSON metadata followed by the content.
pub fn multipart_related(boundary: &str, metadata_json: &[u8], content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata_json.len() + content.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata_json);
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}
