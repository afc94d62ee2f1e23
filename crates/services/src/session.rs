use std::sync::Arc;
use std::time::Duration;

use drivebucket_config::{AuthSettings, Settings};
use reqwest::Client;
use tracing::info;

use crate::auth::{CredentialProvider, StaticTokenProvider, TokenFileProvider};
use crate::cloud_storage::{DriveBackend, GoogleDriveService};
use crate::error::{BackendError, StorageResult};
use crate::storage::DriveStorage;

/// One authenticated Drive session, built once and handed to whatever needs
/// the backend.
pub struct DriveSession {
    settings: Settings,
    backend: Arc<dyn DriveBackend>,
}

impl DriveSession {
    /// Builds the HTTP client and checks that a usable access token is
    /// available before any backend call is made.
    pub async fn connect(settings: Settings) -> StorageResult<Self> {
        let credentials = credential_provider(&settings.auth);
        credentials.token().await?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.drive.request_timeout_secs))
            .build()
            .map_err(BackendError::from)?;
        let backend: Arc<dyn DriveBackend> = Arc::new(GoogleDriveService::new(
            client,
            credentials,
            &settings.drive,
        ));

        info!(provider = backend.provider_name(), api = %settings.drive.api_base_url, "Drive session ready");
        Ok(Self { settings, backend })
    }

    /// A session over an already constructed backend.
    pub fn with_backend(settings: Settings, backend: Arc<dyn DriveBackend>) -> Self {
        Self { settings, backend }
    }

    pub fn backend(&self) -> Arc<dyn DriveBackend> {
        self.backend.clone()
    }

    pub fn storage(&self) -> DriveStorage {
        DriveStorage::new(self.backend.clone(), &self.settings)
    }
}

/// A configured access token wins over the token file.
pub fn credential_provider(auth: &AuthSettings) -> Arc<dyn CredentialProvider> {
    match auth.access_token.as_deref() {
        Some(token) if !token.is_empty() => Arc::new(StaticTokenProvider::new(token)),
        _ => Arc::new(TokenFileProvider::new(&auth.token_path)),
    }
}
