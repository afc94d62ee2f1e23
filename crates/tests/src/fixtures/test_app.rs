use std::net::SocketAddr;

use drivebucket_config::{RetrySettings, Settings};
use drivebucket_services::{DriveSession, DriveStorage};
use tempfile::TempDir;
use tokio::net::TcpListener;

use super::mock_drive::{MockDrive, TEST_TOKEN};

/// A mock Drive server on a random port plus settings pointing at it.
pub struct TestDrive {
    pub addr: SocketAddr,
    pub base_url: String,
    pub drive: MockDrive,
    pub settings: Settings,
    /// Scratch directory for local files; removed on drop.
    pub workdir: TempDir,
}

impl TestDrive {
    pub async fn spawn() -> Self {
        Self::spawn_with_settings(|_| {}).await
    }

    /// Spawns with customized settings. The `mutator` runs after the test
    /// defaults (small pages and chunks, fast retries) are applied.
    pub async fn spawn_with_settings(mutator: impl FnOnce(&mut Settings)) -> Self {
        let drive = MockDrive::default();
        let app = drive.router();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base_url = format!("http://{}", addr);
        let workdir = tempfile::tempdir().expect("Failed to create work dir");

        let mut settings = Settings::defaults().expect("Failed to build default settings");
        settings.drive.api_base_url = format!("{}/drive/v3", base_url);
        settings.drive.upload_base_url = format!("{}/upload/drive/v3", base_url);
        settings.drive.page_size = 2;
        settings.drive.chunk_size = 4;
        settings.drive.request_timeout_secs = 5;
        settings.auth.access_token = Some(TEST_TOKEN.to_string());
        settings.storage.staging_path = workdir.path().join("temp.pkl").display().to_string();
        settings.retry = RetrySettings {
            max_retries: 2,
            initial_delay_ms: 1,
            max_delay_ms: 5,
        };

        mutator(&mut settings);

        Self {
            addr,
            base_url,
            drive,
            settings,
            workdir,
        }
    }

    pub async fn session(&self) -> DriveSession {
        DriveSession::connect(self.settings.clone())
            .await
            .expect("Failed to connect to mock drive")
    }

    pub async fn storage(&self) -> DriveStorage {
        self.session().await.storage()
    }

    /// Path inside the scratch directory.
    pub fn local(&self, name: &str) -> std::path::PathBuf {
        self.workdir.path().join(name)
    }
}
