use std::sync::Arc;

use drivebucket_services::auth::StaticTokenProvider;
use drivebucket_services::cloud_storage::{EntryQuery, NewEntry};
use drivebucket_services::{
    BackendError, DriveBackend, DriveSession, FileId, FolderId, GoogleDriveService, StorageError,
};

use crate::fixtures::mock_drive::TEST_TOKEN;
use crate::fixtures::test_app::TestDrive;

#[tokio::test]
async fn listing_follows_page_tokens() {
    let app = TestDrive::spawn().await;
    for name in ["a", "b", "c"] {
        app.drive.add_folder(name, None);
    }
    let backend = app.session().await.backend();

    let first = backend
        .list_entries(&EntryQuery::AllFolders, None)
        .await
        .unwrap();
    assert_eq!(first.entries.len(), 2);
    assert!(first.entries.iter().all(|e| e.is_folder()));
    let token = first.next_page_token.expect("expected a second page");

    let second = backend
        .list_entries(&EntryQuery::AllFolders, Some(&token))
        .await
        .unwrap();
    assert_eq!(second.entries.len(), 1);
    assert_eq!(second.entries[0].name, "c");
    assert!(second.next_page_token.is_none());
}

#[tokio::test]
async fn file_query_is_scoped_to_parent_and_skips_folders() {
    let app = TestDrive::spawn().await;
    let data = app.drive.add_folder("data", None);
    let other = app.drive.add_folder("other", None);
    app.drive.add_file("x.csv", &data, b"1");
    app.drive.add_file("y.csv", &other, b"2");
    app.drive.add_folder("nested", Some(&data));
    let backend = app.session().await.backend();

    let page = backend
        .list_entries(&EntryQuery::FilesIn(FolderId::new(data)), None)
        .await
        .unwrap();
    assert_eq!(page.entries.len(), 1);
    assert_eq!(page.entries[0].name, "x.csv");
    assert!(!page.entries[0].is_folder());
}

#[tokio::test]
async fn trashed_entries_are_not_listed() {
    let app = TestDrive::spawn().await;
    let gone = app.drive.add_folder("results", None);
    app.drive.trash(&gone);
    let backend = app.session().await.backend();

    let page = backend
        .list_entries(&EntryQuery::AllFolders, None)
        .await
        .unwrap();
    assert!(page.entries.is_empty());
}

#[tokio::test]
async fn multipart_create_stores_content_and_parent() {
    let app = TestDrive::spawn().await;
    let data = app.drive.add_folder("data", None);
    let backend = app.session().await.backend();

    let id = backend
        .create_entry(
            &NewEntry::file("report.csv", &FolderId::new(data.clone())),
            Some(b"a,b\n1,2\n".to_vec()),
        )
        .await
        .unwrap();

    let stored = app.drive.entry(&id).unwrap();
    assert_eq!(stored.name, "report.csv");
    assert_eq!(stored.parents, vec![data]);
    assert_eq!(stored.content, b"a,b\n1,2\n");
}

#[tokio::test]
async fn ranged_reads_report_total_size() {
    let app = TestDrive::spawn().await;
    let data = app.drive.add_folder("data", None);
    let id = FileId::new(app.drive.add_file("blob", &data, b"abcdefghij"));
    let backend = app.session().await.backend();

    let head = backend.get_content_chunk(&id, 0, 4).await.unwrap();
    assert_eq!(head.data, b"abcd");
    assert_eq!(head.total_size, Some(10));

    let tail = backend.get_content_chunk(&id, 8, 4).await.unwrap();
    assert_eq!(tail.data, b"ij");

    let past_end = backend.get_content_chunk(&id, 10, 4).await.unwrap();
    assert!(past_end.data.is_empty());
    assert_eq!(past_end.total_size, Some(10));
}

#[tokio::test]
async fn updating_unknown_file_is_a_status_error() {
    let app = TestDrive::spawn().await;
    let backend = app.session().await.backend();

    let err = backend
        .update_entry(&FileId::new("file-404"), b"x".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Backend(BackendError::Status { status: 404, .. })
    ));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn rejected_token_surfaces_as_unauthorized() {
    let app = TestDrive::spawn_with_settings(|s| {
        s.auth.access_token = Some("revoked".to_string());
    })
    .await;
    app.drive.add_folder("data", None);
    let storage = app.storage().await;

    let err = storage.get_bucket("data").await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Backend(BackendError::Status { status: 401, .. })
    ));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn session_wraps_a_prebuilt_backend() {
    let app = TestDrive::spawn().await;
    let data = app.drive.add_folder("data", None);
    app.drive.add_file("report.csv", &data, b"a\n1\n");
    let backend: Arc<dyn DriveBackend> = Arc::new(GoogleDriveService::new(
        reqwest::Client::new(),
        Arc::new(StaticTokenProvider::new(TEST_TOKEN)),
        &app.settings.drive,
    ));

    let storage = DriveSession::with_backend(app.settings.clone(), backend).storage();

    assert!(storage.key_exists("data", "report.csv").await.unwrap());
    assert_eq!(storage.read_object("report.csv", "data").await.unwrap(), b"a\n1\n");
}
