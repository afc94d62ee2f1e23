use drivebucket_services::{BackendError, FolderId, StorageError};

use crate::fixtures::test_app::TestDrive;

#[tokio::test]
async fn missing_bucket_is_not_found() {
    let app = TestDrive::spawn().await;
    app.drive.add_folder("data", None);
    let storage = app.storage().await;

    let err = storage.get_bucket("results").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "No folder named 'results'");
    assert_eq!(app.drive.calls().media, 0);
}

#[tokio::test]
async fn folder_on_a_later_page_is_found() {
    let app = TestDrive::spawn().await;
    for i in 0..4 {
        app.drive.add_folder(&format!("bucket-{}", i), None);
    }
    let wanted = app.drive.add_folder("models", None);
    let storage = app.storage().await;

    let id = storage.get_bucket("models").await.unwrap();
    assert_eq!(id.as_str(), wanted);
    assert_eq!(app.drive.calls().list, 3);
}

#[tokio::test]
async fn server_side_page_cap_is_followed() {
    let app = TestDrive::spawn().await;
    app.drive.add_folder("a", None);
    app.drive.add_folder("b", None);
    let wanted = app.drive.add_folder("c", None);
    app.drive.set_max_page_size(1);
    let storage = app.storage().await;

    let id = storage.get_bucket("c").await.unwrap();
    assert_eq!(id.as_str(), wanted);
    assert_eq!(app.drive.calls().list, 3);
}

#[tokio::test]
async fn duplicate_folder_names_resolve_to_last_listed() {
    let app = TestDrive::spawn().await;
    app.drive.add_folder("data", None);
    app.drive.add_folder("misc", None);
    let last = app.drive.add_folder("data", None);
    let storage = app.storage().await;

    let id = storage.get_bucket("data").await.unwrap();
    assert_eq!(id, FolderId::new(last));
}

#[tokio::test]
async fn resolve_file_returns_every_match_in_order() {
    let app = TestDrive::spawn().await;
    let data = app.drive.add_folder("data", None);
    let first = app.drive.add_file("report.csv", &data, b"1");
    app.drive.add_file("other.csv", &data, b"2");
    let second = app.drive.add_file("report.csv", &data, b"3");
    let storage = app.storage().await;
    let folder = FolderId::new(data);

    let matches = storage
        .resolver()
        .resolve_file("report.csv", &folder)
        .await
        .unwrap();
    let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec![first.as_str(), second.as_str()]);
    assert!(matches.iter().all(|m| m.parent == folder));

    let none = storage
        .resolver()
        .resolve_file("absent.csv", &folder)
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn file_in_another_folder_is_not_matched() {
    let app = TestDrive::spawn().await;
    let data = app.drive.add_folder("data", None);
    let other = app.drive.add_folder("other", None);
    app.drive.add_file("report.csv", &other, b"x");
    let storage = app.storage().await;

    let matches = storage
        .get_file_objects("report.csv", "data")
        .await
        .unwrap();
    assert!(matches.is_empty());
    assert!(app.drive.children_named(&data, "report.csv").is_empty());
}

#[tokio::test]
async fn child_folders_are_scoped_to_parent() {
    let app = TestDrive::spawn().await;
    let root = app.drive.add_folder("root", None);
    let elsewhere = app.drive.add_folder("elsewhere", None);
    let archive = app.drive.add_folder("archive", Some(&root));
    app.drive.add_folder("archive", Some(&elsewhere));
    let storage = app.storage().await;

    let found = storage
        .resolver()
        .resolve_child_folders("archive", &FolderId::new(root))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id.as_str(), archive);
    assert_eq!(found[0].name, "archive");
}

#[tokio::test]
async fn transient_listing_failures_are_retried() {
    let app = TestDrive::spawn().await;
    let data = app.drive.add_folder("data", None);
    app.drive.fail_next_lists(2);
    let storage = app.storage().await;

    let id = storage.get_bucket("data").await.unwrap();
    assert_eq!(id.as_str(), data);
    assert_eq!(app.drive.calls().list, 3);
}

#[tokio::test]
async fn listing_gives_up_after_max_retries() {
    let app = TestDrive::spawn().await;
    app.drive.add_folder("data", None);
    app.drive.fail_next_lists(10);
    let storage = app.storage().await;

    let err = storage.get_bucket("data").await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Backend(BackendError::Status { status: 503, .. })
    ));
    assert!(err.is_transient());
    assert_eq!(app.drive.calls().list, 3);
}
