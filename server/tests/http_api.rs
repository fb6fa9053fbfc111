//! End-to-end tests driving the wire protocol against a live server

use std::env;
use std::path::{Path, PathBuf};

use picstash_core::protocol::{DeleteResponse, ListResponse, UploadResponse};
use picstash_core::FsImageStore;
use reqwest::multipart::{Form, Part};
use server::{start_server, ServerHandle};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake image payload";

fn temp_store_dir() -> PathBuf {
    env::temp_dir().join(format!("picstash_api_test_{}", uuid::Uuid::new_v4()))
}

async fn start_test_server(dir: &Path) -> ServerHandle {
    let store = FsImageStore::new(dir.to_path_buf(), "/assets/images");
    start_server(store).await.unwrap()
}

fn file_part(name: &str, data: &[u8]) -> Part {
    Part::bytes(data.to_vec()).file_name(name.to_string())
}

async fn upload(
    client: &reqwest::Client,
    handle: &ServerHandle,
    parts: Vec<(&str, Part)>,
) -> UploadResponse {
    let mut form = Form::new();
    for (field, part) in parts {
        form = form.part(field.to_string(), part);
    }
    client
        .post(format!("{}/api/images/upload", handle.url()))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn list(client: &reqwest::Client, handle: &ServerHandle) -> ListResponse {
    client
        .get(format!("{}/api/images/list", handle.url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn delete(client: &reqwest::Client, handle: &ServerHandle, filename: &str) -> DeleteResponse {
    client
        .post(format!("{}/api/images/delete", handle.url()))
        .json(&serde_json::json!({ "filename": filename }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_upload_then_list_round_trip() {
    let dir = temp_store_dir();
    let handle = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    let response = upload(
        &client,
        &handle,
        vec![("images[]", file_part("cat photo.png", PNG_BYTES))],
    )
    .await;

    assert!(response.ok);
    assert_eq!(response.uploaded.len(), 1);
    let stored = &response.uploaded[0];
    assert_eq!(stored.original, "cat photo.png");
    assert!(stored.filename.starts_with("cat_photo_"));
    assert!(stored.filename.ends_with(".png"));
    assert_eq!(stored.size, PNG_BYTES.len() as u64);
    assert_eq!(stored.url, format!("/assets/images/{}", stored.filename));

    let listed = list(&client, &handle).await;
    assert!(listed.ok);
    assert_eq!(listed.images.len(), 1);
    assert_eq!(listed.images[0].filename, stored.filename);
    assert_eq!(listed.images[0].size, PNG_BYTES.len() as u64);

    // The bytes on disk are the bytes that went over the wire
    let on_disk = std::fs::read(dir.join(&stored.filename)).unwrap();
    assert_eq!(on_disk, PNG_BYTES);

    handle.stop();
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_duplicate_original_names_stay_unique() {
    let dir = temp_store_dir();
    let handle = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    let first = upload(
        &client,
        &handle,
        vec![("images[]", file_part("same.png", b"first"))],
    )
    .await;
    let second = upload(
        &client,
        &handle,
        vec![("images[]", file_part("same.png", b"second"))],
    )
    .await;

    assert!(first.ok && second.ok);
    assert_ne!(first.uploaded[0].filename, second.uploaded[0].filename);

    handle.stop();
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_partial_batch_reports_both_sides() {
    let dir = temp_store_dir();
    let handle = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    let oversize = vec![0u8; 5 * 1024 * 1024 + 1];
    let response = upload(
        &client,
        &handle,
        vec![
            ("images[]", file_part("ok1.jpg", b"a")),
            ("images[]", file_part("big.png", &oversize)),
            ("images[]", file_part("ok2.gif", b"b")),
        ],
    )
    .await;

    assert!(response.ok);
    assert_eq!(response.uploaded.len(), 2);
    assert_eq!(response.errors.len(), 1);
    assert!(response.errors[0].contains("big.png"));

    handle.stop();
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_fully_failed_batch_reports_overall_failure() {
    let dir = temp_store_dir();
    let handle = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    let response = upload(
        &client,
        &handle,
        vec![
            ("images[]", file_part("script.sh", b"#!/bin/sh")),
            ("images[]", file_part("notes.txt", b"text")),
        ],
    )
    .await;

    assert!(!response.ok);
    assert!(response.uploaded.is_empty());
    let error = response.error.unwrap();
    assert!(error.contains("script.sh"));
    assert!(error.contains("notes.txt"));

    handle.stop();
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_list_before_first_upload_is_empty() {
    let dir = temp_store_dir();
    let handle = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    // The store directory does not exist yet; that is not an error
    let listed = list(&client, &handle).await;
    assert!(listed.ok);
    assert!(listed.images.is_empty());

    handle.stop();
}

#[tokio::test]
async fn test_list_is_idempotent() {
    let dir = temp_store_dir();
    let handle = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    upload(
        &client,
        &handle,
        vec![
            ("images[]", file_part("a.png", b"a")),
            ("images[]", file_part("b.png", b"b")),
        ],
    )
    .await;

    let first = list(&client, &handle).await;
    let second = list(&client, &handle).await;
    assert_eq!(first.images, second.images);

    handle.stop();
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_delete_round_trip() {
    let dir = temp_store_dir();
    let handle = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    let uploaded = upload(
        &client,
        &handle,
        vec![("images[]", file_part("gone.png", b"g"))],
    )
    .await;
    let filename = uploaded.uploaded[0].filename.clone();

    let response = delete(&client, &handle, &filename).await;
    assert!(response.ok);
    assert_eq!(response.message.as_deref(), Some("File deleted"));
    assert!(list(&client, &handle).await.images.is_empty());

    handle.stop();
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_delete_missing_file_is_in_band_error() {
    let dir = temp_store_dir();
    let handle = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    let response = delete(&client, &handle, "never_stored.png").await;
    assert!(!response.ok);
    assert_eq!(response.error.as_deref(), Some("File not found"));

    let empty = delete(&client, &handle, "").await;
    assert!(!empty.ok);
    assert_eq!(empty.error.as_deref(), Some("No filename given"));

    handle.stop();
}

#[tokio::test]
async fn test_delete_ignores_path_traversal_segments() {
    let base = temp_store_dir();
    let store_dir = base.join("store");
    let handle = start_test_server(&store_dir).await;
    let client = reqwest::Client::new();

    // A file right outside the store directory
    std::fs::create_dir_all(&base).unwrap();
    let outside = base.join("secret.png");
    std::fs::write(&outside, b"keep me").unwrap();

    let uploaded = upload(
        &client,
        &handle,
        vec![("images[]", file_part("inside.png", b"i"))],
    )
    .await;
    let filename = uploaded.uploaded[0].filename.clone();

    // Traversal input resolves to a basename the store does not hold
    let response = delete(&client, &handle, "../secret.png").await;
    assert!(!response.ok);
    assert_eq!(response.error.as_deref(), Some("File not found"));
    assert!(outside.exists());

    // Bogus path segments in front of a real basename still delete only
    // inside the store
    let response = delete(&client, &handle, &format!("foo/../{}", filename)).await;
    assert!(response.ok);
    assert!(outside.exists());
    assert!(list(&client, &handle).await.images.is_empty());

    handle.stop();
    std::fs::remove_dir_all(&base).ok();
}

#[tokio::test]
async fn test_unknown_action_is_reported() {
    let dir = temp_store_dir();
    let handle = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/images/rotate", handle.url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["ok"], serde_json::Value::Bool(false));
    assert_eq!(body["error"], "Unknown action");

    handle.stop();
}

#[tokio::test]
async fn test_upload_without_files_fails_overall() {
    let dir = temp_store_dir();
    let handle = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    // A multipart body whose parts are not under the images field
    let response = upload(
        &client,
        &handle,
        vec![("unrelated", file_part("a.png", b"a"))],
    )
    .await;
    assert!(!response.ok);
    assert!(response.uploaded.is_empty());
    assert!(response.error.is_some());

    handle.stop();
}
