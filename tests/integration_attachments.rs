#![allow(clippy::unwrap_used, clippy::panic, clippy::todo, clippy::missing_panics_doc, clippy::must_use_candidate, missing_debug_implementations, clippy::clone_on_ref_ptr, unreachable_pub, clippy::print_stdout, clippy::similar_names)]
use reqwest::StatusCode;
use serde_json::json;

mod common;

#[tokio::test]
async fn test_attach_and_list_metadata() {
    let app = common::TestApp::spawn().await;
    let alice = app.new_user();
    let bob = app.new_user();
    let conv = app.create_conversation(&alice, &bob).await;
    let sent = app.send_message(&alice, conv, "holiday pics").await;
    let id = sent["id"].as_str().unwrap();

    let (status, body) = app
        .post(&alice, &format!("/messages/{id}/attachments"), json!({ "fileName": "beach.jpg", "fileSize": 204_800 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["fileType"], "image");
    assert_eq!(body["mimeType"], "image/jpeg");

    let (status, list) = app.get(&bob, &format!("/messages/{id}/attachments")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["attachments"].as_array().unwrap().len(), 1);
    assert_eq!(list["attachments"][0]["fileName"], "beach.jpg");
}

#[tokio::test]
async fn test_attachment_policy_rejections() {
    let config = common::get_test_config_with(&["--attachment-max-size-bytes", "1000"]);
    let app = common::TestApp::spawn_with_config(config).await;
    let alice = app.new_user();
    let bob = app.new_user();
    let conv = app.create_conversation(&alice, &bob).await;
    let sent = app.send_message(&alice, conv, "files").await;
    let path = format!("/messages/{}/attachments", sent["id"].as_str().unwrap());

    let (status, body) = app.post(&alice, &path, json!({ "fileName": "big.png", "fileSize": 1001 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Attachment rejected"));

    let (status, _) = app.post(&alice, &path, json!({ "fileName": "page.html", "fileSize": 10 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) =
        app.post(&alice, &path, json!({ "fileName": "report.pdf", "fileSize": 10, "fileType": "video" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post(&bob, &path, json!({ "fileName": "ok.png", "fileSize": 10 })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, list) = app.get(&alice, &path).await;
    assert!(list["attachments"].as_array().unwrap().is_empty());
}
