#![allow(clippy::unwrap_used, clippy::panic, clippy::todo, clippy::missing_panics_doc, clippy::must_use_candidate, missing_debug_implementations, clippy::clone_on_ref_ptr, unreachable_pub, clippy::print_stdout, clippy::similar_names)]
use reqwest::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

mod common;

#[tokio::test]
async fn test_full_direct_message_flow() {
    let app = common::TestApp::spawn().await;
    let alice = app.new_user();
    let bob = app.new_user();

    // 1. Alice messages Bob without creating a conversation first
    let (status, sent) = app
        .post(&alice, &format!("/users/{}/messages", bob.user_id), json!({ "content": "hey bob" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let conv: Uuid = sent["conversationId"].as_str().unwrap().parse().unwrap();
    let message_id = sent["id"].as_str().unwrap().to_string();
    assert_eq!(sent["isRead"], false);

    // 2. Bob sees it as unread
    let (_, unread) = app.get(&bob, &format!("/conversations/{conv}/unread")).await;
    assert_eq!(unread["unreadCount"], 1);

    // 3. Bob reads it
    let (status, read) = app.post(&bob, &format!("/messages/{message_id}/read"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["isRead"], true);
    assert!(read["readAt"].is_string());

    let (_, unread) = app.get(&bob, &format!("/conversations/{conv}/unread")).await;
    assert_eq!(unread["unreadCount"], 0);

    let (status, receipts) = app.get(&alice, &format!("/messages/{message_id}/receipts")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipts["receipts"][0]["readerId"], bob.user_id.to_string());

    // 4. Alice edits, then deletes
    let (status, edited) = app
        .request(Method::PATCH, &alice, &format!("/messages/{message_id}"), Some(json!({ "content": "hey Bob!" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["content"], "hey Bob!");
    assert_eq!(edited["isEdited"], true);

    let (status, deleted) = app.request(Method::DELETE, &alice, &format!("/messages/{message_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["isDeleted"], true);
    assert_eq!(deleted["content"], "[deleted]");

    // 5. The timeline keeps the row and shows the placeholder
    let (_, timeline) = app.get(&bob, &format!("/conversations/{conv}/messages")).await;
    let messages = timeline["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "[deleted]");
}

#[tokio::test]
async fn test_only_sender_may_edit_or_delete() {
    let app = common::TestApp::spawn().await;
    let alice = app.new_user();
    let bob = app.new_user();
    let conv = app.create_conversation(&alice, &bob).await;
    let sent = app.send_message(&alice, conv, "mine").await;
    let id = sent["id"].as_str().unwrap();

    let (status, _) =
        app.request(Method::PATCH, &bob, &format!("/messages/{id}"), Some(json!({ "content": "hijack" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.request(Method::DELETE, &bob, &format!("/messages/{id}"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deleted_message_cannot_be_edited_and_delete_is_idempotent() {
    let app = common::TestApp::spawn().await;
    let alice = app.new_user();
    let bob = app.new_user();
    let conv = app.create_conversation(&alice, &bob).await;
    let sent = app.send_message(&alice, conv, "temporary").await;
    let id = sent["id"].as_str().unwrap();

    let (status, _) = app.request(Method::DELETE, &alice, &format!("/messages/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.request(Method::DELETE, &alice, &format!("/messages/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) =
        app.request(Method::PATCH, &alice, &format!("/messages/{id}"), Some(json!({ "content": "again" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_content_validation() {
    let app = common::TestApp::spawn_with_config(common::get_test_config_with(&["--max-content-chars", "10"])).await;
    let alice = app.new_user();
    let bob = app.new_user();
    let conv = app.create_conversation(&alice, &bob).await;
    let path = format!("/conversations/{conv}/messages");

    let (status, _) = app.post(&alice, &path, json!({ "content": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post(&alice, &path, json!({ "content": "x".repeat(11) })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post(&alice, &path, json!({ "content": "x".repeat(10) })).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_mark_conversation_read_marks_only_incoming() {
    let app = common::TestApp::spawn().await;
    let alice = app.new_user();
    let bob = app.new_user();
    let conv = app.create_conversation(&alice, &bob).await;

    app.send_message(&alice, conv, "one").await;
    app.send_message(&alice, conv, "two").await;
    app.send_message(&bob, conv, "three").await;

    let (status, body) = app.post(&bob, &format!("/conversations/{conv}/read"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["markedRead"], 2);

    let (_, body) = app.post(&bob, &format!("/conversations/{conv}/read"), json!({})).await;
    assert_eq!(body["markedRead"], 0);

    let (_, unread) = app.get(&alice, &format!("/conversations/{conv}/unread")).await;
    assert_eq!(unread["unreadCount"], 1);
}

#[tokio::test]
async fn test_sender_reading_own_message_is_a_no_op() {
    let app = common::TestApp::spawn().await;
    let alice = app.new_user();
    let bob = app.new_user();
    let conv = app.create_conversation(&alice, &bob).await;
    let sent = app.send_message(&alice, conv, "hello").await;
    let id = sent["id"].as_str().unwrap();

    let (status, body) = app.post(&alice, &format!("/messages/{id}/read"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isRead"], false);
}

#[tokio::test]
async fn test_timeline_pages_newest_first() {
    let app = common::TestApp::spawn().await;
    let alice = app.new_user();
    let bob = app.new_user();
    let conv = app.create_conversation(&alice, &bob).await;

    for i in 0..5 {
        app.send_message(&alice, conv, &format!("msg {i}")).await;
    }

    let (status, page) = app.get(&bob, &format!("/conversations/{conv}/messages?limit=2")).await;
    assert_eq!(status, StatusCode::OK);
    let contents: Vec<&str> = page["messages"].as_array().unwrap().iter().map(|m| m["content"].as_str().unwrap()).collect();
    assert_eq!(contents, vec!["msg 4", "msg 3"]);

    let cursor = page["nextBefore"].as_str().unwrap();
    let (_, page) = app.get(&bob, &format!("/conversations/{conv}/messages?limit=2&before={cursor}")).await;
    let contents: Vec<&str> = page["messages"].as_array().unwrap().iter().map(|m| m["content"].as_str().unwrap()).collect();
    assert_eq!(contents, vec!["msg 2", "msg 1"]);

    let cursor = page["nextBefore"].as_str().unwrap();
    let (_, page) = app.get(&bob, &format!("/conversations/{conv}/messages?limit=2&before={cursor}")).await;
    assert_eq!(page["messages"].as_array().unwrap().len(), 1);
    assert!(page["nextBefore"].is_null());
}

#[tokio::test]
async fn test_timeline_rejects_foreign_cursor() {
    let app = common::TestApp::spawn().await;
    let alice = app.new_user();
    let bob = app.new_user();
    let carol = app.new_user();
    let conv = app.create_conversation(&alice, &bob).await;
    let other = app.create_conversation(&alice, &carol).await;
    let foreign = app.send_message(&alice, other, "elsewhere").await;

    let (status, _) = app
        .get(&alice, &format!("/conversations/{conv}/messages?before={}", foreign["id"].as_str().unwrap()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
