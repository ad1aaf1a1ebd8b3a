#![allow(clippy::unwrap_used, clippy::panic, clippy::todo, clippy::missing_panics_doc, clippy::must_use_candidate, missing_debug_implementations, clippy::clone_on_ref_ptr, unreachable_pub, clippy::print_stdout, clippy::similar_names)]
use reqwest::{Method, StatusCode};
use std::time::Duration;

mod common;

#[tokio::test]
async fn test_typing_indicator_visible_then_expires() {
    let config = common::get_test_config_with(&["--typing-ttl-ms", "300"]);
    let app = common::TestApp::spawn_with_config(config).await;
    let alice = app.new_user();
    let bob = app.new_user();
    let conv = app.create_conversation(&alice, &bob).await;

    let (status, body) = app.request(Method::PUT, &alice, &format!("/conversations/{conv}/typing"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userId"], alice.user_id.to_string());

    let (status, body) = app.get(&bob, &format!("/conversations/{conv}/typing")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userIds"][0], alice.user_id.to_string());

    // The caller never sees themselves.
    let (_, body) = app.get(&alice, &format!("/conversations/{conv}/typing")).await;
    assert!(body["userIds"].as_array().unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(400)).await;

    let (_, body) = app.get(&bob, &format!("/conversations/{conv}/typing")).await;
    assert!(body["userIds"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_outsider_cannot_signal_typing() {
    let app = common::TestApp::spawn().await;
    let alice = app.new_user();
    let bob = app.new_user();
    let mallory = app.new_user();
    let conv = app.create_conversation(&alice, &bob).await;

    let (status, _) = app.request(Method::PUT, &mallory, &format!("/conversations/{conv}/typing"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
