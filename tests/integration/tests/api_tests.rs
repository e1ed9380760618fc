//! HTTP API integration tests
//!
//! Uploads, static serving, account endpoints and health, against an
//! in-memory user store.
//!
//! Run with: cargo test -p integration-tests --test api_tests

use integration_tests::{assert_error, assert_json, TestServer};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};

fn file_part(name: &str, mime: &str, bytes: &'static [u8]) -> Part {
    Part::bytes(bytes).file_name(name.to_string()).mime_str(mime).unwrap()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_reports_connections() {
    let server = TestServer::start().await.unwrap();
    let _alice = server.connect_as("alice").await.unwrap();

    let response = server.get("/health").await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));

    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body, json!({"status": "ok", "connections": 1}));
}

#[tokio::test]
async fn test_cors_echoes_origin() {
    let server = TestServer::start().await.unwrap();

    let response = server
        .client
        .get(format!("{}/health", server.base_url()))
        .header("origin", "http://app.example")
        .send()
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "http://app.example"
    );
    assert_eq!(
        headers.get("access-control-allow-credentials").unwrap(),
        "true"
    );
}

// ============================================================================
// Uploads
// ============================================================================

#[tokio::test]
async fn test_upload_and_download() {
    let server = TestServer::start().await.unwrap();

    let form = Form::new()
        .part("files", file_part("cat.png", "image/png", b"\x89PNG fake"))
        .part("files", file_part("notes.txt", "text/plain", b"hello"));

    let response = server.post_multipart("/upload/file", form).await.unwrap();
    let body: Value = assert_json(response, StatusCode::CREATED).await.unwrap();

    assert_eq!(body["message"], "Files uploaded successfully");
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);

    let png_name = files[0]["fileName"].as_str().unwrap();
    let png_url = files[0]["fileUrl"].as_str().unwrap();
    assert!(png_name.ends_with(".png"));
    assert_eq!(png_url, format!("/uploads/files/{png_name}"));
    assert!(server.upload_dir().join("files").join(png_name).is_file());

    let txt_url = files[1]["fileUrl"].as_str().unwrap();
    let download = server.get(txt_url).await.unwrap();
    assert_eq!(download.status(), StatusCode::OK);
    assert_eq!(download.text().await.unwrap(), "hello");
}

#[tokio::test]
async fn test_rejected_file_removes_earlier_files_from_request() {
    let server = TestServer::start().await.unwrap();

    let form = Form::new()
        .part("files", file_part("ok.png", "image/png", b"png"))
        .part("files", file_part("run.sh", "application/x-sh", b"#!/bin/sh"));

    let response = server.post_multipart("/upload/file", form).await.unwrap();
    assert_error(response, StatusCode::BAD_REQUEST, "INVALID_INPUT")
        .await
        .unwrap();

    let stored = std::fs::read_dir(server.upload_dir().join("files"))
        .unwrap()
        .count();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn test_upload_requires_files() {
    let server = TestServer::start().await.unwrap();

    let form = Form::new().text("note", "nothing attached");
    let response = server.post_multipart("/upload/file", form).await.unwrap();

    let body = assert_error(response, StatusCode::BAD_REQUEST, "INVALID_INPUT")
        .await
        .unwrap();
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("No files uploaded"));
}

#[tokio::test]
async fn test_upload_caps_file_count() {
    let server = TestServer::start().await.unwrap();

    let form = (0..11).fold(Form::new(), |form, i| {
        form.part("files", file_part(&format!("{i}.txt"), "text/plain", b"x"))
    });

    let response = server.post_multipart("/upload/file", form).await.unwrap();
    assert_error(response, StatusCode::BAD_REQUEST, "INVALID_INPUT")
        .await
        .unwrap();

    // The first ten were written before the eleventh was seen.
    let stored = std::fs::read_dir(server.upload_dir().join("files"))
        .unwrap()
        .count();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn test_upload_body_limit() {
    let server = TestServer::start_with(&[("MAX_FILE_SIZE_MB", "1")]).await.unwrap();

    static BIG: [u8; 2 * 1024 * 1024] = [b'a'; 2 * 1024 * 1024];
    let form = Form::new().part("files", file_part("big.txt", "text/plain", &BIG));

    // The server may reset the connection before the body is fully sent.
    if let Ok(response) = server.post_multipart("/upload/file", form).await {
        assert!(response.status().is_client_error());
    }
    assert_eq!(
        std::fs::read_dir(server.upload_dir().join("files")).unwrap().count(),
        0
    );
}

#[tokio::test]
async fn test_missing_static_file_is_404() {
    let server = TestServer::start().await.unwrap();

    let response = server.get("/uploads/files/nope.png").await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn test_signup_and_login() {
    let server = TestServer::start().await.unwrap();
    let credentials = json!({"username": "alice42", "password": "Secret1!x"});

    let response = server.post("/auth/signup", &credentials).await.unwrap();
    let user: Value = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(user["username"], "alice42");
    assert!(user.get("password").is_none());
    assert!(user.get("passwordHash").is_none());

    let response = server.post("/auth/login", &credentials).await.unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body, json!({"message": "Login successful"}));
}

#[tokio::test]
async fn test_signup_duplicate_username() {
    let server = TestServer::start().await.unwrap();
    let credentials = json!({"username": "bob", "password": "Secret1!x"});

    let response = server.post("/auth/signup", &credentials).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = server.post("/auth/signup", &credentials).await.unwrap();
    assert_error(response, StatusCode::CONFLICT, "ALREADY_EXISTS")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_signup_rejects_weak_input() {
    let server = TestServer::start().await.unwrap();

    for body in [
        json!({"username": "ab", "password": "Secret1!x"}),
        json!({"username": "bad name", "password": "Secret1!x"}),
        json!({"username": "carol", "password": "short"}),
        json!({"username": "carol", "password": "alllowercase1!"}),
    ] {
        let response = server.post("/auth/signup", &body).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
    }
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let server = TestServer::start().await.unwrap();
    server
        .post(
            "/auth/signup",
            &json!({"username": "dave", "password": "Secret1!x"}),
        )
        .await
        .unwrap();

    let wrong_password = server
        .post("/auth/login", &json!({"username": "dave", "password": "Wrong1!xx"}))
        .await
        .unwrap();
    let wrong_user = server
        .post("/auth/login", &json!({"username": "erin", "password": "Secret1!x"}))
        .await
        .unwrap();

    let a = assert_error(wrong_password, StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS")
        .await
        .unwrap();
    let b = assert_error(wrong_user, StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS")
        .await
        .unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_malformed_json_body() {
    let server = TestServer::start().await.unwrap();

    let response = server
        .client
        .post(format!("{}/auth/login", server.base_url()))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_error(response, StatusCode::BAD_REQUEST, "INVALID_BODY")
        .await
        .unwrap();
}
