//! User management integration tests.
//!
//! Run with: `cargo test -p detector-api --test users_test`

mod helpers;

use helpers::auth::register_test_user;
use helpers::fixtures::{detect, upload_cat};
use helpers::setup_test_app;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_user_routes_require_authentication() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client.get("/users").await;
    assert_eq!(response.status_code(), 401);

    let response = client
        .post("/users")
        .json(&json!({ "username": "bob", "email": "bob@example.com", "password": "pw" }))
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_create_and_list_users() {
    let app = setup_test_app().await;
    let client = app.client();
    let admin = register_test_user(client, "alice").await;

    let response = client
        .post("/users")
        .add_header("Authorization", admin.bearer())
        .json(&json!({ "username": "bob", "email": "Bob@Example.com", "password": "pw" }))
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    let created: serde_json::Value = response.json();
    assert_eq!(created["username"], "bob");
    assert_eq!(created["email"], "bob@example.com");
    assert!(created.get("password_hash").is_none());

    let response = client
        .get("/users")
        .add_header("Authorization", admin.bearer())
        .await;
    assert_eq!(response.status_code(), 200);
    let users: Vec<serde_json::Value> = response.json();
    let names: Vec<&str> = users.iter().map(|u| u["username"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["alice", "bob"]);

    // The created account can log in
    let response = client
        .post("/auth/login")
        .json(&json!({ "email": "bob@example.com", "password": "pw" }))
        .await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_create_user_validation_and_conflict() {
    let app = setup_test_app().await;
    let client = app.client();
    let admin = register_test_user(client, "alice").await;

    for body in [
        json!({ "username": "b".repeat(31), "email": "bob@example.com", "password": "pw" }),
        json!({ "username": "bob", "email": "nope", "password": "pw" }),
        json!({ "username": "bob", "email": "bob@example.com", "password": "" }),
        json!({ "username": "bob" }),
    ] {
        let response = client
            .post("/users")
            .add_header("Authorization", admin.bearer())
            .json(&body)
            .await;
        assert_eq!(response.status_code(), 400, "{}", body);
    }

    let response = client
        .post("/users")
        .add_header("Authorization", admin.bearer())
        .json(&json!({ "username": "other", "email": "ALICE@example.com", "password": "pw" }))
        .await;
    assert_eq!(response.status_code(), 409);
}

#[tokio::test]
async fn test_get_unknown_user() {
    let app = setup_test_app().await;
    let client = app.client();
    let admin = register_test_user(client, "alice").await;

    for id in [Uuid::new_v4().to_string(), "abc".to_string()] {
        let response = client
            .get(&format!("/users/{}", id))
            .add_header("Authorization", admin.bearer())
            .await;
        assert_eq!(response.status_code(), 404);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "User not found");
    }

    let response = client
        .get(&format!("/users/{}", admin.user_id))
        .add_header("Authorization", admin.bearer())
        .await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["email"], "alice@example.com");
}

#[tokio::test]
async fn test_update_user_replaces_credentials() {
    let app = setup_test_app().await;
    let client = app.client();
    let admin = register_test_user(client, "alice").await;
    let bob = register_test_user(client, "bob").await;

    let response = client
        .post(&format!("/users/{}", bob.user_id))
        .add_header("Authorization", admin.bearer())
        .json(&json!({ "username": "robert", "email": "robert@example.com", "password": "new-pw" }))
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
    let body: serde_json::Value = response.json();
    assert_eq!(body["id"], bob.user_id.to_string());
    assert_eq!(body["username"], "robert");

    let response = client
        .post("/auth/login")
        .json(&json!({ "email": "robert@example.com", "password": "new-pw" }))
        .await;
    assert_eq!(response.status_code(), 200);

    let response = client
        .post("/auth/login")
        .json(&json!({ "email": bob.email, "password": bob.password }))
        .await;
    assert_eq!(response.status_code(), 401);

    // Taking someone else's email conflicts
    let response = client
        .post(&format!("/users/{}", bob.user_id))
        .add_header("Authorization", admin.bearer())
        .json(&json!({ "username": "robert", "email": "alice@example.com", "password": "pw" }))
        .await;
    assert_eq!(response.status_code(), 409);

    let response = client
        .post(&format!("/users/{}", Uuid::new_v4()))
        .add_header("Authorization", admin.bearer())
        .json(&json!({ "username": "x", "email": "x@example.com", "password": "pw" }))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_delete_user_removes_images_and_files() {
    let app = setup_test_app().await;
    let client = app.client();
    let admin = register_test_user(client, "alice").await;
    let bob = register_test_user(client, "bob").await;

    let uploaded = upload_cat(client, &bob).await;
    let response = detect(client, &bob, uploaded["id"].as_str().unwrap()).await;
    assert_eq!(response.status_code(), 200);
    upload_cat(client, &bob).await;
    let kept = upload_cat(client, &admin).await;

    assert_eq!(app.image_count().await, 3);
    assert_eq!(app.tag_count().await, 1);
    assert_eq!(app.stored_files().len(), 4);

    let response = client
        .post(&format!("/users/{}/delete", bob.user_id))
        .add_header("Authorization", admin.bearer())
        .await;
    assert_eq!(response.status_code(), 204);

    assert_eq!(app.image_count().await, 1);
    assert_eq!(app.tag_count().await, 0);
    assert_eq!(
        app.stored_files(),
        vec![kept["image_path"].as_str().unwrap().to_string()]
    );

    // Deleting again finds nothing
    let response = client
        .post(&format!("/users/{}/delete", bob.user_id))
        .add_header("Authorization", admin.bearer())
        .await;
    assert_eq!(response.status_code(), 404);

    // The deleted user's token no longer authenticates
    let response = client
        .get("/upload")
        .add_header("Authorization", bob.bearer())
        .await;
    assert_eq!(response.status_code(), 401);
}
