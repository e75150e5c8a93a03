use axum_test::TestServer;
use serde_json::json;
use uuid::Uuid;

/// Signed-up user and its bearer token
pub struct TestUser {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub password: String,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Sign up through the API and return the issued token.
pub async fn register_test_user(client: &TestServer, username: &str) -> TestUser {
    let email = format!("{}@example.com", username);
    let password = "TestPassword123!".to_string();

    let response = client
        .post("/auth/signup")
        .json(&json!({
            "username": username,
            "email": email,
            "password": password,
        }))
        .await;
    assert_eq!(response.status_code(), 201, "signup failed: {}", response.text());

    let body: serde_json::Value = response.json();
    let user_id = Uuid::parse_str(body["user"]["id"].as_str().expect("Expected user id"))
        .expect("Invalid user id");
    let token = body["access_token"]
        .as_str()
        .expect("Expected access_token")
        .to_string();

    TestUser {
        user_id,
        username: username.to_string(),
        email,
        password,
        token,
    }
}
