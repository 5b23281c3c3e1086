//! Integration tests for the public surface of the session_auth server

use jsonwebtoken::Algorithm;
use std::net::TcpListener;
use std::sync::Arc;
use session_auth::auth::TokenService;
use session_auth::configuration::AuthSettings;
use session_auth::session_store::InMemorySessionStore;
use session_auth::startup::run;

fn spawn_app(expose_login: bool) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let settings = AuthSettings {
        secret: "health-check-secret-at-least-32-characters".to_string(),
        access_token_ttl: 900,
        refresh_token_ttl: 604800,
        algorithm: Algorithm::HS256,
    };
    let tokens = TokenService::new(&settings, Arc::new(InMemorySessionStore::new()))
        .expect("Failed to build token service");
    let server = run(listener, Arc::new(tokens), expose_login)
        .expect("Failed to create server");

    let _ = tokio::spawn(async move {
        let _ = server.await;
    });

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_works() {
    let addr = spawn_app(false);

    let response = reqwest::Client::new()
        .get(&format!("{}/health_check", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn health_check_needs_no_credentials_even_with_garbage_cookie() {
    let addr = spawn_app(false);

    let response = reqwest::Client::new()
        .get(&format!("{}/health_check", addr))
        .header("Cookie", "access_token=not-a-token")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn login_is_not_mounted_unless_exposed() {
    let addr = spawn_app(false);

    let response = reqwest::Client::new()
        .post(&format!("{}/auth/login", addr))
        .json(&serde_json::json!({ "user_id": 1, "role": "user" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(404, response.status().as_u16());
}
