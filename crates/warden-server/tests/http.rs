//! HTTP scenarios against the full router.

use argon2::{Algorithm, Argon2, Params, Version};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use warden_auth::{AuthService, AuthSettings, CredentialVerifier};
use warden_server::{routes::create_router, AppState};

const SIGNING_KEY: &str = "http-test-signing-key-0123456789abcdef";

fn app_with(settings: AuthSettings) -> Router {
    let params = Params::new(1024, 1, 1, None).unwrap();
    let credentials =
        CredentialVerifier::with_argon2(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
            .unwrap();
    let auth = AuthService::builder(settings)
        .credentials(credentials)
        .build()
        .unwrap();
    create_router(AppState::new(Arc::new(auth)), Duration::from_secs(5))
}

fn app() -> Router {
    app_with(AuthSettings::new(SIGNING_KEY))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register(app: &Router, username: &str, password: &str, role: i32) -> StatusCode {
    let body = json!({ "username": username, "password": password, "role": role });
    send(app, Method::POST, "/register", None, Some(body)).await.0
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let body = json!({ "username": username, "password": password });
    let (status, value) = send(app, Method::POST, "/login", None, Some(body)).await;
    assert_eq!(status, StatusCode::OK, "login failed: {value}");
    value["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn root_and_health() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Hello World");

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_login_logout_flow() {
    let app = app();
    assert_eq!(register(&app, "alice", "secret", 3).await, StatusCode::CREATED);

    let body = json!({ "username": "alice", "password": "secret" });
    let (status, value) = send(&app, Method::POST, "/login", None, Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    let token = value["token"].as_str().unwrap().to_string();
    assert!(value["active_time"].as_i64().unwrap() > chrono::Utc::now().timestamp());

    let (status, _) = send(&app, Method::GET, "/user_path", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::POST, "/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/user_path", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn register_response_and_errors() {
    let app = app();
    let body = json!({ "username": "bob", "password": "pw", "role": 3 });
    let (status, value) = send(&app, Method::POST, "/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(value["msg"], "User created successfully");

    assert_eq!(register(&app, "bob", "other", 3).await, StatusCode::CONFLICT);
    assert_eq!(register(&app, "carol", "pw", 42).await, StatusCode::BAD_REQUEST);
    assert_eq!(register(&app, "", "pw", 3).await, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_failures_look_the_same() {
    let app = app();
    register(&app, "dave", "right", 3).await;

    let wrong = json!({ "username": "dave", "password": "wrong" });
    let unknown = json!({ "username": "nobody", "password": "right" });
    let (s1, b1) = send(&app, Method::POST, "/login", None, Some(wrong)).await;
    let (s2, b2) = send(&app, Method::POST, "/login", None, Some(unknown)).await;

    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s1, s2);
    assert_eq!(b1, b2);
    assert_eq!(b1["error"]["code"], "invalid_credentials");
}

#[tokio::test]
async fn role_gates() {
    let app = app();
    register(&app, "root", "pw", 1).await;
    register(&app, "mod", "pw", 2).await;
    register(&app, "pleb", "pw", 3).await;
    let admin = login(&app, "root", "pw").await;
    let moderator = login(&app, "mod", "pw").await;
    let user = login(&app, "pleb", "pw").await;

    let cases = [
        (&admin, "/admin_path", StatusCode::OK),
        (&admin, "/moderator_path", StatusCode::OK),
        (&admin, "/user_path", StatusCode::OK),
        (&moderator, "/admin_path", StatusCode::FORBIDDEN),
        (&moderator, "/moderator_path", StatusCode::OK),
        (&moderator, "/user_path", StatusCode::OK),
        (&user, "/admin_path", StatusCode::FORBIDDEN),
        (&user, "/moderator_path", StatusCode::FORBIDDEN),
        (&user, "/user_path", StatusCode::OK),
    ];
    for (token, path, expected) in cases {
        let (status, _) = send(&app, Method::GET, path, Some(token), None).await;
        assert_eq!(status, expected, "{path}");
    }
}

#[tokio::test]
async fn gated_path_without_token_is_bad_request() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/user_path", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_authorization_header");
}

#[tokio::test]
async fn token_in_cookie_is_accepted() {
    let app = app();
    register(&app, "erin", "pw", 3).await;
    let token = login(&app, "erin", "pw").await;

    let request = Request::builder()
        .uri("/user_path")
        .header(header::COOKIE, format!("access_token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn refresh_keeps_access() {
    let app = app();
    register(&app, "frank", "pw", 2).await;
    let token = login(&app, "frank", "pw").await;

    let (status, value) = send(&app, Method::POST, "/refresh/token", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let refreshed = value["token"].as_str().unwrap().to_string();

    let (status, _) = send(&app, Method::GET, "/moderator_path", Some(&refreshed), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::POST, "/refresh/token", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "invalid_token");
}

#[tokio::test]
async fn logout_all_ends_every_session() {
    let app = app();
    register(&app, "gina", "pw", 3).await;
    let t1 = login(&app, "gina", "pw").await;
    let t2 = login(&app, "gina", "pw").await;

    let (status, _) = send(&app, Method::POST, "/logout", Some(&t1), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, "/user_path", Some(&t2), None).await;
    assert_eq!(status, StatusCode::OK);

    let t3 = login(&app, "gina", "pw").await;
    let (status, _) = send(&app, Method::POST, "/logout_all", Some(&t2), None).await;
    assert_eq!(status, StatusCode::OK);
    for token in [&t1, &t2, &t3] {
        let (status, _) = send(&app, Method::GET, "/user_path", Some(token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // Logging out again with a dead token is rejected.
    let (status, body) = send(&app, Method::POST, "/logout_all", Some(&t2), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "invalid_token");
}

#[tokio::test]
async fn exposed_denial_reasons() {
    let mut settings = AuthSettings::new(SIGNING_KEY);
    settings.expose_denial_reasons = true;
    let app = app_with(settings);
    register(&app, "hank", "pw", 3).await;
    let token = login(&app, "hank", "pw").await;

    let (status, body) = send(&app, Method::GET, "/admin_path", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "insufficient_role");

    send(&app, Method::POST, "/logout", Some(&token), None).await;
    let (status, body) = send(&app, Method::GET, "/user_path", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "token_revoked");

    let (_, body) = send(&app, Method::GET, "/user_path", Some("nope"), None).await;
    assert_eq!(body["error"]["code"], "invalid_token");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/missing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}
