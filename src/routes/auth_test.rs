use serde_json::json;

use super::*;
use crate::routes::app;
use crate::routes::test_helpers::*;
use crate::state::test_helpers::test_app_state;

fn creds(email: &str, password: &str) -> Option<serde_json::Value> {
    Some(json!({"email": email, "password": password}))
}

#[tokio::test]
async fn signup_sets_http_only_cookie_and_returns_session() {
    let (state, _) = test_app_state();
    let app = app(state);
    let response = send(&app, request("POST", "/api/auth/signup", None, creds("user@example.com", "password1"))).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let set_cookie = response.headers().get(axum::http::header::SET_COOKIE).unwrap().to_str().unwrap().to_owned();
    assert!(set_cookie.starts_with("session_token="));
    assert!(set_cookie.contains("HttpOnly"));

    let body = body_json(response).await;
    assert_eq!(body["email"], "user@example.com");
    assert!(body.get("token").is_none());
}

#[tokio::test]
async fn signup_with_invalid_email_is_bad_request() {
    let (state, store) = test_app_state();
    let app = app(state);
    let response = send(&app, request("POST", "/api/auth/signup", None, creds("not-an-email", "password1"))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "E_VALIDATION");
    assert!(store.snapshot().await.is_empty());
}

#[tokio::test]
async fn login_me_logout_flow() {
    let (state, _) = test_app_state();
    let app = app(state);
    signup_cookie(&app, "user@example.com").await;

    let response = send(&app, request("POST", "/api/auth/login", None, creds("user@example.com", "password1"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response_cookie(&response).unwrap();

    let response = send(&app, request("GET", "/api/auth/me", Some(&cookie), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["email"], "user@example.com");

    let response = send(&app, request("POST", "/api/auth/logout", Some(&cookie), None)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response_cookie(&response).as_deref(), Some("session_token="));

    let response = send(&app, request("GET", "/api/auth/me", Some(&cookie), None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let (state, _) = test_app_state();
    let app = app(state);
    signup_cookie(&app, "user@example.com").await;

    let response = send(&app, request("POST", "/api/auth/login", None, creds("user@example.com", "wrong-pass1"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response_cookie(&response).is_none());
    assert_eq!(body_json(response).await["code"], "E_NOT_AUTHENTICATED");
}

#[tokio::test]
async fn me_without_cookie_is_unauthorized() {
    let (state, _) = test_app_state();
    let app = app(state);
    let response = send(&app, request("GET", "/api/auth/me", None, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_without_session_is_no_content() {
    let (state, _) = test_app_state();
    let app = app(state);
    let response = send(&app, request("POST", "/api/auth/logout", None, None)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
