use axum::Router;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower::Service;
use uuid::Uuid;

use server::routes::{self, auth};
use server::widget_api::WidgetClient;
use service::store::{file::FileUserStore, UserStore};

const TEST_PASSWORD: &str = "test-password";

fn cors() -> tower_http::cors::CorsLayer { tower_http::cors::CorsLayer::very_permissive() }

async fn build_app() -> anyhow::Result<Router> {
    // isolated store file per test run
    let users_file = std::env::temp_dir().join(format!("users_flow_{}.json", Uuid::new_v4()));
    let store: Arc<dyn UserStore> = FileUserStore::new(&users_file, Duration::from_secs(5)).await?;

    let state = auth::ServerState {
        store,
        widget: Arc::new(WidgetClient::new(configs::WidgetConfig::default())),
        auth: auth::ServerAuthConfig {
            webapp_password: TEST_PASSWORD.into(),
            secure_cookies: false,
        },
    };
    Ok(routes::build_router(cors(), state))
}

fn api_request(method: &str, uri: &str, body: serde_json::Value, with_password: bool) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if with_password {
        builder = builder.header(header::COOKIE, format!("app_password={TEST_PASSWORD}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request build")
}

async fn json_body(resp: axum::response::Response) -> anyhow::Result<serde_json::Value> {
    let bytes = axum::body::to_bytes(resp.into_body(), 64 * 1024).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn test_health_is_public() -> anyhow::Result<()> {
    let mut app = build_app().await?;
    let req = Request::builder().uri("/health").body(Body::empty())?;
    let resp = app.call(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_api_requires_password_cookie() -> anyhow::Result<()> {
    let app = build_app().await?;

    let req = api_request("POST", "/api/users", json!({"email": "a@x.com", "workspaceName": "Acme"}), false);
    let resp = app.clone().call(req).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_login_sets_password_cookie() -> anyhow::Result<()> {
    let app = build_app().await?;

    // wrong password
    let req = api_request("POST", "/api/login", json!({"password": "nope"}), false);
    let resp = app.clone().call(req).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // correct password
    let req = api_request("POST", "/api/login", json!({"password": TEST_PASSWORD}), false);
    let resp = app.clone().call(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("set-cookie present");
    assert!(cookie.contains("app_password="));
    Ok(())
}

#[tokio::test]
async fn test_create_then_update_flow() -> anyhow::Result<()> {
    let app = build_app().await?;
    let email = format!("user_{}@example.com", Uuid::new_v4());

    // first submit creates (201) and signs the user in
    let req = api_request("POST", "/api/users", json!({"email": email, "workspaceName": "Acme"}), true);
    let resp = app.clone().call(req).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let cookie = resp
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("set-cookie present");
    assert!(cookie.contains("user_email="));
    let body = json_body(resp).await?;
    assert_eq!(body["email"], email.as_str());
    assert_eq!(body["workspaceName"], "Acme");

    // second submit updates (200)
    let req = api_request("POST", "/api/users", json!({"email": email, "workspaceName": "Acme2"}), true);
    let resp = app.clone().call(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await?;
    assert_eq!(body["workspaceName"], "Acme2");

    // current-user lookup reflects the cookie identity
    let req = Request::builder()
        .method("GET")
        .uri("/api/users/me")
        .header(
            header::COOKIE,
            format!("app_password={TEST_PASSWORD}; user_email={email}"),
        )
        .body(Body::empty())?;
    let resp = app.clone().call(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await?;
    assert_eq!(body["workspaceName"], "Acme2");
    Ok(())
}

#[tokio::test]
async fn test_upsert_validation_errors() -> anyhow::Result<()> {
    let app = build_app().await?;

    let req = api_request("POST", "/api/users", json!({"workspaceName": "Acme"}), true);
    let resp = app.clone().call(req).await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await?;
    assert_eq!(body["error"], "email is required");

    let req = api_request("POST", "/api/users", json!({"email": "a@x.com"}), true);
    let resp = app.clone().call(req).await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = api_request("POST", "/api/users", json!({"email": "not-an-email", "workspaceName": "W"}), true);
    let resp = app.clone().call(req).await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_me_without_identity_is_unauthorized() -> anyhow::Result<()> {
    let app = build_app().await?;

    let req = Request::builder()
        .method("GET")
        .uri("/api/users/me")
        .header(header::COOKIE, format!("app_password={TEST_PASSWORD}"))
        .body(Body::empty())?;
    let resp = app.clone().call(req).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_widget_token_requires_identity() -> anyhow::Result<()> {
    let app = build_app().await?;

    let req = api_request("POST", "/api/widget/token", json!({}), true);
    let resp = app.clone().call(req).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_logout_clears_identity_cookie() -> anyhow::Result<()> {
    let app = build_app().await?;

    let req = api_request("POST", "/api/logout", json!({}), true);
    let resp = app.clone().call(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("set-cookie present");
    assert!(cookie.starts_with("user_email="));
    Ok(())
}
