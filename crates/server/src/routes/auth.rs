use axum::{Json, extract::{State, Request}, http::StatusCode, middleware::Next, response::Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::sync::Arc;

use models::user::UserRecord;
use service::store::UserStore;

use crate::errors::ApiError;
use crate::widget_api::WidgetClient;

/// Name of the cookie carrying the shared web-app password.
pub const APP_PASSWORD_COOKIE: &str = "app_password";
/// Name of the cookie identifying the current user by email.
pub const USER_EMAIL_COOKIE: &str = "user_email";

#[derive(Clone)]
pub struct ServerAuthConfig {
    pub webapp_password: String,
    pub secure_cookies: bool,
}

#[derive(Clone)]
pub struct ServerState {
    pub store: Arc<dyn UserStore>,
    pub widget: Arc<WidgetClient>,
    pub auth: ServerAuthConfig,
}

#[derive(Deserialize)]
pub struct LoginInput {
    pub password: String,
}

fn session_cookie(name: &'static str, value: String, auth: &ServerAuthConfig) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(auth.secure_cookies);
    cookie.set_same_site(SameSite::Strict);
    cookie
}

/// Attach the `user_email` identity cookie after a successful upsert.
pub fn set_auth_cookie(jar: CookieJar, email: &str, auth: &ServerAuthConfig) -> CookieJar {
    jar.add(session_cookie(USER_EMAIL_COOKIE, email.to_string(), auth))
}

/// Resolve the current user from the `user_email` cookie via the store.
pub async fn current_user(
    state: &ServerState,
    jar: &CookieJar,
) -> Result<Option<UserRecord>, ApiError> {
    let Some(cookie) = jar.get(USER_EMAIL_COOKIE) else {
        return Ok(None);
    };
    Ok(state.store.find_user(cookie.value()).await?)
}

#[utoipa::path(post, path = "/api/login", tag = "auth", request_body = crate::openapi::LoginRequest, responses((status = 200, description = "Logged In"), (status = 401, description = "Unauthorized")))]
pub async fn login(
    State(state): State<ServerState>,
    jar: CookieJar,
    Json(input): Json<LoginInput>,
) -> Result<(CookieJar, Json<serde_json::Value>), ApiError> {
    if state.auth.webapp_password.is_empty() || input.password != state.auth.webapp_password {
        return Err(ApiError::Unauthorized("invalid password".into()));
    }

    let jar = jar.add(session_cookie(APP_PASSWORD_COOKIE, input.password, &state.auth));
    Ok((jar, Json(serde_json::json!({"success": true}))))
}

#[utoipa::path(post, path = "/api/logout", tag = "auth", responses((status = 200, description = "Logged Out")))]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    let mut cookie = Cookie::from(USER_EMAIL_COOKIE);
    cookie.set_path("/");
    let jar = jar.remove(cookie);
    (jar, Json(serde_json::json!({"message": "Logged out successfully"})))
}

/// 全局中间件：除登录与 CORS 预检外，/api 路由要求 app_password cookie
/// 与配置的口令一致；缺失或不符返回 401
pub async fn require_app_password(
    State(state): State<ServerState>,
    jar: CookieJar,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let path = req.uri().path();
    let method = req.method().clone();

    // 白名单：登录与 CORS 预检
    if path == "/api/login" || method == axum::http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let authorized = !state.auth.webapp_password.is_empty()
        && jar
            .get(APP_PASSWORD_COOKIE)
            .map(|c| c.value() == state.auth.webapp_password)
            .unwrap_or(false);

    if !authorized {
        tracing::warn!(path = %path, "missing or invalid app password cookie");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(req).await)
}
