use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use models::user::{self, UserRecord};

use crate::errors::ApiError;
use crate::routes::auth::{self, ServerState};

#[derive(Deserialize)]
pub struct UpsertUserInput {
    pub email: Option<String>,
    #[serde(rename = "workspaceName")]
    pub workspace_name: Option<String>,
}

/// Create-or-update flow: absent email is added (201), present email gets its
/// workspace name replaced (200). Either way the caller is signed in via the
/// `user_email` cookie and receives the resulting record.
#[utoipa::path(post, path = "/api/users", tag = "users", request_body = crate::openapi::UpsertUserRequest, responses((status = 201, description = "Created"), (status = 200, description = "Updated"), (status = 400, description = "Bad Request"), (status = 409, description = "Conflict")))]
pub async fn create_or_update(
    State(state): State<ServerState>,
    jar: CookieJar,
    Json(input): Json<UpsertUserInput>,
) -> Result<(StatusCode, CookieJar, Json<UserRecord>), ApiError> {
    let Some(email) = input.email.filter(|e| !e.is_empty()) else {
        return Err(ApiError::BadRequest("email is required".into()));
    };
    let Some(workspace_name) = input.workspace_name.filter(|w| !w.is_empty()) else {
        return Err(ApiError::BadRequest("workspace name is required".into()));
    };
    user::validate_email(&email).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let (status, record) = match state.store.find_user(&email).await? {
        None => (StatusCode::CREATED, state.store.add_user(&email, &workspace_name).await?),
        Some(_) => (StatusCode::OK, state.store.update_user(&email, &workspace_name).await?),
    };

    let jar = auth::set_auth_cookie(jar, &record.email, &state.auth);
    Ok((status, jar, Json(record)))
}

#[utoipa::path(get, path = "/api/users/me", tag = "users", responses((status = 200, description = "Current user"), (status = 401, description = "Unauthorized")))]
pub async fn me(
    State(state): State<ServerState>,
    jar: CookieJar,
) -> Result<Json<UserRecord>, ApiError> {
    match auth::current_user(&state, &jar).await? {
        Some(found) => Ok(Json(found)),
        None => Err(ApiError::Unauthorized("not authenticated".into())),
    }
}
