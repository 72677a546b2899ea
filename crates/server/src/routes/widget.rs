use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::errors::ApiError;
use crate::routes::auth::{self, ServerState};

#[derive(Deserialize)]
pub struct WidgetTokenInput {
    #[serde(rename = "allowedOrigin")]
    pub allowed_origin: Option<String>,
}

/// Exchange the current user's identity for an embedded-widget token.
/// Origin overrides from the request body are honored for localhost only;
/// anything else falls back to the configured allowed origin.
#[utoipa::path(post, path = "/api/widget/token", tag = "widget", request_body = crate::openapi::WidgetTokenRequest, responses((status = 200, description = "Token issued"), (status = 401, description = "Unauthorized"), (status = 500, description = "Provider error")))]
pub async fn generate_token(
    State(state): State<ServerState>,
    jar: CookieJar,
    input: Option<Json<WidgetTokenInput>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(current) = auth::current_user(&state, &jar).await? else {
        return Err(ApiError::Unauthorized("user not authenticated".into()));
    };

    let origin = input
        .and_then(|Json(i)| i.allowed_origin)
        .filter(|o| o.contains("localhost"));

    let token = state
        .widget
        .widget_token(&current.email, &current.workspace_name, origin.as_deref())
        .await?;
    Ok(Json(serde_json::json!({"token": token})))
}
