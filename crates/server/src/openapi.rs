use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(utoipa::ToSchema)]
pub struct LoginRequest { pub password: String }

#[derive(utoipa::ToSchema)]
pub struct UpsertUserRequest { pub email: String, pub workspace_name: String }

#[derive(utoipa::ToSchema)]
pub struct UserRecordDoc {
    pub email: String,
    pub workspace_name: String,
    pub created_at: Option<String>,
}

#[derive(utoipa::ToSchema)]
pub struct WidgetTokenRequest { pub allowed_origin: Option<String> }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::users::create_or_update,
        crate::routes::users::me,
        crate::routes::widget::generate_token,
    ),
    components(
        schemas(
            HealthResponse,
            LoginRequest,
            UpsertUserRequest,
            UserRecordDoc,
            WidgetTokenRequest,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "users"),
        (name = "widget")
    )
)]
pub struct ApiDoc;
