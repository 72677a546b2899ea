use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use common::utils::logging::init_logging_default;
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::routes::{self, auth};
use crate::widget_api::WidgetClient;
use service::{runtime, store};

/// Initialize logging via shared common utils
fn init_logging() {
    init_logging_default();
}

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();

    let cfg = configs::AppConfig::load_and_validate()?;

    runtime::ensure_env("frontend", "data").await?;

    // 依据配置选择用户存储：redis_url 非空走远端 KV，否则本地文件
    let user_store = store::select_store(&cfg.store).await?;

    // Widget provider client (token exchange)
    let widget = Arc::new(WidgetClient::new(cfg.widget.clone()));

    if cfg.auth.webapp_password.trim().is_empty() {
        warn!("webapp password not configured; /api routes will reject all requests");
    }

    let state = auth::ServerState {
        store: user_store,
        widget,
        auth: auth::ServerAuthConfig {
            webapp_password: cfg.auth.webapp_password.clone(),
            secure_cookies: cfg.auth.secure_cookies,
        },
    };

    // Build router
    let cors = build_cors();
    let app: Router = routes::build_router(cors, state);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(%addr, "starting workspace registry server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
