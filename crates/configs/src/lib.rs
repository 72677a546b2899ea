use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub widget: WidgetConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 3000, worker_threads: Some(4) }
    }
}

/// User store selection and tuning.
/// An empty `redis_url` selects the file-backed store at `users_file`.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub redis_url: String,
    #[serde(default = "default_users_file")]
    pub users_file: String,
    #[serde(default = "default_op_timeout")]
    pub op_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: String::new(),
            users_file: default_users_file(),
            op_timeout_secs: default_op_timeout(),
        }
    }
}

fn default_users_file() -> String { "data/users.json".to_string() }
fn default_op_timeout() -> u64 { 5 }

/// Widget provider credentials and endpoints (token exchange API).
#[derive(Debug, Clone, Deserialize)]
pub struct WidgetConfig {
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_widget_token_url")]
    pub widget_token_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub organization_id: String,
    #[serde(default)]
    pub allowed_origin: String,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            token_url: default_token_url(),
            widget_token_url: default_widget_token_url(),
            client_id: String::new(),
            client_secret: String::new(),
            organization_id: String::new(),
            allowed_origin: String::new(),
        }
    }
}

fn default_token_url() -> String { "https://api.widget-provider.example/v1/applications/token".to_string() }
fn default_widget_token_url() -> String { "https://api.widget-provider.example/v1/embedded/widget-token".to_string() }

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub webapp_password: String,
    #[serde(default)]
    pub secure_cookies: bool,
}

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load from `config.toml` (or `CONFIG_PATH`); fall back to pure env/default
    /// config when the file is absent, then normalize and validate. A file
    /// that exists but fails to parse is an error, not a silent default.
    pub fn load_and_validate() -> Result<Self> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        let mut cfg = if std::path::Path::new(&path).exists() {
            load_from_file(&path)?
        } else {
            AppConfig::default()
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        // 归一化 server
        self.server.normalize_from_env()?;
        // 归一化 store/widget/auth（支持从环境变量填充）
        self.store.normalize_from_env();
        self.store.validate()?;
        self.widget.normalize_from_env();
        self.auth.normalize_from_env();
        Ok(())
    }
}

impl ServerConfig {
    fn normalize_from_env(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.host = host;
        }
        if let Ok(port) = std::env::var("SERVER_PORT") {
            self.port = port.parse().map_err(|_| anyhow!("SERVER_PORT must be a valid port number"))?;
        }
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        if let Some(w) = self.worker_threads {
            if w == 0 { self.worker_threads = Some(4); }
        } else {
            self.worker_threads = Some(4);
        }
        Ok(())
    }
}

impl StoreConfig {
    pub fn normalize_from_env(&mut self) {
        // 若 TOML 中未提供，则尝试从环境变量填充
        if self.redis_url.trim().is_empty() {
            if let Ok(url) = std::env::var("REDIS_URL") {
                self.redis_url = url;
            }
        }
        if let Ok(path) = std::env::var("USERS_FILE") {
            if !path.trim().is_empty() {
                self.users_file = path;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.redis_url.trim().is_empty() {
            let lower = self.redis_url.to_lowercase();
            if !(lower.starts_with("redis://") || lower.starts_with("rediss://") || lower.starts_with("redis+unix://")) {
                return Err(anyhow!("store.redis_url must start with redis:// or rediss://"));
            }
        }
        if self.users_file.trim().is_empty() {
            return Err(anyhow!("store.users_file must not be empty"));
        }
        if self.op_timeout_secs == 0 {
            return Err(anyhow!("store.op_timeout_secs must be a positive number of seconds"));
        }
        Ok(())
    }

    /// Whether the remote backend is selected.
    pub fn use_redis(&self) -> bool {
        !self.redis_url.trim().is_empty()
    }
}

impl WidgetConfig {
    pub fn normalize_from_env(&mut self) {
        if let Ok(v) = std::env::var("WIDGET_TOKEN_URL") {
            if !v.trim().is_empty() { self.token_url = v; }
        }
        if let Ok(v) = std::env::var("WIDGET_WIDGET_TOKEN_URL") {
            if !v.trim().is_empty() { self.widget_token_url = v; }
        }
        if self.client_id.trim().is_empty() {
            if let Ok(v) = std::env::var("WIDGET_CLIENT_ID") { self.client_id = v; }
        }
        if self.client_secret.trim().is_empty() {
            if let Ok(v) = std::env::var("WIDGET_CLIENT_SECRET") { self.client_secret = v; }
        }
        if self.organization_id.trim().is_empty() {
            if let Ok(v) = std::env::var("WIDGET_ORGANIZATION_ID") { self.organization_id = v; }
        }
        if self.allowed_origin.trim().is_empty() {
            if let Ok(v) = std::env::var("WIDGET_ALLOWED_ORIGIN") { self.allowed_origin = v; }
        }
    }
}

impl AuthConfig {
    pub fn normalize_from_env(&mut self) {
        if self.webapp_password.trim().is_empty() {
            if let Ok(v) = std::env::var("WEBAPP_PASSWORD") { self.webapp_password = v; }
        }
        if let Ok(v) = std::env::var("SECURE_COOKIES") {
            self.secure_cookies = matches!(v.as_str(), "1" | "true" | "yes");
        }
    }
}
