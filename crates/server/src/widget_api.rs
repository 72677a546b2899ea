//! Widget provider API client
//!
//! Two-step token exchange: client credentials buy a short-lived access
//! token, which then buys an embedded-widget token scoped to one user and
//! workspace.

use serde_json::json;
use tracing::info;

use common::CoreError;
use configs::WidgetConfig;

pub struct WidgetClient {
    http: reqwest::Client,
    cfg: WidgetConfig,
}

impl WidgetClient {
    pub fn new(cfg: WidgetConfig) -> Self {
        Self { http: reqwest::Client::new(), cfg }
    }

    /// Obtain an access token from the provider's application-token endpoint.
    async fn access_token(&self) -> Result<String, CoreError> {
        let resp = self
            .http
            .post(&self.cfg.token_url)
            .json(&json!({
                "client_id": self.cfg.client_id,
                "client_secret": self.cfg.client_secret,
                "grant-type": "client_credentials",
            }))
            .send()
            .await
            .map_err(|e| CoreError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let msg = provider_message(resp).await;
            return Err(CoreError::Upstream(format!("failed to get access token: {msg}")));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| CoreError::Parse(e.to_string()))?;
        data.get("access_token")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| CoreError::Parse("access_token missing in token response".into()))
    }

    /// Request a widget token for `(external_user_id, workspace_name)`.
    /// `allowed_origin` overrides the configured origin when given.
    pub async fn widget_token(
        &self,
        external_user_id: &str,
        workspace_name: &str,
        allowed_origin: Option<&str>,
    ) -> Result<String, CoreError> {
        let access_token = self.access_token().await?;
        let origin = allowed_origin.unwrap_or(&self.cfg.allowed_origin);

        info!(%external_user_id, %workspace_name, %origin, "generating widget token");

        let resp = self
            .http
            .post(&self.cfg.widget_token_url)
            .bearer_auth(&access_token)
            .json(&json!({
                "external_user_id": external_user_id,
                "workspace_name": workspace_name,
                "organization_id": self.cfg.organization_id,
                "allowed_origin": origin,
            }))
            .send()
            .await
            .map_err(|e| CoreError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let msg = provider_message(resp).await;
            return Err(CoreError::Upstream(format!("failed to get widget token: {msg}")));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| CoreError::Parse(e.to_string()))?;
        data.get("token")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| CoreError::Parse("token missing in widget response".into()))
    }
}

/// Pull the provider's `message` field out of an error response, falling back
/// to the HTTP status line.
async fn provider_message(resp: reqwest::Response) -> String {
    let status = resp.status();
    match resp.json::<serde_json::Value>().await {
        Ok(body) => body
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| status.to_string()),
        Err(_) => status.to_string(),
    }
}
