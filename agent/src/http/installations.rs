//! GitHub App installation API

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::errors::AgentError;
use crate::http::client::HttpClient;

/// Access token scoped to one app installation
#[derive(Debug, Clone, Deserialize)]
pub struct InstallationToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl HttpClient {
    /// Exchange an app JWT for an installation access token
    pub async fn create_installation_token(
        &self,
        app_jwt: &str,
        installation_id: u64,
    ) -> Result<InstallationToken, AgentError> {
        let installation_id = installation_id.to_string();
        let url = self.endpoint(&["app", "installations", &installation_id, "access_tokens"])?;
        self.post(url, app_jwt, &serde_json::json!({})).await
    }
}
