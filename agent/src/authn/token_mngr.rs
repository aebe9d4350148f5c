//! Token manager for GitHub authentication

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::authn::app_token::{create_app_token, is_fresh};
use crate::errors::AgentError;
use crate::http::client::HttpClient;
use crate::http::installations::InstallationToken;

/// How the agent authenticates against GitHub
pub enum GithubAuth {
    /// Personal access or fine-grained token
    Token(SecretString),

    /// GitHub App credentials, exchanged per installation
    App { app_id: u64, private_key: SecretString },
}

impl std::fmt::Debug for GithubAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GithubAuth::Token(_) => f.write_str("Token([REDACTED])"),
            GithubAuth::App { app_id, .. } => f
                .debug_struct("App")
                .field("app_id", app_id)
                .field("private_key", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Token manager trait for testability
#[async_trait]
pub trait TokenManagerExt: Send + Sync {
    /// Get a token allowed to act on repositories of the given installation
    async fn get_token(&self, installation_id: Option<u64>) -> Result<String, AgentError>;
}

/// Token manager implementation
pub struct TokenManager {
    auth: GithubAuth,
    http_client: Arc<HttpClient>,
    installation_tokens: RwLock<HashMap<u64, InstallationToken>>,
}

impl TokenManager {
    /// Create a new token manager
    pub fn new(auth: GithubAuth, http_client: Arc<HttpClient>) -> Self {
        Self {
            auth,
            http_client,
            installation_tokens: RwLock::new(HashMap::new()),
        }
    }

    async fn installation_token(
        &self,
        app_id: u64,
        private_key: &SecretString,
        installation_id: u64,
    ) -> Result<String, AgentError> {
        // Try to get from cache first
        {
            let cached = self.installation_tokens.read().await;
            if let Some(token) = cached.get(&installation_id) {
                if is_fresh(token.expires_at, Utc::now()) {
                    return Ok(token.token.clone());
                }
            }
        }

        debug!("Requesting access token for installation {}", installation_id);
        let app_token = create_app_token(app_id, private_key.expose_secret(), Utc::now())?;
        let token = self
            .http_client
            .create_installation_token(&app_token, installation_id)
            .await
            .map_err(|e| {
                AgentError::TokenError(format!(
                    "Failed to get access token for installation {}: {}",
                    installation_id, e
                ))
            })?;

        info!(
            "Installation {} token refreshed, expires at: {}",
            installation_id, token.expires_at
        );

        let raw = token.token.clone();
        self.installation_tokens
            .write()
            .await
            .insert(installation_id, token);
        Ok(raw)
    }
}

#[async_trait]
impl TokenManagerExt for TokenManager {
    async fn get_token(&self, installation_id: Option<u64>) -> Result<String, AgentError> {
        match &self.auth {
            GithubAuth::Token(token) => Ok(token.expose_secret().to_string()),
            GithubAuth::App {
                app_id,
                private_key,
            } => {
                let installation_id = installation_id.ok_or_else(|| {
                    AgentError::TokenError(
                        "Push did not come from a GitHub App installation".to_string(),
                    )
                })?;
                self.installation_token(*app_id, private_key, installation_id)
                    .await
            }
        }
    }
}
