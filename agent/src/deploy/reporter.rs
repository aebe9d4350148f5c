//! Commit status reporting

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::authn::token_mngr::TokenManagerExt;
use crate::errors::AgentError;
use crate::http::client::HttpClient;
use crate::models::status::{CommitRef, CreateStatusRequest, DeployStatus};

/// Status reporter trait for testability
#[async_trait]
pub trait StatusReporter: Send + Sync {
    /// Record a status against a commit
    async fn report(&self, commit: &CommitRef, status: &DeployStatus) -> Result<(), AgentError>;
}

/// Reports statuses through the GitHub commit status API
pub struct GithubStatusReporter {
    http_client: Arc<HttpClient>,
    token_mngr: Arc<dyn TokenManagerExt>,
    context: String,
}

impl GithubStatusReporter {
    pub fn new(
        http_client: Arc<HttpClient>,
        token_mngr: Arc<dyn TokenManagerExt>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            token_mngr,
            context: context.into(),
        }
    }
}

#[async_trait]
impl StatusReporter for GithubStatusReporter {
    async fn report(&self, commit: &CommitRef, status: &DeployStatus) -> Result<(), AgentError> {
        debug!(
            "Setting {} status on {}/{}@{}: {}",
            status.state, commit.owner, commit.repo, commit.sha, status.description
        );

        let token = self.token_mngr.get_token(commit.installation_id).await?;
        let request = CreateStatusRequest {
            state: status.state,
            description: status.description.clone(),
            context: self.context.clone(),
            target_url: None,
        };
        self.http_client
            .create_commit_status(&token, commit, &request)
            .await
    }
}
