//! Commit status API

use crate::errors::AgentError;
use crate::http::client::HttpClient;
use crate::models::status::{CommitRef, CreateStatusRequest};

impl HttpClient {
    /// Create a commit status on `owner/repo@sha`
    pub async fn create_commit_status(
        &self,
        token: &str,
        commit: &CommitRef,
        request: &CreateStatusRequest,
    ) -> Result<(), AgentError> {
        let url = self.endpoint(&["repos", &commit.owner, &commit.repo, "statuses", &commit.sha])?;
        let _: serde_json::Value = self.post(url, token, request).await?;
        Ok(())
    }
}
