//! Push webhook models

use serde::Deserialize;

use crate::errors::AgentError;
use crate::models::status::CommitRef;

/// Owner of the pushed repository
#[derive(Debug, Clone, Deserialize)]
pub struct PushOwner {
    #[serde(default)]
    pub login: Option<String>,

    /// Push payloads carry the owner's name alongside (or instead of) the login
    #[serde(default)]
    pub name: Option<String>,
}

/// Repository section of a push payload
#[derive(Debug, Clone, Deserialize)]
pub struct PushRepository {
    pub name: String,
    pub owner: PushOwner,
    pub default_branch: String,
}

/// Head commit of a push
#[derive(Debug, Clone, Deserialize)]
pub struct PushCommit {
    pub id: String,
}

/// GitHub App installation the delivery came from
#[derive(Debug, Clone, Deserialize)]
pub struct PushInstallation {
    pub id: u64,
}

/// Raw push webhook payload (only the fields the deployer reads)
#[derive(Debug, Clone, Deserialize)]
pub struct PushPayload {
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    pub repository: PushRepository,
    /// `null` when the push deleted the branch
    #[serde(default)]
    pub head_commit: Option<PushCommit>,
    #[serde(default)]
    pub installation: Option<PushInstallation>,
}

/// A push the deployer can act on
#[derive(Debug, Clone)]
pub struct PushEvent {
    pub owner: String,
    pub name: String,
    pub default_branch: String,
    pub head_sha: String,
    pub installation_id: Option<u64>,
    pub payload: serde_json::Value,
}

impl PushEvent {
    /// Build a push event from a webhook payload.
    ///
    /// Returns `Ok(None)` for pushes without a head commit, such as branch
    /// deletions, since there is nothing to check out.
    pub fn from_payload(payload: serde_json::Value) -> Result<Option<Self>, AgentError> {
        let parsed = PushPayload::deserialize(&payload)
            .map_err(|e| AgentError::WebhookError(format!("Invalid push payload: {}", e)))?;

        let Some(head_commit) = parsed.head_commit else {
            return Ok(None);
        };

        let owner = parsed
            .repository
            .owner
            .login
            .or(parsed.repository.owner.name)
            .filter(|owner| !owner.is_empty())
            .ok_or_else(|| {
                AgentError::WebhookError("Push payload has no repository owner".to_string())
            })?;

        Ok(Some(Self {
            owner,
            name: parsed.repository.name,
            default_branch: parsed.repository.default_branch,
            head_sha: head_commit.id,
            installation_id: parsed.installation.map(|i| i.id),
            payload,
        }))
    }

    /// Commit the deploy statuses are attached to
    pub fn commit_ref(&self) -> CommitRef {
        CommitRef {
            owner: self.owner.clone(),
            repo: self.name.clone(),
            sha: self.head_sha.clone(),
            installation_id: self.installation_id,
        }
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}
