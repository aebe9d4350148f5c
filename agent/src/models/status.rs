//! Commit status models

use std::fmt;

use serde::{Deserialize, Serialize};

/// GitHub rejects commit status descriptions longer than this
pub const DESCRIPTION_MAX_LEN: usize = 140;

/// Default status context shown on the commit
pub const DEFAULT_STATUS_CONTEXT: &str = "jeeves/deploy";

/// State of a commit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Pending,
    Success,
    Error,
}

impl CommitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitState::Pending => "pending",
            CommitState::Success => "success",
            CommitState::Error => "error",
        }
    }
}

impl fmt::Display for CommitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state plus description, as reported for one deploy stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployStatus {
    pub state: CommitState,
    pub description: String,
}

impl DeployStatus {
    /// Create a status, truncating the description to the GitHub limit
    pub fn new(state: CommitState, description: impl AsRef<str>) -> Self {
        Self {
            state,
            description: truncate_description(description.as_ref()),
        }
    }

    pub fn pending(description: impl AsRef<str>) -> Self {
        Self::new(CommitState::Pending, description)
    }

    pub fn success(description: impl AsRef<str>) -> Self {
        Self::new(CommitState::Success, description)
    }

    pub fn error(description: impl AsRef<str>) -> Self {
        Self::new(CommitState::Error, description)
    }
}

/// Identifies the commit a status is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    pub owner: String,
    pub repo: String,
    pub sha: String,
    /// GitHub App installation that delivered the push
    pub installation_id: Option<u64>,
}

/// Request body for `POST /repos/{owner}/{repo}/statuses/{sha}`
#[derive(Debug, Clone, Serialize)]
pub struct CreateStatusRequest {
    pub state: CommitState,
    pub description: String,
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
}

/// Keep the first [`DESCRIPTION_MAX_LEN`] characters of a description.
///
/// Counts characters rather than bytes so multi-byte text is never split.
pub fn truncate_description(description: &str) -> String {
    match description.char_indices().nth(DESCRIPTION_MAX_LEN) {
        Some((idx, _)) => description[..idx].to_string(),
        None => description.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_description_untouched() {
        assert_eq!(truncate_description("checking out code"), "checking out code");
        assert_eq!(truncate_description(""), "");
    }

    #[test]
    fn test_long_description_truncated() {
        let long = "x".repeat(200);
        let truncated = truncate_description(&long);
        assert_eq!(truncated.len(), DESCRIPTION_MAX_LEN);
        assert_eq!(truncated, &long[..DESCRIPTION_MAX_LEN]);
    }

    #[test]
    fn test_exact_limit_untouched() {
        let exact = "y".repeat(DESCRIPTION_MAX_LEN);
        assert_eq!(truncate_description(&exact), exact);

        let over = "y".repeat(DESCRIPTION_MAX_LEN + 1);
        assert_eq!(truncate_description(&over), exact);
    }

    #[test]
    fn test_multibyte_description_not_split() {
        let long = "é".repeat(150);
        let truncated = truncate_description(&long);
        assert_eq!(truncated.chars().count(), DESCRIPTION_MAX_LEN);
        assert_eq!(truncated, "é".repeat(DESCRIPTION_MAX_LEN));
    }

    #[test]
    fn test_deploy_status_constructors_truncate() {
        let status = DeployStatus::error("e".repeat(300));
        assert_eq!(status.state, CommitState::Error);
        assert_eq!(status.description.len(), DESCRIPTION_MAX_LEN);
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let body = CreateStatusRequest {
            state: CommitState::Pending,
            description: "installing packages".to_string(),
            context: DEFAULT_STATUS_CONTEXT.to_string(),
            target_url: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["state"], "pending");
        assert_eq!(json["context"], "jeeves/deploy");
        assert!(json.get("target_url").is_none());
    }
}
