//! The agent's own running revision

use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::deploy::command::{CommandRunner, ShellCommand};
use crate::errors::AgentError;
use crate::filesys::dir::Dir;
use crate::storage::brain::Brain;

/// Brain key the running revision is stored under
pub const SELF_REVISION_KEY: &str = "jeeves:sha";

/// Length of the short revision
pub const SHORT_SHA_LEN: usize = 8;

/// Short hash of the commit the agent runs from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelfRevision {
    pub revision: String,
}

impl SelfRevision {
    /// Shorten the output of `git rev-parse HEAD`
    pub fn from_head(head: &str) -> Result<Self, AgentError> {
        let head = head.trim();
        if head.is_empty() || !head.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AgentError::Internal(format!(
                "Unexpected revision for the agent checkout: {:?}",
                head
            )));
        }
        Ok(Self {
            revision: head.chars().take(SHORT_SHA_LEN).collect(),
        })
    }
}

impl fmt::Display for SelfRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.revision)
    }
}

/// Determine the running revision and persist it in the brain
pub async fn init_self_revision(
    runner: &dyn CommandRunner,
    brain: &dyn Brain,
    install_dir: &Dir,
) -> Result<SelfRevision, AgentError> {
    let head = runner
        .output(
            &ShellCommand::new("git").args(["rev-parse", "HEAD"]),
            install_dir.path(),
        )
        .await?;
    let revision = SelfRevision::from_head(&head)?;

    brain.json_set(SELF_REVISION_KEY, &revision.revision).await?;
    let stored: Option<String> = brain.json_get(SELF_REVISION_KEY).await?;
    info!(
        "Running using sha {}",
        stored.as_deref().unwrap_or("<missing>")
    );

    Ok(revision)
}
