//! Local checkout a push deploys to

use std::path::{Component, Path};

use crate::errors::AgentError;
use crate::filesys::dir::Dir;

/// Directory `<repos_root>/<owner>/<name>` holding a checkout of the pushed repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployTarget {
    dir: Dir,
}

impl DeployTarget {
    /// Resolve the checkout for `owner/name` under `repos_root`.
    ///
    /// Owner and name must each be a single plain path segment.
    pub fn new(repos_root: &Dir, owner: &str, name: &str) -> Result<Self, AgentError> {
        for segment in [owner, name] {
            if !is_plain_segment(segment) {
                return Err(AgentError::ValidationError(format!(
                    "Invalid repository path segment: {:?}",
                    segment
                )));
            }
        }
        Ok(Self {
            dir: repos_root.subdir(owner).subdir(name),
        })
    }

    pub fn dir(&self) -> &Dir {
        &self.dir
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Whether the checkout exists on this machine
    pub async fn exists(&self) -> bool {
        self.dir.exists().await
    }

    /// Whether this checkout is the one the agent runs from
    pub async fn is_install_dir(&self, install_dir: &Dir) -> bool {
        self.dir.same_as(install_dir).await
    }
}

fn is_plain_segment(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !segment.contains('/')
        && !segment.contains('\\')
}
