//! Test doubles shared by the integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use jeeves::deploy::command::{CommandRunner, ShellCommand};
use jeeves::deploy::reporter::StatusReporter;
use jeeves::errors::AgentError;
use jeeves::models::push::PushEvent;
use jeeves::models::status::{CommitRef, CommitState, DeployStatus};

/// Something a stub observed, in the order it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Status(CommitState, String),
    Command(String, PathBuf),
}

pub type Timeline = Arc<Mutex<Vec<Entry>>>;

pub fn timeline() -> Timeline {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn statuses(timeline: &Timeline) -> Vec<(CommitState, String)> {
    timeline
        .lock()
        .unwrap()
        .iter()
        .filter_map(|entry| match entry {
            Entry::Status(state, description) => Some((*state, description.clone())),
            Entry::Command(..) => None,
        })
        .collect()
}

pub fn commands(timeline: &Timeline) -> Vec<(String, PathBuf)> {
    timeline
        .lock()
        .unwrap()
        .iter()
        .filter_map(|entry| match entry {
            Entry::Command(command, dir) => Some((command.clone(), dir.clone())),
            Entry::Status(..) => None,
        })
        .collect()
}

/// Records commands and optionally fails one of them
pub struct StubRunner {
    timeline: Timeline,
    failure: Option<(String, String)>,
    head: String,
}

impl StubRunner {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            failure: None,
            head: "0123456789abcdef0123456789abcdef01234567".to_string(),
        }
    }

    /// Fail `command` with `message`
    pub fn failing(mut self, command: &str, message: &str) -> Self {
        self.failure = Some((command.to_string(), message.to_string()));
        self
    }

    pub fn with_head(mut self, head: &str) -> Self {
        self.head = head.to_string();
        self
    }
}

#[async_trait]
impl CommandRunner for StubRunner {
    async fn run(&self, command: &ShellCommand, dir: &Path) -> Result<(), AgentError> {
        let command = command.to_string();
        self.timeline
            .lock()
            .unwrap()
            .push(Entry::Command(command.clone(), dir.to_path_buf()));

        match &self.failure {
            Some((failing, message)) if *failing == command => {
                Err(AgentError::CommandError(message.clone()))
            }
            _ => Ok(()),
        }
    }

    async fn output(&self, command: &ShellCommand, dir: &Path) -> Result<String, AgentError> {
        self.run(command, dir).await?;
        Ok(self.head.clone())
    }
}

/// Records statuses, optionally failing every call
pub struct StubReporter {
    timeline: Timeline,
    commits: Mutex<Vec<CommitRef>>,
    fail: bool,
}

impl StubReporter {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            commits: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn commits(&self) -> Vec<CommitRef> {
        self.commits.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusReporter for StubReporter {
    async fn report(&self, commit: &CommitRef, status: &DeployStatus) -> Result<(), AgentError> {
        self.timeline
            .lock()
            .unwrap()
            .push(Entry::Status(status.state, status.description.clone()));
        self.commits.lock().unwrap().push(commit.clone());

        if self.fail {
            return Err(AgentError::ApiError("502 Bad Gateway: unavailable".to_string()));
        }
        Ok(())
    }
}

pub fn push_event(owner: &str, name: &str, branch: &str, sha: &str) -> PushEvent {
    PushEvent {
        owner: owner.to_string(),
        name: name.to_string(),
        default_branch: branch.to_string(),
        head_sha: sha.to_string(),
        installation_id: Some(1),
        payload: serde_json::json!({}),
    }
}

pub fn pending(description: &str) -> (CommitState, String) {
    (CommitState::Pending, description.to_string())
}

pub fn success(description: &str) -> (CommitState, String) {
    (CommitState::Success, description.to_string())
}

pub fn error(description: &str) -> (CommitState, String) {
    (CommitState::Error, description.to_string())
}
