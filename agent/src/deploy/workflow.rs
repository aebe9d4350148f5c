//! Push-to-deploy workflow
//!
//! A push for `owner/name` redeploys the checkout at `<repos_root>/owner/name`
//! if this machine has one:
//!
//! 1. checkout: `git checkout <default branch> --`, `git pull`, `git checkout <sha> --`
//! 2. install: the setup script
//! 3. restart: the restart script
//!
//! Each stage is announced as a commit status on the pushed sha. When the
//! checkout is the agent's own, success is reported before the restart since
//! the restart replaces this process.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::deploy::command::{CommandRunner, ShellCommand};
use crate::deploy::reporter::StatusReporter;
use crate::deploy::target::DeployTarget;
use crate::errors::AgentError;
use crate::filesys::dir::Dir;
use crate::models::push::PushEvent;
use crate::models::status::{CommitRef, DeployStatus};

/// Deploy workflow options
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Root holding local checkouts
    pub repos_root: Dir,

    /// Checkout the agent itself runs from
    pub install_dir: Dir,

    /// Run in the checkout after updating it
    pub setup_command: ShellCommand,

    /// Run in the checkout to restart its service
    pub restart_command: ShellCommand,
}

impl DeployOptions {
    pub fn new(repos_root: Dir, install_dir: Dir) -> Self {
        Self {
            repos_root,
            install_dir,
            setup_command: ShellCommand::new("./script/setup"),
            restart_command: ShellCommand::new("./script/restart"),
        }
    }
}

/// Result of handling one push
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// No local checkout for the repository, nothing was done
    Skipped,

    /// Every stage succeeded
    Deployed,

    /// A stage failed with the given message
    Failed(String),
}

/// Deploy stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Checkout,
    Install,
    Restart,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Checkout => "checkout",
            Stage::Install => "install",
            Stage::Restart => "restart",
        })
    }
}

/// Deploys local checkouts in response to pushes
pub struct PushDeployer {
    options: DeployOptions,
    runner: Arc<dyn CommandRunner>,
    reporter: Arc<dyn StatusReporter>,
}

impl PushDeployer {
    pub fn new(
        options: DeployOptions,
        runner: Arc<dyn CommandRunner>,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        Self {
            options,
            runner,
            reporter,
        }
    }

    /// Deploy the pushed commit if this machine hosts a checkout of the repository
    pub async fn handle_push(&self, event: &PushEvent) -> DeployOutcome {
        let target = match DeployTarget::new(&self.options.repos_root, &event.owner, &event.name) {
            Ok(target) => target,
            Err(e) => {
                warn!("Ignoring push for {}: {}", event.full_name(), e);
                return DeployOutcome::Skipped;
            }
        };

        if !target.exists().await {
            debug!(
                "No checkout of {} at {}, ignoring push",
                event.full_name(),
                target.path().display()
            );
            return DeployOutcome::Skipped;
        }

        let is_deploying_self = target.is_install_dir(&self.options.install_dir).await;
        info!(
            "Deploying {}@{} to {}{}",
            event.full_name(),
            event.head_sha,
            target.path().display(),
            if is_deploying_self { " (self)" } else { "" }
        );

        let deploy = Deploy {
            options: &self.options,
            runner: self.runner.as_ref(),
            reporter: self.reporter.as_ref(),
            commit: event.commit_ref(),
            target,
            is_deploying_self,
        };

        match deploy.run(&event.default_branch, &event.head_sha).await {
            Ok(()) => {
                info!("Deployed {}@{}", event.full_name(), event.head_sha);
                DeployOutcome::Deployed
            }
            Err((stage, e)) => {
                let message = e.to_string();
                error!(
                    "Deploy of {}@{} failed during {}: {}",
                    event.full_name(),
                    event.head_sha,
                    stage,
                    message
                );
                deploy.update_status(DeployStatus::error(&message)).await;
                DeployOutcome::Failed(message)
            }
        }
    }
}

/// One deploy attempt of one commit
struct Deploy<'a> {
    options: &'a DeployOptions,
    runner: &'a dyn CommandRunner,
    reporter: &'a dyn StatusReporter,
    commit: CommitRef,
    target: DeployTarget,
    is_deploying_self: bool,
}

impl Deploy<'_> {
    async fn run(&self, branch: &str, sha: &str) -> Result<(), (Stage, AgentError)> {
        self.checkout(branch, sha)
            .await
            .map_err(|e| (Stage::Checkout, e))?;
        self.install().await.map_err(|e| (Stage::Install, e))?;
        self.restart().await.map_err(|e| (Stage::Restart, e))?;

        self.update_status(DeployStatus::success("deployed")).await;
        Ok(())
    }

    async fn checkout(&self, branch: &str, sha: &str) -> Result<(), AgentError> {
        self.update_status(DeployStatus::pending("checking out code"))
            .await;

        validate_branch(branch)?;
        validate_sha(sha)?;

        // Refs only: `--` keeps an unknown ref from matching a pathspec
        self.exec(&ShellCommand::new("git").args(["checkout", branch, "--"]))
            .await?;
        self.exec(&ShellCommand::new("git").arg("pull")).await?;
        self.exec(&ShellCommand::new("git").args(["checkout", sha, "--"]))
            .await
    }

    async fn install(&self) -> Result<(), AgentError> {
        self.update_status(DeployStatus::pending("installing packages"))
            .await;
        self.exec(&self.options.setup_command).await
    }

    async fn restart(&self) -> Result<(), AgentError> {
        if self.is_deploying_self {
            // Restarting replaces this process, report while we still can
            self.update_status(DeployStatus::success("restarting self"))
                .await;
            self.exec(&self.options.restart_command).await
        } else {
            self.update_status(DeployStatus::pending("restarting")).await;
            self.exec(&self.options.restart_command).await?;
            self.update_status(DeployStatus::success("restarted")).await;
            Ok(())
        }
    }

    async fn exec(&self, command: &ShellCommand) -> Result<(), AgentError> {
        self.runner.run(command, self.target.path()).await
    }

    /// Report a status. Failures are logged and never abort the deploy.
    async fn update_status(&self, status: DeployStatus) {
        debug!(
            "{}/{}@{}: {} {}",
            self.commit.owner, self.commit.repo, self.commit.sha, status.state, status.description
        );
        if let Err(e) = self.reporter.report(&self.commit, &status).await {
            warn!(
                "Failed to report {} status \"{}\" for {}/{}@{}: {}",
                status.state,
                status.description,
                self.commit.owner,
                self.commit.repo,
                self.commit.sha,
                e
            );
        }
    }
}

fn validate_branch(branch: &str) -> Result<(), AgentError> {
    if branch.is_empty() || branch.starts_with('-') || branch.chars().any(char::is_whitespace) {
        return Err(AgentError::ValidationError(format!(
            "Refusing to check out branch {:?}",
            branch
        )));
    }
    Ok(())
}

fn validate_sha(sha: &str) -> Result<(), AgentError> {
    if sha.is_empty() || sha.len() > 64 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AgentError::ValidationError(format!(
            "Refusing to check out commit {:?}",
            sha
        )));
    }
    Ok(())
}
