//! Command execution

use std::fmt;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::AgentError;

/// A program plus arguments, run without a shell in between
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ShellCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Parse a configured command line such as `./script/setup --prod`.
    ///
    /// Splits on whitespace; quoting is not supported.
    pub fn parse(line: &str) -> Result<Self, AgentError> {
        let mut parts = line.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| AgentError::ConfigError("Command line is empty".to_string()))?;
        Ok(Self::new(program).args(parts))
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Command runner trait for testability
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command in `dir` with inherited stdout/stderr, failing on a
    /// non-zero exit
    async fn run(&self, command: &ShellCommand, dir: &Path) -> Result<(), AgentError>;

    /// Run a command in `dir` and return its trimmed stdout
    async fn output(&self, command: &ShellCommand, dir: &Path) -> Result<String, AgentError>;
}

/// Runs commands as child processes of the agent
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(command: &ShellCommand, dir: &Path) -> Command {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .kill_on_drop(false);
        cmd
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &ShellCommand, dir: &Path) -> Result<(), AgentError> {
        info!("Executing \"{}\" in {}", command, dir.display());

        let status = Self::command(command, dir)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| AgentError::CommandError(format!("Command failed: {}: {}", command, e)))?;

        if !status.success() {
            return Err(AgentError::CommandError(format!(
                "Command failed: {} ({})",
                command, status
            )));
        }

        debug!("\"{}\" finished", command);
        Ok(())
    }

    async fn output(&self, command: &ShellCommand, dir: &Path) -> Result<String, AgentError> {
        debug!("Capturing \"{}\" in {}", command, dir.display());

        let output = Self::command(command, dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| AgentError::CommandError(format!("Command failed: {}: {}", command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AgentError::CommandError(format!(
                "Command failed: {} ({}): {}",
                command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
