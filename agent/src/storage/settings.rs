//! Settings file management

use std::path::PathBuf;

use serde::Deserialize;

use crate::errors::AgentError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::logs::LogLevel;
use crate::models::status::DEFAULT_STATUS_CONTEXT;

/// Agent settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Directory for rolling log files (stdout only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Emit JSON formatted logs
    #[serde(default)]
    pub json_logs: bool,

    /// Root holding local checkouts as `<repos_root>/<owner>/<name>`
    #[serde(default)]
    pub repos_root: Option<PathBuf>,

    /// Checkout the agent itself runs from (defaults to the working directory)
    #[serde(default)]
    pub install_dir: Option<PathBuf>,

    /// Brain file (defaults to `brain.json` in the storage directory)
    #[serde(default)]
    pub brain_file: Option<PathBuf>,

    /// Local HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// GitHub configuration
    #[serde(default)]
    pub github: GithubSettings,

    /// Deploy scripts, relative to the checkout
    #[serde(default)]
    pub scripts: ScriptSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_dir: None,
            json_logs: false,
            repos_root: None,
            install_dir: None,
            brain_file: None,
            server: ServerSettings::default(),
            github: GithubSettings::default(),
            scripts: ScriptSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a file, falling back to defaults if it is absent
    pub async fn load(file: &File) -> Result<Self, AgentError> {
        if !file.exists().await {
            return Ok(Self::default());
        }
        file.read_json().await.map_err(|e| {
            AgentError::ConfigError(format!(
                "Unable to read settings file {}: {}",
                file.path().display(),
                e
            ))
        })
    }

    /// Apply environment overrides on top of the file settings
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), AgentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(root) = lookup("REPOS_ROOT") {
            self.repos_root = Some(PathBuf::from(root));
        }
        if let Some(dir) = lookup("INSTALL_DIR") {
            self.install_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level.parse().map_err(AgentError::ConfigError)?;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| AgentError::ConfigError(format!("Invalid PORT: {}", port)))?;
        }
        if let Some(token) = lookup("GITHUB_TOKEN") {
            self.github.token = Some(token);
        }
        if let Some(app_id) = lookup("APP_ID") {
            self.github.app_id = Some(
                app_id
                    .parse()
                    .map_err(|_| AgentError::ConfigError(format!("Invalid APP_ID: {}", app_id)))?,
            );
        }
        if let Some(path) = lookup("PRIVATE_KEY_PATH") {
            self.github.private_key_path = Some(PathBuf::from(path));
        }
        if let Some(secret) = lookup("WEBHOOK_SECRET") {
            self.github.webhook_secret = Some(secret);
        }
        if let Some(host) = lookup("GHE_HOST") {
            self.github.api_url = format!("https://{}/api/v3", host);
        }
        Ok(())
    }

    /// Check the startup requirements and return the checkouts root
    pub async fn validate(&self) -> Result<Dir, AgentError> {
        let root = self.repos_root.as_ref().ok_or_else(|| {
            AgentError::ConfigError(
                "Missing REPOS_ROOT. Set it in the environment or as repos_root in the settings file"
                    .to_string(),
            )
        })?;

        let root = Dir::new(root);
        if !root.exists().await {
            return Err(AgentError::ConfigError(format!(
                "REPOS_ROOT does not point to an existing directory: {}",
                root.path().display()
            )));
        }

        if !self.server.status_path.starts_with('/') || !self.server.webhook_path.starts_with('/') {
            return Err(AgentError::ConfigError(
                "Server paths must start with '/'".to_string(),
            ));
        }

        Ok(root)
    }
}

/// Local HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Path serving the agent's own revision
    #[serde(default = "default_status_path")]
    pub status_path: String,

    /// Path receiving GitHub webhook deliveries
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_status_path() -> String {
    "/jeeves".to_string()
}

fn default_webhook_path() -> String {
    "/webhooks/github".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            status_path: default_status_path(),
            webhook_path: default_webhook_path(),
        }
    }
}

/// GitHub API settings
#[derive(Clone, Deserialize)]
pub struct GithubSettings {
    /// Base URL for the GitHub REST API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Static token used for status calls
    #[serde(default)]
    pub token: Option<String>,

    /// GitHub App id, used with `private_key_path` when no token is set
    #[serde(default)]
    pub app_id: Option<u64>,

    /// PEM encoded GitHub App private key
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,

    /// Context the deploy statuses are reported under
    #[serde(default = "default_status_context")]
    pub status_context: String,

    /// Secret webhook deliveries are signed with
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_status_context() -> String {
    DEFAULT_STATUS_CONTEXT.to_string()
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            app_id: None,
            private_key_path: None,
            status_context: default_status_context(),
            webhook_secret: None,
        }
    }
}

impl std::fmt::Debug for GithubSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubSettings")
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("app_id", &self.app_id)
            .field("private_key_path", &self.private_key_path)
            .field("status_context", &self.status_context)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Deploy scripts run inside the checkout
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptSettings {
    #[serde(default = "default_setup_script")]
    pub setup: String,

    #[serde(default = "default_restart_script")]
    pub restart: String,
}

fn default_setup_script() -> String {
    "./script/setup".to_string()
}

fn default_restart_script() -> String {
    "./script/restart".to_string()
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            setup: default_setup_script(),
            restart: default_restart_script(),
        }
    }
}
