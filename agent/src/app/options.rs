//! Application configuration options

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;

use crate::authn::token_mngr::GithubAuth;
use crate::deploy::command::ShellCommand;
use crate::deploy::workflow::DeployOptions;
use crate::errors::AgentError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::{GithubSettings, Settings};
use crate::workers::deployer;

/// Main application options
#[derive(Debug)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Server configuration
    pub server: ServerOptions,

    /// GitHub configuration
    pub github: GithubOptions,

    /// Deploy workflow configuration
    pub deploy: DeployOptions,

    /// Deployer worker options
    pub deployer_worker: deployer::Options,

    /// Brain file holding persisted agent state
    pub brain_file: File,

    /// Secret webhook deliveries must be signed with
    pub webhook_secret: SecretString,
}

impl AppOptions {
    /// Build the options from validated settings
    pub async fn from_settings(settings: &Settings, layout: &StorageLayout) -> Result<Self, AgentError> {
        let repos_root = settings.validate().await?;

        let install_dir = match &settings.install_dir {
            Some(dir) => Dir::new(dir),
            None => Dir::new(std::env::current_dir()?),
        };

        let mut deploy = DeployOptions::new(repos_root, install_dir);
        deploy.setup_command = ShellCommand::parse(&settings.scripts.setup)?;
        deploy.restart_command = ShellCommand::parse(&settings.scripts.restart)?;

        let webhook_secret = settings
            .github
            .webhook_secret
            .clone()
            .map(SecretString::from)
            .ok_or_else(|| {
                AgentError::ConfigError(
                    "Missing WEBHOOK_SECRET. Set it in the environment or as github.webhook_secret in the settings file"
                        .to_string(),
                )
            })?;

        let brain_file = match &settings.brain_file {
            Some(path) => File::new(path),
            None => layout.brain_file(),
        };

        Ok(Self {
            lifecycle: LifecycleOptions::default(),
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
                status_path: settings.server.status_path.clone(),
                webhook_path: settings.server.webhook_path.clone(),
            },
            github: GithubOptions::from_settings(&settings.github).await?,
            deploy,
            deployer_worker: deployer::Options::default(),
            brain_file,
            webhook_secret,
        })
    }
}

/// Lifecycle options for the agent
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Path serving the running revision
    pub status_path: String,

    /// Path receiving GitHub webhooks
    pub webhook_path: String,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            status_path: "/jeeves".to_string(),
            webhook_path: "/webhooks/github".to_string(),
        }
    }
}

/// GitHub API options
#[derive(Debug)]
pub struct GithubOptions {
    /// REST API base URL
    pub api_url: String,

    /// Credentials for status calls
    pub auth: GithubAuth,

    /// Context the deploy statuses are reported under
    pub status_context: String,
}

impl GithubOptions {
    /// Resolve credentials: a static token wins over GitHub App credentials
    pub async fn from_settings(settings: &GithubSettings) -> Result<Self, AgentError> {
        let auth = match (&settings.token, settings.app_id, &settings.private_key_path) {
            (Some(token), _, _) => GithubAuth::Token(SecretString::from(token.clone())),
            (None, Some(app_id), Some(path)) => GithubAuth::App {
                app_id,
                private_key: read_private_key(path).await?,
            },
            _ => {
                return Err(AgentError::ConfigError(
                    "No GitHub credentials: set GITHUB_TOKEN, or APP_ID and PRIVATE_KEY_PATH"
                        .to_string(),
                ))
            }
        };

        Ok(Self {
            api_url: settings.api_url.clone(),
            auth,
            status_context: settings.status_context.clone(),
        })
    }
}

async fn read_private_key(path: &Path) -> Result<SecretString, AgentError> {
    let pem = File::new(path).read_string().await.map_err(|e| {
        AgentError::ConfigError(format!(
            "Unable to read GitHub App private key {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(SecretString::from(pem))
}
