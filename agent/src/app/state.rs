//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::GithubOptions;
use crate::authn::token_mngr::TokenManager;
use crate::deploy::command::{CommandRunner, ProcessRunner};
use crate::deploy::reporter::GithubStatusReporter;
use crate::deploy::workflow::{DeployOptions, PushDeployer};
use crate::errors::AgentError;
use crate::filesys::file::File;
use crate::http::client::HttpClient;
use crate::revision::{init_self_revision, SelfRevision};
use crate::storage::brain::FileBrain;

/// Main application state
pub struct AppState {
    /// Revision the agent runs from
    pub revision: SelfRevision,

    /// Push deploy workflow
    pub deployer: Arc<PushDeployer>,
}

impl AppState {
    /// Initialize application state
    pub async fn init(
        github: GithubOptions,
        deploy: DeployOptions,
        brain_file: File,
    ) -> Result<Self, AgentError> {
        info!("Initializing application state...");

        let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());
        let brain = FileBrain::open(brain_file).await?;

        // The agent cannot serve without knowing what it runs
        let revision =
            init_self_revision(runner.as_ref(), &brain, &deploy.install_dir).await?;

        let http_client = Arc::new(HttpClient::new(&github.api_url)?);
        let token_mngr = Arc::new(TokenManager::new(github.auth, http_client.clone()));
        let reporter = Arc::new(GithubStatusReporter::new(
            http_client,
            token_mngr,
            github.status_context,
        ));

        let deployer = Arc::new(PushDeployer::new(deploy, runner, reporter));

        Ok(Self { revision, deployer })
    }
}
